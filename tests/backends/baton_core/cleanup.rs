use std::sync::Arc;

use baton_core::output::MemorySink;
use baton_core::relay::{Budget, CancellationSignal, Coordinator, Pacing, RelayConfig};
use baton_core::ring::{PrimitiveLedger, RingKind, RingLayout};
use baton_core::synca::{MutexSlot, RingSlot};
use ntest::timeout;
use tracing_test::traced_test;

fn run_with_ledger(config: RelayConfig) -> Arc<PrimitiveLedger> {
    let ledger = PrimitiveLedger::new();
    let _ = Coordinator::new(config)
        .with_sink(Arc::new(MemorySink::new()))
        .with_ledger(ledger.clone())
        .run();
    ledger
}

#[test]
#[traced_test]
#[timeout(20000)]
fn successful_runs_destroy_every_slot() {
    let mutex = run_with_ledger(RelayConfig::new(6, Budget::Units(4)));
    assert_eq!(mutex.created(), 7);
    assert!(mutex.is_balanced());

    let semaphore = run_with_ledger(
        RelayConfig::new(6, Budget::Units(4)).with_pacing(Pacing::Ring(RingKind::Semaphore)),
    );
    assert_eq!(semaphore.created(), 6);
    assert!(semaphore.is_balanced());

    let free = run_with_ledger(RelayConfig::new(6, Budget::Units(4)).with_pacing(Pacing::Free));
    assert_eq!(free.created(), 0);
}

#[test]
#[traced_test]
#[timeout(20000)]
fn cancelled_runs_destroy_every_slot() {
    let ledger = PrimitiveLedger::new();
    let cancel = CancellationSignal::new();
    cancel.trigger();

    let report = Coordinator::new(RelayConfig::new(3, Budget::UntilCancelled))
        .with_sink(Arc::new(MemorySink::new()))
        .with_cancellation(cancel)
        .with_ledger(ledger.clone())
        .run()
        .expect("should run");

    assert!(report.cancelled);
    assert_eq!(ledger.outstanding(), 0);
}

#[test]
#[traced_test]
fn rejected_rings_leave_nothing_behind() {
    let ledger = PrimitiveLedger::new();
    let slots: Vec<Box<dyn RingSlot>> = vec![Box::new(MutexSlot::new(0))];

    let err = Coordinator::new(RelayConfig::new(2, Budget::Units(1)))
        .with_ledger(ledger.clone())
        .with_ring_slots(RingLayout::HandOff, slots)
        .run()
        .expect_err("two workers need three slots");

    assert_eq!(err.exit_code(), 7);
    assert!(ledger.is_balanced());
}
