use std::io;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use baton_core::errors::{BatonError, EXIT_CREATION, EXIT_JOIN, EXIT_SYNCHRONIZATION};
use baton_core::output::{LineSink, MemorySink};
use baton_core::relay::{
    AggregateResult, Budget, Coordinator, OsThreads, Pacing, RelayConfig, Spawner, WorkerReport,
    WorkerStatus, WorkerTask,
};
use baton_core::ring::{PrimitiveLedger, RingKind, RingLayout};
use baton_core::synca::{Interrupt, MutexSlot, RingSlot, SlotError, SlotFault, SlotOp};
use ntest::timeout;
use tracing_test::traced_test;

/// `Tripwire` behaves like a mutex slot until its `trip_on`-th acquire,
/// which fails.
struct Tripwire {
    inner: MutexSlot,
    trip_on: usize,
    acquires: AtomicUsize,
}

impl RingSlot for Tripwire {
    fn index(&self) -> usize {
        self.inner.index()
    }

    fn acquire(&self, owner: usize, interrupt: &dyn Interrupt) -> Result<(), SlotError> {
        if self.acquires.fetch_add(1, Ordering::SeqCst) + 1 == self.trip_on {
            return Err(SlotFault::Poisoned {
                slot: self.index(),
                op: SlotOp::Acquire,
            }
            .into());
        }
        self.inner.acquire(owner, interrupt)
    }

    fn release(&self, owner: usize) -> Result<(), SlotFault> {
        self.inner.release(owner)
    }
}

struct FailAt(usize);

impl Spawner for FailAt {
    fn spawn(&self, worker: usize, task: WorkerTask) -> io::Result<JoinHandle<WorkerReport>> {
        if worker == self.0 {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "thread limit reached"));
        }
        OsThreads::default().spawn(worker, task)
    }
}

struct PanicOnLine {
    lines: MemorySink,
    panic_at: usize,
    seen: AtomicUsize,
}

impl LineSink for PanicOnLine {
    fn emit(&self, line: &str) {
        assert!(
            self.seen.fetch_add(1, Ordering::SeqCst) != self.panic_at,
            "sink refused {line:?}"
        );
        self.lines.emit(line);
    }
}

#[test]
#[traced_test]
#[timeout(20000)]
fn slot_fault_stops_the_whole_ring() {
    let ledger = PrimitiveLedger::new();
    let sink = Arc::new(MemorySink::new());
    let slots: Vec<Box<dyn RingSlot>> = vec![
        Box::new(MutexSlot::new(0)),
        Box::new(MutexSlot::new(1)),
        Box::new(Tripwire {
            inner: MutexSlot::new(2),
            trip_on: 2,
            acquires: AtomicUsize::new(0),
        }),
    ];

    let report = Coordinator::new(RelayConfig::new(2, Budget::Units(5)))
        .with_sink(sink.clone())
        .with_ledger(ledger.clone())
        .with_ring_slots(RingLayout::HandOff, slots)
        .run()
        .expect("should report");

    // worker 1 primed on slot 2, worker 0's second visit trips it
    assert_eq!(sink.lines(), vec!["0 0 ping", "1 0 pong"]);
    assert_eq!(
        report.workers[0].status,
        WorkerStatus::SynchronizationFailed(SlotFault::Poisoned {
            slot: 2,
            op: SlotOp::Acquire,
        })
    );
    assert_eq!(report.workers[1].status, WorkerStatus::Aborted);
    assert!((report.workers[1].partial).abs() < f64::EPSILON);

    assert!(matches!(
        report.primary_error(),
        Some(BatonError::Synchronization { worker: 0, .. })
    ));
    assert_eq!(report.exit_code(), EXIT_SYNCHRONIZATION);
    assert_eq!(
        report.aggregate,
        AggregateResult::Invalid {
            offenders: vec![0, 1]
        }
    );

    assert_eq!(ledger.created(), 3);
    assert!(ledger.is_balanced());
}

#[test]
#[traced_test]
#[timeout(20000)]
fn failure_while_priming_releases_the_coordinator() {
    let ledger = PrimitiveLedger::new();
    let slots: Vec<Box<dyn RingSlot>> = vec![
        Box::new(Tripwire {
            inner: MutexSlot::new(0),
            trip_on: 1,
            acquires: AtomicUsize::new(0),
        }),
        Box::new(MutexSlot::new(1)),
        Box::new(MutexSlot::new(2)),
        Box::new(MutexSlot::new(3)),
    ];

    let report = Coordinator::new(RelayConfig::new(3, Budget::Units(5)))
        .with_sink(Arc::new(MemorySink::new()))
        .with_ledger(ledger.clone())
        .with_ring_slots(RingLayout::HandOff, slots)
        .run()
        .expect("should report");

    assert!(matches!(
        report.workers[0].status,
        WorkerStatus::SynchronizationFailed(_)
    ));
    assert!(report.workers.iter().all(|worker| !worker.primed));
    assert_eq!(report.exit_code(), EXIT_SYNCHRONIZATION);
    assert!(ledger.is_balanced());
}

#[test]
#[traced_test]
#[timeout(20000)]
fn creation_failure_cleans_up_the_mutex_ring() {
    let ledger = PrimitiveLedger::new();
    let report = Coordinator::new(RelayConfig::new(4, Budget::Units(3)))
        .with_sink(Arc::new(MemorySink::new()))
        .with_spawner(FailAt(1))
        .with_ledger(ledger.clone())
        .run()
        .expect("should report");

    assert_eq!(report.workers.len(), 2);
    assert_eq!(report.workers[1].status, WorkerStatus::CreationFailed);
    assert_eq!(report.exit_code(), EXIT_CREATION);
    assert_eq!(
        report.aggregate,
        AggregateResult::Invalid {
            offenders: vec![0, 1, 2, 3]
        }
    );

    let creation = report.primary_error().expect("has an error");
    assert_eq!(
        creation.to_string(),
        "worker 1: can't create thread: thread limit reached"
    );

    assert_eq!(ledger.created(), 5);
    assert!(ledger.is_balanced());
}

#[test]
#[traced_test]
#[timeout(20000)]
fn panicking_sink_is_collected_as_join_failure() {
    let ledger = PrimitiveLedger::new();
    let sink = Arc::new(PanicOnLine {
        lines: MemorySink::new(),
        panic_at: 2,
        seen: AtomicUsize::new(0),
    });
    let config =
        RelayConfig::new(2, Budget::Units(5)).with_pacing(Pacing::Ring(RingKind::Semaphore));

    let report = Coordinator::new(config)
        .with_sink(sink.clone())
        .with_ledger(ledger.clone())
        .run()
        .expect("should report");

    assert_eq!(sink.lines.lines(), vec!["0 0 ping", "1 0 pong"]);
    assert!(matches!(
        report.workers[0].status,
        WorkerStatus::JoinFailed(ref reason) if reason.contains("sink refused")
    ));
    assert_eq!(report.workers[1].status, WorkerStatus::Aborted);

    // both failures are reported, the join failure decides the exit status
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.exit_code(), EXIT_JOIN);

    // the panicked worker's slot is torn down with the ring
    assert_eq!(ledger.created(), 2);
    assert!(ledger.is_balanced());
}
