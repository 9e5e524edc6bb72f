use std::sync::Arc;

use baton_core::kernels::{Identity, Leibniz};
use baton_core::output::MemorySink;
use baton_core::relay::{AggregateResult, Budget, Coordinator, Pacing, RelayConfig};
use baton_core::ring::RingKind;
use ntest::timeout;
use tracing_test::traced_test;

use super::support::{assert_cyclic, cyclic_lines};

fn relay(workers: usize, visits: u64, kind: RingKind) -> (Vec<String>, Vec<usize>, f64) {
    let sink = Arc::new(MemorySink::new());
    let config =
        RelayConfig::new(workers, Budget::Units(visits)).with_pacing(Pacing::Ring(kind));

    let report = Coordinator::new(config)
        .with_sink(sink.clone())
        .run()
        .expect("should run");

    assert!(report.is_success(), "{:?}", report.errors);
    let total = report.aggregate.value().expect("valid aggregate");
    (sink.lines(), report.first_visit_order, total)
}

#[test]
#[traced_test]
#[timeout(20000)]
fn two_workers_alternate_five_times() {
    let (lines, _, total) = relay(2, 5, RingKind::Mutex);

    assert_eq!(
        lines,
        vec![
            "0 0 ping", "1 0 pong", "0 1 ping", "1 1 pong", "0 2 ping", "1 2 pong", "0 3 ping",
            "1 3 pong", "0 4 ping", "1 4 pong",
        ]
    );
    assert!((total - 10.0).abs() < f64::EPSILON);
}

#[test]
#[traced_test]
#[timeout(30000)]
fn mutex_ring_visits_rotate_in_worker_order() {
    for workers in 1..=5 {
        let (lines, first_visits, _) = relay(workers, 7, RingKind::Mutex);

        assert_eq!(lines, cyclic_lines(workers, 7, &["ping", "pong"]));
        assert_eq!(first_visits, (0..workers).collect::<Vec<_>>());
    }
}

#[test]
#[traced_test]
#[timeout(30000)]
fn semaphore_ring_visits_rotate_in_worker_order() {
    for workers in 1..=5 {
        let (lines, first_visits, _) = relay(workers, 7, RingKind::Semaphore);

        assert_cyclic(&lines, workers);
        assert_eq!(lines.len(), workers * 7);
        assert_eq!(first_visits, (0..workers).collect::<Vec<_>>());
    }
}

#[test]
#[traced_test]
#[timeout(30000)]
fn many_workers_keep_the_rotation() {
    let (lines, _, total) = relay(16, 25, RingKind::Mutex);

    assert_cyclic(&lines, 16);
    assert!((total - 400.0).abs() < f64::EPSILON);
}

#[test]
#[traced_test]
#[timeout(30000)]
fn aggregate_does_not_depend_on_scheduling() {
    let run = |pacing: Pacing| {
        let config = RelayConfig::new(8, Budget::Units(50))
            .with_pacing(pacing)
            .with_unit_len(10);
        Coordinator::new(config)
            .with_sink(Arc::new(MemorySink::new()))
            .with_kernel(Arc::new(Identity))
            .run()
            .expect("should run")
            .aggregate
    };

    // indices 0..4000 each contribute once
    let exact = AggregateResult::Valid(3999.0 * 4000.0 / 2.0);
    assert_eq!(run(Pacing::Free), exact);
    assert_eq!(run(Pacing::Free), exact);
    assert_eq!(run(Pacing::Ring(RingKind::Mutex)), exact);
    assert_eq!(run(Pacing::Ring(RingKind::Semaphore)), exact);
}

#[test]
#[traced_test]
#[timeout(30000)]
fn leibniz_runs_repeat_bit_for_bit() {
    let run = || {
        let config = RelayConfig::new(4, Budget::Units(20))
            .with_pacing(Pacing::Free)
            .with_unit_len(500);
        Coordinator::new(config)
            .with_kernel(Arc::new(Leibniz))
            .run()
            .expect("should run")
            .aggregate
            .value()
            .expect("valid aggregate")
    };

    let first = run();
    assert_eq!(first.to_bits(), run().to_bits());
    assert!((first - std::f64::consts::PI).abs() < 1e-4);
}
