use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use baton_core::kernels::{Leibniz, Ones};
use baton_core::relay::{
    Budget, CancellationSignal, Coordinator, Pacing, RelayConfig, WorkerStatus,
};
use baton_core::ring::RingKind;
use ntest::timeout;
use tracing_test::traced_test;

use super::support::{assert_cyclic, CancelAfter};

#[test]
#[traced_test]
#[timeout(20000)]
fn cancelled_ring_keeps_rotation_and_partials() {
    for kind in [RingKind::Mutex, RingKind::Semaphore] {
        let cancel = CancellationSignal::new();
        let sink = CancelAfter::new(12, cancel.clone());
        let config = RelayConfig::new(3, Budget::UntilCancelled)
            .with_pacing(Pacing::Ring(kind))
            .with_poll_interval(Duration::from_millis(1));

        let report = Coordinator::new(config)
            .with_sink(sink.clone())
            .with_kernel(Arc::new(Ones))
            .with_cancellation(cancel)
            .run()
            .expect("should run");

        let lines = sink.lines.lines();
        assert!(lines.len() >= 12, "{kind}: {} lines", lines.len());
        assert_cyclic(&lines, 3);

        assert!(report.cancelled);
        assert!(report
            .workers
            .iter()
            .all(|worker| worker.status == WorkerStatus::Cancelled));

        // every visit printed exactly one line and summed exactly one term
        #[allow(clippy::cast_precision_loss)]
        let printed = lines.len() as f64;
        assert_eq!(report.aggregate.value(), Some(printed));
        assert_eq!(report.exit_code(), 0);
    }
}

#[test]
#[traced_test]
#[timeout(20000)]
fn trigger_before_ready_takes_effect_when_armed() {
    let cancel = CancellationSignal::new();
    cancel.trigger();

    let config = RelayConfig::new(4, Budget::UntilCancelled).with_pacing(Pacing::Free);
    let report = Coordinator::new(config)
        .with_cancellation(cancel.clone())
        .run()
        .expect("should run");

    assert!(cancel.is_armed());
    assert!(report.cancelled);
    assert!(report.aggregate.is_valid());
    assert!(report.workers.iter().all(|worker| worker.primed));
}

#[test]
#[traced_test]
#[timeout(20000)]
fn unbounded_accumulation_stops_soon_after_trigger() {
    let cancel = CancellationSignal::new();
    let config = RelayConfig::new(4, Budget::UntilCancelled)
        .with_pacing(Pacing::Free)
        .with_unit_len(1_000);

    let trigger = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            cancel.trigger();
            Instant::now()
        })
    };

    let report = Coordinator::new(config)
        .with_kernel(Arc::new(Leibniz))
        .with_cancellation(cancel)
        .run()
        .expect("should run");
    let finished = Instant::now();
    let triggered = trigger.join().expect("should join");

    assert!(finished.duration_since(triggered) < Duration::from_secs(2));
    assert!(report.workers.iter().all(|worker| worker.visits > 0));

    // workers stop after different unit counts, so only validity is fixed
    let pi = report.aggregate.value().expect("cancelled runs stay valid");
    assert!(pi.is_finite());
}

#[test]
#[traced_test]
#[timeout(20000)]
fn waiting_workers_notice_cancellation() {
    // one visit each, then worker 0 cancels while the others wait for
    // turns that will never be printed
    let cancel = CancellationSignal::new();
    let sink = CancelAfter::new(1, cancel.clone());
    let config = RelayConfig::new(4, Budget::UntilCancelled)
        .with_pacing(Pacing::Ring(RingKind::Mutex))
        .with_poll_interval(Duration::from_millis(1));

    let report = Coordinator::new(config)
        .with_sink(sink.clone())
        .with_cancellation(cancel)
        .run()
        .expect("should run");

    assert_cyclic(&sink.lines.lines(), 4);
    assert!(report
        .workers
        .iter()
        .all(|worker| worker.status == WorkerStatus::Cancelled));
}
