use std::any::Any;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::errors::{BatonError, BatonResult, EXIT_SUCCESS};
use crate::kernels::{Kernel, Ones};
use crate::limits::get_max_workers;
use crate::output::{LineSink, StdoutSink};
use crate::ring::{PrimitiveLedger, Ring, RingLayout};
use crate::synca::{Interruption, RingSlot, StartBarrier};

use super::worker::{FirstCycle, RelayState, Watch};
use super::{
    CancellationSignal, OsThreads, Pacing, RelayConfig, Spawner, Worker, WorkerActivity,
    WorkerConfig, WorkerReport, WorkerStatus,
};

/// `AggregateResult` combines the partial results of a run.
#[derive(Clone, Debug, PartialEq)]
pub enum AggregateResult {
    /// the scaled sum of every worker's partial, in worker order.
    Valid(f64),

    /// some workers did not end in a success status.
    Invalid { offenders: Vec<usize> },
}

impl AggregateResult {
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Valid(value) => Some(*value),
            Self::Invalid { .. } => None,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// `RunReport` is the outcome of [`Coordinator::run`].
#[derive(Debug)]
pub struct RunReport {
    /// one report per worker that was started or failed to start, in
    /// worker order.
    pub workers: Vec<WorkerReport>,
    pub aggregate: AggregateResult,

    /// every fatal condition of the run.
    pub errors: Vec<BatonError>,

    /// true if any worker stopped on cancellation.
    pub cancelled: bool,
    pub first_cycle_complete: bool,

    /// the order in which workers made their first visit.
    pub first_visit_order: Vec<usize>,
}

impl RunReport {
    /// `primary_error` picks the error that decides the exit status:
    /// creation, then synchronization, then join failures.
    #[must_use]
    pub fn primary_error(&self) -> Option<&BatonError> {
        let rank = |err: &BatonError| match err {
            BatonError::Argument(_) => 0,
            BatonError::Creation { .. } => 1,
            BatonError::Synchronization { .. } => 2,
            BatonError::Join { .. } => 3,
            BatonError::Aborted { .. } => 4,
        };
        self.errors.iter().min_by_key(|err| rank(err))
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.primary_error().map_or(EXIT_SUCCESS, BatonError::exit_code)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.aggregate.is_valid()
    }
}

/// `Coordinator` starts the workers of a relay, waits for them and combines
/// their results.
///
/// Joining is best-effort: a worker that can't be joined is recorded as
/// [`WorkerStatus::JoinFailed`] and the remaining workers are still joined.
pub struct Coordinator {
    config: RelayConfig,
    kernel: Arc<dyn Kernel>,
    sink: Arc<dyn LineSink>,
    spawner: Box<dyn Spawner>,
    cancel: CancellationSignal,
    ledger: Arc<PrimitiveLedger>,
    max_workers: usize,
    custom_slots: Option<(RingLayout, Vec<Box<dyn RingSlot>>)>,

    state: Option<Arc<RelayState>>,
    activity: Option<flume::Receiver<WorkerActivity>>,
    handles: Vec<(usize, JoinHandle<WorkerReport>)>,
    outcomes: Vec<WorkerReport>,
    first_visits: Vec<usize>,
    first_cycle_complete: bool,
}

impl Coordinator {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        let spawner = OsThreads {
            stack_size: config.stack_size,
        };

        Self {
            config,
            kernel: Arc::new(Ones),
            sink: Arc::new(StdoutSink),
            spawner: Box::new(spawner),
            cancel: CancellationSignal::new(),
            ledger: PrimitiveLedger::new(),
            max_workers: get_max_workers(),
            custom_slots: None,
            state: None,
            activity: None,
            handles: Vec::new(),
            outcomes: Vec::new(),
            first_visits: Vec::new(),
            first_cycle_complete: false,
        }
    }

    #[must_use]
    pub fn with_kernel(mut self, kernel: Arc<dyn Kernel>) -> Self {
        self.kernel = kernel;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LineSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub fn with_spawner(mut self, spawner: impl Spawner + 'static) -> Self {
        self.spawner = Box::new(spawner);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationSignal) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<PrimitiveLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    #[must_use]
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// `with_ring_slots` replaces the slots a ring paced relay builds with
    /// caller supplied ones laid out as `layout`.
    #[must_use]
    pub fn with_ring_slots(mut self, layout: RingLayout, slots: Vec<Box<dyn RingSlot>>) -> Self {
        self.custom_slots = Some((layout, slots));
        self
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationSignal {
        &self.cancel
    }

    #[must_use]
    pub fn ledger(&self) -> Arc<PrimitiveLedger> {
        self.ledger.clone()
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    fn build_ring(&mut self) -> BatonResult<Option<Ring>> {
        let workers = self.config.workers;
        let Pacing::Ring(kind) = self.config.pacing else {
            return Ok(None);
        };

        let ring = match self.custom_slots.take() {
            Some((layout, slots)) => Ring::from_slots(layout, workers, slots, self.ledger.clone())?,
            None => Ring::with_poll(
                kind,
                workers,
                self.config.poll_interval,
                self.ledger.clone(),
            ),
        };
        Ok(Some(ring))
    }

    /// `spawn` validates the config, builds the ring and starts one thread
    /// per worker.
    ///
    /// # Errors
    ///
    /// Returns [`BatonError::Argument`] before anything starts when the
    /// config is invalid. Returns [`BatonError::Creation`] when a thread
    /// could not be created, after halting the relay and joining every
    /// worker already started.
    pub fn spawn(&mut self) -> BatonResult<()> {
        let span = tracing::trace_span!("Coordinator::spawn");
        let _enter = span.enter();

        self.config.validate(self.max_workers)?;
        let ring = self.build_ring()?;

        let workers = self.config.workers;
        let (sender, receiver) = flume::unbounded();
        let state = Arc::new(RelayState {
            ring,
            barrier: StartBarrier::with_poll(workers + 1, self.config.poll_interval),
            halted: Default::default(),
            first_cycle: FirstCycle::new(workers),
            cancel: self.cancel.clone(),
            kernel: self.kernel.clone(),
            sink: self.sink.clone(),
            activity: sender,
        });

        self.state = Some(state.clone());
        self.activity = Some(receiver);

        for index in 0..workers {
            let worker = Worker::new(
                WorkerConfig {
                    index,
                    stride: workers,
                    budget: self.config.budget,
                    unit_len: self.config.unit_len,
                    payload: self.config.payload(index).to_string(),
                },
                state.clone(),
            );

            match self.spawner.spawn(index, Box::new(move || worker.run())) {
                Ok(handle) => {
                    tracing::debug!("started worker {}", index);
                    self.handles.push((index, handle));
                }
                Err(source) => {
                    baton_logs::error!(worker = index, "can't create worker thread: {}", source);
                    state.halt();
                    self.outcomes
                        .push(WorkerReport::unstarted(index, WorkerStatus::CreationFailed));
                    self.join_started();
                    return Err(BatonError::Creation {
                        worker: index,
                        source,
                    });
                }
            }
        }

        baton_logs::info!("started {} workers", workers);
        Ok(())
    }

    /// `wait_ready` blocks until every worker is primed and waiting at the
    /// start barrier, then releases them all.
    ///
    /// # Errors
    ///
    /// Returns [`Interruption::Halted`] if the relay was halted first.
    pub fn wait_ready(&self) -> Result<(), Interruption> {
        let span = tracing::trace_span!("Coordinator::wait_ready");
        let _enter = span.enter();

        let Some(state) = self.state.as_ref() else {
            return Err(Interruption::Halted);
        };

        state.barrier.wait(&Watch::coordinator(state))?;
        tracing::debug!("all workers ready");
        Ok(())
    }

    /// `arm` lets workers observe cancellation, including a trigger that
    /// arrived before.
    pub fn arm(&self) {
        if self.cancel.arm() && self.cancel.is_requested() {
            baton_logs::info!("cancellation was requested before workers were ready");
        }
    }

    fn join_started(&mut self) {
        for (index, handle) in self.handles.drain(..) {
            match handle.join() {
                Ok(report) => self.outcomes.push(report),
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    baton_logs::error!(worker = index, "can't join worker: {}", reason);
                    self.outcomes
                        .push(WorkerReport::unstarted(index, WorkerStatus::JoinFailed(reason)));
                }
            }
        }
    }

    /// `join_all` joins every started worker and tears the ring down.
    pub fn join_all(&mut self) -> Vec<WorkerReport> {
        let span = tracing::trace_span!("Coordinator::join_all");
        let _enter = span.enter();

        self.join_started();

        if let Some(receiver) = self.activity.take() {
            for activity in receiver.try_iter() {
                tracing::trace!("worker activity: {:?}", activity);
                if let WorkerActivity::FirstVisit { worker } = activity {
                    self.first_visits.push(worker);
                }
            }
        }

        // last reference once every worker is joined
        if let Some(state) = self.state.take() {
            self.first_cycle_complete = state.first_cycle.is_complete();
        }

        let mut outcomes = std::mem::take(&mut self.outcomes);
        outcomes.sort_by_key(|report| report.worker);
        outcomes
    }

    /// `aggregate` sums the partial results in worker order, or names the
    /// workers that keep it from being valid.
    #[must_use]
    pub fn aggregate(&self, reports: &[WorkerReport]) -> AggregateResult {
        let offenders: Vec<usize> = (0..self.config.workers)
            .filter(|worker| {
                !reports
                    .iter()
                    .any(|report| report.worker == *worker && report.status.is_success())
            })
            .collect();

        if !offenders.is_empty() {
            return AggregateResult::Invalid { offenders };
        }

        let sum: f64 = reports.iter().map(|report| report.partial).sum();
        AggregateResult::Valid(self.kernel.scale() * sum)
    }

    /// `run` spawns the workers, waits for them to be ready, arms
    /// cancellation, joins them and aggregates.
    ///
    /// # Errors
    ///
    /// Only [`BatonError::Argument`] is returned as an error, every other
    /// failure is part of the [`RunReport`].
    pub fn run(mut self) -> BatonResult<RunReport> {
        let span = tracing::trace_span!("Coordinator::run");
        let _enter = span.enter();

        let mut errors = Vec::new();
        match self.spawn() {
            Ok(()) => {
                if let Err(reason) = self.wait_ready() {
                    baton_logs::warn!("relay {} before all workers were ready", reason);
                }
                self.arm();
            }
            Err(err @ BatonError::Argument(_)) => return Err(err),
            Err(err) => errors.push(err),
        }

        let workers = self.join_all();

        for report in &workers {
            let worker = report.worker;
            match &report.status {
                WorkerStatus::SynchronizationFailed(fault) => {
                    errors.push(BatonError::Synchronization {
                        worker,
                        fault: fault.clone(),
                    });
                }
                WorkerStatus::JoinFailed(reason) => errors.push(BatonError::Join {
                    worker,
                    reason: reason.clone(),
                }),
                WorkerStatus::Aborted => errors.push(BatonError::Aborted { worker }),
                WorkerStatus::Completed
                | WorkerStatus::Cancelled
                | WorkerStatus::CreationFailed => {}
            }
        }

        let aggregate = self.aggregate(&workers);
        let cancelled = workers
            .iter()
            .any(|report| report.status == WorkerStatus::Cancelled);

        match aggregate.value() {
            Some(value) => baton_logs::info!("relay finished with aggregate {}", value),
            None => baton_logs::warn!("relay finished without a valid aggregate"),
        }

        Ok(RunReport {
            workers,
            aggregate,
            errors,
            cancelled,
            first_cycle_complete: self.first_cycle_complete,
            first_visit_order: std::mem::take(&mut self.first_visits),
        })
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        return (*reason).to_string();
    }
    if let Some(reason) = payload.downcast_ref::<String>() {
        return reason.clone();
    }
    "worker panicked".to_string()
}
