use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::kernels::{Kernel, Stride};
use crate::output::LineSink;
use crate::ring::{Baton, Ring};
use crate::synca::{
    Interrupt, Interruption, OnSignal, OnUnwind, SlotError, SlotFault, StartBarrier,
};

use super::{Budget, CancellationSignal};

/// `WorkerStatus` is the terminal state of a worker.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerStatus {
    /// the budget was used up.
    Completed,

    /// cancellation was observed, the partial result is kept.
    Cancelled,

    /// the thread for the worker could not be created.
    CreationFailed,

    /// the worker's thread could not be joined, usually because it
    /// panicked.
    JoinFailed(String),

    SynchronizationFailed(SlotFault),

    /// the worker stopped because a peer failed fatally.
    Aborted,
}

impl WorkerStatus {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl From<Interruption> for WorkerStatus {
    fn from(reason: Interruption) -> Self {
        match reason {
            Interruption::Cancelled => Self::Cancelled,
            Interruption::Halted => Self::Aborted,
        }
    }
}

/// `Phase` tracks how far a worker got.
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    /// taking the initial slot and waiting at the start barrier.
    Priming,

    Steady,

    Finished(WorkerStatus),
}

/// `WorkerActivity` is sent by workers to the coordinator as they progress.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerActivity {
    /// the worker is primed and waits at the start barrier.
    Ready { worker: usize },

    /// sent from inside the worker's first print section.
    FirstVisit { worker: usize },

    /// the worker's first visit completed the first full cycle.
    CycleComplete { worker: usize },

    Finished { worker: usize, status: WorkerStatus },
}

/// `WorkerReport` is what a worker hands back through its join handle.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerReport {
    pub worker: usize,
    pub status: WorkerStatus,

    /// sum of the kernel terms the worker covered, zero unless the status
    /// is a success.
    pub partial: f64,
    pub visits: u64,

    /// true once the worker made it past the start barrier.
    pub primed: bool,
}

impl WorkerReport {
    /// `unstarted` reports a worker that never ran.
    #[must_use]
    pub fn unstarted(worker: usize, status: WorkerStatus) -> Self {
        Self {
            worker,
            status,
            partial: 0.0,
            visits: 0,
            primed: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub index: usize,
    pub stride: usize,
    pub budget: Budget,
    pub unit_len: u64,
    pub payload: String,
}

/// `FirstCycle` elects the worker whose first visit completes the first
/// full rotation.
pub struct FirstCycle {
    parties: usize,
    visited: AtomicUsize,
    complete: OnSignal,
}

impl FirstCycle {
    #[must_use]
    pub fn new(parties: usize) -> Self {
        Self {
            parties,
            visited: AtomicUsize::new(0),
            complete: OnSignal::new(),
        }
    }

    /// `record` notes a worker's first visit, returning true for exactly
    /// one caller: the one completing the cycle.
    pub fn record(&self) -> bool {
        let seen = self.visited.fetch_add(1, Ordering::SeqCst) + 1;
        seen == self.parties && self.complete.turn_on()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete.probe()
    }
}

/// `RelayState` is everything the workers of one relay share.
pub(crate) struct RelayState {
    pub ring: Option<Ring>,
    pub barrier: StartBarrier,
    pub halted: OnSignal,
    pub first_cycle: FirstCycle,
    pub cancel: CancellationSignal,
    pub kernel: Arc<dyn Kernel>,
    pub sink: Arc<dyn LineSink>,
    pub activity: flume::Sender<WorkerActivity>,
}

impl RelayState {
    /// `halt` stops every blocking wait of the relay.
    pub fn halt(&self) {
        if self.halted.turn_on() {
            tracing::debug!("relay halted");
        }
        self.barrier.abort();
    }

    fn report(&self, activity: WorkerActivity) {
        if let Err(err) = self.activity.send(activity) {
            tracing::trace!("activity dropped: {:?}", err.into_inner());
        }
    }
}

/// `Watch` is the [`Interrupt`] of a relay participant. A halt takes
/// precedence over cancellation.
pub(crate) struct Watch<'a> {
    state: &'a RelayState,
    cancellable: bool,
}

impl<'a> Watch<'a> {
    pub fn worker(state: &'a RelayState) -> Self {
        Self {
            state,
            cancellable: true,
        }
    }

    pub fn coordinator(state: &'a RelayState) -> Self {
        Self {
            state,
            cancellable: false,
        }
    }
}

impl Interrupt for Watch<'_> {
    fn interruption(&self) -> Option<Interruption> {
        if self.state.halted.probe() {
            return Some(Interruption::Halted);
        }
        if self.cancellable && self.state.cancel.observe() {
            return Some(Interruption::Cancelled);
        }
        None
    }
}

#[derive(Default)]
struct Progress {
    partial: f64,
    visits: u64,
}

pub struct Worker {
    config: WorkerConfig,
    state: Arc<RelayState>,
    phase: Phase,
}

impl Worker {
    pub(crate) fn new(config: WorkerConfig, state: Arc<RelayState>) -> Self {
        Self {
            config,
            state,
            phase: Phase::Priming,
        }
    }

    fn advance(&mut self, next: Phase) {
        tracing::debug!(
            "worker {} moving from {:?} to {:?}",
            self.config.index,
            self.phase,
            next
        );
        self.phase = next;
    }

    /// `run` drives the worker to a terminal status.
    pub fn run(mut self) -> WorkerReport {
        let span = tracing::trace_span!("Worker::run", worker = self.config.index);
        let _enter = span.enter();

        let unwinding = self.state.clone();
        let _halt_on_panic = OnUnwind::new(move || unwinding.halt());

        let state = self.state.clone();
        let mut baton = state.ring.as_ref().map(|ring| ring.baton(self.config.index));
        let mut progress = Progress::default();

        let status = self.drive(&state, baton.as_mut(), &mut progress);

        if let (Some(ring), Some(baton)) = (state.ring.as_ref(), baton.as_mut()) {
            ring.relinquish(baton);
        }

        let primed = self.phase == Phase::Steady;
        self.advance(Phase::Finished(status.clone()));

        baton_logs::info!(
            worker = self.config.index,
            visits = progress.visits,
            "worker finished: {:?}",
            status
        );
        state.report(WorkerActivity::Finished {
            worker: self.config.index,
            status: status.clone(),
        });

        WorkerReport {
            worker: self.config.index,
            partial: if status.is_success() {
                progress.partial
            } else {
                0.0
            },
            status,
            visits: progress.visits,
            primed,
        }
    }

    fn drive(
        &mut self,
        state: &RelayState,
        mut baton: Option<&mut Baton>,
        progress: &mut Progress,
    ) -> WorkerStatus {
        let watch = Watch::worker(state);
        let index = self.config.index;

        if let (Some(ring), Some(baton)) = (state.ring.as_ref(), baton.as_deref_mut()) {
            if let Err(err) = ring.prime(baton, &watch) {
                return self.failed(state, err);
            }
        }

        state.report(WorkerActivity::Ready { worker: index });
        if let Err(reason) = state.barrier.wait(&watch) {
            return reason.into();
        }
        self.advance(Phase::Steady);

        let stride = Stride {
            offset: index as u64,
            step: self.config.stride as u64,
            unit_len: self.config.unit_len,
        };

        loop {
            if self.config.budget.exhausted(progress.visits) {
                return WorkerStatus::Completed;
            }

            if let Some(reason) = watch.interruption() {
                return reason.into();
            }

            let turn = match (state.ring.as_ref(), baton.as_deref_mut()) {
                (Some(ring), Some(baton)) => {
                    if let Err(err) = ring.enter(baton, &watch) {
                        return self.failed(state, err);
                    }

                    // nothing is printed once cancellation was seen
                    if let Some(reason) = watch.interruption() {
                        return reason.into();
                    }

                    state.sink.emit(&format!(
                        "{} {} {}",
                        index, progress.visits, self.config.payload
                    ));
                    Some((ring, baton))
                }
                _ => None,
            };

            progress.partial += stride.unit(state.kernel.as_ref(), progress.visits);
            progress.visits += 1;

            if progress.visits == 1 {
                state.report(WorkerActivity::FirstVisit { worker: index });
                if state.first_cycle.record() {
                    baton_logs::info!("worker {} completed the first full cycle", index);
                    state.report(WorkerActivity::CycleComplete { worker: index });
                }
            }

            if let Some((ring, baton)) = turn {
                if let Err(fault) = ring.leave(baton) {
                    return self.failed(state, fault.into());
                }
            }
        }
    }

    fn failed(&self, state: &RelayState, err: SlotError) -> WorkerStatus {
        match err {
            SlotError::Interrupted(reason) => reason.into(),
            SlotError::Fault(fault) => {
                baton_logs::error!(
                    worker = self.config.index,
                    "synchronization failed: {}",
                    fault
                );
                state.halt();
                WorkerStatus::SynchronizationFailed(fault)
            }
        }
    }
}
