//! The ring of slots whose rotation decides which worker may enter the
//! print section.
//!
//! Two layouts exist:
//!
//! - [`RingLayout::HandOff`]: `n` workers over `n+1` owner-checked slots.
//!   Worker `i` starts holding slot `(n+1-i) mod (n+1)`, which leaves slot 1
//!   free for worker 0. A visit acquires the slot after the one held, runs
//!   the print section and only then releases the slot held before. Since
//!   worker `i` always waits on the slot worker `i-1` holds, visits rotate
//!   strictly in worker order starting with worker 0.
//!
//! - [`RingLayout::PingPong`]: `n` workers over `n` counting slots of
//!   maximum count 1, slot 0 seeded. Worker `i` acquires slot `i` and
//!   releases slot `(i+1) mod n`.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ArgumentError;
use crate::synca::{
    Interrupt, MutexSlot, RingSlot, SemaphoreSlot, SlotError, SlotFault, DEFAULT_SLOT_POLL,
};

/// `RingKind` selects the primitive a ring is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingKind {
    Mutex,
    Semaphore,
}

impl RingKind {
    #[must_use]
    pub fn layout(&self) -> RingLayout {
        match self {
            Self::Mutex => RingLayout::HandOff,
            Self::Semaphore => RingLayout::PingPong,
        }
    }
}

impl FromStr for RingKind {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mutex" => Ok(Self::Mutex),
            "semaphore" => Ok(Self::Semaphore),
            _ => Err(ArgumentError::UnknownRing(s.to_string())),
        }
    }
}

impl core::fmt::Display for RingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mutex => write!(f, "mutex"),
            Self::Semaphore => write!(f, "semaphore"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingLayout {
    HandOff,
    PingPong,
}

impl RingLayout {
    /// `slots_for` returns how many slots the layout needs for `workers`.
    #[must_use]
    pub fn slots_for(&self, workers: usize) -> usize {
        match self {
            Self::HandOff => workers + 1,
            Self::PingPong => workers,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::HandOff => "hand-off",
            Self::PingPong => "ping-pong",
        }
    }
}

/// `PrimitiveLedger` counts slot creations and destructions.
#[derive(Debug, Default)]
pub struct PrimitiveLedger {
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

impl PrimitiveLedger {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.created().saturating_sub(self.destroyed())
    }

    pub fn is_balanced(&self) -> bool {
        self.created() == self.destroyed()
    }
}

/// `TrackedSlot` records its slot in the ledger until dropped.
struct TrackedSlot {
    slot: Box<dyn RingSlot>,
    ledger: Arc<PrimitiveLedger>,
}

impl TrackedSlot {
    fn new(slot: Box<dyn RingSlot>, ledger: Arc<PrimitiveLedger>) -> Self {
        ledger.created.fetch_add(1, Ordering::SeqCst);
        Self { slot, ledger }
    }
}

impl Drop for TrackedSlot {
    fn drop(&mut self) {
        self.ledger.destroyed.fetch_add(1, Ordering::SeqCst);
        tracing::trace!("slot {} destroyed", self.slot.index());
    }
}

/// `starting_offset` returns the slot a hand-off worker holds before its
/// first visit.
#[must_use]
pub fn starting_offset(worker: usize, slots: usize) -> usize {
    (slots - worker % slots) % slots
}

/// `Baton` is a worker's position in the ring and the slots it holds.
#[derive(Debug)]
pub struct Baton {
    worker: usize,
    current: usize,
    held: Vec<usize>,
}

impl Baton {
    #[must_use]
    pub fn worker(&self) -> usize {
        self.worker
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn held(&self) -> &[usize] {
        &self.held
    }
}

pub struct Ring {
    layout: RingLayout,
    workers: usize,
    slots: Vec<TrackedSlot>,
}

impl Ring {
    /// Builds the ring `kind` calls for over `workers` workers.
    #[must_use]
    pub fn new(kind: RingKind, workers: usize, ledger: Arc<PrimitiveLedger>) -> Self {
        Self::with_poll(kind, workers, DEFAULT_SLOT_POLL, ledger)
    }

    #[must_use]
    pub fn with_poll(
        kind: RingKind,
        workers: usize,
        poll: Duration,
        ledger: Arc<PrimitiveLedger>,
    ) -> Self {
        let layout = kind.layout();
        let slots = (0..layout.slots_for(workers))
            .map(|index| -> Box<dyn RingSlot> {
                match kind {
                    RingKind::Mutex => Box::new(MutexSlot::with_poll(index, poll)),
                    RingKind::Semaphore => {
                        let initial = usize::from(index == 0);
                        Box::new(SemaphoreSlot::with_poll(index, initial, 1, poll))
                    }
                }
            })
            .map(|slot| TrackedSlot::new(slot, ledger.clone()))
            .collect();

        tracing::debug!(
            "built {} ring of {} slots for {} workers",
            layout.name(),
            layout.slots_for(workers),
            workers
        );

        Self {
            layout,
            workers,
            slots,
        }
    }

    /// `from_slots` builds a ring over caller supplied slots. Slot `k` of
    /// the vector is ring position `k` and must already be in the initial
    /// state `layout` expects.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError::RingSize`] when the slot count does not fit
    /// the layout.
    pub fn from_slots(
        layout: RingLayout,
        workers: usize,
        slots: Vec<Box<dyn RingSlot>>,
        ledger: Arc<PrimitiveLedger>,
    ) -> Result<Self, ArgumentError> {
        let slots: Vec<TrackedSlot> = slots
            .into_iter()
            .map(|slot| TrackedSlot::new(slot, ledger.clone()))
            .collect();

        if workers == 0 || slots.len() != layout.slots_for(workers) {
            return Err(ArgumentError::RingSize {
                layout: layout.name(),
                workers,
                slots: slots.len(),
            });
        }

        Ok(Self {
            layout,
            workers,
            slots,
        })
    }

    #[must_use]
    pub fn layout(&self) -> RingLayout {
        self.layout
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, index: usize) -> &dyn RingSlot {
        self.slots[index].slot.as_ref()
    }

    /// `baton` returns the starting position of `worker`.
    #[must_use]
    pub fn baton(&self, worker: usize) -> Baton {
        let current = match self.layout {
            RingLayout::HandOff => starting_offset(worker, self.len()),
            RingLayout::PingPong => worker % self.len(),
        };

        Baton {
            worker,
            current,
            held: Vec::with_capacity(2),
        }
    }

    /// `prime` takes the slot a worker must hold before the start barrier.
    ///
    /// # Errors
    ///
    /// Returns the [`SlotError`] of the failed acquire.
    pub fn prime(&self, baton: &mut Baton, interrupt: &dyn Interrupt) -> Result<(), SlotError> {
        if self.layout == RingLayout::PingPong {
            return Ok(());
        }

        self.slot(baton.current).acquire(baton.worker, interrupt)?;
        baton.held.push(baton.current);
        Ok(())
    }

    /// `enter` blocks until the worker may run its print section.
    ///
    /// # Errors
    ///
    /// Returns the [`SlotError`] of the failed acquire.
    pub fn enter(&self, baton: &mut Baton, interrupt: &dyn Interrupt) -> Result<(), SlotError> {
        match self.layout {
            RingLayout::HandOff => {
                let next = (baton.current + 1) % self.len();
                self.slot(next).acquire(baton.worker, interrupt)?;
                baton.held.push(next);
            }
            RingLayout::PingPong => {
                self.slot(baton.current).acquire(baton.worker, interrupt)?;
            }
        }
        Ok(())
    }

    /// `leave` ends the print section and passes the turn on.
    ///
    /// # Errors
    ///
    /// Returns the [`SlotFault`] of the failed release.
    pub fn leave(&self, baton: &mut Baton) -> Result<(), SlotFault> {
        match self.layout {
            RingLayout::HandOff => {
                let previous = baton.current;
                let next = (previous + 1) % self.len();

                self.slot(previous).release(baton.worker)?;
                baton.held.retain(|held| *held != previous);
                baton.current = next;
            }
            RingLayout::PingPong => {
                let next = (baton.current + 1) % self.len();
                self.slot(next).release(baton.worker)?;
            }
        }
        Ok(())
    }

    /// `relinquish` releases whatever the worker still holds once it stops.
    /// Peers blocked on those slots may then proceed and notice why the
    /// run ended.
    pub fn relinquish(&self, baton: &mut Baton) {
        for index in baton.held.drain(..) {
            if let Err(fault) = self.slots[index].slot.release(baton.worker) {
                tracing::debug!(
                    "worker {} could not relinquish slot {}: {}",
                    baton.worker,
                    index,
                    fault
                );
            }
        }
    }
}
