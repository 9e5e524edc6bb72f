// Implements the exclusion primitives a relay ring is built from.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use derive_more::derive::Display;

/// `DEFAULT_SLOT_POLL` is how long a blocked acquire sleeps before it
/// re-checks its [`Interrupt`].
pub const DEFAULT_SLOT_POLL: Duration = Duration::from_millis(10); // 10ms

/// `Interruption` names why a blocking wait was abandoned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum Interruption {
    /// the run was cancelled from outside.
    #[display("cancelled")]
    Cancelled,

    /// a peer failed fatally and the ring was halted.
    #[display("halted")]
    Halted,
}

/// `Interrupt` is polled by every blocking wait so cancellation and peer
/// failure can end it.
pub trait Interrupt: Send + Sync {
    fn interruption(&self) -> Option<Interruption>;
}

/// `Uninterrupted` never interrupts a wait.
#[derive(Clone, Copy, Debug, Default)]
pub struct Uninterrupted;

impl Interrupt for Uninterrupted {
    fn interruption(&self) -> Option<Interruption> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SlotOp {
    #[display("acquire")]
    Acquire,

    #[display("release")]
    Release,
}

/// `SlotFault` is an unrecoverable failure of a slot primitive.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SlotFault {
    #[error("{op} on slot {slot}: worker {owner} already holds it (self-deadlock)")]
    SelfDeadlock { slot: usize, owner: usize, op: SlotOp },

    #[error("{op} on slot {slot}: worker {owner} does not own it (holder: {holder:?})")]
    NotOwner {
        slot: usize,
        owner: usize,
        holder: Option<usize>,
        op: SlotOp,
    },

    #[error("{op} on slot {slot}: count would exceed maximum of {max}")]
    Overflow { slot: usize, max: usize, op: SlotOp },

    #[error("{op} on slot {slot}: primitive poisoned")]
    Poisoned { slot: usize, op: SlotOp },
}

impl SlotFault {
    #[must_use]
    pub fn slot(&self) -> usize {
        match self {
            Self::SelfDeadlock { slot, .. }
            | Self::NotOwner { slot, .. }
            | Self::Overflow { slot, .. }
            | Self::Poisoned { slot, .. } => *slot,
        }
    }

    #[must_use]
    pub fn op(&self) -> SlotOp {
        match self {
            Self::SelfDeadlock { op, .. }
            | Self::NotOwner { op, .. }
            | Self::Overflow { op, .. }
            | Self::Poisoned { op, .. } => *op,
        }
    }
}

/// `SlotError` is what a blocking acquire can end with.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error(transparent)]
    Fault(#[from] SlotFault),

    #[error("wait interrupted: {0}")]
    Interrupted(Interruption),
}

/// `RingSlot` is one exclusion primitive of a ring.
///
/// `owner` is the index of the calling worker. Owner-checked slots use it to
/// detect self-deadlock and foreign releases, counting slots ignore it.
pub trait RingSlot: Send + Sync {
    fn index(&self) -> usize;

    /// `acquire` blocks until the slot can be taken or `interrupt` reports an
    /// [`Interruption`].
    ///
    /// # Errors
    ///
    /// Returns [`SlotError::Fault`] when the primitive detects misuse and
    /// [`SlotError::Interrupted`] when the wait was abandoned.
    fn acquire(&self, owner: usize, interrupt: &dyn Interrupt) -> Result<(), SlotError>;

    /// `release` frees the slot and wakes at most one waiter.
    ///
    /// # Errors
    ///
    /// Returns a [`SlotFault`] when the release is not permitted.
    fn release(&self, owner: usize) -> Result<(), SlotFault>;
}

/// `MutexSlot` is an owner-checked mutual-exclusion slot.
pub struct MutexSlot {
    index: usize,
    poll: Duration,
    holder: Mutex<Option<usize>>,
    event: Condvar,
}

impl MutexSlot {
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self::with_poll(index, DEFAULT_SLOT_POLL)
    }

    #[must_use]
    pub fn with_poll(index: usize, poll: Duration) -> Self {
        Self {
            index,
            poll,
            holder: Mutex::new(None),
            event: Condvar::new(),
        }
    }

    /// `holder` returns the worker currently holding the slot, if any.
    pub fn holder(&self) -> Option<usize> {
        match self.holder.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn state(&self, op: SlotOp) -> Result<MutexGuard<'_, Option<usize>>, SlotFault> {
        self.holder.lock().map_err(|_| SlotFault::Poisoned {
            slot: self.index,
            op,
        })
    }
}

impl RingSlot for MutexSlot {
    fn index(&self) -> usize {
        self.index
    }

    fn acquire(&self, owner: usize, interrupt: &dyn Interrupt) -> Result<(), SlotError> {
        let mut holder = self.state(SlotOp::Acquire)?;
        loop {
            match *holder {
                None => {
                    *holder = Some(owner);
                    return Ok(());
                }
                Some(current) if current == owner => {
                    return Err(SlotFault::SelfDeadlock {
                        slot: self.index,
                        owner,
                        op: SlotOp::Acquire,
                    }
                    .into());
                }
                Some(_) => {}
            }

            if let Some(reason) = interrupt.interruption() {
                return Err(SlotError::Interrupted(reason));
            }

            let (next, _) = self
                .event
                .wait_timeout(holder, self.poll)
                .map_err(|_| SlotFault::Poisoned {
                    slot: self.index,
                    op: SlotOp::Acquire,
                })?;
            holder = next;
        }
    }

    fn release(&self, owner: usize) -> Result<(), SlotFault> {
        let mut holder = self.state(SlotOp::Release)?;
        if *holder != Some(owner) {
            return Err(SlotFault::NotOwner {
                slot: self.index,
                owner,
                holder: *holder,
                op: SlotOp::Release,
            });
        }

        *holder = None;
        drop(holder);

        self.event.notify_one();
        Ok(())
    }
}

/// `SemaphoreSlot` is a counting slot bounded by a maximum count.
pub struct SemaphoreSlot {
    index: usize,
    max: usize,
    poll: Duration,
    count: Mutex<usize>,
    event: Condvar,
}

impl SemaphoreSlot {
    #[must_use]
    pub fn new(index: usize, initial: usize, max: usize) -> Self {
        Self::with_poll(index, initial, max, DEFAULT_SLOT_POLL)
    }

    #[must_use]
    pub fn with_poll(index: usize, initial: usize, max: usize, poll: Duration) -> Self {
        Self {
            index,
            max,
            poll,
            count: Mutex::new(initial.min(max)),
            event: Condvar::new(),
        }
    }

    /// `available` returns the current count.
    pub fn available(&self) -> usize {
        match self.count.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn state(&self, op: SlotOp) -> Result<MutexGuard<'_, usize>, SlotFault> {
        self.count.lock().map_err(|_| SlotFault::Poisoned {
            slot: self.index,
            op,
        })
    }
}

impl RingSlot for SemaphoreSlot {
    fn index(&self) -> usize {
        self.index
    }

    fn acquire(&self, _owner: usize, interrupt: &dyn Interrupt) -> Result<(), SlotError> {
        let mut count = self.state(SlotOp::Acquire)?;
        loop {
            if *count > 0 {
                *count -= 1;
                return Ok(());
            }

            if let Some(reason) = interrupt.interruption() {
                return Err(SlotError::Interrupted(reason));
            }

            let (next, _) = self
                .event
                .wait_timeout(count, self.poll)
                .map_err(|_| SlotFault::Poisoned {
                    slot: self.index,
                    op: SlotOp::Acquire,
                })?;
            count = next;
        }
    }

    fn release(&self, _owner: usize) -> Result<(), SlotFault> {
        let mut count = self.state(SlotOp::Release)?;
        if *count >= self.max {
            return Err(SlotFault::Overflow {
                slot: self.index,
                max: self.max,
                op: SlotOp::Release,
            });
        }

        *count += 1;
        drop(count);

        self.event.notify_one();
        Ok(())
    }
}
