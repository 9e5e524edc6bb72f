use std::sync::atomic::{AtomicUsize, Ordering};

/// Indicates the underlying signal to be set.
const SET: usize = 1;

/// Indicates the underlying signal was not set.
const UNSET: usize = 0;

/// `OnSignal` is a one-shot flag built on a single atomic word.
///
/// Every operation is a lone compare-exchange or load, never a lock, so
/// [`OnSignal::turn_on`] is safe to call from an interrupt handler while any
/// number of threads [`OnSignal::probe`] it.
#[derive(Debug)]
pub struct OnSignal {
    state: AtomicUsize,
}

impl Default for OnSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl OnSignal {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicUsize::new(UNSET),
        }
    }

    /// `turn_on` flips the state from UNSET to SET.
    ///
    /// Returns true only for the caller that performed the flip, which makes
    /// it usable as an exactly-once election.
    #[inline]
    pub fn turn_on(&self) -> bool {
        self.state
            .compare_exchange(UNSET, SET, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
    }

    /// probe returns true when the state is SET else false.
    #[inline]
    pub fn probe(&self) -> bool {
        self.state.load(Ordering::Acquire) == SET
    }
}
