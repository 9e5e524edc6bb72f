//! Start barrier shared by the workers of a relay and their coordinator.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use super::slots::{Interrupt, Interruption, DEFAULT_SLOT_POLL};

struct BarrierState {
    count: usize,
    generation: usize,
    aborted: bool,
}

/// `StartBarrier` blocks its parties until all of them arrived, or until
/// the barrier is aborted or an [`Interrupt`] fires.
pub struct StartBarrier {
    parties: usize,
    poll: Duration,
    state: Mutex<BarrierState>,
    event: Condvar,
}

impl StartBarrier {
    /// Creates a barrier for `parties` participants.
    ///
    /// # Panics
    ///
    /// Panics if `parties` is 0.
    #[must_use]
    pub fn new(parties: usize) -> Self {
        Self::with_poll(parties, DEFAULT_SLOT_POLL)
    }

    #[must_use]
    pub fn with_poll(parties: usize, poll: Duration) -> Self {
        assert!(parties > 0, "StartBarrier parties must be > 0");

        Self {
            parties,
            poll,
            state: Mutex::new(BarrierState {
                count: 0,
                generation: 0,
                aborted: false,
            }),
            event: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// `abort` releases every current and future waiter with
    /// [`Interruption::Halted`].
    pub fn abort(&self) {
        let mut state = self.lock();
        state.aborted = true;
        drop(state);

        self.event.notify_all();
    }

    /// `wait` registers the caller and blocks until every party arrived.
    ///
    /// # Errors
    ///
    /// Returns [`Interruption::Halted`] if the barrier was aborted, or
    /// whatever `interrupt` reported while the caller was waiting.
    pub fn wait(&self, interrupt: &dyn Interrupt) -> Result<(), Interruption> {
        let mut state = self.lock();
        if state.aborted {
            return Err(Interruption::Halted);
        }

        let local_gen = state.generation;
        state.count += 1;

        if state.count >= self.parties {
            state.count = 0;
            state.generation += 1;
            drop(state);

            self.event.notify_all();
            return Ok(());
        }

        while state.generation == local_gen {
            if state.aborted {
                return Err(Interruption::Halted);
            }

            if let Some(reason) = interrupt.interruption() {
                return Err(reason);
            }

            state = match self.event.wait_timeout(state, self.poll) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        Ok(())
    }
}
