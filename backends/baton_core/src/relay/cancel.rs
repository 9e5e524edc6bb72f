use std::sync::Arc;

use crate::synca::OnSignal;

struct CancelState {
    requested: OnSignal,
    armed: OnSignal,
}

/// `CancellationSignal` asks every worker of a relay to stop.
///
/// [`CancellationSignal::trigger`] is a single compare-exchange and never
/// blocks, so it can be called from an interrupt handler. Workers only see
/// the request once the coordinator armed the signal; a trigger arriving
/// earlier stays pending until then.
#[derive(Clone)]
pub struct CancellationSignal(Arc<CancelState>);

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("requested", &self.is_requested())
            .field("armed", &self.is_armed())
            .finish()
    }
}

impl CancellationSignal {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(CancelState {
            requested: OnSignal::new(),
            armed: OnSignal::new(),
        }))
    }

    /// `trigger` requests cancellation, returns false if it already was.
    pub fn trigger(&self) -> bool {
        self.0.requested.turn_on()
    }

    /// `arm` makes requests visible to [`CancellationSignal::observe`].
    pub fn arm(&self) -> bool {
        self.0.armed.turn_on()
    }

    #[must_use]
    pub fn observe(&self) -> bool {
        self.0.armed.probe() && self.0.requested.probe()
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.0.requested.probe()
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.0.armed.probe()
    }
}

/// `install_interrupt_handler` makes Ctrl-C trigger `signal`.
///
/// # Errors
///
/// Fails if the process already has a Ctrl-C handler.
pub fn install_interrupt_handler(signal: &CancellationSignal) -> Result<(), ctrlc::Error> {
    let signal = signal.clone();
    ctrlc::set_handler(move || {
        if signal.trigger() {
            tracing::info!("Cancelling relay due to interrupt");
        }
    })
}
