use std::thread;

/// `OnUnwind` runs its function only if the owning thread is unwinding
/// from a panic when the guard drops.
pub struct OnUnwind<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> OnUnwind<F> {
    pub fn new(f: F) -> Self {
        Self(Some(f))
    }
}

impl<F: FnOnce()> Drop for OnUnwind<F> {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }

        if let Some(cb) = self.0.take() {
            tracing::debug!("detected unwinding thread; running unwind guard");
            cb();
        }
    }
}
