use std::io;
use std::thread::{self, JoinHandle};

use super::WorkerReport;

pub type WorkerTask = Box<dyn FnOnce() -> WorkerReport + Send + 'static>;

/// `Spawner` starts the thread a worker runs on.
pub trait Spawner: Send + Sync {
    /// # Errors
    ///
    /// Returns the OS error when the thread could not be created.
    fn spawn(&self, worker: usize, task: WorkerTask) -> io::Result<JoinHandle<WorkerReport>>;
}

/// `OsThreads` runs every worker on its own named OS thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsThreads {
    pub stack_size: Option<usize>,
}

impl Spawner for OsThreads {
    fn spawn(&self, worker: usize, task: WorkerTask) -> io::Result<JoinHandle<WorkerReport>> {
        let mut builder = thread::Builder::new().name(format!("baton_worker_{worker}"));
        if let Some(stack_size) = self.stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder.spawn(task)
    }
}
