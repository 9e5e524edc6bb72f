//! Workers taking turns over a ring, and the coordinator running them.

mod budget;
mod cancel;
mod config;
mod coordinator;
mod spawner;
mod worker;

pub use budget::*;
pub use cancel::*;
pub use config::*;
pub use coordinator::*;
pub use spawner::*;
pub use worker::{
    FirstCycle, Phase, Worker, WorkerActivity, WorkerConfig, WorkerReport, WorkerStatus,
};
