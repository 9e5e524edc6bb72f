//! `baton_core` runs a fixed set of worker threads that take strict turns
//! over a ring of mutex or semaphore slots, or accumulate a numeric series
//! side by side until their budget runs out or they are cancelled.

pub mod errors;
pub mod kernels;
pub mod limits;
pub mod output;
pub mod relay;
pub mod ring;
pub mod synca;

pub use errors::{BatonError, BatonResult};
