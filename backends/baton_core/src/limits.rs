use std::env;
use std::str::FromStr;

/// `DEFAULT_MAX_WORKERS` caps the worker count when `BATON_MAX_WORKERS` is unset.
pub const DEFAULT_MAX_WORKERS: usize = 64;

/// `WORKERS_MAX` is the hard ceiling no environment override can exceed.
pub const WORKERS_MAX: usize = 1024;

pub const MAX_WORKERS_ENV: &str = "BATON_MAX_WORKERS";

/// `get_max_workers` returns how many workers a relay may start.
#[must_use]
pub fn get_max_workers() -> usize {
    let max_workers = match env::var(MAX_WORKERS_ENV)
        .ok()
        .and_then(|s| usize::from_str(s.trim()).ok())
    {
        Some(x @ 1..) => {
            tracing::debug!("Retrieved max workers from {}", MAX_WORKERS_ENV);
            x.min(WORKERS_MAX)
        }
        _ => DEFAULT_MAX_WORKERS,
    };

    tracing::debug!("Reporting max workers: {}", max_workers);
    max_workers
}
