use std::time::Duration;

use crate::errors::ArgumentError;
use crate::ring::RingKind;
use crate::synca::DEFAULT_SLOT_POLL;

use super::Budget;

/// `DEFAULT_PAYLOADS` are printed alternately by the workers of a relay.
pub const DEFAULT_PAYLOADS: [&str; 2] = ["ping", "pong"];

/// `Pacing` decides whether workers take turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// every worker runs its units without waiting on the others and
    /// nothing is printed.
    Free,

    /// workers visit the print section one at a time, in ring order.
    Ring(RingKind),
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub workers: usize,
    pub budget: Budget,
    pub unit_len: u64,
    pub payloads: Vec<String>,
    pub pacing: Pacing,
    pub poll_interval: Duration,
    pub stack_size: Option<usize>,
}

impl RelayConfig {
    #[must_use]
    pub fn new(workers: usize, budget: Budget) -> Self {
        Self {
            workers,
            budget,
            unit_len: 1,
            payloads: DEFAULT_PAYLOADS.iter().map(ToString::to_string).collect(),
            pacing: Pacing::Ring(RingKind::Mutex),
            poll_interval: DEFAULT_SLOT_POLL,
            stack_size: None,
        }
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_unit_len(mut self, unit_len: u64) -> Self {
        self.unit_len = unit_len;
        self
    }

    #[must_use]
    pub fn with_payloads(mut self, payloads: Vec<String>) -> Self {
        self.payloads = payloads;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// `payload` returns the payload worker `worker` prints.
    #[must_use]
    pub fn payload(&self, worker: usize) -> &str {
        if self.payloads.is_empty() {
            return "";
        }
        &self.payloads[worker % self.payloads.len()]
    }

    /// `validate` checks the config before any worker is started.
    ///
    /// # Errors
    ///
    /// Returns the first [`ArgumentError`] found.
    pub fn validate(&self, max_workers: usize) -> Result<(), ArgumentError> {
        if self.workers == 0 {
            return Err(ArgumentError::NotPositive {
                name: "workers",
                value: self.workers.to_string(),
            });
        }

        if self.workers > max_workers {
            return Err(ArgumentError::TooManyWorkers {
                requested: self.workers,
                max: max_workers,
            });
        }

        if self.budget == Budget::Units(0) {
            return Err(ArgumentError::NotPositive {
                name: "budget",
                value: "0".into(),
            });
        }

        if self.unit_len == 0 {
            return Err(ArgumentError::ZeroUnitLength);
        }

        if self.poll_interval.is_zero() {
            return Err(ArgumentError::ZeroPollInterval);
        }

        if matches!(self.pacing, Pacing::Ring(_)) && self.payloads.is_empty() {
            return Err(ArgumentError::NoPayloads);
        }

        Ok(())
    }
}
