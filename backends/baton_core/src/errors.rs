use derive_more::derive::From;

use crate::synca::SlotFault;

/// Process exit codes for each failure class.
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_SYNCHRONIZATION: u8 = 1;
pub const EXIT_CREATION: u8 = 2;
pub const EXIT_JOIN: u8 = 4;
pub const EXIT_BAD_ARGS: u8 = 7;

/// `ArgumentError` is raised before any worker starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgumentError {
    Missing(&'static str),

    NotANumber {
        name: &'static str,
        value: String,
    },

    /// the value parsed but did not read back the same, e.g. `007` or
    /// something beyond the integer range.
    NotCanonical {
        name: &'static str,
        value: String,
    },

    NotPositive {
        name: &'static str,
        value: String,
    },

    TooManyWorkers {
        requested: usize,
        max: usize,
    },

    NoPayloads,

    ZeroUnitLength,

    /// blocked waits would spin without a pause.
    ZeroPollInterval,

    UnknownRing(String),

    RingSize {
        layout: &'static str,
        workers: usize,
        slots: usize,
    },
}

impl std::error::Error for ArgumentError {}

impl core::fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "bad input: missing {name}"),
            Self::NotANumber { name, value } => {
                write!(f, "bad input: {name} {value:?} is not a number")
            }
            Self::NotCanonical { name, value } => {
                write!(f, "bad input: {name} {value:?} too long or starts with 0")
            }
            Self::NotPositive { name, value } => {
                write!(f, "bad input: {name} {value:?} must be positive")
            }
            Self::TooManyWorkers { requested, max } => {
                write!(f, "bad input: {requested} workers exceeds maximum of {max}")
            }
            Self::NoPayloads => write!(f, "bad input: at least one payload is required"),
            Self::ZeroUnitLength => write!(f, "bad input: unit length must be positive"),
            Self::ZeroPollInterval => write!(f, "bad input: poll interval must be positive"),
            Self::UnknownRing(value) => {
                write!(f, "bad input: unknown ring {value:?} (expected mutex or semaphore)")
            }
            Self::RingSize {
                layout,
                workers,
                slots,
            } => write!(
                f,
                "bad input: {layout} ring for {workers} workers can't use {slots} slots"
            ),
        }
    }
}

/// `BatonError` is the failure a relay run reports.
#[derive(Debug, From)]
pub enum BatonError {
    Argument(ArgumentError),

    #[from(ignore)]
    Creation {
        worker: usize,
        source: std::io::Error,
    },

    #[from(ignore)]
    Synchronization { worker: usize, fault: SlotFault },

    #[from(ignore)]
    Join { worker: usize, reason: String },

    /// the worker stopped because a peer failed fatally.
    #[from(ignore)]
    Aborted { worker: usize },
}

impl BatonError {
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Argument(_) => EXIT_BAD_ARGS,
            Self::Creation { .. } => EXIT_CREATION,
            Self::Synchronization { .. } | Self::Aborted { .. } => EXIT_SYNCHRONIZATION,
            Self::Join { .. } => EXIT_JOIN,
        }
    }

    #[must_use]
    pub fn worker(&self) -> Option<usize> {
        match self {
            Self::Argument(_) => None,
            Self::Creation { worker, .. }
            | Self::Synchronization { worker, .. }
            | Self::Join { worker, .. }
            | Self::Aborted { worker } => Some(*worker),
        }
    }
}

impl std::error::Error for BatonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Argument(err) => Some(err),
            Self::Creation { source, .. } => Some(source),
            Self::Synchronization { fault, .. } => Some(fault),
            Self::Join { .. } | Self::Aborted { .. } => None,
        }
    }
}

impl core::fmt::Display for BatonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Argument(err) => write!(f, "{err}"),
            Self::Creation { worker, source } => {
                write!(f, "worker {worker}: can't create thread: {source}")
            }
            Self::Synchronization { worker, fault } => {
                write!(f, "worker {worker}: synchronization failed: {fault}")
            }
            Self::Join { worker, reason } => write!(f, "worker {worker}: can't join: {reason}"),
            Self::Aborted { worker } => {
                write!(f, "worker {worker}: aborted after a peer failed")
            }
        }
    }
}

pub type BatonResult<T> = std::result::Result<T, BatonError>;
