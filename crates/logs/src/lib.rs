//! Logging macros that forward to `tracing` only when the calling crate enables
//! the matching feature.
//!
//! The `cfg!(feature = ...)` check expands inside the caller, so every crate using
//! these macros declares `log_info`, `log_warnings`, `log_debug` and `log_errors`
//! features of its own (the `standard` feature turns on all but debug).
//!
//! Fatal conditions of a relay run are always reported through [`error!`]; phase
//! changes and per-worker results go through [`info!`] and [`debug!`].

#[doc(hidden)]
#[macro_export]
macro_rules! gated {
    ($feature:tt, $level:ident, $($t:tt)*) => {
        if cfg!(feature = $feature) {
            tracing::$level!($($t)*);
        }
    };
}

#[macro_export]
macro_rules! info {
    ($($t:tt)*) => {
        $crate::gated!("log_info", info, $($t)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($t:tt)*) => {
        $crate::gated!("log_warnings", warn, $($t)*)
    };
}

#[macro_export]
macro_rules! debug {
    ($($t:tt)*) => {
        $crate::gated!("log_debug", debug, $($t)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($t:tt)*) => {
        $crate::gated!("log_errors", error, $($t)*)
    };
}
