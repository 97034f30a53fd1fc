//! Crate-internal logging macros.
//!
//! With the `logging` feature these forward to the `log` facade; without it
//! they expand to dead code, so their arguments still type-check.

#[cfg(feature = "logging")]
macro_rules! trace {
    ($($arg:tt)+) => {
        log::trace!(target: "scatter_table", $($arg)+)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! trace {
    ($($arg:tt)+) => {
        if false {
            let _ = core::format_args!($($arg)+);
        }
    };
}

#[cfg(feature = "logging")]
macro_rules! debug {
    ($($arg:tt)+) => {
        log::debug!(target: "scatter_table", $($arg)+)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! debug {
    ($($arg:tt)+) => {
        if false {
            let _ = core::format_args!($($arg)+);
        }
    };
}

pub(crate) use debug;
pub(crate) use trace;
