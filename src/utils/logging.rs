//! Log macros that can be silenced per module.
//!
//! A module opts in by defining `const ENABLE_LOGS: bool` and importing the
//! macros from the crate root:
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_info};
//!
//! log_info!("poll cycle finished");
//! ```
//!
//! With the flag off the calls compile to nothing, which keeps the polling
//! loop quiet without touching `RUST_LOG`.

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Errors are always logged; `ENABLE_LOGS` only gates the chatty levels.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}
