//! Conditional logging macros gated on a module-level `ENABLE_LOGS`
//! const, so chatty polling modules can be silenced without touching the
//! logger filter.
//!
//! ```ignore
//! // In the using module:
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn, log_error};
//!
//! log_info!("logged only while ENABLE_LOGS is true");
//! ```

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

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
