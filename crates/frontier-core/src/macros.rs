//! Thin shims over the `log` facade so every call site in this crate can log
//! unconditionally while the dependency itself stays behind the `logging` feature,
//! the same way `batsat` and `batsat-term-allocator` gate their own `log` usage.

macro_rules! log_trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        { log::trace!($($arg)*); }
    };
}

macro_rules! log_debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        { log::debug!($($arg)*); }
    };
}

macro_rules! log_info {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        { log::info!($($arg)*); }
    };
}

macro_rules! log_warn {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        { log::warn!($($arg)*); }
    };
}

macro_rules! log_error {
    ($($arg:tt)*) => {
        #[cfg(feature = "logging")]
        { log::error!($($arg)*); }
    };
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_trace;
pub(crate) use log_warn;
