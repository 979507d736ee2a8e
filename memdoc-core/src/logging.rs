// memdoc-core/src/logging.rs
// Engine-local log level gate on top of the `log` facade.
//
// The host installs whatever `log` backend it wants; these macros only decide
// whether the engine emits a record at all, so a chatty host logger can still
// keep the query engine quiet.

use std::sync::atomic::{AtomicU8, Ordering};

#[doc(hidden)]
pub use log as __log;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn get_log_level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

#[doc(hidden)]
#[inline]
pub fn enabled(level: LogLevel) -> bool {
    level != LogLevel::Off && level <= get_log_level()
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Error) {
            $crate::logging::__log::error!(target: "memdoc", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Warn) {
            $crate::logging::__log::warn!(target: "memdoc", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Info) {
            $crate::logging::__log::info!(target: "memdoc", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Debug) {
            $crate::logging::__log::debug!(target: "memdoc", $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        if $crate::logging::enabled($crate::logging::LogLevel::Trace) {
            $crate::logging::__log::trace!(target: "memdoc", $($arg)*);
        }
    };
}
