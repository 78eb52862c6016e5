//! Minimal leveled logging over the serial console.
//!
//! Mirrors the teacher's `log.rs`: a global atomic level, per-level
//! prefixes, and macros that early boot code and every subsystem use
//! uniformly. Zero-cost when the level is filtered out at runtime (the
//! format arguments are still evaluated — this kernel does not attempt
//! compile-time elision, matching the teacher).

use core::sync::atomic::{AtomicU8, Ordering};

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Error => "[ERROR] ",
            Self::Warn => "[WARN]  ",
            Self::Info => "[INFO]  ",
            Self::Debug => "[DEBUG] ",
            Self::Trace => "[TRACE] ",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

pub fn set_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn level() -> LogLevel {
    match LOG_LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Error,
        1 => LogLevel::Warn,
        2 => LogLevel::Info,
        3 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

pub fn enabled(level: LogLevel) -> bool {
    (level as u8) <= (self::level() as u8)
}

#[doc(hidden)]
pub fn _log(level: LogLevel, args: core::fmt::Arguments) {
    if !enabled(level) {
        return;
    }
    use core::fmt::Write;
    let mut port = crate::uart::console();
    let _ = port.write_str(level.prefix());
    let _ = port.write_fmt(args);
    let _ = port.write_str("\n");
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log::_log($crate::log::LogLevel::Error, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log::_log($crate::log::LogLevel::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log::_log($crate::log::LogLevel::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log::_log($crate::log::LogLevel::Debug, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log::_log($crate::log::LogLevel::Trace, format_args!($($arg)*))
    };
}
