//! Engine log records and the console sink
//!
//! Every message the engine emits goes through `Engine::log` as a [`LogEntry`]
//! and ends up in the installed [`Logger`]. The `engine_*` macros below are the
//! only producers inside the workspace. Errors raised through `engine_err!` or
//! `engine_bail!` are logged at the call site with their file and line, then
//! surface as `Error::BackendError`.

use chrono::{DateTime, Local};
use colored::{ColoredString, Colorize};
use std::fmt;
use std::time::SystemTime;

/// Destination for engine log records
///
/// ```no_run
/// use nebula_3d_engine::nebula3d::log::{Logger, LogEntry};
///
/// struct FrameTraceSink(std::sync::Mutex<Vec<String>>);
///
/// impl Logger for FrameTraceSink {
///     fn log(&self, entry: &LogEntry) {
///         self.0.lock().unwrap().push(entry.to_string());
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    fn log(&self, entry: &LogEntry);
}

/// One record produced by the `engine_*` macros
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub timestamp: SystemTime,
    /// Emitting component, e.g. `nebula3d::Screen` or `nebula3d::vulkan::Swapchain`
    pub source: String,
    pub message: String,
    /// Call-site location, present for ERROR records only
    pub file: Option<&'static str>,
    pub line: Option<u32>,
}

impl LogEntry {
    /// `file:line` of the call site when the record carries one
    pub fn location(&self) -> Option<String> {
        match (self.file, self.line) {
            (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            _ => None,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] [{}] {}",
            format_timestamp(self.timestamp),
            self.severity.label(),
            self.source,
            self.message
        )?;
        match self.location() {
            Some(location) => write!(f, " ({})", location),
            None => Ok(()),
        }
    }
}

/// Ordered from most verbose to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogSeverity {
    /// Five-character label, padded so columns line up
    pub fn label(&self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }

    fn colored_label(&self) -> ColoredString {
        let label = self.label();
        match self {
            LogSeverity::Trace => label.bright_black(),
            LogSeverity::Debug => label.cyan(),
            LogSeverity::Info => label.green(),
            LogSeverity::Warn => label.yellow(),
            LogSeverity::Error => label.red().bold(),
        }
    }
}

/// Local time with millisecond precision: `YYYY-MM-DD HH:MM:SS.mmm`
pub fn format_timestamp(timestamp: SystemTime) -> String {
    let local: DateTime<Local> = timestamp.into();
    local.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Uncolored single-line rendering of an entry, same layout as the console
pub fn format_entry(entry: &LogEntry) -> String {
    entry.to_string()
}

/// Console sink installed until `Engine::set_logger` replaces it
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let location = entry
            .location()
            .map(|location| format!(" ({})", location))
            .unwrap_or_default();
        println!(
            "[{}] [{}] [{}] {}{}",
            format_timestamp(entry.timestamp),
            entry.severity.colored_label(),
            entry.source.bright_blue(),
            entry.message,
            location
        );
    }
}

// ===== LOGGING MACROS =====

/// Shared body of the plain severity macros
#[doc(hidden)]
#[macro_export]
macro_rules! __engine_log {
    ($severity:ident, $source:expr, $($arg:tt)*) => {
        $crate::nebula3d::Engine::log(
            $crate::nebula3d::log::LogSeverity::$severity,
            $source,
            format!($($arg)*),
        )
    };
}

/// Per-frame chatter: image indices, barrier transitions
///
/// ```no_run
/// # use nebula_3d_engine::engine_trace;
/// engine_trace!("nebula3d::Screen", "Acquired image {}", 2);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Trace, $source, $($arg)*) };
}

#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Debug, $source, $($arg)*) };
}

#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Info, $source, $($arg)*) };
}

#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => { $crate::__engine_log!(Warn, $source, $($arg)*) };
}

/// ERROR record carrying the caller's `file!()` and `line!()`
///
/// ```no_run
/// # use nebula_3d_engine::engine_error;
/// engine_error!("nebula3d::vulkan", "Device lost while presenting image {}", 1);
/// ```
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::nebula3d::Engine::log_detailed(
            $crate::nebula3d::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!(),
        )
    };
}

/// Logs at ERROR and evaluates to `Error::BackendError` with the same text
///
/// ```ignore
/// device.create_fence(&info, None)
///     .map_err(|e| engine_err!("nebula3d::vulkan", "Failed to create fence: {:?}", e))?;
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::nebula3d::Error::BackendError(message)
    }};
}

/// `return Err(engine_err!(...))`
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Like `engine_err!` but logged at WARN, for failures the caller may recover from
#[macro_export]
macro_rules! engine_warn_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_warn!($source, "{}", message);
        $crate::nebula3d::Error::BackendError(message)
    }};
}

#[macro_export]
macro_rules! engine_bail_warn {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_warn_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
