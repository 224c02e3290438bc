/// Nebula3D Engine - process-wide logging facade
///
/// The render device and every component built on it are passed explicitly
/// (`&mut dyn RenderDevice`); the only process-wide state kept here is the
/// logger used by the `engine_*` macros and its severity threshold.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};

struct Sink {
    logger: RwLock<Box<dyn Logger>>,
    threshold: RwLock<LogSeverity>,
}

static SINK: OnceLock<Sink> = OnceLock::new();

fn sink() -> &'static Sink {
    SINK.get_or_init(|| Sink {
        logger: RwLock::new(Box::new(DefaultLogger)),
        threshold: RwLock::new(LogSeverity::Trace),
    })
}

/// Engine logging facade
///
/// ```no_run
/// use nebula_3d_engine::nebula3d::{Engine, log::{Logger, LogEntry, LogSeverity}};
///
/// struct Quiet;
/// impl Logger for Quiet {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{}", entry);
///     }
/// }
///
/// Engine::set_logger(Quiet);
/// Engine::set_min_severity(LogSeverity::Warn);
/// ```
pub struct Engine;

impl Engine {
    /// Route every following entry to `logger`
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut slot) = sink().logger.write() {
            *slot = Box::new(logger);
        }
    }

    /// Go back to the colored console logger
    pub fn reset_logger() {
        Self::set_logger(DefaultLogger);
    }

    /// Entries below `severity` are discarded before reaching the logger
    pub fn set_min_severity(severity: LogSeverity) {
        if let Ok(mut threshold) = sink().threshold.write() {
            *threshold = severity;
        }
    }

    pub fn min_severity() -> LogSeverity {
        sink().threshold.read().map(|t| *t).unwrap_or(LogSeverity::Trace)
    }

    /// Entry point of engine_trace! through engine_warn!
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::emit(severity, source, message, None);
    }

    /// Entry point of engine_error! and engine_err!, which pass their call site
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::emit(severity, source, message, Some((file, line)));
    }

    fn emit(
        severity: LogSeverity,
        source: &str,
        message: String,
        location: Option<(&'static str, u32)>,
    ) {
        if severity < Self::min_severity() {
            return;
        }
        let entry = LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_owned(),
            message,
            file: location.map(|(file, _)| file),
            line: location.map(|(_, line)| line),
        };
        if let Ok(logger) = sink().logger.read() {
            logger.log(&entry);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
