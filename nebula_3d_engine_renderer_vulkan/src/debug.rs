/// Validation layer messenger
///
/// Each message is classified by level and category, dropped when the filter
/// hides it, counted as suppressed when its id is on the benign allow-list,
/// and otherwise printed with an `[xN]` repeat marker to the console or a file.

use ash::vk;
use colored::{ColoredString, Colorize};
use nebula_3d_engine::nebula3d::render::{
    DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats,
};
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Global debug configuration (shared across callbacks)
static DEBUG_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// Global validation statistics
static VALIDATION_STATS: ValidationCounters = ValidationCounters::new();

/// Occurrences of each message text, for the repeat marker and the report
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Debug configuration for the callback
#[derive(Debug, Clone)]
pub struct Config {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub break_on_error: bool,
    pub panic_on_error: bool,
    pub enable_stats: bool,
    pub benign_message_ids: Vec<String>,
}

/// Severity of a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageLevel {
    Error,
    Warning,
    Info,
    Verbose,
}

impl MessageLevel {
    fn from_vk(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Self {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            MessageLevel::Error
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            MessageLevel::Warning
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            MessageLevel::Info
        } else {
            MessageLevel::Verbose
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MessageLevel::Error => "ERROR",
            MessageLevel::Warning => "WARNING",
            MessageLevel::Info => "INFO",
            MessageLevel::Verbose => "VERBOSE",
        }
    }

    fn colored(&self) -> ColoredString {
        match self {
            MessageLevel::Error => self.label().red().bold(),
            MessageLevel::Warning => self.label().yellow().bold(),
            MessageLevel::Info => self.label().cyan(),
            MessageLevel::Verbose => self.label().bright_black(),
        }
    }
}

/// Message category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageCategory {
    General,
    Validation,
    Performance,
}

impl MessageCategory {
    fn from_vk(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
            MessageCategory::Validation
        } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
            MessageCategory::Performance
        } else {
            MessageCategory::General
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MessageCategory::General => "General",
            MessageCategory::Validation => "Validation",
            MessageCategory::Performance => "Performance",
        }
    }
}

/// What the callback does with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Filtered out by severity or category
    Ignore,
    /// Known-benign: counted as suppressed, not printed
    Suppress,
    Report,
}

impl Config {
    pub(crate) fn disposition(
        &self,
        level: MessageLevel,
        category: MessageCategory,
        message_id: &str,
    ) -> Disposition {
        let severity_shown = match self.severity {
            DebugSeverity::ErrorsOnly => level == MessageLevel::Error,
            DebugSeverity::ErrorsAndWarnings => {
                matches!(level, MessageLevel::Error | MessageLevel::Warning)
            }
            DebugSeverity::All => true,
        };
        let category_shown = match category {
            MessageCategory::General => self.message_filter.show_general,
            MessageCategory::Validation => self.message_filter.show_validation,
            MessageCategory::Performance => self.message_filter.show_performance,
        };
        if !severity_shown || !category_shown {
            Disposition::Ignore
        } else if self.benign_message_ids.iter().any(|id| id == message_id) {
            Disposition::Suppress
        } else {
            Disposition::Report
        }
    }

    /// Messenger severity flags matching `severity`
    pub(crate) fn severity_flags(&self) -> vk::DebugUtilsMessageSeverityFlagsEXT {
        match self.severity {
            DebugSeverity::ErrorsOnly => vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            DebugSeverity::ErrorsAndWarnings => {
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            }
            DebugSeverity::All => {
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            }
        }
    }
}

/// Per-level message counters, plus the suppressed benign messages
struct ValidationCounters {
    by_level: [AtomicU32; 4],
    suppressed: AtomicU32,
}

impl ValidationCounters {
    const fn new() -> Self {
        Self {
            by_level: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
            suppressed: AtomicU32::new(0),
        }
    }

    fn slot(level: MessageLevel) -> usize {
        match level {
            MessageLevel::Error => 0,
            MessageLevel::Warning => 1,
            MessageLevel::Info => 2,
            MessageLevel::Verbose => 3,
        }
    }

    fn count(&self, level: MessageLevel) {
        self.by_level[Self::slot(level)].fetch_add(1, Ordering::Relaxed);
    }

    fn count_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ValidationStats {
        let read = |level| self.by_level[Self::slot(level)].load(Ordering::Relaxed);
        ValidationStats {
            errors: read(MessageLevel::Error),
            warnings: read(MessageLevel::Warning),
            info: read(MessageLevel::Info),
            verbose: read(MessageLevel::Verbose),
            suppressed: self.suppressed.load(Ordering::Relaxed),
        }
    }

    fn clear(&self) {
        for counter in self.by_level.iter().chain(std::iter::once(&self.suppressed)) {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Poisoning only means a previous callback panicked (`panic_on_error`);
/// the guarded data is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Initialize debug configuration and reset statistics
pub fn init_debug_config(config: Config) {
    VALIDATION_STATS.clear();
    *lock(&MESSAGE_TRACKER) = Some(FxHashMap::default());
    *lock(&DEBUG_CONFIG) = Some(config);
}

/// Drop the configuration so late callbacks during teardown are ignored
pub fn cleanup_debug_config() {
    *lock(&DEBUG_CONFIG) = None;
}

/// Get current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.snapshot()
}

/// Print the counters collected since the device was created
///
/// Lines with a zero count are skipped; the total is always printed.
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 && stats.suppressed == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    let rows = [
        ("Errors:".red().bold(), stats.errors),
        ("Warnings:".yellow().bold(), stats.warnings),
        ("Info:".cyan(), stats.info),
        ("Verbose:".bright_black(), stats.verbose),
        ("Suppressed (benign):".bright_black(), stats.suppressed),
    ];

    println!("\n{}", "--- Vulkan validation ---".bright_blue().bold());
    for (label, count) in rows.iter().filter(|(_, count)| *count > 0) {
        println!("  {} {}", label, count);
    }
    println!("  {} {}", "Total:".white().bold(), stats.total());

    let repeated = lock(&MESSAGE_TRACKER)
        .as_ref()
        .map(|tracker| tracker.values().filter(|&&count| count > 1).count())
        .unwrap_or(0);
    if repeated > 0 {
        println!("  {} distinct message(s) were reported more than once", repeated);
    }
}

fn track_message(message: &str) -> u32 {
    let mut guard = lock(&MESSAGE_TRACKER);
    let tracker = guard.get_or_insert_with(FxHashMap::default);
    let count = tracker.entry(message.to_string()).or_insert(0);
    *count += 1;
    *count
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        fallback.into()
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Vulkan debug messenger callback
///
/// # Safety
///
/// Called by the validation layer with a valid callback data pointer.
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }
    let callback_data = &*p_callback_data;
    let message_id_name = c_str_or(callback_data.p_message_id_name, "Unknown");
    let message = c_str_or(callback_data.p_message, "No message");

    let config = match lock(&DEBUG_CONFIG).as_ref() {
        Some(cfg) => cfg.clone(),
        None => return vk::FALSE,
    };

    let level = MessageLevel::from_vk(message_severity);
    let category = MessageCategory::from_vk(message_type);

    match config.disposition(level, category, &message_id_name) {
        Disposition::Ignore => return vk::FALSE,
        Disposition::Suppress => {
            if config.enable_stats {
                VALIDATION_STATS.count_suppressed();
            }
            return vk::FALSE;
        }
        Disposition::Report => {}
    }

    if config.enable_stats {
        VALIDATION_STATS.count(level);
    }

    let occurrence_count = if config.enable_stats { track_message(&message) } else { 1 };
    let repeats = match occurrence_count {
        1 => String::new(),
        n => format!(" [x{}]", n),
    };

    let plain = format!(
        "[VULKAN {}] [{}]{} {}: {}",
        level.label(), category.label(), repeats, message_id_name, message
    );
    let console = || {
        eprintln!(
            "{} {} {}{}\n    {} {}",
            "vulkan".bright_blue().bold(),
            level.colored(),
            category.label().bright_black(),
            repeats.yellow(),
            message_id_name.white(),
            message
        )
    };

    match &config.output {
        DebugOutput::Console => console(),
        DebugOutput::File(path) => append_line(path, &plain),
        DebugOutput::Both(path) => {
            console();
            append_line(path, &plain);
        }
    }

    if level == MessageLevel::Error {
        if config.panic_on_error {
            panic!("Vulkan validation error ({} / {}): {}", category.label(), message_id_name, message);
        }
        if config.break_on_error {
            eprintln!("{} {}", "Aborting on validation error:".red().bold(), message_id_name.yellow());
            std::process::abort();
        }
    }

    vk::FALSE
}

/// Best effort: a log file that cannot be opened drops the line
fn append_line(path: &str, line: &str) {
    let file = OpenOptions::new().create(true).append(true).open(path);
    if let Ok(mut file) = file {
        let _ = writeln!(file, "{}", line);
    }
}

#[cfg(test)]
#[path = "debug_tests.rs"]
mod tests;
