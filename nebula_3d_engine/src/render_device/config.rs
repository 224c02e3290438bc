/// Render device configuration

use crate::render_device::types::SampleCount;

/// Default window width used by applications that do not pick one
pub const DEFAULT_WINDOW_WIDTH: u32 = 1280;

/// Default window height used by applications that do not pick one
pub const DEFAULT_WINDOW_HEIGHT: u32 = 720;

/// Which validation messages are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    ErrorsOnly,
    ErrorsAndWarnings,
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    Console,
    File(String),
    Both(String),
}

/// Validation message categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Validation message counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
    /// Messages matched by the benign allow-list (counted, never printed)
    pub suppressed: u32,
}

impl ValidationStats {
    /// Total number of reported messages (suppressed ones excluded)
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Validation message IDs known to be harmless for this engine
///
/// - `Loader Message`: loader chatter about implicit layers
/// - `UNASSIGNED-BestPractices-vkCreateInstance-specialuse-extension-debugging`:
///   emitted because the debug-utils extension itself is enabled
/// - `VUID-VkSwapchainCreateInfoKHR-imageExtent-01274`: window resized between
///   the capability query and swapchain creation; the next frame recreates again
pub const DEFAULT_BENIGN_MESSAGE_IDS: [&str; 3] = [
    "Loader Message",
    "UNASSIGNED-BestPractices-vkCreateInstance-specialuse-extension-debugging",
    "VUID-VkSwapchainCreateInfoKHR-imageExtent-01274",
];

/// Render device configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name reported to the driver
    pub app_name: String,
    /// Enable the validation layer and debug messenger
    pub enable_validation: bool,
    /// Validation severity filter
    pub debug_severity: DebugSeverity,
    /// Validation output target
    pub debug_output: DebugOutput,
    /// Validation category filter
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,
    /// Panic on the first validation error
    pub panic_on_error: bool,
    /// Count validation messages
    pub enable_validation_stats: bool,
    /// Validation message IDs counted but not printed
    pub benign_message_ids: Vec<String>,
    /// Preferred MSAA sample count (capped by the device)
    pub preferred_sample_count: SampleCount,
    /// Directory holding `<name>.<stage>.spv` shader binaries
    pub shader_directory: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Nebula3D Application".to_string(),
            enable_validation: cfg!(debug_assertions),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            panic_on_error: false,
            enable_validation_stats: true,
            benign_message_ids: DEFAULT_BENIGN_MESSAGE_IDS.iter().map(|s| s.to_string()).collect(),
            preferred_sample_count: SampleCount::S4,
            shader_directory: "shader".to_string(),
        }
    }
}

impl Config {
    /// True when `message_id` is in the benign allow-list
    pub fn is_benign_message(&self, message_id: &str) -> bool {
        self.benign_message_ids.iter().any(|id| id == message_id)
    }
}
