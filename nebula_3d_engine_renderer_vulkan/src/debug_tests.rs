//! Unit tests for validation message filtering

use super::*;
use nebula_3d_engine::nebula3d::render::DEFAULT_BENIGN_MESSAGE_IDS;

fn config(severity: DebugSeverity) -> Config {
    Config {
        severity,
        output: DebugOutput::Console,
        message_filter: DebugMessageFilter::default(),
        break_on_error: false,
        panic_on_error: false,
        enable_stats: true,
        benign_message_ids: DEFAULT_BENIGN_MESSAGE_IDS.iter().map(|s| s.to_string()).collect(),
    }
}

// ============================================================================
// SEVERITY FILTER
// ============================================================================

#[test]
fn test_errors_only_ignores_warnings() {
    let cfg = config(DebugSeverity::ErrorsOnly);

    assert_eq!(
        cfg.disposition(MessageLevel::Error, MessageCategory::Validation, "VUID-x"),
        Disposition::Report
    );
    assert_eq!(
        cfg.disposition(MessageLevel::Warning, MessageCategory::Validation, "VUID-x"),
        Disposition::Ignore
    );
}

#[test]
fn test_errors_and_warnings_ignores_info() {
    let cfg = config(DebugSeverity::ErrorsAndWarnings);

    assert_eq!(
        cfg.disposition(MessageLevel::Warning, MessageCategory::General, "id"),
        Disposition::Report
    );
    assert_eq!(
        cfg.disposition(MessageLevel::Info, MessageCategory::General, "id"),
        Disposition::Ignore
    );
}

#[test]
fn test_severity_flags_match_filter() {
    assert_eq!(
        config(DebugSeverity::ErrorsOnly).severity_flags(),
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
    );
    assert!(config(DebugSeverity::All)
        .severity_flags()
        .contains(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE));
}

// ============================================================================
// CATEGORY FILTER
// ============================================================================

#[test]
fn test_hidden_category_is_ignored() {
    let mut cfg = config(DebugSeverity::All);
    cfg.message_filter.show_performance = false;

    assert_eq!(
        cfg.disposition(MessageLevel::Warning, MessageCategory::Performance, "id"),
        Disposition::Ignore
    );
    assert_eq!(
        cfg.disposition(MessageLevel::Warning, MessageCategory::Validation, "id"),
        Disposition::Report
    );
}

#[test]
fn test_category_from_vk_prefers_validation() {
    let both = vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE;

    assert_eq!(MessageCategory::from_vk(both), MessageCategory::Validation);
    assert_eq!(
        MessageCategory::from_vk(vk::DebugUtilsMessageTypeFlagsEXT::GENERAL),
        MessageCategory::General
    );
}

// ============================================================================
// BENIGN ALLOW-LIST
// ============================================================================

#[test]
fn test_benign_message_is_suppressed() {
    let cfg = config(DebugSeverity::All);

    assert_eq!(
        cfg.disposition(
            MessageLevel::Error,
            MessageCategory::Validation,
            "VUID-VkSwapchainCreateInfoKHR-imageExtent-01274"
        ),
        Disposition::Suppress
    );
}

#[test]
fn test_filtered_benign_message_is_ignored_not_suppressed() {
    let cfg = config(DebugSeverity::ErrorsOnly);

    assert_eq!(
        cfg.disposition(MessageLevel::Info, MessageCategory::General, "Loader Message"),
        Disposition::Ignore
    );
}

#[test]
fn test_empty_allow_list_reports_everything() {
    let mut cfg = config(DebugSeverity::All);
    cfg.benign_message_ids.clear();

    assert_eq!(
        cfg.disposition(MessageLevel::Info, MessageCategory::General, "Loader Message"),
        Disposition::Report
    );
}

#[test]
fn test_message_level_from_vk() {
    assert_eq!(
        MessageLevel::from_vk(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR),
        MessageLevel::Error
    );
    assert_eq!(
        MessageLevel::from_vk(vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE),
        MessageLevel::Verbose
    );
}

#[test]
fn test_counters_snapshot_and_clear() {
    let counters = ValidationCounters::new();
    counters.count(MessageLevel::Error);
    counters.count(MessageLevel::Warning);
    counters.count(MessageLevel::Warning);
    counters.count_suppressed();

    let stats = counters.snapshot();
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.warnings, 2);
    assert_eq!(stats.info, 0);
    assert_eq!(stats.suppressed, 1);

    counters.clear();
    let stats = counters.snapshot();
    assert_eq!(stats.total(), 0);
    assert_eq!(stats.suppressed, 0);
}
