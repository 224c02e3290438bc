//! Integration tests for the logging facade, driven through the exported macros
//!
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use nebula_3d_engine::nebula3d::log::{LogEntry, LogSeverity, Logger};
use nebula_3d_engine::nebula3d::{Engine, Error, Result};
use nebula_3d_engine::{engine_bail_warn, engine_debug, engine_err, engine_error, engine_info, engine_trace, engine_warn};
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// HELPERS
// ============================================================================

/// Installs itself as the engine logger and records rendered lines
#[derive(Clone, Default)]
struct Recorder {
    lines: Arc<Mutex<Vec<(LogSeverity, String)>>>,
}

impl Recorder {
    fn install() -> Self {
        let recorder = Recorder::default();
        Engine::set_logger(recorder.clone());
        Engine::set_min_severity(LogSeverity::Trace);
        recorder
    }

    fn severities(&self) -> Vec<LogSeverity> {
        self.lines.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }

    fn last_line(&self) -> String {
        self.lines.lock().unwrap().last().map(|(_, l)| l.clone()).unwrap_or_default()
    }
}

impl Logger for Recorder {
    fn log(&self, entry: &LogEntry) {
        self.lines.lock().unwrap().push((entry.severity, entry.to_string()));
    }
}

fn restore() {
    Engine::set_min_severity(LogSeverity::Trace);
    Engine::reset_logger();
}

// ============================================================================
// MACROS FROM A DOWNSTREAM CRATE
// ============================================================================

#[test]
#[serial]
fn test_each_macro_reports_its_severity() {
    let recorder = Recorder::install();

    engine_trace!("nebula3d::Screen", "Acquired image {}", 1);
    engine_debug!("nebula3d::SceneRenderer", "Scene target {}x{}", 640, 480);
    engine_info!("nebula3d::Screen", "Screen initialized");
    engine_warn!("nebula3d::vulkan", "Surface format fallback");
    engine_error!("nebula3d::vulkan", "Device lost");

    assert_eq!(
        recorder.severities(),
        vec![
            LogSeverity::Trace,
            LogSeverity::Debug,
            LogSeverity::Info,
            LogSeverity::Warn,
            LogSeverity::Error,
        ]
    );
    restore();
}

#[test]
#[serial]
fn test_rendered_line_carries_source_and_call_site() {
    let recorder = Recorder::install();

    engine_info!("nebula3d::Editor", "Viewport panel resized to {}x{}", 320, 200);
    assert!(recorder.last_line().ends_with("[INFO ] [nebula3d::Editor] Viewport panel resized to 320x200"));

    engine_error!("nebula3d::vulkan", "Swapchain lost");
    let line = recorder.last_line();
    assert!(line.contains("[ERROR] [nebula3d::vulkan] Swapchain lost ("));
    assert!(line.contains("logging_integration_tests.rs:"));
    restore();
}

#[test]
#[serial]
fn test_min_severity_drops_frame_chatter() {
    let recorder = Recorder::install();
    Engine::set_min_severity(LogSeverity::Info);

    for image in 0..3 {
        engine_trace!("nebula3d::Screen", "Acquired image {}", image);
        engine_debug!("nebula3d::Screen", "Presented image {}", image);
    }
    engine_info!("nebula3d::Screen", "Recreating swapchain");

    assert_eq!(recorder.severities(), vec![LogSeverity::Info]);
    restore();
}

#[test]
#[serial]
fn test_reset_logger_detaches_recorder() {
    let recorder = Recorder::install();
    engine_info!("test", "before reset");

    Engine::reset_logger();
    engine_info!("test", "after reset");

    assert_eq!(recorder.severities().len(), 1);
    restore();
}

// ============================================================================
// ERROR-PRODUCING MACROS
// ============================================================================

#[test]
#[serial]
fn test_engine_err_text_matches_logged_message() {
    let recorder = Recorder::install();

    let err: Error = engine_err!("nebula3d::vulkan", "vkCreateFence failed: {}", -1);

    assert_eq!(err.to_string(), "Backend error: vkCreateFence failed: -1");
    assert!(recorder.last_line().contains("vkCreateFence failed: -1 ("));
    restore();
}

#[test]
#[serial]
fn test_engine_bail_warn_returns_without_location() {
    let recorder = Recorder::install();

    fn pick_present_mode(available: &[u32]) -> Result<u32> {
        match available.first() {
            Some(mode) => Ok(*mode),
            None => engine_bail_warn!("nebula3d::vulkan", "No present mode available"),
        }
    }

    assert_eq!(pick_present_mode(&[2, 0]).unwrap(), 2);
    assert!(matches!(pick_present_mode(&[]), Err(Error::BackendError(_))));
    assert_eq!(recorder.severities(), vec![LogSeverity::Warn]);
    assert!(recorder.last_line().ends_with("No present mode available"));
    restore();
}
