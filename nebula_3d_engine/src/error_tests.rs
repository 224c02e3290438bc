//! Unit tests for error.rs
//!
//! Tests all Error variants and their implementations (Display, Debug, Clone, std::error::Error).

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkCreateSwapchainKHR failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkCreateSwapchainKHR failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("stale buffer handle".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Invalid resource"));
    assert!(display.contains("stale buffer handle"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("No Vulkan-capable GPU found".to_string());
    assert_eq!(
        format!("{}", err),
        "Initialization failed: No Vulkan-capable GPU found"
    );
}

#[test]
fn test_invalid_state_display() {
    let err = Error::InvalidState("screen frame already begun".to_string());
    assert_eq!(format!("{}", err), "Invalid state: screen frame already begun");
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug_names_variant() {
    assert!(format!("{:?}", Error::BackendError("x".into())).contains("BackendError"));
    assert!(format!("{:?}", Error::InvalidState("x".into())).contains("InvalidState"));
}

#[test]
fn test_error_clone_keeps_message() {
    let err = Error::InvalidResource("texture".to_string());
    assert_eq!(format!("{}", err.clone()), format!("{}", err));
}

// ============================================================================
// RESULT TYPE TESTS
// ============================================================================

#[test]
fn test_result_propagates_with_question_mark() {
    fn inner() -> Result<u32> {
        Err(Error::OutOfMemory)
    }
    fn outer() -> Result<u32> {
        let value = inner()?;
        Ok(value + 1)
    }

    assert!(matches!(outer(), Err(Error::OutOfMemory)));
}
