//! Unit tests for swapchain sizing helpers

use crate::render_device::swapchain::*;
use crate::render_device::types::Extent2D;

fn caps(min: u32, max: u32, current: Extent2D) -> SurfaceCapabilities {
    SurfaceCapabilities {
        min_image_count: min,
        max_image_count: max,
        current_extent: current,
        min_extent: Extent2D::new(1, 1),
        max_extent: Extent2D::new(4096, 4096),
    }
}

#[test]
fn test_clamp_image_count_within_bounds() {
    let c = caps(2, 8, Extent2D::new(800, 600));
    assert_eq!(clamp_image_count(DESIRED_SWAPCHAIN_IMAGE_COUNT, &c), 3);
}

#[test]
fn test_clamp_image_count_raised_to_minimum() {
    let c = caps(4, 8, Extent2D::new(800, 600));
    assert_eq!(clamp_image_count(DESIRED_SWAPCHAIN_IMAGE_COUNT, &c), 4);
}

#[test]
fn test_clamp_image_count_lowered_to_maximum() {
    let c = caps(1, 2, Extent2D::new(800, 600));
    assert_eq!(clamp_image_count(DESIRED_SWAPCHAIN_IMAGE_COUNT, &c), 2);
}

#[test]
fn test_clamp_image_count_unbounded_maximum() {
    let c = caps(2, 0, Extent2D::new(800, 600));
    assert_eq!(clamp_image_count(DESIRED_SWAPCHAIN_IMAGE_COUNT, &c), 3);
    assert_eq!(clamp_image_count(16, &c), 16);
}

#[test]
fn test_resolve_extent_uses_window_extent() {
    let c = caps(2, 3, Extent2D::new(1024, 768));
    assert_eq!(resolve_extent(&c, Extent2D::new(10, 10)), Extent2D::new(1024, 768));
}

#[test]
fn test_resolve_extent_clamps_fallback_when_undefined() {
    let c = caps(2, 3, Extent2D::new(EXTENT_UNDEFINED, EXTENT_UNDEFINED));
    assert_eq!(c.window_extent(), None);
    assert_eq!(resolve_extent(&c, Extent2D::new(8000, 600)), Extent2D::new(4096, 600));
}

#[test]
fn test_resolve_extent_minimized_window_uses_fallback() {
    let c = caps(2, 3, Extent2D::new(0, 0));
    assert_eq!(resolve_extent(&c, Extent2D::new(1280, 720)), Extent2D::new(1280, 720));
}

#[test]
fn test_resolve_extent_never_empty() {
    let c = SurfaceCapabilities {
        min_extent: Extent2D::new(0, 0),
        max_extent: Extent2D::new(0, 0),
        ..caps(2, 3, Extent2D::new(0, 0))
    };
    assert_eq!(resolve_extent(&c, Extent2D::new(1280, 720)), Extent2D::new(1, 1));
}
