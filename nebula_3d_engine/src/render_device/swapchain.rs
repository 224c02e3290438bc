/// Surface capabilities and swapchain descriptions

use crate::render_device::handles::{SurfaceHandle, SwapchainHandle};
use crate::render_device::types::{CompositeAlpha, Extent2D, PresentMode, SurfaceFormat};

/// Image count requested for every swapchain before clamping
pub const DESIRED_SWAPCHAIN_IMAGE_COUNT: u32 = 3;

/// Extent value meaning "the surface size follows the swapchain"
pub const EXTENT_UNDEFINED: u32 = u32::MAX;

/// What the surface currently allows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    pub min_image_count: u32,
    /// 0 means no upper bound
    pub max_image_count: u32,
    pub current_extent: Extent2D,
    pub min_extent: Extent2D,
    pub max_extent: Extent2D,
}

impl SurfaceCapabilities {
    /// Extent reported by the window system, if it dictates one
    pub fn window_extent(&self) -> Option<Extent2D> {
        if self.current_extent.width == EXTENT_UNDEFINED {
            None
        } else {
            Some(self.current_extent)
        }
    }
}

/// Clamp `desired` into `[min_image_count, max_image_count]`
pub fn clamp_image_count(desired: u32, caps: &SurfaceCapabilities) -> u32 {
    let count = desired.max(caps.min_image_count);
    if caps.max_image_count > 0 {
        count.min(caps.max_image_count)
    } else {
        count
    }
}

/// Extent to build a swapchain with
///
/// The window-system extent when there is a non-zero one. Otherwise
/// (undefined, or a minimized window reporting 0x0) `fallback` clamped into
/// the surface's supported range, never below 1x1.
pub fn resolve_extent(caps: &SurfaceCapabilities, fallback: Extent2D) -> Extent2D {
    match caps.window_extent() {
        Some(extent) if !extent.is_empty() => extent,
        _ => Extent2D::new(
            fallback.width.min(caps.max_extent.width).max(caps.min_extent.width).max(1),
            fallback.height.min(caps.max_extent.height).max(caps.min_extent.height).max(1),
        ),
    }
}

/// Swapchain creation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    pub surface: SurfaceHandle,
    pub image_count: u32,
    pub format: SurfaceFormat,
    pub extent: Extent2D,
    pub present_mode: PresentMode,
    pub composite_alpha: CompositeAlpha,
    /// Swapchain being replaced; it stays alive until the caller destroys it
    pub old_swapchain: Option<SwapchainHandle>,
}

#[cfg(test)]
#[path = "swapchain_tests.rs"]
mod tests;
