/// Device and surface selection policies
///
/// Pure functions over backend-neutral descriptions so the choices made during
/// device bring-up can be tested without a GPU.

use crate::render_device::types::{
    DeviceType, SampleCount, SurfaceFormat, TextureFormat, DEPTH_FORMAT_CANDIDATES,
};

/// Pick the physical device to use: the first discrete GPU, otherwise index 0
///
/// Returns `None` only when `devices` is empty. Integrated GPUs are not
/// ranked; a machine without a discrete GPU gets whatever enumerates first.
pub fn select_physical_device(devices: &[DeviceType]) -> Option<usize> {
    if devices.is_empty() {
        return None;
    }
    Some(
        devices
            .iter()
            .position(|t| *t == DeviceType::DiscreteGpu)
            .unwrap_or(0),
    )
}

/// Highest sample count supported by both color and depth framebuffers
///
/// Both arguments are bitmasks where bit `n` means `2^n` samples are supported
/// (the Vulkan `SampleCountFlags` encoding).
pub fn max_usable_sample_count(color_counts: u32, depth_counts: u32) -> SampleCount {
    let counts = color_counts & depth_counts;
    SampleCount::DESCENDING
        .iter()
        .copied()
        .find(|s| counts & s.count() != 0)
        .unwrap_or(SampleCount::S1)
}

/// Surface formats accepted without warning, in priority order
pub const PREFERRED_SURFACE_FORMATS: [TextureFormat; 7] = [
    TextureFormat::R8G8B8A8_UNORM,
    TextureFormat::B8G8R8A8_UNORM,
    TextureFormat::R8G8B8A8_SRGB,
    TextureFormat::B8G8R8A8_SRGB,
    TextureFormat::A2B10G10R10_UNORM,
    TextureFormat::A2R10G10B10_UNORM,
    TextureFormat::R16G16B16A16_SFLOAT,
];

/// Outcome of surface format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFormatChoice {
    /// A format from `PREFERRED_SURFACE_FORMATS`
    Preferred(SurfaceFormat),
    /// Nothing preferred was exposed; the first exposed format is used
    Fallback(SurfaceFormat),
}

impl SurfaceFormatChoice {
    pub fn format(&self) -> SurfaceFormat {
        match self {
            SurfaceFormatChoice::Preferred(f) | SurfaceFormatChoice::Fallback(f) => *f,
        }
    }
}

/// Select the surface format: preferred 8-bit, then 10-bit packed, then
/// 16-bit float RGBA; otherwise the first exposed format
pub fn select_surface_format(available: &[SurfaceFormat]) -> Option<SurfaceFormatChoice> {
    for wanted in PREFERRED_SURFACE_FORMATS {
        if let Some(found) = available.iter().find(|f| f.format == wanted) {
            return Some(SurfaceFormatChoice::Preferred(*found));
        }
    }
    available.first().map(|f| SurfaceFormatChoice::Fallback(*f))
}

/// First depth candidate accepted by `supports`, in `DEPTH_FORMAT_CANDIDATES` order
pub fn find_depth_format<F>(mut supports: F) -> Option<TextureFormat>
where
    F: FnMut(TextureFormat) -> bool,
{
    DEPTH_FORMAT_CANDIDATES.iter().copied().find(|f| supports(*f))
}

#[cfg(test)]
#[path = "selection_tests.rs"]
mod tests;
