//! Unit tests for device and surface selection policies

use crate::render_device::selection::*;
use crate::render_device::types::{
    choose_msaa, default_msaa, ColorSpace, DeviceType, SampleCount, SurfaceFormat, TextureFormat,
};

fn srgb(format: TextureFormat) -> SurfaceFormat {
    SurfaceFormat { format, color_space: ColorSpace::SrgbNonlinear }
}

// ============================================================================
// PHYSICAL DEVICE SELECTION
// ============================================================================

#[test]
fn test_select_first_discrete_gpu() {
    let devices = [DeviceType::IntegratedGpu, DeviceType::DiscreteGpu, DeviceType::DiscreteGpu];
    assert_eq!(select_physical_device(&devices), Some(1));
}

#[test]
fn test_select_falls_back_to_index_zero_without_discrete() {
    // Index 0 even when a better integrated GPU enumerates later
    let devices = [DeviceType::Cpu, DeviceType::IntegratedGpu];
    assert_eq!(select_physical_device(&devices), Some(0));
}

#[test]
fn test_select_no_devices() {
    assert_eq!(select_physical_device(&[]), None);
}

// ============================================================================
// SAMPLE COUNT
// ============================================================================

#[test]
fn test_max_usable_sample_count_takes_common_maximum() {
    // color: 1|2|4|8, depth: 1|2|4
    assert_eq!(max_usable_sample_count(0b1111, 0b0111), SampleCount::S4);
}

#[test]
fn test_max_usable_sample_count_up_to_64() {
    assert_eq!(max_usable_sample_count(0x7F, 0x7F), SampleCount::S64);
}

#[test]
fn test_max_usable_sample_count_single_sample_only() {
    assert_eq!(max_usable_sample_count(0b1, 0b1111), SampleCount::S1);
}

#[test]
fn test_default_msaa_prefers_4x_then_2x() {
    assert_eq!(default_msaa(SampleCount::S8), SampleCount::S4);
    assert_eq!(default_msaa(SampleCount::S4), SampleCount::S4);
    assert_eq!(default_msaa(SampleCount::S2), SampleCount::S2);
    assert_eq!(default_msaa(SampleCount::S1), SampleCount::S1);
}

#[test]
fn test_choose_msaa_caps_preference() {
    assert_eq!(choose_msaa(SampleCount::S8, SampleCount::S16), SampleCount::S8);
    assert_eq!(choose_msaa(SampleCount::S8, SampleCount::S2), SampleCount::S2);
}

// ============================================================================
// SURFACE FORMAT
// ============================================================================

#[test]
fn test_surface_format_prefers_8bit_over_10bit_and_float() {
    let available = [
        srgb(TextureFormat::R16G16B16A16_SFLOAT),
        srgb(TextureFormat::A2B10G10R10_UNORM),
        srgb(TextureFormat::B8G8R8A8_UNORM),
    ];
    assert_eq!(
        select_surface_format(&available),
        Some(SurfaceFormatChoice::Preferred(srgb(TextureFormat::B8G8R8A8_UNORM)))
    );
}

#[test]
fn test_surface_format_10bit_before_float() {
    let available = [
        srgb(TextureFormat::R16G16B16A16_SFLOAT),
        srgb(TextureFormat::A2R10G10B10_UNORM),
    ];
    assert_eq!(
        select_surface_format(&available).map(|c| c.format().format),
        Some(TextureFormat::A2R10G10B10_UNORM)
    );
}

#[test]
fn test_surface_format_falls_back_to_first() {
    let exotic = srgb(TextureFormat::Native(1_000_156_000));
    let available = [exotic, srgb(TextureFormat::Native(42))];
    assert_eq!(select_surface_format(&available), Some(SurfaceFormatChoice::Fallback(exotic)));
}

#[test]
fn test_surface_format_none_exposed() {
    assert_eq!(select_surface_format(&[]), None);
}

// ============================================================================
// DEPTH FORMAT
// ============================================================================

#[test]
fn test_depth_format_priority() {
    assert_eq!(find_depth_format(|_| true), Some(TextureFormat::D32_SFLOAT));
    assert_eq!(
        find_depth_format(|f| f == TextureFormat::D24_UNORM_S8_UINT),
        Some(TextureFormat::D24_UNORM_S8_UINT)
    );
    assert_eq!(
        find_depth_format(|f| f != TextureFormat::D32_SFLOAT),
        Some(TextureFormat::D32_SFLOAT_S8_UINT)
    );
}

#[test]
fn test_depth_format_unsupported() {
    assert_eq!(find_depth_format(|_| false), None);
}
