//! Integration tests for VulkanRenderDevice
//!
//! All tests require a GPU and a window system and are marked with #[ignore].
//!
//! Run with: cargo test --test vulkan_render_device_tests -- --ignored


use gpu_test_utils::{get_test_device, get_test_window};
use nebula_3d_engine::nebula3d::{Error, RenderDevice};
use nebula_3d_engine::nebula3d::render::{
    BufferUsage, ComputePipelineDesc, ImageLayout, SamplerDesc, TextureDesc, TextureFormat,
};
use nebula_3d_engine::nebula3d::screen::{Screen, ScreenState};
use serial_test::serial;

// ============================================================================
// BUFFER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_buffer_write_read_roundtrip() {
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    let buffer = device.create_buffer(BufferUsage::Uniform, 64).unwrap();
    device.write_buffer(buffer, 0, &[0xAB; 64]).unwrap();

    let mut out = [0u8; 64];
    device.read_buffer(buffer, 0, &mut out).unwrap();
    assert!(out.iter().all(|b| *b == 0xAB));

    assert_eq!(device.buffer_info(buffer).unwrap().size, 64);
    device.destroy_buffer(buffer).unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_buffer_partial_write_at_offset() {
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    let buffer = device.create_buffer(BufferUsage::Vertex, 16).unwrap();
    device.write_buffer(buffer, 0, &[0; 16]).unwrap();
    device.write_buffer(buffer, 12, &[1, 2, 3, 4]).unwrap();

    let mut out = [0u8; 8];
    device.read_buffer(buffer, 8, &mut out).unwrap();
    assert_eq!(out, [0, 0, 0, 0, 1, 2, 3, 4]);

    device.destroy_buffer(buffer).unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_zero_sized_buffer_rejected() {
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    assert!(matches!(
        device.create_buffer(BufferUsage::Index, 0),
        Err(Error::BackendError(_))
    ));
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_destroyed_buffer_handle_is_stale() {
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    let buffer = device.create_buffer(BufferUsage::Storage, 32).unwrap();
    device.destroy_buffer(buffer).unwrap();

    assert!(matches!(device.buffer_info(buffer), Err(Error::InvalidResource(_))));
    assert!(matches!(device.destroy_buffer(buffer), Err(Error::InvalidResource(_))));
}

// ============================================================================
// TEXTURE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_write_texture_ends_shader_read_only() {
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    let texture = device
        .create_texture(&TextureDesc::sampled(4, 4, TextureFormat::R8G8B8A8_UNORM))
        .unwrap();
    assert_eq!(device.texture_info(texture).unwrap().layout, ImageLayout::Undefined);

    let pixels: Vec<u8> = (0..64).collect();
    device.write_texture(texture, &pixels).unwrap();
    assert_eq!(device.texture_info(texture).unwrap().layout, ImageLayout::ShaderReadOnly);

    // A second upload starts over from Undefined and ends in the same layout
    device.write_texture(texture, &pixels).unwrap();
    assert_eq!(device.texture_info(texture).unwrap().layout, ImageLayout::ShaderReadOnly);

    device.destroy_texture(texture).unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_write_texture_wrong_size_rejected() {
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    let texture = device
        .create_texture(&TextureDesc::sampled(4, 4, TextureFormat::R8G8B8A8_UNORM))
        .unwrap();

    assert!(matches!(
        device.write_texture(texture, &[0u8; 60]),
        Err(Error::InvalidResource(_))
    ));

    device.destroy_texture(texture).unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_texture_descriptor_released_with_texture() {
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    let baseline = device.descriptor_sets_in_use();
    let sampler = device.create_sampler(&SamplerDesc::linear_clamp()).unwrap();
    let texture = device
        .create_texture(&TextureDesc::sampled(2, 2, TextureFormat::B8G8R8A8_UNORM))
        .unwrap();
    device.write_texture(texture, &[255u8; 16]).unwrap();

    let first = device.create_texture_descriptor(texture, sampler).unwrap();
    assert_eq!(device.descriptor_sets_in_use(), baseline + 1);

    // Rebinding replaces the previous set instead of leaking it
    let second = device.create_texture_descriptor(texture, sampler).unwrap();
    assert_ne!(first, second);
    assert_eq!(device.descriptor_sets_in_use(), baseline + 1);
    assert_eq!(device.texture_info(texture).unwrap().descriptor_set, Some(second));

    device.destroy_texture(texture).unwrap();
    assert_eq!(device.descriptor_sets_in_use(), baseline);

    device.destroy_sampler(sampler).unwrap();
}

// ============================================================================
// DEVICE QUERIES
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_depth_format_is_a_depth_format() {
    let device = get_test_device();
    let device = device.lock().unwrap();

    let format = device.find_supported_depth_format().unwrap();
    assert!(format.is_depth());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_sample_count_within_device_limit() {
    let device = get_test_device();
    let device = device.lock().unwrap();

    assert!(device.sample_count() <= device.context().max_sample_count());
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_missing_shader_is_backend_error() {
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    let result = device.create_compute_pipeline(&ComputePipelineDesc {
        shader: "no_such_shader".to_string(),
        set_layouts: Vec::new(),
        push_constant_ranges: Vec::new(),
    });

    assert!(matches!(result, Err(Error::BackendError(_))));
}

// ============================================================================
// SYNCHRONIZATION
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_empty_submit_signals_fence() {
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    let fence = device.create_fence().unwrap();
    device.cmd_buffer_submit(None, &[], &[], Some(fence)).unwrap();
    device.wait_for_fence(fence).unwrap();

    // Reset after the wait, so it can be signaled again
    device.cmd_buffer_submit(None, &[], &[], Some(fence)).unwrap();
    device.wait_for_fence(fence).unwrap();

    device.destroy_fence(fence).unwrap();
}

// ============================================================================
// SCREEN
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_vulkan_screen_initialize_and_destroy() {
    let window = get_test_window();
    let device = get_test_device();
    let mut device = device.lock().unwrap();

    let mut screen = Screen::new();
    screen.initialize(&mut *device, window).unwrap();

    assert_eq!(screen.state(), ScreenState::Steady);
    assert!(screen.image_count() >= 2);
    assert_eq!(screen.images().len(), device.swapchain_images(screen.swapchain().unwrap()).unwrap().len());
    assert_eq!(screen.surface_format(), Some(device.surface_format()));

    screen.destroy(&mut *device).unwrap();
}
