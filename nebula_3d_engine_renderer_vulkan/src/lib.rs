/*!
# Nebula 3D Engine - Vulkan Render Device

Vulkan implementation of the `RenderDevice` trait from `nebula_3d_engine`.

Built on Ash for the Vulkan bindings, ash-window for surface creation and
gpu-allocator for memory. Validation layers and the debug messenger are
available in debug builds, or in release builds with the `vulkan-validation`
feature.

```no_run
use nebula_3d_engine::nebula3d::render::Config;
use nebula_3d_engine_renderer_vulkan::nebula3d::VulkanRenderDevice;
# fn run(window: &winit::window::Window) -> nebula_3d_engine::nebula3d::Result<()> {
let mut device = VulkanRenderDevice::new(window, &Config::default())?;
# Ok(())
# }
```
*/

mod debug;
mod vulkan_format;
mod vulkan_context;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_render_pass;
mod vulkan_pipeline;
mod vulkan_swapchain;
mod vulkan_render_device;

pub mod nebula3d {
    pub use crate::vulkan_render_device::VulkanRenderDevice;
    pub use crate::vulkan_context::DeviceContext;

    // Validation statistics
    pub use crate::debug::{get_validation_stats, print_validation_stats_report};
}
