/// RenderDevice trait - the only way components touch the GPU
///
/// Implemented by backend crates (e.g. `VulkanRenderDevice`) and by the
/// in-memory mock used in unit tests. Every GPU object is addressed by a slot
/// handle; destroy calls consume the slot, and dropping the device destroys
/// whatever is still alive before the device itself goes away.
///
/// All operations are synchronous and single-threaded: one graphics queue,
/// one command pool, one descriptor pool.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::Result;
use crate::render_device::buffer::{BufferInfo, BufferUsage};
use crate::render_device::descriptor::{DescriptorBinding, DescriptorWrite};
use crate::render_device::handles::*;
use crate::render_device::pipeline::{ComputePipelineDesc, GraphicsPipelineDesc, PipelineInfo};
use crate::render_device::render_pass::{FramebufferAttachment, RenderPassDesc};
use crate::render_device::sampler::SamplerDesc;
use crate::render_device::swapchain::{SurfaceCapabilities, SwapchainDesc};
use crate::render_device::texture::{TextureDesc, TextureInfo};
use crate::render_device::types::{
    ClearValue, Extent2D, ImageLayout, IndexType, SampleCount, ShaderStageFlags, SurfaceFormat,
    TextureFormat, WaitStage,
};

/// Anything that can hand out native window and display handles
pub trait WindowSource: HasDisplayHandle + HasWindowHandle {}

impl<T: HasDisplayHandle + HasWindowHandle> WindowSource for T {}

/// Semaphore wait for a queue submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemaphoreWait {
    pub semaphore: SemaphoreHandle,
    pub stage: WaitStage,
}

/// Render device interface
pub trait RenderDevice {
    // ===== QUERIES =====

    /// MSAA sample count chosen at bring-up; scene render passes are built with it
    fn sample_count(&self) -> SampleCount;

    /// Surface format negotiated with the window at bring-up
    fn surface_format(&self) -> SurfaceFormat;

    /// First of D32, D32S8, D24S8 usable as an optimal-tiling depth attachment
    fn find_supported_depth_format(&self) -> Result<TextureFormat>;

    /// Live descriptor sets allocated from the device's pool
    fn descriptor_sets_in_use(&self) -> u32;

    // ===== BUFFERS =====

    /// Host-visible buffer of exactly `size` bytes
    fn create_buffer(&mut self, usage: BufferUsage, size: u64) -> Result<BufferHandle>;

    fn buffer_info(&self, buffer: BufferHandle) -> Result<BufferInfo>;

    /// Copy `data` into the buffer at `offset`
    ///
    /// # Panics
    ///
    /// When `offset + data.len()` exceeds the buffer size.
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Copy `out.len()` bytes from the buffer at `offset`
    ///
    /// # Panics
    ///
    /// When `offset + out.len()` exceeds the buffer size.
    fn read_buffer(&self, buffer: BufferHandle, offset: u64, out: &mut [u8]) -> Result<()>;

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<()>;

    // ===== TEXTURES =====

    /// 2D image + view, one mip level, one layer, layout `Undefined`
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle>;

    fn texture_info(&self, texture: TextureHandle) -> Result<TextureInfo>;

    /// Upload pixels through a staging buffer and a one-time command buffer
    ///
    /// Blocks until the upload finished. The texture ends in `ShaderReadOnly`
    /// whatever its layout was before.
    fn write_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<()>;

    /// Allocate the texture's combined image sampler set and bind `sampler` to it
    ///
    /// Replaces (and frees) a previously bound set.
    fn create_texture_descriptor(
        &mut self,
        texture: TextureHandle,
        sampler: SamplerHandle,
    ) -> Result<DescriptorSetHandle>;

    /// Destroy image, view and allocation, and free the bound descriptor set
    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<()>;

    // ===== SAMPLERS =====

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle>;

    fn destroy_sampler(&mut self, sampler: SamplerHandle) -> Result<()>;

    // ===== RENDER PASSES / FRAMEBUFFERS =====

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle>;

    fn destroy_render_pass(&mut self, render_pass: RenderPassHandle) -> Result<()>;

    fn create_framebuffer(
        &mut self,
        render_pass: RenderPassHandle,
        attachments: &[FramebufferAttachment],
        extent: Extent2D,
    ) -> Result<FramebufferHandle>;

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) -> Result<()>;

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &mut self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle>;

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle) -> Result<()>;

    fn allocate_descriptor_set(
        &mut self,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle>;

    fn write_descriptor_set(
        &mut self,
        set: DescriptorSetHandle,
        writes: &[DescriptorWrite],
    ) -> Result<()>;

    fn free_descriptor_set(&mut self, set: DescriptorSetHandle) -> Result<()>;

    // ===== PIPELINES =====

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<PipelineHandle>;

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<PipelineHandle>;

    fn pipeline_info(&self, pipeline: PipelineHandle) -> Result<PipelineInfo>;

    /// Destroy a graphics or compute pipeline and its layout
    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) -> Result<()>;

    // ===== PRESENTATION =====

    /// Presentation surface for `window`
    fn create_surface(&mut self, window: &dyn WindowSource) -> Result<SurfaceHandle>;

    fn destroy_surface(&mut self, surface: SurfaceHandle) -> Result<()>;

    fn surface_capabilities(&self, surface: SurfaceHandle) -> Result<SurfaceCapabilities>;

    /// Create a swapchain; `desc.old_swapchain` is handed to the driver but not destroyed
    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<SwapchainHandle>;

    /// Destroy a swapchain and forget its images
    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) -> Result<()>;

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>>;

    fn create_image_view(&mut self, image: ImageHandle) -> Result<ImageViewHandle>;

    fn destroy_image_view(&mut self, view: ImageViewHandle) -> Result<()>;

    /// Index of the next presentable image (blocks without timeout)
    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
    ) -> Result<u32>;

    /// Present `image_index`, then wait for the queue to go idle
    fn present(
        &mut self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: &[SemaphoreHandle],
    ) -> Result<()>;

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&mut self) -> Result<SemaphoreHandle>;

    fn destroy_semaphore(&mut self, semaphore: SemaphoreHandle) -> Result<()>;

    /// Unsignaled fence
    fn create_fence(&mut self) -> Result<FenceHandle>;

    /// Wait for `fence` without timeout, then reset it
    fn wait_for_fence(&mut self, fence: FenceHandle) -> Result<()>;

    fn destroy_fence(&mut self, fence: FenceHandle) -> Result<()>;

    fn device_wait_idle(&self) -> Result<()>;

    // ===== COMMAND BUFFERS =====

    /// Primary command buffer from the device's command pool
    fn allocate_command_buffer(&mut self) -> Result<CommandBufferHandle>;

    fn free_command_buffer(&mut self, command_buffer: CommandBufferHandle) -> Result<()>;

    /// Reset and begin recording a persistent command buffer
    fn cmd_buffer_begin(&mut self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn cmd_buffer_end(&mut self, command_buffer: CommandBufferHandle) -> Result<()>;

    /// Allocate and begin a command buffer for a single submission
    fn cmd_buffer_one_time_begin(&mut self) -> Result<CommandBufferHandle>;

    /// End, submit, wait for queue idle and free a one-time command buffer
    fn cmd_buffer_one_time_end(&mut self, command_buffer: CommandBufferHandle) -> Result<()>;

    /// Submit zero or one command buffer with explicit semaphores and fence
    fn cmd_buffer_submit(
        &mut self,
        command_buffer: Option<CommandBufferHandle>,
        wait: &[SemaphoreWait],
        signal: &[SemaphoreHandle],
        fence: Option<FenceHandle>,
    ) -> Result<()>;

    // ===== RECORDING =====

    fn cmd_begin_render_pass(
        &mut self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    fn cmd_end_render_pass(&mut self, command_buffer: CommandBufferHandle) -> Result<()>;

    fn cmd_bind_pipeline(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
    ) -> Result<()>;

    fn cmd_bind_vertex_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
    ) -> Result<()>;

    fn cmd_bind_index_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()>;

    fn cmd_draw(
        &mut self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()>;

    fn cmd_draw_indexed(
        &mut self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()>;

    fn cmd_dispatch(
        &mut self,
        command_buffer: CommandBufferHandle,
        group_count_x: u32,
        group_count_y: u32,
        group_count_z: u32,
    ) -> Result<()>;

    /// Bind `set` at `set_index` for the pipeline's bind point and layout
    fn cmd_bind_descriptor_set(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
        set_index: u32,
        set: DescriptorSetHandle,
    ) -> Result<()>;

    /// Set viewport and scissor to the same rectangle
    fn cmd_set_viewport_scissor(
        &mut self,
        command_buffer: CommandBufferHandle,
        x: i32,
        y: i32,
        extent: Extent2D,
    ) -> Result<()>;

    fn cmd_push_constants(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Transition a texture from its tracked layout to `new_layout`
    ///
    /// The tracked layout is updated as soon as the barrier is recorded.
    fn cmd_image_barrier(
        &mut self,
        command_buffer: CommandBufferHandle,
        texture: TextureHandle,
        new_layout: ImageLayout,
    ) -> Result<()>;
}
