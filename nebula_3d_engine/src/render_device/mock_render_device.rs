/// Mock render device for unit tests (no GPU required)
///
/// Keeps every resource in slot maps exactly like a real backend, stores
/// buffer contents in memory, tracks texture layouts and descriptor sets, and
/// appends every lifecycle call to `calls` so tests can assert ordering.
/// The surface reports whatever extent the test sets.

use slotmap::{Key, SlotMap};

use crate::error::{Error, Result};
use crate::render_device::*;

// ============================================================================
// Recorded calls
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    CreateSurface(SurfaceHandle),
    DestroySurface(SurfaceHandle),
    CreateSwapchain {
        swapchain: SwapchainHandle,
        old_swapchain: Option<SwapchainHandle>,
        image_count: u32,
        extent: Extent2D,
    },
    DestroySwapchain(SwapchainHandle),
    CreateRenderPass(RenderPassHandle),
    DestroyRenderPass(RenderPassHandle),
    CreateFramebuffer(FramebufferHandle, Extent2D),
    DestroyFramebuffer(FramebufferHandle),
    CreateImageView(ImageViewHandle),
    DestroyImageView(ImageViewHandle),
    AllocateCommandBuffer(CommandBufferHandle),
    FreeCommandBuffer(CommandBufferHandle),
    CreateTexture(TextureHandle),
    DestroyTexture(TextureHandle),
    CreatePipeline(PipelineHandle),
    DestroyPipeline(PipelineHandle),
    AcquireNextImage(u32),
    Submit {
        command_buffer: Option<CommandBufferHandle>,
        wait: Vec<SemaphoreWait>,
        signal: Vec<SemaphoreHandle>,
        fence: Option<FenceHandle>,
    },
    Present(u32),
    WaitForFence(FenceHandle),
}

// ============================================================================
// Mock resources
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub info: BufferInfo,
    pub data: Vec<u8>,
}

#[derive(Debug)]
pub struct MockFramebuffer {
    pub render_pass: RenderPassHandle,
    pub attachments: Vec<FramebufferAttachment>,
    pub extent: Extent2D,
}

#[derive(Debug, Default)]
pub struct MockCommandBuffer {
    pub recording: bool,
    pub in_render_pass: bool,
    /// Framebuffer of the render pass being recorded
    pub framebuffer: Option<FramebufferHandle>,
    pub one_time: bool,
    /// Recorded commands, e.g. "begin_render_pass", "draw 36"
    pub commands: Vec<String>,
}

#[derive(Debug)]
pub struct MockDescriptorSet {
    pub layout: DescriptorSetLayoutHandle,
    pub writes: Vec<DescriptorWrite>,
}

#[derive(Debug)]
pub struct MockSwapchain {
    pub images: Vec<ImageHandle>,
    pub extent: Extent2D,
}

fn lookup<'a, K: Key, V>(map: &'a SlotMap<K, V>, key: K, kind: &str) -> Result<&'a V> {
    map.get(key)
        .ok_or_else(|| Error::InvalidResource(format!("{} handle is not alive", kind)))
}

fn lookup_mut<'a, K: Key, V>(map: &'a mut SlotMap<K, V>, key: K, kind: &str) -> Result<&'a mut V> {
    map.get_mut(key)
        .ok_or_else(|| Error::InvalidResource(format!("{} handle is not alive", kind)))
}

fn release<K: Key, V>(map: &mut SlotMap<K, V>, key: K, kind: &str) -> Result<V> {
    map.remove(key)
        .ok_or_else(|| Error::InvalidResource(format!("{} handle is not alive", kind)))
}

// ============================================================================
// Mock device
// ============================================================================

pub struct MockRenderDevice {
    pub calls: Vec<MockCall>,
    pub sample_count: SampleCount,
    pub surface_format: SurfaceFormat,
    pub supported_depth_formats: Vec<TextureFormat>,
    pub surface_caps: SurfaceCapabilities,
    /// Shader base names that behave as if their `.spv` file were missing
    pub missing_shaders: Vec<String>,

    pub buffers: SlotMap<BufferHandle, MockBuffer>,
    pub textures: SlotMap<TextureHandle, TextureInfo>,
    pub samplers: SlotMap<SamplerHandle, SamplerDesc>,
    pub render_passes: SlotMap<RenderPassHandle, RenderPassDesc>,
    pub framebuffers: SlotMap<FramebufferHandle, MockFramebuffer>,
    pub set_layouts: SlotMap<DescriptorSetLayoutHandle, Vec<DescriptorBinding>>,
    pub descriptor_sets: SlotMap<DescriptorSetHandle, MockDescriptorSet>,
    pub pipelines: SlotMap<PipelineHandle, PipelineInfo>,
    pub surfaces: SlotMap<SurfaceHandle, ()>,
    pub swapchains: SlotMap<SwapchainHandle, MockSwapchain>,
    pub images: SlotMap<ImageHandle, SwapchainHandle>,
    pub image_views: SlotMap<ImageViewHandle, ImageHandle>,
    pub semaphores: SlotMap<SemaphoreHandle, ()>,
    pub fences: SlotMap<FenceHandle, bool>,
    pub command_buffers: SlotMap<CommandBufferHandle, MockCommandBuffer>,

    texture_set_layout: Option<DescriptorSetLayoutHandle>,
    next_image: u32,
}

impl MockRenderDevice {
    /// Device with a 800x600 surface allowing 2..=8 images, 4x MSAA
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            sample_count: SampleCount::S4,
            surface_format: SurfaceFormat {
                format: TextureFormat::B8G8R8A8_UNORM,
                color_space: ColorSpace::SrgbNonlinear,
            },
            supported_depth_formats: vec![TextureFormat::D32_SFLOAT, TextureFormat::D24_UNORM_S8_UINT],
            surface_caps: SurfaceCapabilities {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: Extent2D::new(800, 600),
                min_extent: Extent2D::new(1, 1),
                max_extent: Extent2D::new(8192, 8192),
            },
            missing_shaders: Vec::new(),
            buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            samplers: SlotMap::with_key(),
            render_passes: SlotMap::with_key(),
            framebuffers: SlotMap::with_key(),
            set_layouts: SlotMap::with_key(),
            descriptor_sets: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            surfaces: SlotMap::with_key(),
            swapchains: SlotMap::with_key(),
            images: SlotMap::with_key(),
            image_views: SlotMap::with_key(),
            semaphores: SlotMap::with_key(),
            fences: SlotMap::with_key(),
            command_buffers: SlotMap::with_key(),
            texture_set_layout: None,
            next_image: 0,
        }
    }

    /// Simulate a window resize
    pub fn set_surface_extent(&mut self, width: u32, height: u32) {
        self.surface_caps.current_extent = Extent2D::new(width, height);
    }

    /// Commands recorded into a command buffer
    pub fn commands(&self, command_buffer: CommandBufferHandle) -> Vec<String> {
        self.command_buffers
            .get(command_buffer)
            .map(|cb| cb.commands.clone())
            .unwrap_or_default()
    }

    fn record(&mut self, command_buffer: CommandBufferHandle, command: String) -> Result<()> {
        let cb = lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?;
        if !cb.recording {
            return Err(Error::BackendError("Command buffer not recording".to_string()));
        }
        cb.commands.push(command);
        Ok(())
    }

    fn record_in_pass(&mut self, command_buffer: CommandBufferHandle, command: String) -> Result<()> {
        let in_pass = lookup(&self.command_buffers, command_buffer, "command buffer")?.in_render_pass;
        if !in_pass {
            return Err(Error::BackendError(format!("{} outside of a render pass", command)));
        }
        self.record(command_buffer, command)
    }

    fn check_shader(&self, name: &str) -> Result<()> {
        if self.missing_shaders.iter().any(|s| s == name) {
            return Err(Error::BackendError(format!("Shader file not found: shader/{}", name)));
        }
        Ok(())
    }
}

impl RenderDevice for MockRenderDevice {
    // ===== QUERIES =====

    fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    fn surface_format(&self) -> SurfaceFormat {
        self.surface_format
    }

    fn find_supported_depth_format(&self) -> Result<TextureFormat> {
        find_depth_format(|f| self.supported_depth_formats.contains(&f))
            .ok_or_else(|| Error::BackendError("No supported depth format".to_string()))
    }

    fn descriptor_sets_in_use(&self) -> u32 {
        self.descriptor_sets.len() as u32
    }

    // ===== BUFFERS =====

    fn create_buffer(&mut self, usage: BufferUsage, size: u64) -> Result<BufferHandle> {
        Ok(self.buffers.insert(MockBuffer {
            info: BufferInfo { size, usage },
            data: vec![0; size as usize],
        }))
    }

    fn buffer_info(&self, buffer: BufferHandle) -> Result<BufferInfo> {
        Ok(lookup(&self.buffers, buffer, "buffer")?.info)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let buffer = lookup_mut(&mut self.buffers, buffer, "buffer")?;
        let range = checked_range(buffer.info.size, offset, data.len());
        buffer.data[range].copy_from_slice(data);
        Ok(())
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: u64, out: &mut [u8]) -> Result<()> {
        let buffer = lookup(&self.buffers, buffer, "buffer")?;
        let range = checked_range(buffer.info.size, offset, out.len());
        out.copy_from_slice(&buffer.data[range]);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        release(&mut self.buffers, buffer, "buffer").map(|_| ())
    }

    // ===== TEXTURES =====

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        let texture = self.textures.insert(TextureInfo::new(desc));
        self.calls.push(MockCall::CreateTexture(texture));
        Ok(texture)
    }

    fn texture_info(&self, texture: TextureHandle) -> Result<TextureInfo> {
        Ok(*lookup(&self.textures, texture, "texture")?)
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<()> {
        let info = lookup_mut(&mut self.textures, texture, "texture")?;
        info.check_upload(data.len())?;
        info.layout = ImageLayout::Undefined;

        let cb = self.cmd_buffer_one_time_begin()?;
        self.cmd_image_barrier(cb, texture, ImageLayout::TransferDst)?;
        self.record(cb, "copy_buffer_to_image".to_string())?;
        self.cmd_image_barrier(cb, texture, ImageLayout::ShaderReadOnly)?;
        self.cmd_buffer_one_time_end(cb)
    }

    fn create_texture_descriptor(
        &mut self,
        texture: TextureHandle,
        sampler: SamplerHandle,
    ) -> Result<DescriptorSetHandle> {
        lookup(&self.samplers, sampler, "sampler")?;
        let previous = lookup(&self.textures, texture, "texture")?.descriptor_set;
        if let Some(set) = previous {
            self.free_descriptor_set(set)?;
        }
        let layout = match self.texture_set_layout {
            Some(layout) => layout,
            None => {
                let layout = self.create_descriptor_set_layout(&[DescriptorBinding {
                    binding: 0,
                    descriptor_type: DescriptorType::CombinedImageSampler,
                    stages: ShaderStageFlags::FRAGMENT,
                }])?;
                self.texture_set_layout = Some(layout);
                layout
            }
        };
        let set = self.allocate_descriptor_set(layout)?;
        self.write_descriptor_set(set, &[DescriptorWrite {
            binding: 0,
            resource: DescriptorResource::CombinedImageSampler { texture, sampler },
        }])?;
        let info = lookup_mut(&mut self.textures, texture, "texture")?;
        info.descriptor_set = Some(set);
        info.sampler = Some(sampler);
        Ok(set)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<()> {
        let info = release(&mut self.textures, texture, "texture")?;
        if let Some(set) = info.descriptor_set {
            self.free_descriptor_set(set)?;
        }
        self.calls.push(MockCall::DestroyTexture(texture));
        Ok(())
    }

    // ===== SAMPLERS =====

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle> {
        Ok(self.samplers.insert(*desc))
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) -> Result<()> {
        release(&mut self.samplers, sampler, "sampler").map(|_| ())
    }

    // ===== RENDER PASSES / FRAMEBUFFERS =====

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle> {
        let render_pass = self.render_passes.insert(desc.clone());
        self.calls.push(MockCall::CreateRenderPass(render_pass));
        Ok(render_pass)
    }

    fn destroy_render_pass(&mut self, render_pass: RenderPassHandle) -> Result<()> {
        release(&mut self.render_passes, render_pass, "render pass")?;
        self.calls.push(MockCall::DestroyRenderPass(render_pass));
        Ok(())
    }

    fn create_framebuffer(
        &mut self,
        render_pass: RenderPassHandle,
        attachments: &[FramebufferAttachment],
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let desc = lookup(&self.render_passes, render_pass, "render pass")?;
        if desc.attachment_count() != attachments.len() {
            return Err(Error::InvalidResource(format!(
                "Framebuffer has {} attachments, render pass expects {}",
                attachments.len(),
                desc.attachment_count()
            )));
        }
        for attachment in attachments {
            match attachment {
                FramebufferAttachment::Texture(t) => {
                    lookup(&self.textures, *t, "texture")?;
                }
                FramebufferAttachment::SwapchainView(v) => {
                    lookup(&self.image_views, *v, "image view")?;
                }
            }
        }
        let framebuffer = self.framebuffers.insert(MockFramebuffer {
            render_pass,
            attachments: attachments.to_vec(),
            extent,
        });
        self.calls.push(MockCall::CreateFramebuffer(framebuffer, extent));
        Ok(framebuffer)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) -> Result<()> {
        release(&mut self.framebuffers, framebuffer, "framebuffer")?;
        self.calls.push(MockCall::DestroyFramebuffer(framebuffer));
        Ok(())
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &mut self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle> {
        Ok(self.set_layouts.insert(bindings.to_vec()))
    }

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle) -> Result<()> {
        release(&mut self.set_layouts, layout, "descriptor set layout").map(|_| ())
    }

    fn allocate_descriptor_set(
        &mut self,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle> {
        lookup(&self.set_layouts, layout, "descriptor set layout")?;
        if self.descriptor_sets.len() as u32 >= DESCRIPTOR_POOL_MAX_SETS {
            return Err(Error::OutOfMemory);
        }
        Ok(self.descriptor_sets.insert(MockDescriptorSet { layout, writes: Vec::new() }))
    }

    fn write_descriptor_set(
        &mut self,
        set: DescriptorSetHandle,
        writes: &[DescriptorWrite],
    ) -> Result<()> {
        let layout = lookup(&self.descriptor_sets, set, "descriptor set")?.layout;
        let bindings = lookup(&self.set_layouts, layout, "descriptor set layout")?;
        for write in writes {
            let expected = bindings
                .iter()
                .find(|b| b.binding == write.binding)
                .map(|b| b.descriptor_type);
            if expected != Some(write.resource.descriptor_type()) {
                return Err(Error::InvalidResource(format!(
                    "Binding {} does not accept {:?}",
                    write.binding,
                    write.resource.descriptor_type()
                )));
            }
        }
        lookup_mut(&mut self.descriptor_sets, set, "descriptor set")?
            .writes
            .extend_from_slice(writes);
        Ok(())
    }

    fn free_descriptor_set(&mut self, set: DescriptorSetHandle) -> Result<()> {
        release(&mut self.descriptor_sets, set, "descriptor set").map(|_| ())
    }

    // ===== PIPELINES =====

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<PipelineHandle> {
        self.check_shader(&desc.shader)?;
        let samples = lookup(&self.render_passes, desc.render_pass, "render pass")?
            .rasterization_samples();
        let pipeline = self.pipelines.insert(PipelineInfo::Graphics {
            topology: desc.topology,
            samples,
            color_blend: desc.color_blend.resolved(),
            depth_write: desc.depth_write,
        });
        self.calls.push(MockCall::CreatePipeline(pipeline));
        Ok(pipeline)
    }

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<PipelineHandle> {
        self.check_shader(&desc.shader)?;
        let pipeline = self.pipelines.insert(PipelineInfo::Compute);
        self.calls.push(MockCall::CreatePipeline(pipeline));
        Ok(pipeline)
    }

    fn pipeline_info(&self, pipeline: PipelineHandle) -> Result<PipelineInfo> {
        Ok(*lookup(&self.pipelines, pipeline, "pipeline")?)
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) -> Result<()> {
        release(&mut self.pipelines, pipeline, "pipeline")?;
        self.calls.push(MockCall::DestroyPipeline(pipeline));
        Ok(())
    }

    // ===== PRESENTATION =====

    fn create_surface(&mut self, _window: &dyn WindowSource) -> Result<SurfaceHandle> {
        let surface = self.surfaces.insert(());
        self.calls.push(MockCall::CreateSurface(surface));
        Ok(surface)
    }

    fn destroy_surface(&mut self, surface: SurfaceHandle) -> Result<()> {
        release(&mut self.surfaces, surface, "surface")?;
        self.calls.push(MockCall::DestroySurface(surface));
        Ok(())
    }

    fn surface_capabilities(&self, surface: SurfaceHandle) -> Result<SurfaceCapabilities> {
        lookup(&self.surfaces, surface, "surface")?;
        Ok(self.surface_caps)
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<SwapchainHandle> {
        lookup(&self.surfaces, desc.surface, "surface")?;
        if desc.extent.is_empty() {
            return Err(Error::BackendError(format!(
                "Swapchain extent {}x{} is empty",
                desc.extent.width, desc.extent.height
            )));
        }
        if let Some(old) = desc.old_swapchain {
            lookup(&self.swapchains, old, "swapchain")?;
        }
        let swapchain = self.swapchains.insert(MockSwapchain { images: Vec::new(), extent: desc.extent });
        let images: Vec<ImageHandle> = (0..desc.image_count)
            .map(|_| self.images.insert(swapchain))
            .collect();
        if let Some(entry) = self.swapchains.get_mut(swapchain) {
            entry.images = images;
        }
        self.calls.push(MockCall::CreateSwapchain {
            swapchain,
            old_swapchain: desc.old_swapchain,
            image_count: desc.image_count,
            extent: desc.extent,
        });
        Ok(swapchain)
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) -> Result<()> {
        let entry = release(&mut self.swapchains, swapchain, "swapchain")?;
        for image in entry.images {
            self.images.remove(image);
        }
        self.calls.push(MockCall::DestroySwapchain(swapchain));
        Ok(())
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        Ok(lookup(&self.swapchains, swapchain, "swapchain")?.images.clone())
    }

    fn create_image_view(&mut self, image: ImageHandle) -> Result<ImageViewHandle> {
        lookup(&self.images, image, "image")?;
        let view = self.image_views.insert(image);
        self.calls.push(MockCall::CreateImageView(view));
        Ok(view)
    }

    fn destroy_image_view(&mut self, view: ImageViewHandle) -> Result<()> {
        release(&mut self.image_views, view, "image view")?;
        self.calls.push(MockCall::DestroyImageView(view));
        Ok(())
    }

    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
    ) -> Result<u32> {
        lookup(&self.semaphores, signal, "semaphore")?;
        let count = lookup(&self.swapchains, swapchain, "swapchain")?.images.len() as u32;
        let index = self.next_image % count.max(1);
        self.next_image = self.next_image.wrapping_add(1);
        self.calls.push(MockCall::AcquireNextImage(index));
        Ok(index)
    }

    fn present(
        &mut self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: &[SemaphoreHandle],
    ) -> Result<()> {
        let count = lookup(&self.swapchains, swapchain, "swapchain")?.images.len() as u32;
        if image_index >= count {
            return Err(Error::InvalidResource(format!("Image index {} out of range", image_index)));
        }
        for semaphore in wait {
            lookup(&self.semaphores, *semaphore, "semaphore")?;
        }
        self.calls.push(MockCall::Present(image_index));
        Ok(())
    }

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&mut self) -> Result<SemaphoreHandle> {
        Ok(self.semaphores.insert(()))
    }

    fn destroy_semaphore(&mut self, semaphore: SemaphoreHandle) -> Result<()> {
        release(&mut self.semaphores, semaphore, "semaphore").map(|_| ())
    }

    fn create_fence(&mut self) -> Result<FenceHandle> {
        Ok(self.fences.insert(false))
    }

    fn wait_for_fence(&mut self, fence: FenceHandle) -> Result<()> {
        let signaled = lookup_mut(&mut self.fences, fence, "fence")?;
        if !*signaled {
            return Err(Error::BackendError("Waiting on a fence nothing will signal".to_string()));
        }
        *signaled = false;
        self.calls.push(MockCall::WaitForFence(fence));
        Ok(())
    }

    fn destroy_fence(&mut self, fence: FenceHandle) -> Result<()> {
        release(&mut self.fences, fence, "fence").map(|_| ())
    }

    fn device_wait_idle(&self) -> Result<()> {
        Ok(())
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffer(&mut self) -> Result<CommandBufferHandle> {
        let command_buffer = self.command_buffers.insert(MockCommandBuffer::default());
        self.calls.push(MockCall::AllocateCommandBuffer(command_buffer));
        Ok(command_buffer)
    }

    fn free_command_buffer(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        release(&mut self.command_buffers, command_buffer, "command buffer")?;
        self.calls.push(MockCall::FreeCommandBuffer(command_buffer));
        Ok(())
    }

    fn cmd_buffer_begin(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        let cb = lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?;
        if cb.recording {
            return Err(Error::BackendError("Command buffer already recording".to_string()));
        }
        cb.recording = true;
        cb.commands.clear();
        cb.commands.push("begin".to_string());
        Ok(())
    }

    fn cmd_buffer_end(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        let cb = lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?;
        if !cb.recording {
            return Err(Error::BackendError("Command buffer not recording".to_string()));
        }
        if cb.in_render_pass {
            return Err(Error::BackendError("Cannot end command buffer inside a render pass".to_string()));
        }
        cb.recording = false;
        cb.commands.push("end".to_string());
        Ok(())
    }

    fn cmd_buffer_one_time_begin(&mut self) -> Result<CommandBufferHandle> {
        let command_buffer = self.command_buffers.insert(MockCommandBuffer {
            one_time: true,
            ..Default::default()
        });
        self.cmd_buffer_begin(command_buffer)?;
        Ok(command_buffer)
    }

    fn cmd_buffer_one_time_end(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        self.cmd_buffer_end(command_buffer)?;
        release(&mut self.command_buffers, command_buffer, "command buffer").map(|_| ())
    }

    fn cmd_buffer_submit(
        &mut self,
        command_buffer: Option<CommandBufferHandle>,
        wait: &[SemaphoreWait],
        signal: &[SemaphoreHandle],
        fence: Option<FenceHandle>,
    ) -> Result<()> {
        if let Some(cb) = command_buffer {
            if lookup(&self.command_buffers, cb, "command buffer")?.recording {
                return Err(Error::BackendError("Submitting a command buffer still recording".to_string()));
            }
        }
        if let Some(fence) = fence {
            *lookup_mut(&mut self.fences, fence, "fence")? = true;
        }
        self.calls.push(MockCall::Submit {
            command_buffer,
            wait: wait.to_vec(),
            signal: signal.to_vec(),
            fence,
        });
        Ok(())
    }

    // ===== RECORDING =====

    fn cmd_begin_render_pass(
        &mut self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        _clear_values: &[ClearValue],
    ) -> Result<()> {
        lookup(&self.render_passes, render_pass, "render pass")?;
        lookup(&self.framebuffers, framebuffer, "framebuffer")?;
        let cb = lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?;
        if cb.in_render_pass {
            return Err(Error::BackendError("Render pass already begun".to_string()));
        }
        self.record(command_buffer, format!("begin_render_pass {}x{}", extent.width, extent.height))?;
        let cb = lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?;
        cb.in_render_pass = true;
        cb.framebuffer = Some(framebuffer);
        Ok(())
    }

    fn cmd_end_render_pass(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        self.record_in_pass(command_buffer, "end_render_pass".to_string())?;
        let cb = lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?;
        cb.in_render_pass = false;
        let framebuffer = cb.framebuffer.take();

        // Attachments end the pass in their final layouts
        if let Some(fb) = framebuffer.and_then(|fb| self.framebuffers.get(fb)) {
            if let Some(desc) = self.render_passes.get(fb.render_pass) {
                let final_layouts = desc
                    .color_attachments
                    .iter()
                    .chain(desc.depth_attachment.iter())
                    .chain(desc.resolve_attachment.iter())
                    .map(|a| a.final_layout);
                for (attachment, layout) in fb.attachments.iter().zip(final_layouts) {
                    if let FramebufferAttachment::Texture(texture) = attachment {
                        if let Some(info) = self.textures.get_mut(*texture) {
                            info.layout = layout;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn cmd_bind_pipeline(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
    ) -> Result<()> {
        let bind_point = lookup(&self.pipelines, pipeline, "pipeline")?.bind_point();
        self.record(command_buffer, format!("bind_pipeline {:?}", bind_point))
    }

    fn cmd_bind_vertex_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
    ) -> Result<()> {
        lookup(&self.buffers, buffer, "buffer")?;
        self.record(command_buffer, format!("bind_vertex_buffer {}", offset))
    }

    fn cmd_bind_index_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()> {
        lookup(&self.buffers, buffer, "buffer")?;
        self.record(command_buffer, format!("bind_index_buffer {} {:?}", offset, index_type))
    }

    fn cmd_draw(
        &mut self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) -> Result<()> {
        self.record_in_pass(command_buffer, format!("draw {} {}", vertex_count, instance_count))
    }

    fn cmd_draw_indexed(
        &mut self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        _first_index: u32,
        _vertex_offset: i32,
        _first_instance: u32,
    ) -> Result<()> {
        self.record_in_pass(command_buffer, format!("draw_indexed {} {}", index_count, instance_count))
    }

    fn cmd_dispatch(
        &mut self,
        command_buffer: CommandBufferHandle,
        group_count_x: u32,
        group_count_y: u32,
        group_count_z: u32,
    ) -> Result<()> {
        self.record(command_buffer, format!("dispatch {} {} {}", group_count_x, group_count_y, group_count_z))
    }

    fn cmd_bind_descriptor_set(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
        set_index: u32,
        set: DescriptorSetHandle,
    ) -> Result<()> {
        lookup(&self.pipelines, pipeline, "pipeline")?;
        lookup(&self.descriptor_sets, set, "descriptor set")?;
        self.record(command_buffer, format!("bind_descriptor_set {}", set_index))
    }

    fn cmd_set_viewport_scissor(
        &mut self,
        command_buffer: CommandBufferHandle,
        x: i32,
        y: i32,
        extent: Extent2D,
    ) -> Result<()> {
        self.record(command_buffer, format!("set_viewport_scissor {} {} {}x{}", x, y, extent.width, extent.height))
    }

    fn cmd_push_constants(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
        _stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        lookup(&self.pipelines, pipeline, "pipeline")?;
        self.record(command_buffer, format!("push_constants {} {}", offset, data.len()))
    }

    fn cmd_image_barrier(
        &mut self,
        command_buffer: CommandBufferHandle,
        texture: TextureHandle,
        new_layout: ImageLayout,
    ) -> Result<()> {
        let old_layout = lookup(&self.textures, texture, "texture")?.layout;
        self.record(command_buffer, format!("barrier {:?}->{:?}", old_layout, new_layout))?;
        lookup_mut(&mut self.textures, texture, "texture")?.layout = new_layout;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_render_device_tests.rs"]
mod tests;
