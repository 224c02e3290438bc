/// VulkanRenderDevice - RenderDevice implementation on top of a DeviceContext
///
/// Every native object lives in a slot map keyed by the handle handed out to
/// callers, so a destroyed handle can never reach the driver. Work is
/// synchronous: one-time command buffers and presents wait for the queue to
/// go idle before returning.

use ash::vk;
use nebula_3d_engine::nebula3d::{Error, Result};
use nebula_3d_engine::nebula3d::render::*;
use nebula_3d_engine::{engine_bail, engine_debug, engine_err, engine_info, engine_warn};
use slotmap::{Key, SlotMap};
use std::path::PathBuf;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::DeviceContext;
use crate::vulkan_format::{
    descriptor_type_to_vk, image_layout_to_vk, index_type_to_vk, layout_access_and_stage,
    shader_stage_flags_to_vk, vk_to_surface_capabilities, wait_stage_to_vk,
};
use crate::vulkan_pipeline::{self, GraphicsTarget, Pipeline};
use crate::vulkan_render_pass::{self, final_layouts, Framebuffer, RenderPass};
use crate::vulkan_sampler;
use crate::vulkan_swapchain::{self, Swapchain};
use crate::vulkan_texture::{subresource_range, Texture};

const SOURCE: &str = "nebula3d::vulkan::RenderDevice";

/// Binding of the combined image sampler set every texture descriptor uses
const TEXTURE_BINDING: DescriptorBinding = DescriptorBinding {
    binding: 0,
    descriptor_type: DescriptorType::CombinedImageSampler,
    stages: ShaderStageFlags::FRAGMENT,
};

struct SwapchainImage {
    image: vk::Image,
    format: vk::Format,
}

struct SetLayout {
    layout: vk::DescriptorSetLayout,
    bindings: Vec<DescriptorBinding>,
}

struct DescriptorSet {
    set: vk::DescriptorSet,
    /// Bindings of the layout the set was allocated with
    bindings: Vec<DescriptorBinding>,
}

struct CommandBuffer {
    buffer: vk::CommandBuffer,
    recording: bool,
    /// Framebuffer of the render pass being recorded
    framebuffer: Option<FramebufferHandle>,
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

fn clear_value_to_vk(value: &ClearValue) -> vk::ClearValue {
    match *value {
        ClearValue::Color(float32) => vk::ClearValue {
            color: vk::ClearColorValue { float32 },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

/// Vulkan render device
pub struct VulkanRenderDevice {
    shader_directory: PathBuf,
    descriptor_pool: vk::DescriptorPool,
    texture_set_layout: vk::DescriptorSetLayout,

    buffers: SlotMap<BufferHandle, Buffer>,
    textures: SlotMap<TextureHandle, Texture>,
    samplers: SlotMap<SamplerHandle, vk::Sampler>,
    render_passes: SlotMap<RenderPassHandle, RenderPass>,
    framebuffers: SlotMap<FramebufferHandle, Framebuffer>,
    set_layouts: SlotMap<DescriptorSetLayoutHandle, SetLayout>,
    descriptor_sets: SlotMap<DescriptorSetHandle, DescriptorSet>,
    pipelines: SlotMap<PipelineHandle, Pipeline>,
    surfaces: SlotMap<SurfaceHandle, vk::SurfaceKHR>,
    swapchains: SlotMap<SwapchainHandle, Swapchain>,
    images: SlotMap<ImageHandle, SwapchainImage>,
    image_views: SlotMap<ImageViewHandle, vk::ImageView>,
    semaphores: SlotMap<SemaphoreHandle, vk::Semaphore>,
    fences: SlotMap<FenceHandle, vk::Fence>,
    command_buffers: SlotMap<CommandBufferHandle, CommandBuffer>,

    /// Dropped after every resource above (see `Drop`)
    context: DeviceContext,
}

impl VulkanRenderDevice {
    /// Bring up Vulkan for `window` and create the shared descriptor pool
    pub fn new(window: &dyn WindowSource, config: &Config) -> Result<Self> {
        let context = DeviceContext::new(window, config)?;

        let (descriptor_pool, texture_set_layout) = unsafe {
            let pool_sizes = [
                DescriptorType::UniformBuffer,
                DescriptorType::StorageBuffer,
                DescriptorType::CombinedImageSampler,
            ]
            .map(|ty| vk::DescriptorPoolSize {
                ty: descriptor_type_to_vk(ty),
                descriptor_count: DESCRIPTOR_POOL_DESCRIPTORS_PER_TYPE,
            });
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
                .max_sets(DESCRIPTOR_POOL_MAX_SETS)
                .pool_sizes(&pool_sizes);
            let descriptor_pool = context.device().create_descriptor_pool(&pool_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create descriptor pool: {:?}", e))?;

            let texture_set_layout = match create_set_layout(context.device(), &[TEXTURE_BINDING]) {
                Ok(layout) => layout,
                Err(e) => {
                    context.device().destroy_descriptor_pool(descriptor_pool, None);
                    return Err(e);
                }
            };

            (descriptor_pool, texture_set_layout)
        };

        engine_info!(SOURCE, "Render device ready, shaders from '{}'", config.shader_directory);

        Ok(Self {
            shader_directory: PathBuf::from(&config.shader_directory),
            descriptor_pool,
            texture_set_layout,
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
            context,
        })
    }

    /// Underlying context (instance, device, queue, allocator)
    pub fn context(&self) -> &DeviceContext {
        &self.context
    }

    fn device(&self) -> &ash::Device {
        self.context.device()
    }

    /// Native buffer of a command buffer that is currently recording
    fn recording(&self, command_buffer: CommandBufferHandle) -> Result<vk::CommandBuffer> {
        let cb = lookup(&self.command_buffers, command_buffer, "command buffer")?;
        if !cb.recording {
            engine_bail!(SOURCE, "Command buffer not recording");
        }
        Ok(cb.buffer)
    }

    fn pipeline(&self, pipeline: PipelineHandle) -> Result<&Pipeline> {
        lookup(&self.pipelines, pipeline, "pipeline")
    }

    fn native_set_layouts(&self, handles: &[DescriptorSetLayoutHandle]) -> Result<Vec<vk::DescriptorSetLayout>> {
        handles
            .iter()
            .map(|h| lookup(&self.set_layouts, *h, "descriptor set layout").map(|l| l.layout))
            .collect()
    }

    fn allocate_set(&mut self, layout: vk::DescriptorSetLayout, bindings: Vec<DescriptorBinding>) -> Result<DescriptorSetHandle> {
        if self.descriptor_sets.len() as u32 >= DESCRIPTOR_POOL_MAX_SETS {
            engine_warn!(SOURCE, "Descriptor pool exhausted ({} sets)", DESCRIPTOR_POOL_MAX_SETS);
            return Err(Error::OutOfMemory);
        }

        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(&layouts);

        let sets = unsafe { self.device().allocate_descriptor_sets(&alloc_info) };
        match sets {
            Ok(sets) => Ok(self.descriptor_sets.insert(DescriptorSet { set: sets[0], bindings })),
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                engine_warn!(SOURCE, "Descriptor pool out of memory");
                Err(Error::OutOfMemory)
            }
            Err(e) => Err(engine_err!(SOURCE, "Failed to allocate descriptor set: {:?}", e)),
        }
    }

    /// Copy `staging` into the texture, leaving it in `ShaderReadOnly`
    fn upload_texture(&mut self, texture: TextureHandle, staging: vk::Buffer) -> Result<()> {
        let cb = self.cmd_buffer_one_time_begin()?;
        self.cmd_image_barrier(cb, texture, ImageLayout::TransferDst)?;

        let native_cb = self.recording(cb)?;
        let target = lookup(&self.textures, texture, "texture")?;
        let region = vk::BufferImageCopy::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: subresource_range(&target.info).aspect_mask,
                mip_level: 0,
                base_array_layer: 0,
                layer_count: 1,
            })
            .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
            .image_extent(vk::Extent3D {
                width: target.info.width,
                height: target.info.height,
                depth: 1,
            });
        unsafe {
            self.device().cmd_copy_buffer_to_image(
                native_cb,
                staging,
                target.image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
        }

        self.cmd_image_barrier(cb, texture, ImageLayout::ShaderReadOnly)?;
        self.cmd_buffer_one_time_end(cb)
    }
}

fn create_set_layout(device: &ash::Device, bindings: &[DescriptorBinding]) -> Result<vk::DescriptorSetLayout> {
    let native: Vec<vk::DescriptorSetLayoutBinding> = bindings
        .iter()
        .map(|b| vk::DescriptorSetLayoutBinding::default()
            .binding(b.binding)
            .descriptor_type(descriptor_type_to_vk(b.descriptor_type))
            .descriptor_count(1)
            .stage_flags(shader_stage_flags_to_vk(b.stages)))
        .collect();
    let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&native);

    unsafe {
        device.create_descriptor_set_layout(&create_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create descriptor set layout: {:?}", e))
    }
}

impl RenderDevice for VulkanRenderDevice {
    // ===== QUERIES =====

    fn sample_count(&self) -> SampleCount {
        self.context.sample_count()
    }

    fn surface_format(&self) -> SurfaceFormat {
        self.context.surface_format()
    }

    fn find_supported_depth_format(&self) -> Result<TextureFormat> {
        self.context
            .find_supported_depth_format()
            .ok_or_else(|| engine_err!(SOURCE, "No supported depth format"))
    }

    fn descriptor_sets_in_use(&self) -> u32 {
        self.descriptor_sets.len() as u32
    }

    // ===== BUFFERS =====

    fn create_buffer(&mut self, usage: BufferUsage, size: u64) -> Result<BufferHandle> {
        let buffer = Buffer::new(&mut self.context, usage, size)?;
        Ok(self.buffers.insert(buffer))
    }

    fn buffer_info(&self, buffer: BufferHandle) -> Result<BufferInfo> {
        Ok(lookup(&self.buffers, buffer, "buffer")?.info)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        lookup_mut(&mut self.buffers, buffer, "buffer")?.write(offset, data)
    }

    fn read_buffer(&self, buffer: BufferHandle, offset: u64, out: &mut [u8]) -> Result<()> {
        lookup(&self.buffers, buffer, "buffer")?.read(offset, out)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) -> Result<()> {
        release(&mut self.buffers, buffer, "buffer")?.destroy(&mut self.context);
        Ok(())
    }

    // ===== TEXTURES =====

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        let texture = Texture::new(&mut self.context, desc)?;
        Ok(self.textures.insert(texture))
    }

    fn texture_info(&self, texture: TextureHandle) -> Result<TextureInfo> {
        Ok(lookup(&self.textures, texture, "texture")?.info)
    }

    fn write_texture(&mut self, texture: TextureHandle, data: &[u8]) -> Result<()> {
        let info = &mut lookup_mut(&mut self.textures, texture, "texture")?.info;
        info.check_upload(data.len())?;
        // Previous contents are discarded
        info.layout = ImageLayout::Undefined;

        let mut staging = Buffer::new(&mut self.context, BufferUsage::Staging, data.len() as u64)?;
        let result = match staging.write(0, data) {
            Ok(()) => self.upload_texture(texture, staging.buffer),
            Err(e) => Err(e),
        };
        staging.destroy(&mut self.context);
        result
    }

    fn create_texture_descriptor(
        &mut self,
        texture: TextureHandle,
        sampler: SamplerHandle,
    ) -> Result<DescriptorSetHandle> {
        lookup(&self.samplers, sampler, "sampler")?;
        let previous = lookup(&self.textures, texture, "texture")?.info.descriptor_set;
        if let Some(set) = previous {
            self.free_descriptor_set(set)?;
            lookup_mut(&mut self.textures, texture, "texture")?.info.descriptor_set = None;
        }

        let set = self.allocate_set(self.texture_set_layout, vec![TEXTURE_BINDING])?;
        self.write_descriptor_set(set, &[DescriptorWrite {
            binding: 0,
            resource: DescriptorResource::CombinedImageSampler { texture, sampler },
        }])?;

        let info = &mut lookup_mut(&mut self.textures, texture, "texture")?.info;
        info.descriptor_set = Some(set);
        info.sampler = Some(sampler);
        Ok(set)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) -> Result<()> {
        let texture = release(&mut self.textures, texture, "texture")?;
        if let Some(set) = texture.info.descriptor_set {
            if let Err(e) = self.free_descriptor_set(set) {
                engine_warn!(SOURCE, "Texture descriptor set already gone: {}", e);
            }
        }
        texture.destroy(&mut self.context);
        Ok(())
    }

    // ===== SAMPLERS =====

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerHandle> {
        let sampler = vulkan_sampler::create_sampler(&self.context, desc)?;
        Ok(self.samplers.insert(sampler))
    }

    fn destroy_sampler(&mut self, sampler: SamplerHandle) -> Result<()> {
        let sampler = release(&mut self.samplers, sampler, "sampler")?;
        unsafe { self.device().destroy_sampler(sampler, None) };
        Ok(())
    }

    // ===== RENDER PASSES / FRAMEBUFFERS =====

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle> {
        let render_pass = vulkan_render_pass::create_render_pass(self.device(), desc)?;
        Ok(self.render_passes.insert(RenderPass {
            render_pass,
            desc: desc.clone(),
        }))
    }

    fn destroy_render_pass(&mut self, render_pass: RenderPassHandle) -> Result<()> {
        let render_pass = release(&mut self.render_passes, render_pass, "render pass")?;
        unsafe { self.device().destroy_render_pass(render_pass.render_pass, None) };
        Ok(())
    }

    fn create_framebuffer(
        &mut self,
        render_pass: RenderPassHandle,
        attachments: &[FramebufferAttachment],
        extent: Extent2D,
    ) -> Result<FramebufferHandle> {
        let pass = lookup(&self.render_passes, render_pass, "render pass")?;
        if pass.desc.attachment_count() != attachments.len() {
            return Err(Error::InvalidResource(format!(
                "Framebuffer has {} attachments, render pass expects {}",
                attachments.len(),
                pass.desc.attachment_count()
            )));
        }

        let views = attachments
            .iter()
            .map(|attachment| match attachment {
                FramebufferAttachment::Texture(t) => lookup(&self.textures, *t, "texture").map(|t| t.view),
                FramebufferAttachment::SwapchainView(v) => lookup(&self.image_views, *v, "image view").copied(),
            })
            .collect::<Result<Vec<_>>>()?;

        let framebuffer = vulkan_render_pass::create_framebuffer(self.device(), pass.render_pass, &views, extent)?;
        Ok(self.framebuffers.insert(Framebuffer {
            framebuffer,
            render_pass,
            attachments: attachments.to_vec(),
        }))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) -> Result<()> {
        let framebuffer = release(&mut self.framebuffers, framebuffer, "framebuffer")?;
        unsafe { self.device().destroy_framebuffer(framebuffer.framebuffer, None) };
        Ok(())
    }

    // ===== DESCRIPTORS =====

    fn create_descriptor_set_layout(
        &mut self,
        bindings: &[DescriptorBinding],
    ) -> Result<DescriptorSetLayoutHandle> {
        let layout = create_set_layout(self.device(), bindings)?;
        Ok(self.set_layouts.insert(SetLayout {
            layout,
            bindings: bindings.to_vec(),
        }))
    }

    fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle) -> Result<()> {
        let layout = release(&mut self.set_layouts, layout, "descriptor set layout")?;
        unsafe { self.device().destroy_descriptor_set_layout(layout.layout, None) };
        Ok(())
    }

    fn allocate_descriptor_set(
        &mut self,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle> {
        let layout = lookup(&self.set_layouts, layout, "descriptor set layout")?;
        let (native, bindings) = (layout.layout, layout.bindings.clone());
        self.allocate_set(native, bindings)
    }

    fn write_descriptor_set(
        &mut self,
        set: DescriptorSetHandle,
        writes: &[DescriptorWrite],
    ) -> Result<()> {
        let target = lookup(&self.descriptor_sets, set, "descriptor set")?;

        // Resolve every resource first so the native writes can borrow them
        let mut buffer_infos = Vec::new();
        let mut image_infos = Vec::new();
        for write in writes {
            let expected = target.bindings
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

            match write.resource {
                DescriptorResource::UniformBuffer { buffer, offset, range }
                | DescriptorResource::StorageBuffer { buffer, offset, range } => {
                    let buffer = lookup(&self.buffers, buffer, "buffer")?;
                    buffer_infos.push([vk::DescriptorBufferInfo {
                        buffer: buffer.buffer,
                        offset,
                        range,
                    }]);
                }
                DescriptorResource::CombinedImageSampler { texture, sampler } => {
                    let texture = lookup(&self.textures, texture, "texture")?;
                    let sampler = *lookup(&self.samplers, sampler, "sampler")?;
                    image_infos.push([vk::DescriptorImageInfo {
                        sampler,
                        image_view: texture.view,
                        image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    }]);
                }
            }
        }

        let mut next_buffer = buffer_infos.iter();
        let mut next_image = image_infos.iter();
        let mut native_writes = Vec::with_capacity(writes.len());
        for write in writes {
            let native = vk::WriteDescriptorSet::default()
                .dst_set(target.set)
                .dst_binding(write.binding)
                .dst_array_element(0)
                .descriptor_type(descriptor_type_to_vk(write.resource.descriptor_type()));
            let native = match write.resource {
                DescriptorResource::CombinedImageSampler { .. } => match next_image.next() {
                    Some(info) => native.image_info(info),
                    None => continue,
                },
                _ => match next_buffer.next() {
                    Some(info) => native.buffer_info(info),
                    None => continue,
                },
            };
            native_writes.push(native);
        }

        unsafe { self.device().update_descriptor_sets(&native_writes, &[]) };
        Ok(())
    }

    fn free_descriptor_set(&mut self, set: DescriptorSetHandle) -> Result<()> {
        let set = release(&mut self.descriptor_sets, set, "descriptor set")?;
        unsafe {
            self.device()
                .free_descriptor_sets(self.descriptor_pool, &[set.set])
                .map_err(|e| engine_err!(SOURCE, "Failed to free descriptor set: {:?}", e))
        }
    }

    // ===== PIPELINES =====

    fn create_graphics_pipeline(&mut self, desc: &GraphicsPipelineDesc) -> Result<PipelineHandle> {
        let pass = lookup(&self.render_passes, desc.render_pass, "render pass")?;
        let (render_pass, samples) = (pass.render_pass, pass.desc.rasterization_samples());
        let set_layouts = self.native_set_layouts(&desc.set_layouts)?;
        let target = GraphicsTarget {
            render_pass,
            samples,
            wide_lines: self.context.supports_wide_lines(),
            line_width_range: self.context.properties().limits.line_width_range,
        };

        let pipeline = vulkan_pipeline::create_graphics_pipeline(
            self.device(),
            &self.shader_directory,
            desc,
            &target,
            &set_layouts,
        )?;
        engine_debug!(SOURCE, "Graphics pipeline '{}' created", desc.shader);
        Ok(self.pipelines.insert(pipeline))
    }

    fn create_compute_pipeline(&mut self, desc: &ComputePipelineDesc) -> Result<PipelineHandle> {
        let set_layouts = self.native_set_layouts(&desc.set_layouts)?;
        let pipeline = vulkan_pipeline::create_compute_pipeline(
            self.device(),
            &self.shader_directory,
            desc,
            &set_layouts,
        )?;
        engine_debug!(SOURCE, "Compute pipeline '{}' created", desc.shader);
        Ok(self.pipelines.insert(pipeline))
    }

    fn pipeline_info(&self, pipeline: PipelineHandle) -> Result<PipelineInfo> {
        Ok(self.pipeline(pipeline)?.info)
    }

    fn destroy_pipeline(&mut self, pipeline: PipelineHandle) -> Result<()> {
        release(&mut self.pipelines, pipeline, "pipeline")?.destroy(self.context.device());
        Ok(())
    }

    // ===== PRESENTATION =====

    fn create_surface(&mut self, window: &dyn WindowSource) -> Result<SurfaceHandle> {
        let surface = self.context.create_surface(window)?;
        Ok(self.surfaces.insert(surface))
    }

    fn destroy_surface(&mut self, surface: SurfaceHandle) -> Result<()> {
        let surface = release(&mut self.surfaces, surface, "surface")?;
        unsafe { self.context.surface_loader().destroy_surface(surface, None) };
        Ok(())
    }

    fn surface_capabilities(&self, surface: SurfaceHandle) -> Result<SurfaceCapabilities> {
        let surface = *lookup(&self.surfaces, surface, "surface")?;
        let capabilities = unsafe {
            self.context.surface_loader()
                .get_physical_device_surface_capabilities(self.context.physical_device(), surface)
                .map_err(|e| engine_err!(SOURCE, "Failed to query surface capabilities: {:?}", e))?
        };
        Ok(vk_to_surface_capabilities(&capabilities))
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<SwapchainHandle> {
        let surface = *lookup(&self.surfaces, desc.surface, "surface")?;
        let old_swapchain = match desc.old_swapchain {
            Some(old) => lookup(&self.swapchains, old, "swapchain")?.swapchain,
            None => vk::SwapchainKHR::null(),
        };

        let (native, native_images) = vulkan_swapchain::create_swapchain(&self.context, desc, surface, old_swapchain)?;
        let format = crate::vulkan_format::texture_format_to_vk(desc.format.format);
        let images = native_images
            .into_iter()
            .map(|image| self.images.insert(SwapchainImage { image, format }))
            .collect();

        Ok(self.swapchains.insert(Swapchain {
            swapchain: native,
            images,
        }))
    }

    fn destroy_swapchain(&mut self, swapchain: SwapchainHandle) -> Result<()> {
        let swapchain = release(&mut self.swapchains, swapchain, "swapchain")?;
        for image in &swapchain.images {
            self.images.remove(*image);
        }
        unsafe {
            self.context.swapchain_loader().destroy_swapchain(swapchain.swapchain, None);
        }
        Ok(())
    }

    fn swapchain_images(&self, swapchain: SwapchainHandle) -> Result<Vec<ImageHandle>> {
        Ok(lookup(&self.swapchains, swapchain, "swapchain")?.images.clone())
    }

    fn create_image_view(&mut self, image: ImageHandle) -> Result<ImageViewHandle> {
        let image = lookup(&self.images, image, "image")?;
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image.image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(image.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = unsafe {
            self.device().create_image_view(&create_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create swapchain image view: {:?}", e))?
        };
        Ok(self.image_views.insert(view))
    }

    fn destroy_image_view(&mut self, view: ImageViewHandle) -> Result<()> {
        let view = release(&mut self.image_views, view, "image view")?;
        unsafe { self.device().destroy_image_view(view, None) };
        Ok(())
    }

    fn acquire_next_image(
        &mut self,
        swapchain: SwapchainHandle,
        signal: SemaphoreHandle,
    ) -> Result<u32> {
        let signal = *lookup(&self.semaphores, signal, "semaphore")?;
        let swapchain = lookup(&self.swapchains, swapchain, "swapchain")?.swapchain;
        vulkan_swapchain::acquire_next_image(&self.context, swapchain, signal)
    }

    fn present(
        &mut self,
        swapchain: SwapchainHandle,
        image_index: u32,
        wait: &[SemaphoreHandle],
    ) -> Result<()> {
        let entry = lookup(&self.swapchains, swapchain, "swapchain")?;
        if image_index as usize >= entry.images.len() {
            return Err(Error::InvalidResource(format!("Image index {} out of range", image_index)));
        }
        let wait = wait
            .iter()
            .map(|s| lookup(&self.semaphores, *s, "semaphore").copied())
            .collect::<Result<Vec<_>>>()?;
        vulkan_swapchain::present(&self.context, entry.swapchain, image_index, &wait)
    }

    // ===== SYNCHRONIZATION =====

    fn create_semaphore(&mut self) -> Result<SemaphoreHandle> {
        let semaphore = unsafe {
            self.device()
                .create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create semaphore: {:?}", e))?
        };
        Ok(self.semaphores.insert(semaphore))
    }

    fn destroy_semaphore(&mut self, semaphore: SemaphoreHandle) -> Result<()> {
        let semaphore = release(&mut self.semaphores, semaphore, "semaphore")?;
        unsafe { self.device().destroy_semaphore(semaphore, None) };
        Ok(())
    }

    fn create_fence(&mut self) -> Result<FenceHandle> {
        let fence = unsafe {
            self.device()
                .create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create fence: {:?}", e))?
        };
        Ok(self.fences.insert(fence))
    }

    fn wait_for_fence(&mut self, fence: FenceHandle) -> Result<()> {
        let fence = *lookup(&self.fences, fence, "fence")?;
        unsafe {
            self.device()
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| engine_err!(SOURCE, "Failed to wait for fence: {:?}", e))?;
            self.device()
                .reset_fences(&[fence])
                .map_err(|e| engine_err!(SOURCE, "Failed to reset fence: {:?}", e))
        }
    }

    fn destroy_fence(&mut self, fence: FenceHandle) -> Result<()> {
        let fence = release(&mut self.fences, fence, "fence")?;
        unsafe { self.device().destroy_fence(fence, None) };
        Ok(())
    }

    fn device_wait_idle(&self) -> Result<()> {
        unsafe {
            self.device()
                .device_wait_idle()
                .map_err(|e| engine_err!(SOURCE, "Failed to wait for device idle: {:?}", e))
        }
    }

    // ===== COMMAND BUFFERS =====

    fn allocate_command_buffer(&mut self) -> Result<CommandBufferHandle> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.context.command_pool())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe {
            self.device()
                .allocate_command_buffers(&alloc_info)
                .map_err(|e| engine_err!(SOURCE, "Failed to allocate command buffer: {:?}", e))?
        };
        Ok(self.command_buffers.insert(CommandBuffer {
            buffer: buffers[0],
            recording: false,
            framebuffer: None,
        }))
    }

    fn free_command_buffer(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        let cb = release(&mut self.command_buffers, command_buffer, "command buffer")?;
        unsafe {
            self.device().free_command_buffers(self.context.command_pool(), &[cb.buffer]);
        }
        Ok(())
    }

    fn cmd_buffer_begin(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        let cb = lookup(&self.command_buffers, command_buffer, "command buffer")?;
        if cb.recording {
            engine_bail!(SOURCE, "Command buffer already recording");
        }
        let buffer = cb.buffer;

        unsafe {
            self.device()
                .reset_command_buffer(buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!(SOURCE, "Failed to reset command buffer: {:?}", e))?;
            self.device()
                .begin_command_buffer(buffer, &vk::CommandBufferBeginInfo::default())
                .map_err(|e| engine_err!(SOURCE, "Failed to begin command buffer: {:?}", e))?;
        }

        lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?.recording = true;
        Ok(())
    }

    fn cmd_buffer_end(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        let cb = lookup(&self.command_buffers, command_buffer, "command buffer")?;
        if !cb.recording {
            engine_bail!(SOURCE, "Command buffer not recording");
        }
        if cb.framebuffer.is_some() {
            engine_bail!(SOURCE, "Cannot end command buffer inside a render pass");
        }
        let buffer = cb.buffer;

        unsafe {
            self.device()
                .end_command_buffer(buffer)
                .map_err(|e| engine_err!(SOURCE, "Failed to end command buffer: {:?}", e))?;
        }

        lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?.recording = false;
        Ok(())
    }

    fn cmd_buffer_one_time_begin(&mut self) -> Result<CommandBufferHandle> {
        let command_buffer = self.allocate_command_buffer()?;
        let buffer = lookup(&self.command_buffers, command_buffer, "command buffer")?.buffer;

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        let begun = unsafe { self.device().begin_command_buffer(buffer, &begin_info) };
        if let Err(e) = begun {
            self.free_command_buffer(command_buffer)?;
            engine_bail!(SOURCE, "Failed to begin one-time command buffer: {:?}", e);
        }

        lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?.recording = true;
        Ok(command_buffer)
    }

    fn cmd_buffer_one_time_end(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        let ended = self.cmd_buffer_end(command_buffer);
        let submitted = ended.and_then(|()| {
            let buffers = [lookup(&self.command_buffers, command_buffer, "command buffer")?.buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&buffers);
            unsafe {
                self.device()
                    .queue_submit(self.context.queue(), &[submit_info], vk::Fence::null())
                    .map_err(|e| engine_err!(SOURCE, "Failed to submit one-time command buffer: {:?}", e))?;
                self.device()
                    .queue_wait_idle(self.context.queue())
                    .map_err(|e| engine_err!(SOURCE, "Failed to wait for queue idle: {:?}", e))
            }
        });
        self.free_command_buffer(command_buffer)?;
        submitted
    }

    fn cmd_buffer_submit(
        &mut self,
        command_buffer: Option<CommandBufferHandle>,
        wait: &[SemaphoreWait],
        signal: &[SemaphoreHandle],
        fence: Option<FenceHandle>,
    ) -> Result<()> {
        let buffers = match command_buffer {
            Some(cb) => {
                let cb = lookup(&self.command_buffers, cb, "command buffer")?;
                if cb.recording {
                    engine_bail!(SOURCE, "Submitting a command buffer still recording");
                }
                vec![cb.buffer]
            }
            None => Vec::new(),
        };
        let wait_semaphores = wait
            .iter()
            .map(|w| lookup(&self.semaphores, w.semaphore, "semaphore").copied())
            .collect::<Result<Vec<_>>>()?;
        let wait_stages: Vec<vk::PipelineStageFlags> = wait.iter().map(|w| wait_stage_to_vk(w.stage)).collect();
        let signal_semaphores = signal
            .iter()
            .map(|s| lookup(&self.semaphores, *s, "semaphore").copied())
            .collect::<Result<Vec<_>>>()?;
        let fence = match fence {
            Some(f) => *lookup(&self.fences, f, "fence")?,
            None => vk::Fence::null(),
        };

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device()
                .queue_submit(self.context.queue(), &[submit_info], fence)
                .map_err(|e| engine_err!(SOURCE, "Failed to submit command buffer: {:?}", e))
        }
    }

    // ===== RECORDING =====

    fn cmd_begin_render_pass(
        &mut self,
        command_buffer: CommandBufferHandle,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        extent: Extent2D,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        let buffer = self.recording(command_buffer)?;
        if lookup(&self.command_buffers, command_buffer, "command buffer")?.framebuffer.is_some() {
            engine_bail!(SOURCE, "Render pass already begun");
        }
        let native_pass = lookup(&self.render_passes, render_pass, "render pass")?.render_pass;
        let native_framebuffer = lookup(&self.framebuffers, framebuffer, "framebuffer")?.framebuffer;

        let clear_values: Vec<vk::ClearValue> = clear_values.iter().map(clear_value_to_vk).collect();
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(native_pass)
            .framebuffer(native_framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D { width: extent.width, height: extent.height },
            })
            .clear_values(&clear_values);

        unsafe {
            self.device().cmd_begin_render_pass(buffer, &begin_info, vk::SubpassContents::INLINE);
        }
        lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?.framebuffer = Some(framebuffer);
        Ok(())
    }

    fn cmd_end_render_pass(&mut self, command_buffer: CommandBufferHandle) -> Result<()> {
        let buffer = self.recording(command_buffer)?;
        let framebuffer = lookup_mut(&mut self.command_buffers, command_buffer, "command buffer")?
            .framebuffer
            .take();
        let Some(framebuffer) = framebuffer else {
            engine_bail!(SOURCE, "end_render_pass outside of a render pass");
        };

        unsafe { self.device().cmd_end_render_pass(buffer) };

        // Attachments end the pass in their final layouts
        if let Some(fb) = self.framebuffers.get(framebuffer) {
            if let Some(pass) = self.render_passes.get(fb.render_pass) {
                for (attachment, layout) in fb.attachments.iter().zip(final_layouts(&pass.desc)) {
                    if let FramebufferAttachment::Texture(texture) = attachment {
                        if let Some(texture) = self.textures.get_mut(*texture) {
                            texture.info.layout = layout;
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
        let buffer = self.recording(command_buffer)?;
        let pipeline = self.pipeline(pipeline)?;
        unsafe {
            self.device().cmd_bind_pipeline(buffer, pipeline.bind_point(), pipeline.pipeline);
        }
        Ok(())
    }

    fn cmd_bind_vertex_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
    ) -> Result<()> {
        let cb = self.recording(command_buffer)?;
        let buffer = lookup(&self.buffers, buffer, "buffer")?.buffer;
        unsafe { self.device().cmd_bind_vertex_buffers(cb, 0, &[buffer], &[offset]) };
        Ok(())
    }

    fn cmd_bind_index_buffer(
        &mut self,
        command_buffer: CommandBufferHandle,
        buffer: BufferHandle,
        offset: u64,
        index_type: IndexType,
    ) -> Result<()> {
        let cb = self.recording(command_buffer)?;
        let buffer = lookup(&self.buffers, buffer, "buffer")?.buffer;
        unsafe {
            self.device().cmd_bind_index_buffer(cb, buffer, offset, index_type_to_vk(index_type));
        }
        Ok(())
    }

    fn cmd_draw(
        &mut self,
        command_buffer: CommandBufferHandle,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<()> {
        let cb = self.recording(command_buffer)?;
        unsafe {
            self.device().cmd_draw(cb, vertex_count, instance_count, first_vertex, first_instance);
        }
        Ok(())
    }

    fn cmd_draw_indexed(
        &mut self,
        command_buffer: CommandBufferHandle,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        let cb = self.recording(command_buffer)?;
        unsafe {
            self.device().cmd_draw_indexed(
                cb,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
        Ok(())
    }

    fn cmd_dispatch(
        &mut self,
        command_buffer: CommandBufferHandle,
        group_count_x: u32,
        group_count_y: u32,
        group_count_z: u32,
    ) -> Result<()> {
        let cb = self.recording(command_buffer)?;
        unsafe {
            self.device().cmd_dispatch(cb, group_count_x, group_count_y, group_count_z);
        }
        Ok(())
    }

    fn cmd_bind_descriptor_set(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
        set_index: u32,
        set: DescriptorSetHandle,
    ) -> Result<()> {
        let cb = self.recording(command_buffer)?;
        let pipeline = self.pipeline(pipeline)?;
        let set = lookup(&self.descriptor_sets, set, "descriptor set")?.set;
        unsafe {
            self.device().cmd_bind_descriptor_sets(
                cb,
                pipeline.bind_point(),
                pipeline.layout,
                set_index,
                &[set],
                &[],
            );
        }
        Ok(())
    }

    fn cmd_set_viewport_scissor(
        &mut self,
        command_buffer: CommandBufferHandle,
        x: i32,
        y: i32,
        extent: Extent2D,
    ) -> Result<()> {
        let cb = self.recording(command_buffer)?;
        let viewport = vk::Viewport {
            x: x as f32,
            y: y as f32,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x, y },
            extent: vk::Extent2D { width: extent.width, height: extent.height },
        };
        unsafe {
            self.device().cmd_set_viewport(cb, 0, &[viewport]);
            self.device().cmd_set_scissor(cb, 0, &[scissor]);
        }
        Ok(())
    }

    fn cmd_push_constants(
        &mut self,
        command_buffer: CommandBufferHandle,
        pipeline: PipelineHandle,
        stages: ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        let cb = self.recording(command_buffer)?;
        let layout = self.pipeline(pipeline)?.layout;
        unsafe {
            self.device().cmd_push_constants(cb, layout, shader_stage_flags_to_vk(stages), offset, data);
        }
        Ok(())
    }

    fn cmd_image_barrier(
        &mut self,
        command_buffer: CommandBufferHandle,
        texture: TextureHandle,
        new_layout: ImageLayout,
    ) -> Result<()> {
        let cb = self.recording(command_buffer)?;
        let target = lookup(&self.textures, texture, "texture")?;
        let old_layout = target.info.layout;

        let (src_access, src_stage) = layout_access_and_stage(old_layout);
        let (dst_access, dst_stage) = layout_access_and_stage(new_layout);
        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(image_layout_to_vk(old_layout))
            .new_layout(image_layout_to_vk(new_layout))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(target.image)
            .subresource_range(subresource_range(&target.info))
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        unsafe {
            self.device().cmd_pipeline_barrier(
                cb,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }

        lookup_mut(&mut self.textures, texture, "texture")?.info.layout = new_layout;
        Ok(())
    }
}

impl Drop for VulkanRenderDevice {
    fn drop(&mut self) {
        unsafe {
            self.context.device().device_wait_idle().ok();

            let live = self.buffers.len() + self.textures.len() + self.pipelines.len()
                + self.swapchains.len() + self.surfaces.len();
            if live > 0 {
                engine_warn!(SOURCE, "{} resources still alive at device drop, destroying them", live);
            }

            let device = self.context.device().clone();

            for (_, framebuffer) in self.framebuffers.drain() {
                device.destroy_framebuffer(framebuffer.framebuffer, None);
            }
            for (_, view) in self.image_views.drain() {
                device.destroy_image_view(view, None);
            }
            self.images.clear();
            for (_, swapchain) in self.swapchains.drain() {
                self.context.swapchain_loader().destroy_swapchain(swapchain.swapchain, None);
            }
            for (_, surface) in self.surfaces.drain() {
                self.context.surface_loader().destroy_surface(surface, None);
            }
            for (_, pipeline) in self.pipelines.drain() {
                pipeline.destroy(&device);
            }
            for (_, render_pass) in self.render_passes.drain() {
                device.destroy_render_pass(render_pass.render_pass, None);
            }

            // Sets go away with the pool
            self.descriptor_sets.clear();
            device.destroy_descriptor_pool(self.descriptor_pool, None);
            for (_, layout) in self.set_layouts.drain() {
                device.destroy_descriptor_set_layout(layout.layout, None);
            }
            device.destroy_descriptor_set_layout(self.texture_set_layout, None);

            for (_, texture) in self.textures.drain() {
                texture.destroy(&mut self.context);
            }
            for (_, buffer) in self.buffers.drain() {
                buffer.destroy(&mut self.context);
            }
            for (_, sampler) in self.samplers.drain() {
                device.destroy_sampler(sampler, None);
            }
            for (_, semaphore) in self.semaphores.drain() {
                device.destroy_semaphore(semaphore, None);
            }
            for (_, fence) in self.fences.drain() {
                device.destroy_fence(fence, None);
            }
            // Command buffers are freed with the pool owned by the context
            self.command_buffers.clear();
        }
        // `context` drops after this, tearing down allocator, device and instance
    }
}
