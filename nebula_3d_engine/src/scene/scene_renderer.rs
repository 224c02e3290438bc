/// SceneRenderer - draws the scene into an off-screen target
///
/// The target (color, depth and, with MSAA, a single-sample resolve texture)
/// is sized by whoever displays it (the editor viewport), not by the window.
/// It is rebuilt only when `render()` is asked for a different, non-zero size;
/// each rebuild bumps `generation()` so consumers holding the previous output
/// texture know to refresh.
///
/// Recording uses the renderer's own command buffer and fence and completes
/// synchronously: `render()` returns once the GPU has finished the frame.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::error::Result;
use crate::render_device::{
    AttachmentDesc, BufferHandle, BufferUsage, ClearValue, CommandBufferHandle, CullMode,
    ColorBlendAttachment, DescriptorBinding, DescriptorResource, DescriptorSetHandle,
    DescriptorSetLayoutHandle, DescriptorType, DescriptorWrite, Extent2D, FenceHandle,
    FramebufferAttachment, FramebufferHandle, GraphicsPipelineDesc, ImageLayout, LoadOp,
    PipelineHandle, PrimitiveTopology, PushConstantRange, RasterizationState, RenderDevice,
    RenderPassDesc, RenderPassHandle, SampleCount, ShaderStageFlags, StoreOp, TextureDesc,
    TextureFormat, TextureHandle, TextureUsage,
};
use crate::scene::mesh::{Mesh, MeshData, Vertex};
use crate::scene::scene::Scene;
use crate::{engine_debug, engine_info};

/// Format of the texture the scene is resolved into
pub const SCENE_COLOR_FORMAT: TextureFormat = TextureFormat::R8G8B8A8_UNORM;

const SKY_RINGS: u32 = 24;
const SKY_SEGMENTS: u32 = 48;
const SKY_ZENITH: [f32; 3] = [0.18, 0.36, 0.78];
const SKY_HORIZON: [f32; 3] = [0.72, 0.84, 0.96];
const AXIS_LENGTH: f32 = 5.0;
const AXIS_LINE_WIDTH: f32 = 2.0;

// ============================================================================
// GPU data layouts
// ============================================================================

/// Per-frame uniform block (set 0, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub light_direction: [f32; 4],
    /// rgb = light color, a = ambient intensity
    pub light_color: [f32; 4],
}

impl SceneUniforms {
    pub fn new(scene: &Scene, aspect_ratio: f32) -> Self {
        let camera = &scene.camera;
        let light = &scene.light;
        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            projection: camera.projection_matrix(aspect_ratio).to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            light_direction: light.normalized_direction().extend(0.0).to_array(),
            light_color: light.color.extend(light.ambient).to_array(),
        }
    }
}

/// Per-draw push constants (vertex + fragment stages)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectPushConstants {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl ObjectPushConstants {
    pub fn new(model: Mat4, color: Vec4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: color.to_array(),
        }
    }
}

// ============================================================================
// Off-screen target
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SceneTarget {
    extent: Extent2D,
    color: TextureHandle,
    depth: TextureHandle,
    /// Present when rendering multisampled
    resolve: Option<TextureHandle>,
    framebuffer: FramebufferHandle,
}

impl SceneTarget {
    fn output(&self) -> TextureHandle {
        self.resolve.unwrap_or(self.color)
    }
}

// ============================================================================
// SceneRenderer
// ============================================================================

pub struct SceneRenderer {
    samples: SampleCount,
    depth_format: TextureFormat,
    render_pass: RenderPassHandle,
    set_layout: DescriptorSetLayoutHandle,
    descriptor_set: DescriptorSetHandle,
    uniform_buffer: BufferHandle,
    /// `object` shader pipelines, one per mesh topology in use
    object_pipelines: Vec<(PrimitiveTopology, PipelineHandle)>,
    axis_pipeline: PipelineHandle,
    sky_pipeline: PipelineHandle,
    sky_mesh: Mesh,
    axis_mesh: Mesh,
    command_buffer: CommandBufferHandle,
    fence: FenceHandle,
    target: Option<SceneTarget>,
    generation: u64,
    clear_color: [f32; 4],
}

impl SceneRenderer {
    /// Create render pass, pipelines, uniform resources and built-in meshes
    ///
    /// No target exists until the first `render()` with a non-zero size.
    pub fn new(device: &mut dyn RenderDevice) -> Result<Self> {
        let samples = device.sample_count();
        let depth_format = device.find_supported_depth_format()?;
        let render_pass = device.create_render_pass(&Self::render_pass_desc(samples, depth_format))?;

        let set_layout = device.create_descriptor_set_layout(&[DescriptorBinding {
            binding: 0,
            descriptor_type: DescriptorType::UniformBuffer,
            stages: ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
        }])?;
        let uniform_size = std::mem::size_of::<SceneUniforms>() as u64;
        let uniform_buffer = device.create_buffer(BufferUsage::Uniform, uniform_size)?;
        let descriptor_set = device.allocate_descriptor_set(set_layout)?;
        device.write_descriptor_set(descriptor_set, &[DescriptorWrite {
            binding: 0,
            resource: DescriptorResource::UniformBuffer {
                buffer: uniform_buffer,
                offset: 0,
                range: uniform_size,
            },
        }])?;

        let object_pipeline = device.create_graphics_pipeline(&Self::object_pipeline_desc(
            PrimitiveTopology::TriangleList,
            render_pass,
            set_layout,
        ))?;
        let axis_pipeline = device.create_graphics_pipeline(&Self::pipeline_desc(
            "axis",
            PrimitiveTopology::LineList,
            RasterizationState {
                cull_mode: CullMode::None,
                line_width: AXIS_LINE_WIDTH,
                ..Default::default()
            },
            true,
            render_pass,
            set_layout,
        ))?;
        let sky_pipeline = device.create_graphics_pipeline(&Self::pipeline_desc(
            "sky",
            PrimitiveTopology::TriangleList,
            RasterizationState {
                cull_mode: CullMode::Front,
                ..Default::default()
            },
            false,
            render_pass,
            set_layout,
        ))?;

        let sky_mesh = Mesh::upload(
            device,
            &MeshData::sky_sphere(SKY_RINGS, SKY_SEGMENTS, SKY_ZENITH, SKY_HORIZON),
        )?;
        let axis_mesh = Mesh::upload(device, &MeshData::coordinate_axis(AXIS_LENGTH))?;

        let command_buffer = device.allocate_command_buffer()?;
        let fence = device.create_fence()?;

        engine_info!("nebula3d::SceneRenderer", "Scene renderer created ({}x MSAA, depth {:?})",
            samples.count(), depth_format);

        Ok(Self {
            samples,
            depth_format,
            render_pass,
            set_layout,
            descriptor_set,
            uniform_buffer,
            object_pipelines: vec![(PrimitiveTopology::TriangleList, object_pipeline)],
            axis_pipeline,
            sky_pipeline,
            sky_mesh,
            axis_mesh,
            command_buffer,
            fence,
            target: None,
            generation: 0,
            clear_color: [0.1, 0.1, 0.12, 1.0],
        })
    }

    fn render_pass_desc(samples: SampleCount, depth_format: TextureFormat) -> RenderPassDesc {
        let multisampled = samples.is_multisampled();
        let color = AttachmentDesc {
            format: SCENE_COLOR_FORMAT,
            samples,
            load_op: LoadOp::Clear,
            store_op: if multisampled { StoreOp::DontCare } else { StoreOp::Store },
            initial_layout: ImageLayout::Undefined,
            final_layout: if multisampled {
                ImageLayout::ColorAttachment
            } else {
                ImageLayout::ShaderReadOnly
            },
        };
        let depth = AttachmentDesc {
            format: depth_format,
            samples,
            load_op: LoadOp::Clear,
            store_op: StoreOp::DontCare,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::DepthStencilAttachment,
        };
        let resolve = multisampled.then_some(AttachmentDesc {
            format: SCENE_COLOR_FORMAT,
            samples: SampleCount::S1,
            load_op: LoadOp::DontCare,
            store_op: StoreOp::Store,
            initial_layout: ImageLayout::Undefined,
            final_layout: ImageLayout::ShaderReadOnly,
        });
        RenderPassDesc {
            color_attachments: vec![color],
            depth_attachment: Some(depth),
            resolve_attachment: resolve,
        }
    }

    /// Triangles are culled back-face; points and lines are never culled
    fn object_pipeline_desc(
        topology: PrimitiveTopology,
        render_pass: RenderPassHandle,
        set_layout: DescriptorSetLayoutHandle,
    ) -> GraphicsPipelineDesc {
        let rasterization = match topology {
            PrimitiveTopology::TriangleList | PrimitiveTopology::TriangleStrip => RasterizationState::default(),
            PrimitiveTopology::LineList | PrimitiveTopology::LineStrip => RasterizationState {
                cull_mode: CullMode::None,
                line_width: AXIS_LINE_WIDTH,
                ..Default::default()
            },
            PrimitiveTopology::PointList => RasterizationState {
                cull_mode: CullMode::None,
                ..Default::default()
            },
        };
        Self::pipeline_desc("object", topology, rasterization, true, render_pass, set_layout)
    }

    /// Pipeline drawing `object` meshes of `topology`, created on first use
    fn object_pipeline(&mut self, device: &mut dyn RenderDevice, topology: PrimitiveTopology) -> Result<PipelineHandle> {
        if let Some((_, pipeline)) = self.object_pipelines.iter().find(|(t, _)| *t == topology) {
            return Ok(*pipeline);
        }
        let pipeline = device.create_graphics_pipeline(&Self::object_pipeline_desc(
            topology,
            self.render_pass,
            self.set_layout,
        ))?;
        engine_debug!("nebula3d::SceneRenderer", "Object pipeline created for {:?}", topology);
        self.object_pipelines.push((topology, pipeline));
        Ok(pipeline)
    }

    fn pipeline_desc(
        shader: &str,
        topology: PrimitiveTopology,
        rasterization: RasterizationState,
        depth_write: bool,
        render_pass: RenderPassHandle,
        set_layout: DescriptorSetLayoutHandle,
    ) -> GraphicsPipelineDesc {
        GraphicsPipelineDesc {
            shader: shader.to_string(),
            vertex_layout: Some(Vertex::layout()),
            topology,
            rasterization,
            color_blend: ColorBlendAttachment::ALPHA,
            depth_write,
            render_pass,
            subpass: 0,
            set_layouts: vec![set_layout],
            push_constant_ranges: vec![PushConstantRange {
                stages: ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
                offset: 0,
                size: std::mem::size_of::<ObjectPushConstants>() as u32,
            }],
        }
    }

    // ===== ACCESSORS =====

    /// Texture holding the last rendered frame (shader-read-only after `render()`)
    pub fn output_texture(&self) -> Option<TextureHandle> {
        self.target.map(|t| t.output())
    }

    pub fn target_extent(&self) -> Option<Extent2D> {
        self.target.map(|t| t.extent)
    }

    pub fn framebuffer(&self) -> Option<FramebufferHandle> {
        self.target.map(|t| t.framebuffer)
    }

    /// Incremented every time the target is rebuilt
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn render_pass(&self) -> RenderPassHandle {
        self.render_pass
    }

    pub fn sample_count(&self) -> SampleCount {
        self.samples
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    // ===== TARGET =====

    /// Make the target `extent` sized
    ///
    /// Returns true when the target was (re)built. Zero-sized requests and
    /// requests for the current size leave everything untouched.
    pub fn ensure_target(&mut self, device: &mut dyn RenderDevice, extent: Extent2D) -> Result<bool> {
        if extent.is_empty() {
            return Ok(false);
        }
        if self.target.map(|t| t.extent) == Some(extent) {
            return Ok(false);
        }

        if let Some(old) = self.target.take() {
            device.device_wait_idle()?;
            Self::destroy_target(device, old)?;
        }
        self.target = Some(self.create_target(device, extent)?);
        self.generation += 1;

        engine_debug!("nebula3d::SceneRenderer", "Scene target {}x{} (generation {})",
            extent.width, extent.height, self.generation);
        Ok(true)
    }

    fn create_target(&self, device: &mut dyn RenderDevice, extent: Extent2D) -> Result<SceneTarget> {
        let multisampled = self.samples.is_multisampled();
        let color_usage = if multisampled {
            TextureUsage::COLOR_ATTACHMENT | TextureUsage::TRANSIENT
        } else {
            TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED
        };
        let color = device.create_texture(&TextureDesc {
            width: extent.width,
            height: extent.height,
            format: SCENE_COLOR_FORMAT,
            usage: color_usage,
            samples: self.samples,
        })?;
        let depth = device.create_texture(&TextureDesc {
            width: extent.width,
            height: extent.height,
            format: self.depth_format,
            usage: TextureUsage::DEPTH_STENCIL_ATTACHMENT,
            samples: self.samples,
        })?;
        let resolve = if multisampled {
            Some(device.create_texture(&TextureDesc {
                width: extent.width,
                height: extent.height,
                format: SCENE_COLOR_FORMAT,
                usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLED,
                samples: SampleCount::S1,
            })?)
        } else {
            None
        };

        let mut attachments = vec![
            FramebufferAttachment::Texture(color),
            FramebufferAttachment::Texture(depth),
        ];
        if let Some(resolve) = resolve {
            attachments.push(FramebufferAttachment::Texture(resolve));
        }
        let framebuffer = device.create_framebuffer(self.render_pass, &attachments, extent)?;

        Ok(SceneTarget { extent, color, depth, resolve, framebuffer })
    }

    fn destroy_target(device: &mut dyn RenderDevice, target: SceneTarget) -> Result<()> {
        device.destroy_framebuffer(target.framebuffer)?;
        if let Some(resolve) = target.resolve {
            device.destroy_texture(resolve)?;
        }
        device.destroy_texture(target.depth)?;
        device.destroy_texture(target.color)
    }

    // ===== FRAME =====

    /// Render `scene` at `width` x `height` and wait for completion
    ///
    /// Draw order: sky sphere, coordinate axis, objects. Does nothing while
    /// no non-zero size has been requested yet.
    pub fn render(&mut self, device: &mut dyn RenderDevice, scene: &Scene, width: u32, height: u32) -> Result<()> {
        self.ensure_target(device, Extent2D::new(width, height))?;
        let target = match self.target {
            Some(target) => target,
            None => return Ok(()),
        };

        let uniforms = SceneUniforms::new(scene, target.extent.aspect_ratio());
        device.write_buffer(self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms))?;

        let cb = self.command_buffer;
        let mut clear_values = vec![
            ClearValue::Color(self.clear_color),
            ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
        ];
        if target.resolve.is_some() {
            clear_values.push(ClearValue::Color(self.clear_color));
        }

        device.cmd_buffer_begin(cb)?;
        device.cmd_begin_render_pass(cb, self.render_pass, target.framebuffer, target.extent, &clear_values)?;
        device.cmd_set_viewport_scissor(cb, 0, 0, target.extent)?;

        if scene.show_sky {
            let camera = &scene.camera;
            let model = Mat4::from_translation(camera.position) * Mat4::from_scale(Vec3::splat(camera.far * 0.5));
            self.cmd_draw_mesh(device, self.sky_pipeline, &self.sky_mesh, ObjectPushConstants::new(model, Vec4::ONE))?;
        }
        if scene.show_axis {
            self.cmd_draw_mesh(device, self.axis_pipeline, &self.axis_mesh, ObjectPushConstants::new(Mat4::IDENTITY, Vec4::ONE))?;
        }
        let mut bound = None;
        for object in &scene.objects {
            let pipeline = self.object_pipeline(device, object.mesh().topology())?;
            if bound != Some(pipeline) {
                device.cmd_bind_pipeline(cb, pipeline)?;
                device.cmd_bind_descriptor_set(cb, pipeline, 0, self.descriptor_set)?;
                bound = Some(pipeline);
            }
            let constants = ObjectPushConstants::new(object.model_matrix(), object.color);
            device.cmd_push_constants(
                cb,
                pipeline,
                ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
                0,
                bytemuck::bytes_of(&constants),
            )?;
            object.mesh().cmd_draw(device, cb)?;
        }

        device.cmd_end_render_pass(cb)?;
        device.cmd_buffer_end(cb)?;
        device.cmd_buffer_submit(Some(cb), &[], &[], Some(self.fence))?;
        device.wait_for_fence(self.fence)
    }

    fn cmd_draw_mesh(
        &self,
        device: &mut dyn RenderDevice,
        pipeline: PipelineHandle,
        mesh: &Mesh,
        constants: ObjectPushConstants,
    ) -> Result<()> {
        let cb = self.command_buffer;
        device.cmd_bind_pipeline(cb, pipeline)?;
        device.cmd_bind_descriptor_set(cb, pipeline, 0, self.descriptor_set)?;
        device.cmd_push_constants(
            cb,
            pipeline,
            ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT,
            0,
            bytemuck::bytes_of(&constants),
        )?;
        mesh.cmd_draw(device, cb)
    }

    pub fn destroy(mut self, device: &mut dyn RenderDevice) -> Result<()> {
        device.device_wait_idle()?;
        if let Some(target) = self.target.take() {
            Self::destroy_target(device, target)?;
        }
        device.destroy_pipeline(self.sky_pipeline)?;
        device.destroy_pipeline(self.axis_pipeline)?;
        for (_, pipeline) in self.object_pipelines.drain(..) {
            device.destroy_pipeline(pipeline)?;
        }
        self.sky_mesh.destroy(device)?;
        self.axis_mesh.destroy(device)?;
        device.free_descriptor_set(self.descriptor_set)?;
        device.destroy_descriptor_set_layout(self.set_layout)?;
        device.destroy_buffer(self.uniform_buffer)?;
        device.destroy_render_pass(self.render_pass)?;
        device.destroy_fence(self.fence)?;
        device.free_command_buffer(self.command_buffer)
    }
}

#[cfg(test)]
#[path = "scene_renderer_tests.rs"]
mod tests;
