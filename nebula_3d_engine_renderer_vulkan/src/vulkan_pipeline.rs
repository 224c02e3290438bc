/// Pipeline creation - shader loading, graphics and compute pipelines
///
/// Shaders are SPIR-V files named `<name>.<stage>.spv` in the configured
/// shader directory. Each stage must expose a `main` entry point. Shader
/// modules only live for the duration of pipeline creation.

use ash::vk;
use nebula_3d_engine::nebula3d::Result;
use nebula_3d_engine::nebula3d::render::{
    shader_path, ComputePipelineDesc, GraphicsPipelineDesc, PipelineInfo, PushConstantRange,
    SampleCount, ShaderStage,
};
use nebula_3d_engine::{engine_bail, engine_err, engine_trace, engine_warn};
use std::io::Cursor;
use std::path::Path;

use crate::vulkan_format::{
    blend_factor_to_vk, blend_op_to_vk, cull_mode_to_vk, front_face_to_vk, polygon_mode_to_vk,
    sample_count_to_vk, shader_stage_flags_to_vk, topology_to_vk, vertex_format_to_vk,
};

const SOURCE: &str = "nebula3d::vulkan::Pipeline";

const ENTRY_POINT: &std::ffi::CStr = c"main";

pub(crate) struct Pipeline {
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) info: PipelineInfo,
}

impl Pipeline {
    pub(crate) fn bind_point(&self) -> vk::PipelineBindPoint {
        match self.info {
            PipelineInfo::Graphics { .. } => vk::PipelineBindPoint::GRAPHICS,
            PipelineInfo::Compute => vk::PipelineBindPoint::COMPUTE,
        }
    }

    pub(crate) fn destroy(self, device: &ash::Device) {
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Read and validate `<directory>/<name>.<stage>.spv`
pub(crate) fn load_shader_code(directory: &Path, name: &str, stage: ShaderStage) -> Result<Vec<u32>> {
    let path = shader_path(directory, name, stage);
    let bytes = std::fs::read(&path)
        .map_err(|e| engine_err!(SOURCE, "Shader file not found: {} ({})", path.display(), e))?;

    let code = ash::util::read_spv(&mut Cursor::new(&bytes))
        .map_err(|e| engine_err!(SOURCE, "Invalid SPIR-V in {}: {}", path.display(), e))?;

    let entry_points = spirq::ReflectConfig::new()
        .spv(code.as_slice())
        .ref_all_rscs(true)
        .reflect()
        .map_err(|e| engine_err!(SOURCE, "SPIR-V reflection failed for {}: {:?}", path.display(), e))?;

    if !entry_points.iter().any(|ep| ep.name == "main") {
        engine_bail!(SOURCE, "Shader {} has no 'main' entry point", path.display());
    }

    engine_trace!(SOURCE, "Loaded shader {} ({} words)", path.display(), code.len());
    Ok(code)
}

fn create_shader_module(device: &ash::Device, code: &[u32]) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);
    unsafe {
        device.create_shader_module(&create_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create shader module: {:?}", e))
    }
}

/// Line width accepted by the device: 1.0 without the wide-lines feature
pub(crate) fn effective_line_width(requested: f32, wide_lines: bool, range: [f32; 2]) -> f32 {
    if wide_lines {
        requested.clamp(range[0], range[1])
    } else {
        1.0
    }
}

fn create_pipeline_layout(
    device: &ash::Device,
    set_layouts: &[vk::DescriptorSetLayout],
    push_constant_ranges: &[PushConstantRange],
) -> Result<vk::PipelineLayout> {
    let ranges: Vec<vk::PushConstantRange> = push_constant_ranges
        .iter()
        .map(|range| vk::PushConstantRange {
            stage_flags: shader_stage_flags_to_vk(range.stages),
            offset: range.offset,
            size: range.size,
        })
        .collect();

    let create_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(set_layouts)
        .push_constant_ranges(&ranges);

    unsafe {
        device.create_pipeline_layout(&create_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create pipeline layout: {:?}", e))
    }
}

/// Device capabilities a graphics pipeline is specialized for
pub(crate) struct GraphicsTarget {
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) samples: SampleCount,
    pub(crate) wide_lines: bool,
    pub(crate) line_width_range: [f32; 2],
}

pub(crate) fn create_graphics_pipeline(
    device: &ash::Device,
    shader_directory: &Path,
    desc: &GraphicsPipelineDesc,
    target: &GraphicsTarget,
    set_layouts: &[vk::DescriptorSetLayout],
) -> Result<Pipeline> {
    let vertex_code = load_shader_code(shader_directory, &desc.shader, ShaderStage::Vertex)?;
    let fragment_code = load_shader_code(shader_directory, &desc.shader, ShaderStage::Fragment)?;

    let vertex_module = create_shader_module(device, &vertex_code)?;
    let fragment_module = match create_shader_module(device, &fragment_code) {
        Ok(module) => module,
        Err(e) => {
            unsafe { device.destroy_shader_module(vertex_module, None) };
            return Err(e);
        }
    };

    let result = build_graphics_pipeline(device, desc, target, set_layouts, vertex_module, fragment_module);

    unsafe {
        device.destroy_shader_module(vertex_module, None);
        device.destroy_shader_module(fragment_module, None);
    }

    result
}

fn build_graphics_pipeline(
    device: &ash::Device,
    desc: &GraphicsPipelineDesc,
    target: &GraphicsTarget,
    set_layouts: &[vk::DescriptorSetLayout],
    vertex_module: vk::ShaderModule,
    fragment_module: vk::ShaderModule,
) -> Result<Pipeline> {
    let shader_stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_module)
            .name(ENTRY_POINT),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_module)
            .name(ENTRY_POINT),
    ];

    // Vertex input state (binding 0 only)
    let (vertex_bindings, vertex_attributes) = match &desc.vertex_layout {
        Some(layout) => (
            vec![vk::VertexInputBindingDescription {
                binding: 0,
                stride: layout.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            }],
            layout.attributes
                .iter()
                .map(|attribute| vk::VertexInputAttributeDescription {
                    location: attribute.location,
                    binding: 0,
                    format: vertex_format_to_vk(attribute.format),
                    offset: attribute.offset,
                })
                .collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };
    let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&vertex_bindings)
        .vertex_attribute_descriptions(&vertex_attributes);

    let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(topology_to_vk(desc.topology))
        .primitive_restart_enable(false);

    // Viewport state (dynamic)
    let viewports = [vk::Viewport::default()];
    let scissors = [vk::Rect2D::default()];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&viewports)
        .scissors(&scissors);

    let line_width = effective_line_width(
        desc.rasterization.line_width,
        target.wide_lines,
        target.line_width_range,
    );
    if line_width != desc.rasterization.line_width {
        engine_warn!(SOURCE, "Line width {} not supported for '{}', using {}",
            desc.rasterization.line_width, desc.shader, line_width);
    }
    let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(polygon_mode_to_vk(desc.rasterization.polygon_mode))
        .line_width(line_width)
        .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
        .front_face(front_face_to_vk(desc.rasterization.front_face))
        .depth_bias_enable(false);

    let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(true)
        .depth_write_enable(desc.depth_write)
        .depth_compare_op(vk::CompareOp::LESS)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(sample_count_to_vk(target.samples));

    let blend = desc.color_blend.resolved();
    let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(blend.blend_enable)
        .src_color_blend_factor(blend_factor_to_vk(blend.src_color_factor))
        .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color_factor))
        .color_blend_op(blend_op_to_vk(blend.color_op))
        .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha_factor))
        .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha_factor))
        .alpha_blend_op(blend_op_to_vk(blend.alpha_op));
    let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(std::slice::from_ref(&color_blend_attachment));

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
        .dynamic_states(&dynamic_states);

    let layout = create_pipeline_layout(device, set_layouts, &desc.push_constant_ranges)?;

    let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&shader_stages)
        .vertex_input_state(&vertex_input_state)
        .input_assembly_state(&input_assembly_state)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization_state)
        .depth_stencil_state(&depth_stencil_state)
        .multisample_state(&multisample_state)
        .color_blend_state(&color_blend_state)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .render_pass(target.render_pass)
        .subpass(desc.subpass);

    let pipelines = unsafe {
        device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
    };
    let pipeline = match pipelines {
        Ok(pipelines) => pipelines[0],
        Err((_, e)) => {
            unsafe { device.destroy_pipeline_layout(layout, None) };
            engine_bail!(SOURCE, "Failed to create graphics pipeline '{}': {:?}", desc.shader, e);
        }
    };

    Ok(Pipeline {
        pipeline,
        layout,
        info: PipelineInfo::Graphics {
            topology: desc.topology,
            samples: target.samples,
            color_blend: blend,
            depth_write: desc.depth_write,
        },
    })
}

pub(crate) fn create_compute_pipeline(
    device: &ash::Device,
    shader_directory: &Path,
    desc: &ComputePipelineDesc,
    set_layouts: &[vk::DescriptorSetLayout],
) -> Result<Pipeline> {
    let code = load_shader_code(shader_directory, &desc.shader, ShaderStage::Compute)?;
    let module = create_shader_module(device, &code)?;

    let layout = match create_pipeline_layout(device, set_layouts, &desc.push_constant_ranges) {
        Ok(layout) => layout,
        Err(e) => {
            unsafe { device.destroy_shader_module(module, None) };
            return Err(e);
        }
    };

    let stage = vk::PipelineShaderStageCreateInfo::default()
        .stage(vk::ShaderStageFlags::COMPUTE)
        .module(module)
        .name(ENTRY_POINT);
    let create_info = vk::ComputePipelineCreateInfo::default()
        .stage(stage)
        .layout(layout);

    let pipelines = unsafe {
        let result = device.create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None);
        device.destroy_shader_module(module, None);
        result
    };

    match pipelines {
        Ok(pipelines) => Ok(Pipeline {
            pipeline: pipelines[0],
            layout,
            info: PipelineInfo::Compute,
        }),
        Err((_, e)) => {
            unsafe { device.destroy_pipeline_layout(layout, None) };
            Err(engine_err!(SOURCE, "Failed to create compute pipeline '{}': {:?}", desc.shader, e))
        }
    }
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
