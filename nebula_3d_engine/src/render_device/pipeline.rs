/// Pipeline descriptions
///
/// A pipeline is either a graphics or a compute pipeline; both share one
/// handle type and one destroy call, and `PipelineInfo` tells them apart.

use crate::render_device::handles::{DescriptorSetLayoutHandle, RenderPassHandle};
use crate::render_device::types::{SampleCount, ShaderStageFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    /// Values above 1.0 need the wide-lines device feature
    pub line_width: f32,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Color blend state of the single color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBlendAttachment {
    pub blend_enable: bool,
    pub src_color_factor: BlendFactor,
    pub dst_color_factor: BlendFactor,
    pub color_op: BlendOp,
    pub src_alpha_factor: BlendFactor,
    pub dst_alpha_factor: BlendFactor,
    pub alpha_op: BlendOp,
}

impl ColorBlendAttachment {
    /// Standard straight-alpha blending
    pub const ALPHA: Self = Self {
        blend_enable: true,
        src_color_factor: BlendFactor::SrcAlpha,
        dst_color_factor: BlendFactor::OneMinusSrcAlpha,
        color_op: BlendOp::Add,
        src_alpha_factor: BlendFactor::SrcAlpha,
        dst_alpha_factor: BlendFactor::OneMinusSrcAlpha,
        alpha_op: BlendOp::Add,
    };

    /// Blending disabled, source replaces destination
    pub const REPLACE: Self = Self {
        blend_enable: false,
        src_color_factor: BlendFactor::One,
        dst_color_factor: BlendFactor::Zero,
        color_op: BlendOp::Add,
        src_alpha_factor: BlendFactor::One,
        dst_alpha_factor: BlendFactor::Zero,
        alpha_op: BlendOp::Add,
    };

    /// The blend state a graphics pipeline is actually built with
    ///
    /// Every graphics pipeline uses straight-alpha blending; the requested
    /// factors, ops and enable flag are not applied. Existing pipelines
    /// (sky, axis, editor) are authored against this behavior.
    pub fn resolved(&self) -> Self {
        Self::ALPHA
    }
}

impl Default for ColorBlendAttachment {
    fn default() -> Self {
        Self::ALPHA
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float,
    Float2,
    Float3,
    Float4,
    UByte4Norm,
}

impl VertexFormat {
    pub fn size(&self) -> u32 {
        match self {
            VertexFormat::Float => 4,
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
            VertexFormat::UByte4Norm => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Single interleaved vertex buffer at binding 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

/// Graphics pipeline creation parameters
///
/// `shader` is a base name: stages are read from
/// `<shader_directory>/<shader>.vert.spv` and `<shader>.frag.spv`.
/// Viewport and scissor are dynamic; depth test is always enabled with a
/// less-than compare; the sample count is that of the target render pass
/// (`RenderPassDesc::rasterization_samples`).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineDesc {
    pub shader: String,
    pub vertex_layout: Option<VertexLayout>,
    pub topology: PrimitiveTopology,
    pub rasterization: RasterizationState,
    pub color_blend: ColorBlendAttachment,
    pub depth_write: bool,
    pub render_pass: RenderPassHandle,
    pub subpass: u32,
    pub set_layouts: Vec<DescriptorSetLayoutHandle>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

/// Compute pipeline creation parameters (`<shader>.comp.spv`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePipelineDesc {
    pub shader: String,
    pub set_layouts: Vec<DescriptorSetLayoutHandle>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

/// State a created pipeline was built with
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineInfo {
    Graphics {
        topology: PrimitiveTopology,
        samples: SampleCount,
        color_blend: ColorBlendAttachment,
        depth_write: bool,
    },
    Compute,
}

impl PipelineInfo {
    pub fn bind_point(&self) -> PipelineBindPoint {
        match self {
            PipelineInfo::Graphics { .. } => PipelineBindPoint::Graphics,
            PipelineInfo::Compute => PipelineBindPoint::Compute,
        }
    }

    /// Resolved blend state (graphics pipelines only)
    pub fn color_blend(&self) -> Option<ColorBlendAttachment> {
        match self {
            PipelineInfo::Graphics { color_blend, .. } => Some(*color_blend),
            PipelineInfo::Compute => None,
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
