/// Common rendering types shared by every render device backend

use bitflags::bitflags;

/// 2D extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (minimized window, collapsed panel)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width / height, or 1.0 for an empty extent
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Texture and attachment formats
///
/// `Native` carries a backend format code that has no named variant here
/// (e.g. an exotic surface format picked as last-resort fallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    A2B10G10R10_UNORM,
    A2R10G10B10_UNORM,
    R16G16B16A16_SFLOAT,
    D32_SFLOAT,
    D32_SFLOAT_S8_UINT,
    D24_UNORM_S8_UINT,
    Native(i32),
}

impl TextureFormat {
    /// Bytes per texel for uploadable color formats
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::A2B10G10R10_UNORM
            | TextureFormat::A2R10G10B10_UNORM
            | TextureFormat::D32_SFLOAT
            | TextureFormat::D24_UNORM_S8_UINT => 4,
            TextureFormat::R16G16B16A16_SFLOAT | TextureFormat::D32_SFLOAT_S8_UINT => 8,
            TextureFormat::Native(_) => 4,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D32_SFLOAT
                | TextureFormat::D32_SFLOAT_S8_UINT
                | TextureFormat::D24_UNORM_S8_UINT
        )
    }

    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            TextureFormat::D32_SFLOAT_S8_UINT | TextureFormat::D24_UNORM_S8_UINT
        )
    }

    /// Aspect implied by the format
    pub fn aspect(&self) -> TextureAspect {
        if self.has_stencil() {
            TextureAspect::DepthStencil
        } else if self.is_depth() {
            TextureAspect::Depth
        } else {
            TextureAspect::Color
        }
    }
}

/// Depth formats tried by `find_supported_depth_format`, in priority order
pub const DEPTH_FORMAT_CANDIDATES: [TextureFormat; 3] = [
    TextureFormat::D32_SFLOAT,
    TextureFormat::D32_SFLOAT_S8_UINT,
    TextureFormat::D24_UNORM_S8_UINT,
];

/// Surface color space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    SrgbNonlinear,
    Native(i32),
}

/// Format + color space negotiated with a presentation surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceFormat {
    pub format: TextureFormat,
    pub color_space: ColorSpace,
}

/// Image aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureAspect {
    Color,
    Depth,
    DepthStencil,
}

/// Image layout tracked by textures and attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    PresentSrc,
}

/// Multisample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SampleCount {
    S1,
    S2,
    S4,
    S8,
    S16,
    S32,
    S64,
}

impl SampleCount {
    /// Every count from highest to lowest
    pub const DESCENDING: [SampleCount; 7] = [
        SampleCount::S64,
        SampleCount::S32,
        SampleCount::S16,
        SampleCount::S8,
        SampleCount::S4,
        SampleCount::S2,
        SampleCount::S1,
    ];

    pub fn count(&self) -> u32 {
        match self {
            SampleCount::S1 => 1,
            SampleCount::S2 => 2,
            SampleCount::S4 => 4,
            SampleCount::S8 => 8,
            SampleCount::S16 => 16,
            SampleCount::S32 => 32,
            SampleCount::S64 => 64,
        }
    }

    pub fn from_count(count: u32) -> Option<Self> {
        Self::DESCENDING.iter().copied().find(|s| s.count() == count)
    }

    pub fn is_multisampled(&self) -> bool {
        *self != SampleCount::S1
    }
}

/// Default MSAA choice: 4x when the device allows it, otherwise 2x
/// (1x only on devices that cannot multisample at all)
pub fn default_msaa(max_usable: SampleCount) -> SampleCount {
    if max_usable >= SampleCount::S4 {
        SampleCount::S4
    } else if max_usable >= SampleCount::S2 {
        SampleCount::S2
    } else {
        SampleCount::S1
    }
}

/// Apply a preferred sample count, capped by what the device can do
pub fn choose_msaa(preferred: SampleCount, max_usable: SampleCount) -> SampleCount {
    if preferred <= max_usable {
        preferred
    } else {
        default_msaa(max_usable)
    }
}

/// Clear value for a render pass attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// Index type for indexed draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// File-name stage tag (`<name>.<stage>.spv`)
    pub fn extension(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
            ShaderStage::Compute => "comp",
        }
    }
}

bitflags! {
    /// Shader stages a binding or push constant range is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

bitflags! {
    /// How a texture may be used
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SAMPLED = 1 << 0;
        const COLOR_ATTACHMENT = 1 << 1;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 2;
        const TRANSFER_SRC = 1 << 3;
        const TRANSFER_DST = 1 << 4;
        const TRANSIENT = 1 << 5;
    }
}

/// Pipeline stage a semaphore wait applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStage {
    TopOfPipe,
    ColorAttachmentOutput,
    FragmentShader,
    Transfer,
    AllCommands,
}

/// Presentation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    Fifo,
    Mailbox,
    Immediate,
}

/// Surface composite alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeAlpha {
    Opaque,
    PreMultiplied,
    PostMultiplied,
    Inherit,
}

/// Physical device type, as used by GPU selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    DiscreteGpu,
    IntegratedGpu,
    VirtualGpu,
    Cpu,
    Other,
}
