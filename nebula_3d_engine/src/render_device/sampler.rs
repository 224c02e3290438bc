/// Sampler descriptions

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
}

/// Sampler creation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub address_mode: AddressMode,
    /// Anisotropic filtering level, `None` to disable
    pub max_anisotropy: Option<f32>,
}

impl SamplerDesc {
    /// Linear filtering, clamped to edge (editor images, render targets)
    pub fn linear_clamp() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            address_mode: AddressMode::ClampToEdge,
            max_anisotropy: None,
        }
    }

    /// Linear filtering, repeating (mesh textures)
    pub fn linear_repeat() -> Self {
        Self {
            address_mode: AddressMode::Repeat,
            ..Self::linear_clamp()
        }
    }
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self::linear_clamp()
    }
}
