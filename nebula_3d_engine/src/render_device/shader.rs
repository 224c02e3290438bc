/// Shader binary location convention

use std::path::{Path, PathBuf};
use crate::render_device::types::ShaderStage;

/// Path of a SPIR-V stage: `<directory>/<name>.<stage>.spv`
pub fn shader_path(directory: impl AsRef<Path>, name: &str, stage: ShaderStage) -> PathBuf {
    directory
        .as_ref()
        .join(format!("{}.{}.spv", name, stage.extension()))
}
