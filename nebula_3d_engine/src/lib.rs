/*!
# Nebula 3D Engine

Core types of the Nebula 3D engine: the backend-agnostic `RenderDevice`
interface and the components built on top of it.

## Architecture

- **RenderDevice**: trait every GPU backend implements; resources are
  addressed by versioned slot handles
- **Screen**: presentation surface, swapchain and the resize state machine
- **SceneRenderer**: off-screen scene target (sky sphere, coordinate axis,
  render objects)
- **EditorOverlay**: immediate-mode GUI overlay showing the scene target
- **Frame**: per-frame control flow across the components above

The render device is passed explicitly (`&mut dyn RenderDevice`) to every
component; components are released with `destroy(self, device)` before the
device is dropped.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod render_device;
pub mod screen;
pub mod scene;
pub mod editor;
pub mod frame;

// Main nebula3d namespace module
pub mod nebula3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Logging facade
    pub use crate::engine::Engine;

    // Render device trait
    pub use crate::render_device::RenderDevice;

    // Per-frame orchestration
    pub use crate::frame::Frame;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render sub-module with all render device types
    pub mod render {
        pub use crate::render_device::*;
    }

    // Screen sub-module
    pub mod screen {
        pub use crate::screen::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Editor sub-module
    pub mod editor {
        pub use crate::editor::*;
    }
}

// Re-export math library at crate root
pub use glam;
