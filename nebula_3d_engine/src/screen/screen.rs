/// Screen - owner of the presentation surface and swapchain
///
/// Lifecycle: `Uninitialized` -> `initialize()` -> `Steady`. Every
/// `cmd_begin_screen_render()` evaluates `transition()` against the current
/// surface capabilities; a changed, non-zero extent moves the screen through
/// `Recreating` (device idle, per-image resources freed, swapchain rebuilt
/// from the old one, per-image resources rebuilt) back to `Steady` before the
/// next image is acquired.
///
/// The render pass and the two semaphores are created once in `initialize()`
/// and survive every resize.

use crate::error::{Error, Result};
use crate::render_device::{
    clamp_image_count, resolve_extent, AttachmentDesc, ClearValue, CommandBufferHandle,
    CompositeAlpha, Extent2D, FramebufferAttachment, FramebufferHandle, ImageHandle,
    ImageLayout, ImageViewHandle, LoadOp, PresentMode, RenderDevice, RenderPassDesc,
    RenderPassHandle, SampleCount, SemaphoreHandle, SemaphoreWait, StoreOp, SurfaceCapabilities,
    SurfaceFormat, SurfaceHandle, SwapchainDesc, SwapchainHandle, WaitStage, WindowSource,
    DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, DESIRED_SWAPCHAIN_IMAGE_COUNT,
};
use crate::{engine_debug, engine_info};

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenState {
    Uninitialized,
    Steady,
    /// Transient: only observable from inside `recreate_swapchain()`
    Recreating,
}

/// Decision taken at frame begin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenTransition {
    Keep,
    Recreate(Extent2D),
}

/// Compare the cached swapchain extent with what the surface reports now
///
/// Zero-sized extents (minimized window) and surfaces that let the swapchain
/// pick its own size never trigger a recreation.
pub fn transition(cached: Extent2D, caps: &SurfaceCapabilities) -> ScreenTransition {
    match caps.window_extent() {
        Some(current) if !current.is_empty() && current != cached => {
            ScreenTransition::Recreate(current)
        }
        _ => ScreenTransition::Keep,
    }
}

// ============================================================================
// Per-image resources
// ============================================================================

/// Everything that exists once per swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenImage {
    pub image: ImageHandle,
    pub view: ImageViewHandle,
    pub framebuffer: FramebufferHandle,
    pub command_buffer: CommandBufferHandle,
}

/// Frame being recorded between `cmd_begin_screen_render` and `cmd_end_screen_render`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenFrame {
    pub command_buffer: CommandBufferHandle,
    pub image_index: u32,
    pub extent: Extent2D,
}

/// Objects created once by `initialize()`
#[derive(Debug)]
struct Presentation {
    surface: SurfaceHandle,
    render_pass: RenderPassHandle,
    image_available: SemaphoreHandle,
    render_finished: SemaphoreHandle,
}

// ============================================================================
// Screen
// ============================================================================

pub struct Screen {
    state: ScreenState,
    presentation: Option<Presentation>,
    format: Option<SurfaceFormat>,
    swapchain: Option<SwapchainHandle>,
    image_count: u32,
    extent: Extent2D,
    images: Vec<ScreenImage>,
    recording: Option<ScreenFrame>,
    clear_color: [f32; 4],
}

impl Screen {
    pub fn new() -> Self {
        Self {
            state: ScreenState::Uninitialized,
            presentation: None,
            format: None,
            swapchain: None,
            image_count: 0,
            extent: Extent2D::default(),
            images: Vec::new(),
            recording: None,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn state(&self) -> ScreenState {
        self.state
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Clamped image count the current swapchain was requested with
    pub fn image_count(&self) -> u32 {
        self.image_count
    }

    pub fn images(&self) -> &[ScreenImage] {
        &self.images
    }

    pub fn swapchain(&self) -> Option<SwapchainHandle> {
        self.swapchain
    }

    pub fn render_pass(&self) -> Option<RenderPassHandle> {
        self.presentation.as_ref().map(|p| p.render_pass)
    }

    pub fn surface_format(&self) -> Option<SurfaceFormat> {
        self.format
    }

    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
    }

    /// Create surface, semaphores, render pass, swapchain and per-image resources
    pub fn initialize(&mut self, device: &mut dyn RenderDevice, window: &dyn WindowSource) -> Result<()> {
        if self.state != ScreenState::Uninitialized {
            return Err(Error::InvalidState("Screen already initialized".to_string()));
        }

        let surface = device.create_surface(window)?;
        let format = device.surface_format();
        let image_available = device.create_semaphore()?;
        let render_finished = device.create_semaphore()?;
        let render_pass = device.create_render_pass(&RenderPassDesc {
            color_attachments: vec![AttachmentDesc {
                format: format.format,
                samples: SampleCount::S1,
                load_op: LoadOp::Clear,
                store_op: StoreOp::Store,
                initial_layout: ImageLayout::Undefined,
                final_layout: ImageLayout::PresentSrc,
            }],
            depth_attachment: None,
            resolve_attachment: None,
        })?;

        self.format = Some(format);
        self.presentation = Some(Presentation {
            surface,
            render_pass,
            image_available,
            render_finished,
        });

        let caps = device.surface_capabilities(surface)?;
        let extent = resolve_extent(
            &caps,
            Extent2D::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
        );
        self.build_swapchain(device, extent, &caps)?;
        self.state = ScreenState::Steady;

        engine_info!("nebula3d::Screen", "Screen initialized: {}x{}, {} images, {:?}",
            self.extent.width, self.extent.height, self.images.len(), format.format);
        Ok(())
    }

    /// Start recording this frame's screen pass
    ///
    /// Recreates the swapchain first if the surface size changed, then
    /// acquires the next image (blocking), begins its command buffer and the
    /// screen render pass.
    pub fn cmd_begin_screen_render(&mut self, device: &mut dyn RenderDevice) -> Result<ScreenFrame> {
        if self.recording.is_some() {
            return Err(Error::InvalidState("Screen frame already begun".to_string()));
        }
        let (surface, render_pass, image_available) = match (&self.state, &self.presentation) {
            (ScreenState::Steady, Some(p)) => (p.surface, p.render_pass, p.image_available),
            _ => return Err(Error::InvalidState("Screen not initialized".to_string())),
        };

        let caps = device.surface_capabilities(surface)?;
        if let ScreenTransition::Recreate(extent) = transition(self.extent, &caps) {
            self.recreate_swapchain(device, extent, &caps)?;
        }

        let swapchain = self.current_swapchain()?;
        let image_index = device.acquire_next_image(swapchain, image_available)?;
        let image = self
            .images
            .get(image_index as usize)
            .copied()
            .ok_or_else(|| Error::InvalidState(format!("Acquired image {} out of range", image_index)))?;

        device.cmd_buffer_begin(image.command_buffer)?;
        device.cmd_begin_render_pass(
            image.command_buffer,
            render_pass,
            image.framebuffer,
            self.extent,
            &[ClearValue::Color(self.clear_color)],
        )?;
        device.cmd_set_viewport_scissor(image.command_buffer, 0, 0, self.extent)?;

        let frame = ScreenFrame {
            command_buffer: image.command_buffer,
            image_index,
            extent: self.extent,
        };
        self.recording = Some(frame);
        Ok(frame)
    }

    /// Finish the screen pass, submit it and present (blocking until the queue is idle)
    pub fn cmd_end_screen_render(&mut self, device: &mut dyn RenderDevice) -> Result<()> {
        let frame = self
            .recording
            .take()
            .ok_or_else(|| Error::InvalidState("Screen frame not begun".to_string()))?;
        let (image_available, render_finished) = match &self.presentation {
            Some(p) => (p.image_available, p.render_finished),
            None => return Err(Error::InvalidState("Screen not initialized".to_string())),
        };
        let swapchain = self.current_swapchain()?;

        device.cmd_end_render_pass(frame.command_buffer)?;
        device.cmd_buffer_end(frame.command_buffer)?;
        device.cmd_buffer_submit(
            Some(frame.command_buffer),
            &[SemaphoreWait {
                semaphore: image_available,
                stage: WaitStage::ColorAttachmentOutput,
            }],
            &[render_finished],
            None,
        )?;
        device.present(swapchain, frame.image_index, &[render_finished])
    }

    /// Release everything the screen created, in reverse creation order
    pub fn destroy(mut self, device: &mut dyn RenderDevice) -> Result<()> {
        device.device_wait_idle()?;
        self.destroy_images(device)?;
        if let Some(swapchain) = self.swapchain.take() {
            device.destroy_swapchain(swapchain)?;
        }
        if let Some(p) = self.presentation.take() {
            device.destroy_render_pass(p.render_pass)?;
            device.destroy_semaphore(p.render_finished)?;
            device.destroy_semaphore(p.image_available)?;
            device.destroy_surface(p.surface)?;
        }
        self.state = ScreenState::Uninitialized;
        Ok(())
    }

    // ===== INTERNAL =====

    fn current_swapchain(&self) -> Result<SwapchainHandle> {
        self.swapchain
            .ok_or_else(|| Error::InvalidState("Screen has no swapchain".to_string()))
    }

    fn recreate_swapchain(
        &mut self,
        device: &mut dyn RenderDevice,
        extent: Extent2D,
        caps: &SurfaceCapabilities,
    ) -> Result<()> {
        self.state = ScreenState::Recreating;
        engine_info!("nebula3d::Screen", "Recreating swapchain: {}x{} -> {}x{}",
            self.extent.width, self.extent.height, extent.width, extent.height);

        device.device_wait_idle()?;
        self.destroy_images(device)?;
        self.build_swapchain(device, extent, caps)?;

        self.state = ScreenState::Steady;
        Ok(())
    }

    /// Create a swapchain (replacing the current one, if any) and its per-image resources
    fn build_swapchain(
        &mut self,
        device: &mut dyn RenderDevice,
        extent: Extent2D,
        caps: &SurfaceCapabilities,
    ) -> Result<()> {
        let (surface, render_pass) = match &self.presentation {
            Some(p) => (p.surface, p.render_pass),
            None => return Err(Error::InvalidState("Screen not initialized".to_string())),
        };
        let format = self
            .format
            .ok_or_else(|| Error::InvalidState("Screen has no surface format".to_string()))?;
        let image_count = clamp_image_count(DESIRED_SWAPCHAIN_IMAGE_COUNT, caps);
        let old_swapchain = self.swapchain;

        let swapchain = device.create_swapchain(&SwapchainDesc {
            surface,
            image_count,
            format,
            extent,
            present_mode: PresentMode::Fifo,
            composite_alpha: CompositeAlpha::Opaque,
            old_swapchain,
        })?;
        if let Some(old) = old_swapchain {
            device.destroy_swapchain(old)?;
        }
        self.swapchain = Some(swapchain);
        self.image_count = image_count;
        self.extent = extent;

        for image in device.swapchain_images(swapchain)? {
            let view = device.create_image_view(image)?;
            let framebuffer = device.create_framebuffer(
                render_pass,
                &[FramebufferAttachment::SwapchainView(view)],
                extent,
            )?;
            let command_buffer = device.allocate_command_buffer()?;
            self.images.push(ScreenImage { image, view, framebuffer, command_buffer });
        }

        engine_debug!("nebula3d::Screen", "Swapchain built with {} images", self.images.len());
        Ok(())
    }

    /// Free command buffers, framebuffers and views; the swapchain itself stays
    fn destroy_images(&mut self, device: &mut dyn RenderDevice) -> Result<()> {
        for image in self.images.drain(..) {
            device.free_command_buffer(image.command_buffer)?;
            device.destroy_framebuffer(image.framebuffer)?;
            device.destroy_image_view(image.view)?;
        }
        Ok(())
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "screen_tests.rs"]
mod tests;
