//! Errors that can end or interrupt a frame.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// The device is gone; nothing created from it can be used again.
    #[error("GPU device lost: {0}")]
    DeviceLost(String),

    /// Acquiring the next swapchain image failed.
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("Viewport {width}x{height} has no area")]
    InvalidViewport { width: u32, height: u32 },

    #[error("No GPU adapter is compatible with the window surface")]
    AdapterUnavailable,

    #[error("Device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

impl RenderError {
    /// Whether the session has to stop rather than retry next frame.
    pub fn is_fatal(&self) -> bool {
        match self {
            RenderError::DeviceLost(_)
            | RenderError::AdapterUnavailable
            | RenderError::DeviceRequest(_) => true,
            RenderError::Surface(wgpu::SurfaceError::OutOfMemory) => true,
            RenderError::Surface(_) | RenderError::InvalidViewport { .. } => false,
        }
    }

    /// Lost or outdated surfaces only need the surface to be configured again.
    pub fn needs_reconfigure(&self) -> bool {
        matches!(
            self,
            RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)
        )
    }
}
