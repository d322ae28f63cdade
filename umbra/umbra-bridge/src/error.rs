use thiserror::Error;
use umbra_renderer::RenderError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no suitable GPU adapter")]
    NoAdapter,
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("surface error: {0}")]
    Surface(wgpu::SurfaceError),
    #[error("pixel readback failed: {0}")]
    Readback(String),
    #[error(transparent)]
    Render(#[from] RenderError),
}
