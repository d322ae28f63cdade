//! Adapter and device selection shared by the window and offscreen backends.

use log::info;
use umbra_scene::MovingCamera;

use crate::error::BridgeError;

pub(crate) async fn request_device(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), BridgeError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(BridgeError::NoAdapter)?;
    let adapter_info = adapter.get_info();
    info!("using adapter `{}` ({:?})", adapter_info.name, adapter_info.backend);
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor { label: Some("umbra_device"), ..Default::default() },
            None,
        )
        .await?;
    Ok((adapter, device, queue))
}

/// Keeps the camera's aspect ratio in step with the render target without
/// dirtying it every frame.
pub(crate) fn fit_camera(camera: &mut MovingCamera, width: u32, height: u32) {
    if height == 0 {
        return;
    }
    let aspect = width as f32 / height as f32;
    if (camera.aspect_ratio() - aspect).abs() > f32::EPSILON {
        camera.set_resolution(width, height);
    }
}
