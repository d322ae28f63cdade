//! Window-capable backend: owns the surface and the renderer, presents one frame per call.

use std::sync::Arc;

use log::{debug, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use umbra_renderer::{GpuAssets, Renderer, RendererConfig, Resolution};
use umbra_scene::MovingCamera;

use crate::error::BridgeError;
use crate::gpu::{fit_camera, request_device};

/// Backend presenting to a window. The surface holds a shared handle to the
/// window, so it stays valid for the backend's whole lifetime.
pub struct UmbraWindowBackend {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    /// Non-sRGB view format the tone-map pass writes; gamma is applied in the shader.
    output_format: wgpu::TextureFormat,
    renderer: Renderer,
}

impl UmbraWindowBackend {
    /// `config.output_format` is replaced by the surface's non-sRGB format. A zero
    /// extent fails with `InvalidResolution` before the window is touched.
    pub fn from_window<W>(window: Arc<W>, width: u32, height: u32, config: RendererConfig) -> Result<Self, BridgeError>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let resolution = Resolution::new(width, height)?;
        pollster::block_on(Self::from_window_async(window, resolution, config))
    }

    async fn from_window_async<W>(
        window: Arc<W>,
        resolution: Resolution,
        config: RendererConfig,
    ) -> Result<Self, BridgeError>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let (adapter, device, queue) = request_device(&instance, Some(&surface)).await?;
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Rgba8Unorm);
        let output_format = surface_format.remove_srgb_suffix();
        let surface_config = Self::surface_config(surface_format, output_format, resolution);
        surface.configure(&device, &surface_config);
        debug!("surface configured as {surface_format:?}, drawing through {output_format:?}");
        let config = RendererConfig { output_format, ..config };
        let renderer = Renderer::new_with_config(device, queue, resolution, config)?;
        Ok(Self { surface, surface_config, output_format, renderer })
    }

    fn surface_config(
        format: wgpu::TextureFormat,
        output_format: wgpu::TextureFormat,
        resolution: Resolution,
    ) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: resolution.width(),
            height: resolution.height(),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: if output_format == format { vec![] } else { vec![output_format] },
            desired_maximum_frame_latency: 2,
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn device(&self) -> &wgpu::Device {
        self.renderer.device()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.renderer.queue()
    }

    /// Reconfigures the surface and rebuilds the renderer's targets. Zero-sized
    /// events (minimized windows) are ignored; returns whether anything changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let Ok(resolution) = Resolution::new(width, height) else {
            debug!("ignoring resize to {width}x{height}");
            return false;
        };
        self.surface_config.width = resolution.width();
        self.surface_config.height = resolution.height();
        self.surface.configure(self.renderer.device(), &self.surface_config);
        self.renderer.set_resolution(resolution);
        true
    }

    /// Renders and presents one frame. Returns `Ok(false)` when the frame was
    /// skipped because the surface was outdated, lost or timed out.
    pub fn render(&mut self, assets: &GpuAssets, camera: &mut MovingCamera) -> Result<bool, BridgeError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                warn!("surface outdated or lost, reconfiguring and skipping frame");
                self.surface.configure(self.renderer.device(), &self.surface_config);
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timed out, skipping frame");
                return Ok(false);
            }
            Err(e) => return Err(BridgeError::Surface(e)),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.output_format),
            ..Default::default()
        });
        fit_camera(camera, self.surface_config.width, self.surface_config.height);
        self.renderer.sync_camera(camera);
        self.renderer.draw(assets, camera, &view)?;
        frame.present();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raw_window_handle::{DisplayHandle, HandleError, WindowHandle};
    use umbra_renderer::RenderError;

    /// Window whose handles are never available.
    struct Headless;

    impl HasWindowHandle for Headless {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    impl HasDisplayHandle for Headless {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    #[test]
    fn zero_sized_window_is_rejected() {
        for (w, h) in [(0, 600), (800, 0), (0, 0)] {
            let err = UmbraWindowBackend::from_window(Arc::new(Headless), w, h, RendererConfig::default())
                .err()
                .unwrap();
            assert!(
                matches!(err, BridgeError::Render(RenderError::InvalidResolution { width, height }) if (width, height) == (w, h)),
                "{w}x{h}: {err}"
            );
        }
    }

    #[test]
    fn surface_config_adds_view_format_only_when_needed() {
        let resolution = Resolution::new(640, 480).unwrap();
        let srgb = wgpu::TextureFormat::Bgra8UnormSrgb;
        let linear = srgb.remove_srgb_suffix();
        let config = UmbraWindowBackend::surface_config(srgb, linear, resolution);
        assert_eq!(config.view_formats, vec![linear]);
        assert_eq!((config.width, config.height), (640, 480));
        let config = UmbraWindowBackend::surface_config(linear, linear, resolution);
        assert!(config.view_formats.is_empty());
    }
}
