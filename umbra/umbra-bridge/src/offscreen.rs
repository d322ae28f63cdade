//! Offscreen backend: renders into an RGBA8 texture and reads the pixels back.

use std::sync::mpsc;

use log::debug;
use umbra_renderer::{GpuAssets, Renderer, RendererConfig, Resolution};
use umbra_scene::MovingCamera;

use crate::error::BridgeError;
use crate::gpu::{fit_camera, request_device};

const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Rows in a texture-to-buffer copy are padded to 256 bytes.
fn padded_row_bytes(width: u32) -> u32 {
    (width * 4).next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
}

pub struct OffscreenBackend {
    renderer: Renderer,
    target: wgpu::Texture,
    resolution: Resolution,
}

impl OffscreenBackend {
    /// Always renders to `Rgba8Unorm`; `config.output_format` is overridden.
    pub fn new(width: u32, height: u32, config: RendererConfig) -> Result<Self, BridgeError> {
        let resolution = Resolution::new(width, height)?;
        let instance = wgpu::Instance::default();
        let (_adapter, device, queue) = pollster::block_on(request_device(&instance, None))?;
        let target = Self::create_target(&device, resolution);
        let config = RendererConfig { output_format: OUTPUT_FORMAT, ..config };
        let renderer = Renderer::new_with_config(device, queue, resolution, config)?;
        Ok(Self { renderer, target, resolution })
    }

    fn create_target(device: &wgpu::Device, resolution: Resolution) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen_target"),
            size: wgpu::Extent3d { width: resolution.width(), height: resolution.height(), depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
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

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), BridgeError> {
        let resolution = Resolution::new(width, height)?;
        if resolution == self.resolution {
            return Ok(());
        }
        debug!("resizing offscreen target to {width}x{height}");
        self.target = Self::create_target(self.renderer.device(), resolution);
        self.renderer.set_resolution(resolution);
        self.resolution = resolution;
        Ok(())
    }

    pub fn render(&mut self, assets: &GpuAssets, camera: &mut MovingCamera) -> Result<(), BridgeError> {
        let view = self.target.create_view(&Default::default());
        fit_camera(camera, self.resolution.width(), self.resolution.height());
        self.renderer.sync_camera(camera);
        self.renderer.draw(assets, camera, &view)?;
        Ok(())
    }

    /// Tightly packed RGBA8 rows, top row first.
    pub fn read_pixels(&self) -> Result<Vec<u8>, BridgeError> {
        let device = self.renderer.device();
        let (width, height) = (self.resolution.width(), self.resolution.height());
        let padded = padded_row_bytes(width);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen_readback"),
            size: u64::from(padded) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("offscreen_readback") });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout { offset: 0, bytes_per_row: Some(padded), rows_per_image: Some(height) },
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
        self.renderer.queue().submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| BridgeError::Readback(e.to_string()))?
            .map_err(|e| BridgeError::Readback(e.to_string()))?;

        let row_bytes = (width * 4) as usize;
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(padded as usize) {
                pixels.extend_from_slice(&row[..row_bytes]);
            }
        }
        buffer.unmap();
        Ok(pixels)
    }

    /// Renders one frame and returns its pixels.
    pub fn render_to_pixels(&mut self, assets: &GpuAssets, camera: &mut MovingCamera) -> Result<Vec<u8>, BridgeError> {
        self.render(assets, camera)?;
        self.read_pixels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readback_rows_are_aligned() {
        assert_eq!(padded_row_bytes(1), 256);
        assert_eq!(padded_row_bytes(64), 256);
        assert_eq!(padded_row_bytes(65), 512);
    }
}
