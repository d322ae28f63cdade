//! Frame resources: G-buffer (3 RTs + depth/stencil), lighting targets, bloom
//! ping-pong pair. Shadow maps live apart since their size does not follow the viewport.

use log::debug;
use wgpu::TextureView;

use crate::error::RenderError;

pub const GBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Viewport size, validated non-zero on construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidResolution { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d { width: self.width, height: self.height, depth_or_array_layers: 1 }
    }
}

pub struct FrameResources {
    pub position: wgpu::Texture,
    pub normal: wgpu::Texture,
    pub albedo_spec: wgpu::Texture,
    pub depth: wgpu::Texture,
    pub lit_color: wgpu::Texture,
    pub bright: wgpu::Texture,
    pub ping_pong: [wgpu::Texture; 2],
    resolution: Resolution,
}

impl FrameResources {
    /// Returns `existing` if it already has `resolution`, otherwise a complete new set.
    pub fn ensure_size(device: &wgpu::Device, existing: Option<Self>, resolution: Resolution) -> Self {
        if let Some(r) = existing {
            if r.resolution == resolution {
                return r;
            }
        }
        debug!("rebuilding frame resources at {}x{}", resolution.width, resolution.height);
        let make_rt = |label: &str, format: wgpu::TextureFormat| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: resolution.extent(),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        };
        Self {
            position: make_rt("gbuffer_position", GBUFFER_FORMAT),
            normal: make_rt("gbuffer_normal", GBUFFER_FORMAT),
            albedo_spec: make_rt("gbuffer_albedo_spec", GBUFFER_FORMAT),
            depth: make_rt("gbuffer_depth", DEPTH_FORMAT),
            lit_color: make_rt("lit_color", HDR_FORMAT),
            bright: make_rt("bright_color", HDR_FORMAT),
            ping_pong: [make_rt("bloom_ping", HDR_FORMAT), make_rt("bloom_pong", HDR_FORMAT)],
            resolution,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn position_view(&self) -> TextureView { self.position.create_view(&Default::default()) }
    pub fn normal_view(&self) -> TextureView { self.normal.create_view(&Default::default()) }
    pub fn albedo_spec_view(&self) -> TextureView { self.albedo_spec.create_view(&Default::default()) }
    pub fn depth_view(&self) -> TextureView { self.depth.create_view(&Default::default()) }
    pub fn lit_color_view(&self) -> TextureView { self.lit_color.create_view(&Default::default()) }
    pub fn bright_view(&self) -> TextureView { self.bright.create_view(&Default::default()) }
    pub fn ping_pong_view(&self, index: usize) -> TextureView {
        self.ping_pong[index & 1].create_view(&Default::default())
    }
}

/// Directional depth map and 6-layer omni cube map, created once.
pub struct ShadowMaps {
    pub directional: wgpu::Texture,
    pub cube: wgpu::Texture,
    size: u32,
}

impl ShadowMaps {
    pub fn new(device: &wgpu::Device, size: u32) -> Self {
        let size = size.max(1);
        let make = |label: &str, layers: u32| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d { width: size, height: size, depth_or_array_layers: layers },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: SHADOW_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
        };
        Self { directional: make("shadow_directional", 1), cube: make("shadow_cube", 6), size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn directional_view(&self) -> TextureView {
        self.directional.create_view(&Default::default())
    }

    /// Whole cube, for sampling in the lighting pass.
    pub fn cube_view(&self) -> TextureView {
        self.cube.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow_cube_view"),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        })
    }

    /// One face as a 2D depth attachment. Layer order: +X, -X, +Y, -Y, +Z, -Z.
    pub fn cube_face_view(&self, face: u32) -> TextureView {
        self.cube.create_view(&wgpu::TextureViewDescriptor {
            label: Some("shadow_cube_face"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_array_layer: face,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_extent_is_rejected() {
        assert!(matches!(Resolution::new(0, 10), Err(RenderError::InvalidResolution { width: 0, height: 10 })));
        assert!(Resolution::new(10, 0).is_err());
        let r = Resolution::new(640, 480).unwrap();
        assert_eq!((r.width(), r.height()), (640, 480));
    }
}
