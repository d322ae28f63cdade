//! Renderer configuration and debug-UI tunables.

use std::ops::RangeInclusive;

/// Slider range for [`RendererConfig::exposure`].
pub const EXPOSURE_RANGE: RangeInclusive<f32> = 0.0..=2.0;
/// Slider range for [`RendererConfig::gamma`].
pub const GAMMA_RANGE: RangeInclusive<f32> = 0.5..=5.0;
/// Slider range for [`RendererConfig::blur_amount`].
pub const BLUR_AMOUNT_RANGE: RangeInclusive<u32> = 2..=20;

#[derive(Clone, Debug)]
pub struct RendererConfig {
    /// Format of the texture the tone-map pass writes to (swapchain or offscreen).
    /// Use a non-sRGB format: gamma is applied in the shader.
    pub output_format: wgpu::TextureFormat,
    /// Edge length of the directional shadow map and of each cube-map face.
    pub shadow_resolution: u32,
    pub exposure: f32,
    pub gamma: f32,
    /// Number of separable blur iterations applied to the bright buffer.
    pub blur_amount: u32,
    /// Luminance above which a lit pixel feeds the bloom.
    pub bright_threshold: f32,
    /// Draw camera-path control points as spheres in the geometry pass.
    pub show_camera_control_points: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            output_format: wgpu::TextureFormat::Rgba8Unorm,
            shadow_resolution: 1024,
            exposure: 1.0,
            gamma: 2.2,
            blur_amount: 10,
            bright_threshold: 1.0,
            show_camera_control_points: false,
        }
    }
}
