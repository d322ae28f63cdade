//! Tone-map pass: lit color plus bloom, exposure curve and gamma, written straight
//! to the output target.

use wgpu::CommandEncoder;

use crate::bloom::{source_view, BloomSource};
use crate::error::{validated, RenderError};
use crate::resources::FrameResources;

const FULLSCREEN_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/fullscreen.wgsl"));
const TONEMAP_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/tonemap.wgsl"));

/// CPU version of the tone curve, per channel.
pub fn tone_map(hdr: f32, exposure: f32, gamma: f32) -> f32 {
    let mapped = 1.0 - (-hdr * exposure).exp();
    mapped.powf(1.0 / gamma)
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ToneParams {
    values: [f32; 4],
}

pub struct ToneMapPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buf: wgpu::Buffer,
}

impl ToneMapPass {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        let hdr_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tonemap_bind_group_layout"),
            entries: &[
                hdr_entry(0),
                hdr_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline = validated(device, "tonemap_pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("tonemap_shader"),
                source: wgpu::ShaderSource::Wgsl(format!("{FULLSCREEN_WGSL}\n{TONEMAP_WGSL}").into()),
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tonemap_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("tonemap_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_fullscreen"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &[Some(output_format.into())],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;
        let params_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tonemap_params"),
            size: std::mem::size_of::<ToneParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self { pipeline, bind_group_layout, params_buf })
    }

    pub fn write_params(&self, queue: &wgpu::Queue, exposure: f32, gamma: f32) {
        queue.write_buffer(&self.params_buf, 0, bytemuck::bytes_of(&ToneParams { values: [exposure, gamma, 0.0, 0.0] }));
    }

    pub fn encode(
        &self,
        encoder: &mut CommandEncoder,
        device: &wgpu::Device,
        frame: &FrameResources,
        bloom: BloomSource,
        target: &wgpu::TextureView,
    ) {
        let color_view = frame.lit_color_view();
        let bloom_view = source_view(frame, bloom);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tonemap_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&color_view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&bloom_view) },
                wgpu::BindGroupEntry { binding: 2, resource: self.params_buf.as_entire_binding() },
            ],
        });
        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tonemap_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::BLACK), store: wgpu::StoreOp::Store },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, &bind_group, &[]);
        rp.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_stays_black() {
        assert_eq!(tone_map(0.0, 1.0, 2.2), 0.0);
    }

    #[test]
    fn curve_is_monotonic_and_bounded() {
        let mut last = 0.0;
        for i in 1..40 {
            let v = tone_map(i as f32 * 0.25, 1.0, 2.2);
            assert!(v > last && v < 1.0 + 1e-6);
            last = v;
        }
    }

    #[test]
    fn exposure_scales_input() {
        assert!((tone_map(1.0, 2.0, 1.0) - tone_map(2.0, 1.0, 1.0)).abs() < 1e-6);
        assert!(tone_map(0.5, 2.0, 2.2) > tone_map(0.5, 0.5, 2.2));
    }
}
