//! Particle field drawn as points into the G-buffer. The buffer is uploaded once
//! per particle set; motion is evaluated in the vertex shader from the scene clock.

use glam::Mat4;
use log::debug;
use umbra_scene::{Particle, ParticleSystem};

use crate::error::{validated, RenderError};
use crate::resources::{DEPTH_FORMAT, GBUFFER_FORMAT};

const PARTICLES_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/particles.wgsl"));

const PARTICLE_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32,
    3 => Uint32
];

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ParticleFrame {
    view_proj: [f32; 16],
    time: [f32; 4],
}

struct UploadedParticles {
    revision: u64,
    buffer: wgpu::Buffer,
    count: u32,
}

pub struct ParticlePass {
    pipeline: wgpu::RenderPipeline,
    frame_buf: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    uploaded: Option<UploadedParticles>,
}

impl ParticlePass {
    pub fn new(device: &wgpu::Device) -> Result<Self, RenderError> {
        let frame_size = std::mem::size_of::<ParticleFrame>() as u64;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("particles_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(frame_size),
                },
                count: None,
            }],
        });
        let pipeline = validated(device, "particles_pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("particles_shader"),
                source: wgpu::ShaderSource::Wgsl(PARTICLES_WGSL.into()),
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("particles_pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("particles_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Particle>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &PARTICLE_ATTRIBUTES,
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &[
                        Some(GBUFFER_FORMAT.into()),
                        Some(GBUFFER_FORMAT.into()),
                        Some(GBUFFER_FORMAT.into()),
                    ],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::PointList,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;
        let frame_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("particles_frame"),
            size: frame_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("particles_bind_group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buf.as_entire_binding() }],
        });
        Ok(Self { pipeline, frame_buf, bind_group, uploaded: None })
    }

    /// Re-uploads when the particle set changed and writes this frame's clock.
    /// Returns false when there is nothing to draw.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, system: Option<&ParticleSystem>, view_proj: Mat4) -> bool {
        let Some(system) = system.filter(|s| !s.is_empty()) else {
            self.uploaded = None;
            return false;
        };
        if self.uploaded.as_ref().map(|u| u.revision) != Some(system.revision()) {
            debug!("uploading {} particles", system.len());
            let bytes: &[u8] = bytemuck::cast_slice(system.particles());
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("particles"),
                size: bytes.len() as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            queue.write_buffer(&buffer, 0, bytes);
            self.uploaded = Some(UploadedParticles { revision: system.revision(), buffer, count: system.len() as u32 });
        }
        let frame = ParticleFrame { view_proj: view_proj.to_cols_array(), time: [system.time(), 0.0, 0.0, 0.0] };
        queue.write_buffer(&self.frame_buf, 0, bytemuck::bytes_of(&frame));
        true
    }

    /// Draws into an already open G-buffer pass.
    pub fn draw(&self, rp: &mut wgpu::RenderPass<'_>) {
        let Some(uploaded) = &self.uploaded else {
            return;
        };
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, &self.bind_group, &[]);
        rp.set_vertex_buffer(0, uploaded.buffer.slice(..));
        rp.draw(0..uploaded.count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_match_particle_layout() {
        assert_eq!(std::mem::size_of::<Particle>(), 32);
        let offsets: Vec<u64> = PARTICLE_ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24, 28]);
    }
}
