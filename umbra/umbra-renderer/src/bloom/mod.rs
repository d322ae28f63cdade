//! Bloom: separable Gaussian blur ping-ponging between two HDR targets.

use wgpu::CommandEncoder;

use crate::error::{validated, RenderError};
use crate::resources::{FrameResources, HDR_FORMAT};

const FULLSCREEN_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/fullscreen.wgsl"));
const BLUR_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/blur.wgsl"));

/// Texture holding the final bloom result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BloomSource {
    /// No blur ran; the bright buffer is used as-is.
    Bright,
    PingPong(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurStep {
    pub horizontal: bool,
    pub read: BloomSource,
    /// Ping-pong index written by this step.
    pub write: usize,
}

/// Step `i` blurs horizontally when `i` is even and writes ping-pong `1 - i % 2`;
/// every step after the first reads what the previous one wrote.
pub fn blur_schedule(amount: u32) -> Vec<BlurStep> {
    let mut steps = Vec::with_capacity(amount as usize);
    let mut read = BloomSource::Bright;
    for i in 0..amount as usize {
        let write = 1 - i % 2;
        steps.push(BlurStep { horizontal: i % 2 == 0, read, write });
        read = BloomSource::PingPong(write);
    }
    steps
}

/// Where the result of `amount` iterations ends up.
pub fn blur_result(amount: u32) -> BloomSource {
    blur_schedule(amount).last().map_or(BloomSource::Bright, |step| BloomSource::PingPong(step.write))
}

pub(crate) fn source_view(frame: &FrameResources, source: BloomSource) -> wgpu::TextureView {
    match source {
        BloomSource::Bright => frame.bright_view(),
        BloomSource::PingPong(index) => frame.ping_pong_view(index),
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurParams {
    direction: [u32; 4],
}

pub struct BlurPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    /// [vertical, horizontal]; each step binds one, so both are written once up front.
    direction_bufs: [wgpu::Buffer; 2],
}

impl BlurPass {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self, RenderError> {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blur_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
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
        let pipeline = validated(device, "blur_pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("blur_shader"),
                source: wgpu::ShaderSource::Wgsl(format!("{FULLSCREEN_WGSL}\n{BLUR_WGSL}").into()),
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("blur_pipeline_layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("blur_pipeline"),
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
                    targets: &[Some(HDR_FORMAT.into())],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;
        let direction_bufs = [0u32, 1].map(|horizontal| {
            let buf = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(if horizontal == 1 { "blur_horizontal" } else { "blur_vertical" }),
                size: std::mem::size_of::<BlurParams>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            queue.write_buffer(&buf, 0, bytemuck::bytes_of(&BlurParams { direction: [horizontal, 0, 0, 0] }));
            buf
        });
        Ok(Self { pipeline, bind_group_layout, direction_bufs })
    }

    /// Runs `amount` blur steps over the bright buffer and returns where the result is.
    pub fn encode(&self, encoder: &mut CommandEncoder, device: &wgpu::Device, frame: &FrameResources, amount: u32) -> BloomSource {
        let steps = blur_schedule(amount);
        for step in &steps {
            let read_view = source_view(frame, step.read);
            let write_view = frame.ping_pong_view(step.write);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("blur_bind_group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&read_view) },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.direction_bufs[usize::from(step.horizontal)].as_entire_binding(),
                    },
                ],
            });
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blur_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &write_view,
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
        blur_result(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_iterations_is_identity() {
        assert!(blur_schedule(0).is_empty());
        assert_eq!(blur_result(0), BloomSource::Bright);
    }

    #[test]
    fn single_iteration_blurs_once() {
        assert_eq!(
            blur_schedule(1),
            vec![BlurStep { horizontal: true, read: BloomSource::Bright, write: 1 }]
        );
        assert_eq!(blur_result(1), BloomSource::PingPong(1));
    }

    #[test]
    fn steps_alternate_and_chain() {
        let steps = blur_schedule(10);
        assert_eq!(steps.len(), 10);
        for pair in steps.windows(2) {
            assert_ne!(pair[0].horizontal, pair[1].horizontal);
            assert_ne!(pair[0].write, pair[1].write);
            assert_eq!(pair[1].read, BloomSource::PingPong(pair[0].write));
        }
        assert_eq!(steps[0].read, BloomSource::Bright);
    }

    #[test]
    fn result_index_depends_on_parity() {
        for amount in 1..=20 {
            let expected = if amount % 2 == 1 { 1 } else { 0 };
            assert_eq!(blur_result(amount), BloomSource::PingPong(expected));
        }
    }

    #[test]
    fn no_step_reads_what_it_writes() {
        for step in blur_schedule(7) {
            assert_ne!(step.read, BloomSource::PingPong(step.write));
        }
    }
}
