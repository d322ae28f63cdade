//! Geometry pass: fills position, normal and albedo/specular targets plus depth.
//! Scene objects are drawn per program bucket, then particles, then markers.

use glam::Mat4;
use umbra_scene::Scene;
use wgpu::CommandEncoder;

use crate::draw::DrawList;
use crate::error::RenderError;
use crate::markers::ControlPointMarkers;
use crate::particles::ParticlePass;
use crate::program::{GeometryProgram, GeometryShared};
use crate::resources::FrameResources;

pub struct GeometryPass {
    particles: ParticlePass,
    markers: ControlPointMarkers,
}

impl GeometryPass {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, shared: &GeometryShared) -> Result<Self, RenderError> {
        Ok(Self { particles: ParticlePass::new(device)?, markers: ControlPointMarkers::new(device, queue, shared) })
    }

    /// Uploads the extras drawn after scene objects. Markers are only kept while
    /// `show_markers` is set.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shared: &GeometryShared,
        scene: &Scene,
        view_proj: Mat4,
        show_markers: bool,
    ) {
        self.particles.prepare(device, queue, scene.particle_system(), view_proj);
        let controller = scene.camera_controller().filter(|_| show_markers);
        self.markers.prepare(device, queue, shared, controller);
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// `marker_program` must consume static meshes; markers are unit spheres.
    pub fn encode(
        &self,
        encoder: &mut CommandEncoder,
        frame: &FrameResources,
        programs: &[GeometryProgram],
        draws: &DrawList,
        marker_program: &GeometryProgram,
    ) {
        let position_view = frame.position_view();
        let normal_view = frame.normal_view();
        let albedo_view = frame.albedo_spec_view();
        let depth_view = frame.depth_view();
        // Cleared position.w = 0 marks background texels for the light pass.
        let clear = |view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT), store: wgpu::StoreOp::Store },
            })
        };
        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("gbuffer_pass"),
            color_attachments: &[clear(&position_view), clear(&normal_view), clear(&albedo_view)],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_view,
                depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                stencil_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(0), store: wgpu::StoreOp::Store }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        for batch in &draws.batches {
            let Some(program) = programs.get(batch.program.0) else {
                continue;
            };
            program.bind(&mut rp);
            for item in &batch.items {
                item.draw(&mut rp, true);
            }
        }
        self.particles.draw(&mut rp);
        self.markers.draw(&mut rp, marker_program);
    }
}
