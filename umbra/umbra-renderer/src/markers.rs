//! Camera-path control points drawn as small spheres through the static program.

use glam::{Mat4, Vec3};
use umbra_scene::{CameraController, MeshData};

use crate::assets::{GpuMesh, VertexKind};
use crate::program::{GeometryProgram, GeometryShared, ObjectUniform};

const MARKER_SCALE: f32 = 0.1;
const MOVEMENT_COLOR: Vec3 = Vec3::new(0.1, 0.9, 0.2);
const TARGET_COLOR: Vec3 = Vec3::new(1.0, 0.1, 0.2);

/// Position and color of every marker: movement points first, then target points.
pub fn marker_instances(controller: &CameraController) -> Vec<(Vec3, Vec3)> {
    controller
        .movement_control_points()
        .map(|p| (p, MOVEMENT_COLOR))
        .chain(controller.target_control_points().map(|p| (p, TARGET_COLOR)))
        .collect()
}

pub struct ControlPointMarkers {
    sphere: GpuMesh,
    material: wgpu::BindGroup,
    revision: Option<u64>,
    objects: Vec<wgpu::BindGroup>,
}

impl ControlPointMarkers {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, shared: &GeometryShared) -> Self {
        let sphere = GpuMesh::upload(device, queue, "marker_sphere", &MeshData::uv_sphere(12, 8), VertexKind::Static);
        let material = shared.material_bind_group(device, None, None);
        Self { sphere, material, revision: None, objects: Vec::new() }
    }

    /// Rebuilds marker uniforms only when the controller's splines changed.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shared: &GeometryShared,
        controller: Option<&CameraController>,
    ) {
        let Some(controller) = controller else {
            self.revision = None;
            self.objects.clear();
            return;
        };
        if self.revision == Some(controller.revision()) {
            return;
        }
        self.objects = marker_instances(controller)
            .into_iter()
            .map(|(position, color)| {
                let model = Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(MARKER_SCALE));
                shared.object_bind_group(device, queue, &ObjectUniform::solid(model, color, 0.0), None)
            })
            .collect();
        self.revision = Some(controller.revision());
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn draw(&self, rp: &mut wgpu::RenderPass<'_>, program: &GeometryProgram) {
        if self.objects.is_empty() {
            return;
        }
        program.bind(rp);
        rp.set_bind_group(2, &self.material, &[]);
        rp.set_vertex_buffer(0, self.sphere.vertex_buf.slice(..));
        rp.set_index_buffer(self.sphere.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        for object in &self.objects {
            rp.set_bind_group(1, object, &[]);
            rp.draw_indexed(0..self.sphere.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_scene::Spline;

    #[test]
    fn markers_cover_both_splines() {
        let movement = Spline::from_curves(vec![vec![Vec3::ZERO, Vec3::X, Vec3::Y]]);
        let target = Spline::from_curves(vec![vec![Vec3::Z, Vec3::ONE]]);
        let controller = CameraController::new(movement, target, 4.0);
        let markers = marker_instances(&controller);
        assert_eq!(markers.len(), 5);
        assert!(markers[..3].iter().all(|(_, c)| *c == MOVEMENT_COLOR));
        assert!(markers[3..].iter().all(|(_, c)| *c == TARGET_COLOR));
        assert_eq!(markers[3].0, Vec3::Z);
    }
}
