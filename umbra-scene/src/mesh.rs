//! CPU-side vertex data handed to the renderer's asset table.

use std::f32::consts::PI;

use glam::Vec3;

/// Static mesh vertex, 32 bytes (position, normal, uv).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Skinned vertex, 64 bytes: four bone influences on top of [`Vertex`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkinnedVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub bone_ids: [u32; 4],
    pub weights: [f32; 4],
}

#[derive(Clone, Debug, Default)]
pub struct MeshData<V> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
}

impl<V> MeshData<V> {
    pub fn new(vertices: Vec<V>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

impl MeshData<Vertex> {
    /// Unit cube centered at the origin, one quad per face, counter-clockwise winding.
    pub fn cube() -> Self {
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, right, up) in faces {
            let base = vertices.len() as u32;
            let center = normal * 0.5;
            for (u, v) in [(0.0f32, 0.0f32), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let p = center + right * (u - 0.5) + up * (v - 0.5);
                vertices.push(Vertex { position: p.to_array(), normal: normal.to_array(), uv: [u, 1.0 - v] });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        Self { vertices, indices }
    }

    /// UV sphere of radius 1.
    pub fn uv_sphere(sectors: u32, stacks: u32) -> Self {
        let sectors = sectors.max(3);
        let stacks = stacks.max(2);
        let mut vertices = Vec::with_capacity(((sectors + 1) * (stacks + 1)) as usize);
        for i in 0..=stacks {
            let phi = PI / 2.0 - PI * i as f32 / stacks as f32;
            let (y, ring) = (phi.sin(), phi.cos());
            for j in 0..=sectors {
                let theta = 2.0 * PI * j as f32 / sectors as f32;
                let n = Vec3::new(ring * theta.cos(), y, -ring * theta.sin());
                vertices.push(Vertex {
                    position: n.to_array(),
                    normal: n.to_array(),
                    uv: [j as f32 / sectors as f32, i as f32 / stacks as f32],
                });
            }
        }
        let mut indices = Vec::with_capacity((sectors * stacks * 6) as usize);
        for i in 0..stacks {
            for j in 0..sectors {
                let k1 = i * (sectors + 1) + j;
                let k2 = k1 + sectors + 1;
                if i != 0 {
                    indices.extend_from_slice(&[k1, k2, k1 + 1]);
                }
                if i != stacks - 1 {
                    indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
                }
            }
        }
        Self { vertices, indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winding_normal(mesh: &MeshData<Vertex>, tri: usize) -> Vec3 {
        let p = |i: usize| Vec3::from_array(mesh.vertices[mesh.indices[tri * 3 + i] as usize].position);
        (p(1) - p(0)).cross(p(2) - p(0))
    }

    #[test]
    fn cube_faces_wind_outward() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);
        for tri in 0..12 {
            let n = Vec3::from_array(cube.vertices[cube.indices[tri * 3] as usize].normal);
            assert!(winding_normal(&cube, tri).dot(n) > 0.0, "triangle {tri} faces inward");
        }
    }

    #[test]
    fn sphere_winds_outward() {
        let sphere = MeshData::uv_sphere(16, 8);
        for tri in 0..sphere.indices.len() / 3 {
            let centroid: Vec3 = (0..3)
                .map(|i| Vec3::from_array(sphere.vertices[sphere.indices[tri * 3 + i] as usize].position))
                .sum::<Vec3>()
                / 3.0;
            assert!(winding_normal(&sphere, tri).dot(centroid) > 0.0, "triangle {tri} faces inward");
        }
    }

    #[test]
    fn vertex_strides() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(std::mem::size_of::<SkinnedVertex>(), 64);
    }
}
