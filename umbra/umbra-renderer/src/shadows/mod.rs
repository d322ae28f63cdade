//! Shadow passes: directional depth map (orthographic, from the light direction)
//! and omnidirectional cube map around point light 0. Both cull front faces.

use glam::{Mat4, Vec3};
use wgpu::CommandEncoder;

use crate::assets::VertexKind;
use crate::draw::DrawList;
use crate::error::{validated, RenderError};
use crate::program::{GeometryShared, OBJECT_WGSL};
use crate::resources::{ShadowMaps, SHADOW_FORMAT};

const SHADOW_DIR_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/shadow_dir.wgsl"));
const SHADOW_CUBE_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/shadow_cube.wgsl"));

/// Half extent of the orthographic light frustum.
pub const DIR_SHADOW_EXTENT: f32 = 10.0;
pub const DIR_SHADOW_NEAR: f32 = 1.0;
pub const DIR_SHADOW_FAR: f32 = 7.5;
/// Distance of the virtual light position from the origin along its direction.
pub const DIR_SHADOW_DISTANCE: f32 = 5.0;

pub const OMNI_SHADOW_NEAR: f32 = 0.75;
pub const OMNI_SHADOW_FAR: f32 = 25.0;

/// Orthographic light-space matrix for a directional light pointing along
/// `direction` (toward the light) at the origin.
pub fn light_space_matrix(direction: Vec3) -> Mat4 {
    let dir = direction.normalize_or(Vec3::Y);
    let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 { Vec3::Z } else { Vec3::Y };
    let view = Mat4::look_at_rh(dir * DIR_SHADOW_DISTANCE, Vec3::ZERO, up);
    let projection = Mat4::orthographic_rh(
        -DIR_SHADOW_EXTENT,
        DIR_SHADOW_EXTENT,
        -DIR_SHADOW_EXTENT,
        DIR_SHADOW_EXTENT,
        DIR_SHADOW_NEAR,
        DIR_SHADOW_FAR,
    );
    projection * view
}

/// View-projection for each cube face in layer order +X, -X, +Y, -Y, +Z, -Z.
///
/// Y is flipped in clip space so the rendered faces line up with cube-map
/// sampling; the flip reverses winding, which the pipeline compensates for.
pub fn cube_face_matrices(light_pos: Vec3) -> [Mat4; 6] {
    let projection = Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
        * Mat4::perspective_rh(90f32.to_radians(), 1.0, OMNI_SHADOW_NEAR, OMNI_SHADOW_FAR);
    let faces = [
        (Vec3::X, Vec3::NEG_Y),
        (Vec3::NEG_X, Vec3::NEG_Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::NEG_Z),
        (Vec3::Z, Vec3::NEG_Y),
        (Vec3::NEG_Z, Vec3::NEG_Y),
    ];
    faces.map(|(dir, up)| projection * Mat4::look_at_rh(light_pos, light_pos + dir, up))
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CubeFaceUniform {
    view_proj: [f32; 16],
    light: [f32; 4],
}

/// One depth pipeline per vertex kind.
struct ShadowPipelines {
    static_mesh: wgpu::RenderPipeline,
    skinned_mesh: wgpu::RenderPipeline,
}

impl ShadowPipelines {
    fn new(
        device: &wgpu::Device,
        label: &str,
        source: &str,
        light_layout: &wgpu::BindGroupLayout,
        shared: &GeometryShared,
        front_face: wgpu::FrontFace,
        fragment_entry: Option<&str>,
    ) -> Result<Self, RenderError> {
        validated(device, label, || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[light_layout, &shared.object_layout],
                push_constant_ranges: &[],
            });
            let build = |kind: VertexKind, entry: &str| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some(label),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some(entry),
                        buffers: &[kind.layout()],
                        compilation_options: Default::default(),
                    },
                    fragment: fragment_entry.map(|entry| wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some(entry),
                        targets: &[],
                        compilation_options: Default::default(),
                    }),
                    primitive: wgpu::PrimitiveState {
                        front_face,
                        cull_mode: Some(wgpu::Face::Front),
                        ..Default::default()
                    },
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: SHADOW_FORMAT,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::Less,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState::default(),
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            };
            Self {
                static_mesh: build(VertexKind::Static, "vs_static"),
                skinned_mesh: build(VertexKind::Skinned, "vs_skinned"),
            }
        })
    }

    fn get(&self, kind: VertexKind) -> &wgpu::RenderPipeline {
        match kind {
            VertexKind::Static => &self.static_mesh,
            VertexKind::Skinned => &self.skinned_mesh,
        }
    }
}

fn light_layout(device: &wgpu::Device, label: &str, size: u64, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: std::num::NonZeroU64::new(size),
            },
            count: None,
        }],
    })
}

fn draw_depth(rp: &mut wgpu::RenderPass<'_>, pipelines: &ShadowPipelines, draws: &DrawList) {
    let mut bound = None;
    for item in draws.items() {
        if bound != Some(item.mesh.kind) {
            rp.set_pipeline(pipelines.get(item.mesh.kind));
            bound = Some(item.mesh.kind);
        }
        item.draw(rp, false);
    }
}

fn depth_pass<'e>(encoder: &'e mut CommandEncoder, label: &str, view: &wgpu::TextureView) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

pub struct DirectionalShadowPass {
    pipelines: ShadowPipelines,
    light_buf: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl DirectionalShadowPass {
    pub fn new(device: &wgpu::Device, shared: &GeometryShared) -> Result<Self, RenderError> {
        let layout = light_layout(device, "shadow_dir_bind_group_layout", 64, wgpu::ShaderStages::VERTEX);
        let source = format!("{OBJECT_WGSL}\n{SHADOW_DIR_WGSL}");
        let pipelines =
            ShadowPipelines::new(device, "shadow_dir", &source, &layout, shared, wgpu::FrontFace::Ccw, None)?;
        let light_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadow_dir_light_space"),
            size: 64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow_dir_bind_group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: light_buf.as_entire_binding() }],
        });
        Ok(Self { pipelines, light_buf, bind_group })
    }

    pub fn write_light_space(&self, queue: &wgpu::Queue, light_space: Mat4) {
        queue.write_buffer(&self.light_buf, 0, bytemuck::cast_slice(&light_space.to_cols_array()));
    }

    pub fn encode(&self, encoder: &mut CommandEncoder, maps: &ShadowMaps, draws: &DrawList) {
        let view = maps.directional_view();
        let mut rp = depth_pass(encoder, "shadow_dir_pass", &view);
        rp.set_bind_group(0, &self.bind_group, &[]);
        draw_depth(&mut rp, &self.pipelines, draws);
    }
}

pub struct OmniShadowPass {
    pipelines: ShadowPipelines,
    face_bufs: Vec<wgpu::Buffer>,
    face_bind_groups: Vec<wgpu::BindGroup>,
}

impl OmniShadowPass {
    pub fn new(device: &wgpu::Device, shared: &GeometryShared) -> Result<Self, RenderError> {
        let size = std::mem::size_of::<CubeFaceUniform>() as u64;
        let layout = light_layout(device, "shadow_cube_bind_group_layout", size, wgpu::ShaderStages::VERTEX_FRAGMENT);
        let source = format!("{OBJECT_WGSL}\n{SHADOW_CUBE_WGSL}");
        // The clip-space Y flip turns counter-clockwise triangles clockwise.
        let pipelines =
            ShadowPipelines::new(device, "shadow_cube", &source, &layout, shared, wgpu::FrontFace::Cw, Some("fs"))?;
        let face_bufs: Vec<wgpu::Buffer> = (0..6)
            .map(|_| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("shadow_cube_face"),
                    size,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();
        let face_bind_groups = face_bufs
            .iter()
            .map(|buf| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("shadow_cube_face_bind_group"),
                    layout: &layout,
                    entries: &[wgpu::BindGroupEntry { binding: 0, resource: buf.as_entire_binding() }],
                })
            })
            .collect();
        Ok(Self { pipelines, face_bufs, face_bind_groups })
    }

    pub fn write_faces(&self, queue: &wgpu::Queue, light_pos: Vec3) {
        for (buf, view_proj) in self.face_bufs.iter().zip(cube_face_matrices(light_pos)) {
            let uniform = CubeFaceUniform {
                view_proj: view_proj.to_cols_array(),
                light: light_pos.extend(OMNI_SHADOW_FAR).to_array(),
            };
            queue.write_buffer(buf, 0, bytemuck::bytes_of(&uniform));
        }
    }

    /// Six face passes into the cube map layers.
    pub fn encode(&self, encoder: &mut CommandEncoder, maps: &ShadowMaps, draws: &DrawList) {
        for (face, bind_group) in self.face_bind_groups.iter().enumerate() {
            let view = maps.cube_face_view(face as u32);
            let mut rp = depth_pass(encoder, "shadow_cube_face_pass", &view);
            rp.set_bind_group(0, bind_group, &[]);
            draw_depth(&mut rp, &self.pipelines, draws);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_space_keeps_origin_in_view() {
        let m = light_space_matrix(Vec3::new(0.1, 1.0, 0.5));
        let origin = m.project_point3(Vec3::ZERO);
        assert!(origin.x.abs() < 1e-5 && origin.y.abs() < 1e-5);
        let expected = (DIR_SHADOW_DISTANCE - DIR_SHADOW_NEAR) / (DIR_SHADOW_FAR - DIR_SHADOW_NEAR);
        assert!((origin.z - expected).abs() < 1e-5);
        let toward_light = m.project_point3(Vec3::new(0.1, 1.0, 0.5).normalize());
        assert!(toward_light.z < origin.z);
    }

    #[test]
    fn vertical_light_direction_is_not_degenerate() {
        let m = light_space_matrix(Vec3::Y);
        assert!(!m.is_nan());
        let p = m.project_point3(Vec3::new(3.0, 0.0, 0.0));
        assert!((p.x.abs() - 0.3).abs() < 1e-5 || (p.y.abs() - 0.3).abs() < 1e-5);
    }

    #[test]
    fn cube_faces_cover_their_axis() {
        let light = Vec3::new(1.0, 2.0, 3.0);
        let matrices = cube_face_matrices(light);
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (m, axis) in matrices.iter().zip(axes) {
            let p = m.project_point3(light + axis * 5.0);
            assert!(p.x.abs() < 1e-4 && p.y.abs() < 1e-4, "{axis:?} -> {p:?}");
            assert!(p.z > 0.0 && p.z < 1.0);
        }
    }

    #[test]
    fn positive_x_face_matches_cube_sampling() {
        // Cube sampling on +X maps +Y to the top row (NDC y > 0) and +Z to the left (NDC x < 0).
        let m = cube_face_matrices(Vec3::ZERO)[0];
        let up = m.project_point3(Vec3::new(5.0, 1.0, 0.0));
        assert!(up.y > 0.0);
        let toward_z = m.project_point3(Vec3::new(5.0, 0.0, 1.0));
        assert!(toward_z.x < 0.0);
        // +Y face: +X to the right, -Z to the top.
        let top = cube_face_matrices(Vec3::ZERO)[2];
        let p = top.project_point3(Vec3::new(1.0, 5.0, -1.0));
        assert!(p.x > 0.0 && p.y > 0.0);
    }
}
