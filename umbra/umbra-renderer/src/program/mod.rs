//! Geometry programs: a WGSL module plus vertex kind compiled into a G-buffer
//! pipeline with its own camera uniform.
//!
//! Bind groups: 0 = camera (per program), 1 = object uniform + bone palette,
//! 2 = diffuse map, normal map, sampler. Shadow pipelines reuse groups 1 and the
//! per-object bind groups, so an object's uniforms are uploaded once per frame.

use glam::{Mat3, Mat4, Vec3};
use log::debug;
use umbra_scene::{RenderObject, MAX_BONES};

use crate::assets::{GpuTexture, VertexKind};
use crate::error::{validated, RenderError};
use crate::resources::{DEPTH_FORMAT, GBUFFER_FORMAT};

/// Object uniform, bone palette and `skin_matrix`; prepend to custom programs.
pub const OBJECT_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/object.wgsl"));
/// Camera binding, `to_world`, and the G-buffer fragment entry point `fs`.
pub const GBUFFER_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/gbuffer.wgsl"));
const MESH_STATIC_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/mesh_static.wgsl"));
const MESH_SKINNED_WGSL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/mesh_skinned.wgsl"));

const BONE_PALETTE_SIZE: u64 = (MAX_BONES * 64) as u64;

/// Source for a geometry program. The module must provide entry points `vs` and
/// `fs` and follow the bind group interface above.
#[derive(Clone, Debug)]
pub struct ProgramDesc {
    pub label: String,
    pub source: String,
    pub vertex_kind: VertexKind,
}

impl ProgramDesc {
    pub fn static_mesh() -> Self {
        Self {
            label: "static_mesh".to_string(),
            source: format!("{OBJECT_WGSL}\n{GBUFFER_WGSL}\n{MESH_STATIC_WGSL}"),
            vertex_kind: VertexKind::Static,
        }
    }

    pub fn skinned_mesh() -> Self {
        Self {
            label: "skinned_mesh".to_string(),
            source: format!("{OBJECT_WGSL}\n{GBUFFER_WGSL}\n{MESH_SKINNED_WGSL}"),
            vertex_kind: VertexKind::Skinned,
        }
    }

    pub fn custom(label: impl Into<String>, source: impl Into<String>, vertex_kind: VertexKind) -> Self {
        Self { label: label.into(), source: source.into(), vertex_kind }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    material: [f32; 4],
    flags: [u32; 4],
}

impl ObjectUniform {
    pub fn from_object(object: &RenderObject) -> Self {
        let (material, has_material) = match object.material() {
            Some(m) => (m.diffuse.extend(m.specular).to_array(), 1),
            None => ([1.0, 1.0, 1.0, 0.5], 0),
        };
        Self {
            model: object.model_matrix().to_cols_array_2d(),
            normal: Mat4::from_mat3(object.normal_matrix()).to_cols_array_2d(),
            material,
            flags: [
                has_material,
                u32::from(object.diffuse_texture().is_some()),
                u32::from(object.normal_texture().is_some()),
                0,
            ],
        }
    }

    /// Untextured solid-color object, used for control-point markers.
    pub fn solid(model: Mat4, diffuse: Vec3, specular: f32) -> Self {
        let normal = if model.determinant().abs() > f32::EPSILON {
            Mat3::from_mat4(model.inverse().transpose())
        } else {
            Mat3::IDENTITY
        };
        Self {
            model: model.to_cols_array_2d(),
            normal: Mat4::from_mat3(normal).to_cols_array_2d(),
            material: diffuse.extend(specular).to_array(),
            flags: [1, 0, 0, 0],
        }
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages, size: u64) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: std::num::NonZeroU64::new(size),
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Layouts and fallbacks shared by every geometry and shadow pipeline.
pub struct GeometryShared {
    pub camera_layout: wgpu::BindGroupLayout,
    pub object_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
    identity_bones: wgpu::Buffer,
    sampler: wgpu::Sampler,
    white: GpuTexture,
    flat_normal: GpuTexture,
}

impl GeometryShared {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self, RenderError> {
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera_bind_group_layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX, 64)],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object_bind_group_layout"),
            entries: &[
                uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX_FRAGMENT,
                    std::mem::size_of::<ObjectUniform>() as u64,
                ),
                uniform_entry(1, wgpu::ShaderStages::VERTEX, BONE_PALETTE_SIZE),
            ],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let identity_bones = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("identity_bones"),
            size: BONE_PALETTE_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&identity_bones, 0, bytemuck::cast_slice(&bone_palette(&[])));
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white = GpuTexture::from_rgba8(device, queue, "default_diffuse", 1, 1, &[255, 255, 255, 255], true)?;
        let flat_normal = GpuTexture::from_rgba8(device, queue, "default_normal", 1, 1, &[128, 128, 255, 255], false)?;
        Ok(Self { camera_layout, object_layout, material_layout, identity_bones, sampler, white, flat_normal })
    }

    /// Uploads one object's uniform and, for animated objects, its bone palette.
    pub fn object_bind_group(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        uniform: &ObjectUniform,
        bones: Option<&[Mat4]>,
    ) -> wgpu::BindGroup {
        let object_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object_uniform"),
            size: std::mem::size_of::<ObjectUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&object_buf, 0, bytemuck::bytes_of(uniform));
        let bone_buf = bones.filter(|b| !b.is_empty()).map(|bones| {
            let buf = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("object_bones"),
                size: BONE_PALETTE_SIZE,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            queue.write_buffer(&buf, 0, bytemuck::cast_slice(&bone_palette(bones)));
            buf
        });
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bind_group"),
            layout: &self.object_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: object_buf.as_entire_binding() },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bone_buf.as_ref().unwrap_or(&self.identity_bones).as_entire_binding(),
                },
            ],
        })
    }

    /// Missing maps fall back to 1x1 white diffuse and flat normal textures.
    pub fn material_bind_group(
        &self,
        device: &wgpu::Device,
        diffuse: Option<&wgpu::TextureView>,
        normal: Option<&wgpu::TextureView>,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(diffuse.unwrap_or(&self.white.view)),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(normal.unwrap_or(&self.flat_normal.view)),
                },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&self.sampler) },
            ],
        })
    }
}

/// Full palette with unused slots set to identity.
fn bone_palette(bones: &[Mat4]) -> Vec<[[f32; 4]; 4]> {
    let mut palette = vec![Mat4::IDENTITY.to_cols_array_2d(); MAX_BONES];
    for (slot, bone) in palette.iter_mut().zip(bones) {
        *slot = bone.to_cols_array_2d();
    }
    palette
}

pub struct GeometryProgram {
    label: String,
    vertex_kind: VertexKind,
    pipeline: wgpu::RenderPipeline,
    camera_buf: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
}

impl GeometryProgram {
    pub fn new(device: &wgpu::Device, shared: &GeometryShared, desc: &ProgramDesc) -> Result<Self, RenderError> {
        debug!("compiling geometry program `{}` ({:?})", desc.label, desc.vertex_kind);
        let pipeline = validated(device, &desc.label, || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.source.as_str().into()),
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("geometry_pipeline_layout"),
                bind_group_layouts: &[&shared.camera_layout, &shared.object_layout, &shared.material_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&desc.label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[desc.vertex_kind.layout()],
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
                    cull_mode: Some(wgpu::Face::Back),
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
        let camera_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("program_camera"),
            size: 64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("program_camera_bind_group"),
            layout: &shared.camera_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: camera_buf.as_entire_binding() }],
        });
        Ok(Self { label: desc.label.clone(), vertex_kind: desc.vertex_kind, pipeline, camera_buf, camera_bind_group })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn vertex_kind(&self) -> VertexKind {
        self.vertex_kind
    }

    pub fn write_camera(&self, queue: &wgpu::Queue, view_proj: Mat4) {
        queue.write_buffer(&self.camera_buf, 0, bytemuck::cast_slice(&view_proj.to_cols_array()));
    }

    pub(crate) fn bind(&self, rp: &mut wgpu::RenderPass<'_>) {
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, &self.camera_bind_group, &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_scene::Material;

    #[test]
    fn object_uniform_layout() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 160);
    }

    #[test]
    fn object_uniform_flags_follow_material() {
        let mut obj = RenderObject::new();
        let plain = ObjectUniform::from_object(&obj);
        assert_eq!(plain.flags, [0, 0, 0, 0]);
        obj.set_material(Material::new(Vec3::new(0.2, 0.4, 0.6), 0.8));
        obj.set_position(Vec3::new(1.0, 2.0, 3.0));
        let lit = ObjectUniform::from_object(&obj);
        assert_eq!(lit.flags[0], 1);
        assert_eq!(lit.material, [0.2, 0.4, 0.6, 0.8]);
        assert_eq!(lit.model[3], [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn palette_pads_with_identity() {
        let translated = Mat4::from_translation(Vec3::X);
        let palette = bone_palette(&[translated]);
        assert_eq!(palette.len(), MAX_BONES);
        assert_eq!(palette[0], translated.to_cols_array_2d());
        assert_eq!(palette[1], Mat4::IDENTITY.to_cols_array_2d());
    }

    #[test]
    fn builtin_programs_expose_entry_points() {
        for desc in [ProgramDesc::static_mesh(), ProgramDesc::skinned_mesh()] {
            assert!(desc.source.contains("fn vs("));
            assert!(desc.source.contains("fn fs("));
        }
        assert_eq!(ProgramDesc::skinned_mesh().vertex_kind, VertexKind::Skinned);
    }
}
