//! Per-frame draw list: every drawable object resolved against the asset table with
//! its uniforms uploaded. Built once per frame, then replayed by the shadow and
//! geometry passes.

use umbra_scene::{Drawable, ProgramId, Scene};

use crate::assets::{GpuAssets, GpuMesh};
use crate::error::RenderError;
use crate::program::{GeometryProgram, GeometryShared, ObjectUniform};

pub struct DrawItem<'a> {
    pub mesh: &'a GpuMesh,
    pub object_bind_group: wgpu::BindGroup,
    pub material_bind_group: wgpu::BindGroup,
}

impl DrawItem<'_> {
    /// Binds groups 1 and 2 plus the mesh buffers and issues the indexed draw.
    pub(crate) fn draw(&self, rp: &mut wgpu::RenderPass<'_>, with_material: bool) {
        rp.set_bind_group(1, &self.object_bind_group, &[]);
        if with_material {
            rp.set_bind_group(2, &self.material_bind_group, &[]);
        }
        rp.set_vertex_buffer(0, self.mesh.vertex_buf.slice(..));
        rp.set_index_buffer(self.mesh.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        rp.draw_indexed(0..self.mesh.index_count, 0, 0..1);
    }
}

pub struct DrawBatch<'a> {
    pub program: ProgramId,
    pub items: Vec<DrawItem<'a>>,
}

#[derive(Default)]
pub struct DrawList<'a> {
    pub batches: Vec<DrawBatch<'a>>,
}

impl<'a> DrawList<'a> {
    pub fn items(&self) -> impl Iterator<Item = &DrawItem<'a>> {
        self.batches.iter().flat_map(|b| b.items.iter())
    }

    pub fn len(&self) -> usize {
        self.batches.iter().map(|b| b.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves every object of `scene`. Objects without a drawable are skipped; a
/// missing asset, an object under an unregistered program or a mesh whose vertex
/// kind the program cannot consume aborts the frame.
pub fn prepare_draws<'a>(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    shared: &GeometryShared,
    programs: &[GeometryProgram],
    scene: &Scene,
    assets: &'a GpuAssets,
) -> Result<DrawList<'a>, RenderError> {
    let mut list = DrawList::default();
    for (program_id, objects) in scene.buckets() {
        if objects.is_empty() {
            continue;
        }
        let program = programs.get(program_id.0).ok_or(RenderError::UnknownProgram(program_id))?;
        let mut items = Vec::with_capacity(objects.len());
        for object in objects {
            let Some(drawable) = object.drawable() else {
                continue;
            };
            let (mesh, bones) = match drawable {
                Drawable::Mesh(handle) => (assets.mesh(handle)?, None),
                Drawable::Animated(handle) => (assets.model(handle)?, Some(object.bone_transforms())),
            };
            if mesh.kind != program.vertex_kind() {
                return Err(RenderError::VertexKindMismatch {
                    program: program_id,
                    expected: program.vertex_kind(),
                    found: mesh.kind,
                });
            }
            let diffuse = object.diffuse_texture().map(|h| assets.texture(h)).transpose()?;
            let normal = object.normal_texture().map(|h| assets.texture(h)).transpose()?;
            items.push(DrawItem {
                mesh,
                object_bind_group: shared.object_bind_group(device, queue, &ObjectUniform::from_object(object), bones),
                material_bind_group: shared.material_bind_group(
                    device,
                    diffuse.map(|t| &t.view),
                    normal.map(|t| &t.view),
                ),
            });
        }
        if !items.is_empty() {
            list.batches.push(DrawBatch { program: program_id, items });
        }
    }
    Ok(list)
}
