//! GPU asset table: meshes, skinned models and textures, interned by name.
//!
//! Scenes only hold handles. Re-adding under an existing name uploads the new data
//! behind the same handle, so every object referencing it picks up the change.

use log::debug;
use umbra_scene::{
    MeshAsset, MeshData, MeshHandle, ModelAsset, ModelHandle, NamedArena, SkinnedVertex, TextureAsset,
    TextureHandle, Vertex,
};

use crate::error::RenderError;

/// Vertex layout a mesh was uploaded with and a program consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexKind {
    /// [`Vertex`]: position, normal, uv (stride 32).
    Static,
    /// [`SkinnedVertex`]: static attributes plus 4 bone ids and weights (stride 64).
    Skinned,
}

const STATIC_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2
];

const SKINNED_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
    3 => Uint32x4,
    4 => Float32x4
];

impl VertexKind {
    pub fn stride(self) -> u64 {
        match self {
            VertexKind::Static => std::mem::size_of::<Vertex>() as u64,
            VertexKind::Skinned => std::mem::size_of::<SkinnedVertex>() as u64,
        }
    }

    pub fn layout(self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: match self {
                VertexKind::Static => &STATIC_ATTRIBUTES,
                VertexKind::Skinned => &SKINNED_ATTRIBUTES,
            },
        }
    }
}

pub struct GpuMesh {
    pub vertex_buf: wgpu::Buffer,
    pub index_buf: wgpu::Buffer,
    pub index_count: u32,
    pub kind: VertexKind,
}

impl GpuMesh {
    pub fn upload<V: bytemuck::Pod>(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        data: &MeshData<V>,
        kind: VertexKind,
    ) -> Self {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&data.vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&data.indices);
        let vertex_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: padded_size(vertex_bytes.len()),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertex_buf, 0, vertex_bytes);
        let index_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: padded_size(index_bytes.len()),
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&index_buf, 0, index_bytes);
        Self { vertex_buf, index_buf, index_count: data.index_count(), kind }
    }
}

/// Buffers must be non-empty and 4-byte aligned for `write_buffer`.
fn padded_size(len: usize) -> u64 {
    (len.max(4) as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
        srgb: bool,
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::Texture { name: label.to_string(), message: "zero extent".to_string() });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::Texture {
                name: label.to_string(),
                message: format!("expected {expected} bytes of RGBA8, got {}", pixels.len()),
            });
        }
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: if srgb { wgpu::TextureFormat::Rgba8UnormSrgb } else { wgpu::TextureFormat::Rgba8Unorm },
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::ImageDataLayout { offset: 0, bytes_per_row: Some(4 * width), rows_per_image: Some(height) },
            size,
        );
        let view = texture.create_view(&Default::default());
        Ok(Self { texture, view })
    }
}

/// Asset context handed to the renderer at draw time.
pub struct GpuAssets {
    meshes: NamedArena<MeshAsset, GpuMesh>,
    models: NamedArena<ModelAsset, GpuMesh>,
    textures: NamedArena<TextureAsset, GpuTexture>,
}

impl Default for GpuAssets {
    fn default() -> Self {
        Self { meshes: NamedArena::new(), models: NamedArena::new(), textures: NamedArena::new() }
    }
}

impl GpuAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_mesh(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, name: &str, data: &MeshData<Vertex>) -> MeshHandle {
        debug!("uploading mesh `{name}` ({} vertices, {} indices)", data.vertices.len(), data.indices.len());
        let mesh = GpuMesh::upload(device, queue, name, data, VertexKind::Static);
        self.meshes.insert(name, mesh)
    }

    pub fn add_animated_model(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        data: &MeshData<SkinnedVertex>,
    ) -> ModelHandle {
        debug!("uploading animated model `{name}` ({} vertices)", data.vertices.len());
        let mesh = GpuMesh::upload(device, queue, name, data, VertexKind::Skinned);
        self.models.insert(name, mesh)
    }

    /// Tightly packed RGBA8 pixels, row-major from the top. Use `srgb` for color
    /// maps and linear for normal maps.
    pub fn add_texture_rgba8(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        name: &str,
        width: u32,
        height: u32,
        pixels: &[u8],
        srgb: bool,
    ) -> Result<TextureHandle, RenderError> {
        let texture = GpuTexture::from_rgba8(device, queue, name, width, height, pixels, srgb)?;
        Ok(self.textures.insert(name, texture))
    }

    pub fn mesh_handle(&self, name: &str) -> Option<MeshHandle> {
        self.meshes.handle(name)
    }

    pub fn model_handle(&self, name: &str) -> Option<ModelHandle> {
        self.models.handle(name)
    }

    pub fn texture_handle(&self, name: &str) -> Option<TextureHandle> {
        self.textures.handle(name)
    }

    pub fn mesh(&self, handle: MeshHandle) -> Result<&GpuMesh, RenderError> {
        self.meshes
            .get(handle)
            .ok_or_else(|| RenderError::MissingAsset { kind: "mesh", handle: format!("{handle:?}") })
    }

    pub fn model(&self, handle: ModelHandle) -> Result<&GpuMesh, RenderError> {
        self.models
            .get(handle)
            .ok_or_else(|| RenderError::MissingAsset { kind: "animated model", handle: format!("{handle:?}") })
    }

    pub fn texture(&self, handle: TextureHandle) -> Result<&GpuTexture, RenderError> {
        self.textures
            .get(handle)
            .ok_or_else(|| RenderError::MissingAsset { kind: "texture", handle: format!("{handle:?}") })
    }

    pub fn remove_mesh(&mut self, name: &str) -> bool {
        self.meshes.remove(name).is_some()
    }

    pub fn remove_texture(&mut self, name: &str) -> bool {
        self.textures.remove(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_match_vertex_structs() {
        assert_eq!(VertexKind::Static.layout().array_stride, 32);
        assert_eq!(VertexKind::Skinned.layout().array_stride, 64);
        let skinned = VertexKind::Skinned.layout();
        assert_eq!(skinned.attributes[3].offset, 32);
        assert_eq!(skinned.attributes[4].offset, 48);
    }

    #[test]
    fn buffer_sizes_are_copy_aligned() {
        assert_eq!(padded_size(0), 4);
        assert_eq!(padded_size(6), 8);
        assert_eq!(padded_size(32), 32);
    }
}
