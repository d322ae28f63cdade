//! Scene data for the Umbra deferred renderer.
//! Everything here is plain CPU data: the renderer resolves handles and uploads
//! uniforms at draw time, so none of these types own GPU resources.

mod camera;
mod camera_controller;
mod error;
mod handle;
mod light;
mod mesh;
mod particles;
mod render_object;
mod scene;
mod spline;

pub use camera::MovingCamera;
pub use camera_controller::CameraController;
pub use error::SceneError;
pub use handle::{Arena, Handle, MeshAsset, MeshHandle, ModelAsset, ModelHandle, NamedArena, TextureAsset, TextureHandle};
pub use light::{light_radius, Attenuation, DirLight, Light, PointLight, VISIBILITY_THRESHOLD};
pub use mesh::{MeshData, SkinnedVertex, Vertex};
pub use particles::{Particle, ParticleSystem, Pcg32};
pub use render_object::{Drawable, Material, RenderObject, MAX_BONES};
pub use scene::{ObjectId, ProgramId, Scene, MAX_POINT_LIGHTS};
pub use spline::{de_casteljau, Spline};

pub use glam;
