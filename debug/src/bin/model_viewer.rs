//! OBJ viewer: loads a mesh (and optionally a diffuse texture) and orbits it
//! under a sun and one shadow-casting point light.
//! Keys: Left/Right orbit, Up/Down zoom, Space toggle auto-orbit.
//! Run: cargo run -p debug --bin model_viewer -- path/to/model.obj [diffuse.png]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use umbra_bridge::UmbraWindowBackend;
use umbra_renderer::{GpuAssets, RendererConfig, STATIC_PROGRAM};
use umbra_scene::glam::{Mat4, Vec3};
use umbra_scene::{DirLight, Material, MeshData, MovingCamera, PointLight, RenderObject, Scene, Vertex};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const ORBIT_SPEED: f32 = 0.4;
const ORBIT_STEP: f32 = 0.1;
const ZOOM_STEP: f32 = 0.9;

/// Loads every model in the OBJ into one vertex stream, centered on the origin
/// and scaled to fit a unit-radius sphere.
fn load_obj(path: &Path) -> Result<MeshData<Vertex>, String> {
    let (models, _) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS).map_err(|e| format!("load_obj: {e}"))?;
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for model in models {
        let mesh = model.mesh;
        let base = vertices.len() as u32;
        let count = mesh.positions.len() / 3;
        for i in 0..count {
            let position = [mesh.positions[i * 3], mesh.positions[i * 3 + 1], mesh.positions[i * 3 + 2]];
            let normal = if mesh.normals.len() >= (i + 1) * 3 {
                [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
            } else {
                [0.0, 1.0, 0.0]
            };
            let uv = if mesh.texcoords.len() >= (i + 1) * 2 {
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0, 0.0]
            };
            vertices.push(Vertex { position, normal, uv });
        }
        indices.extend(mesh.indices.iter().map(|&i| base + i));
    }
    if indices.is_empty() {
        return Err(format!("{} contains no triangles", path.display()));
    }

    let (min, max) = vertices.iter().fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), v| {
        let p = Vec3::from(v.position);
        (lo.min(p), hi.max(p))
    });
    let center = (min + max) * 0.5;
    let radius = ((max - min).length() * 0.5).max(f32::EPSILON);
    for v in &mut vertices {
        v.position = ((Vec3::from(v.position) - center) / radius).to_array();
    }
    Ok(MeshData::new(vertices, indices))
}

fn load_texture(path: &Path) -> Result<(u32, u32, Vec<u8>), String> {
    let rgba = image::open(path).map_err(|e| format!("{}: {e}", path.display()))?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width, height, rgba.into_raw()))
}

struct Viewer {
    window: Arc<Window>,
    backend: UmbraWindowBackend,
    assets: GpuAssets,
    camera: MovingCamera,
    yaw: f32,
    distance: f32,
    auto_orbit: bool,
    last_frame: Instant,
}

impl Viewer {
    fn new(event_loop: &ActiveEventLoop, obj: &Path, texture: Option<&Path>) -> Result<Self, String> {
        let attrs = winit::window::WindowAttributes::default()
            .with_title("Umbra model viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(1024, 768));
        let window = Arc::new(event_loop.create_window(attrs).map_err(|e| e.to_string())?);
        let size = window.inner_size();
        let mut backend = UmbraWindowBackend::from_window(window.clone(), size.width, size.height, RendererConfig::default())
            .map_err(|e| e.to_string())?;

        let mesh = load_obj(obj)?;
        info!("loaded {} ({} vertices)", obj.display(), mesh.vertices.len());
        let mut assets = GpuAssets::new();
        let model_mesh = assets.add_mesh(backend.device(), backend.queue(), "model", &mesh);
        let floor_mesh = assets.add_mesh(backend.device(), backend.queue(), "floor", &MeshData::cube());

        let mut scene = Scene::new();
        let mut model = RenderObject::with_mesh(model_mesh);
        model.set_material(Material::new(Vec3::splat(0.9), 0.5));
        if let Some(path) = texture {
            let (width, height, pixels) = load_texture(path)?;
            let handle = assets
                .add_texture_rgba8(backend.device(), backend.queue(), "diffuse", width, height, &pixels, true)
                .map_err(|e| e.to_string())?;
            model.set_diffuse_texture(handle);
        }
        scene.add_render_object(STATIC_PROGRAM, model);

        let mut floor = RenderObject::with_mesh(floor_mesh);
        floor.set_model_matrix(Mat4::from_translation(Vec3::new(0.0, -1.05, 0.0)) * Mat4::from_scale(Vec3::new(8.0, 0.1, 8.0)));
        floor.set_material(Material::new(Vec3::splat(0.5), 0.1));
        scene.add_render_object(STATIC_PROGRAM, floor);

        scene.set_dir_light(DirLight::new(Vec3::new(-0.4, 1.0, 0.3), Vec3::splat(0.6)));
        scene.add_point_light(PointLight::new(Vec3::new(1.5, 2.0, 1.5), Vec3::new(1.5, 1.3, 1.1)));
        backend.renderer_mut().set_scene(scene);

        let distance = 3.0;
        let camera = MovingCamera::new(Vec3::new(0.0, 0.8, distance), Vec3::ZERO);
        Ok(Self { window, backend, assets, camera, yaw: 0.0, distance, auto_orbit: true, last_frame: Instant::now() })
    }

    fn place_camera(&mut self) {
        let eye = Vec3::new(self.yaw.sin() * self.distance, 0.8, self.yaw.cos() * self.distance);
        self.camera.move_to(eye);
        self.camera.look_at(Vec3::ZERO);
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::ArrowLeft => self.yaw -= ORBIT_STEP,
            KeyCode::ArrowRight => self.yaw += ORBIT_STEP,
            KeyCode::ArrowUp => self.distance = (self.distance * ZOOM_STEP).max(1.2),
            KeyCode::ArrowDown => self.distance = (self.distance / ZOOM_STEP).min(20.0),
            KeyCode::Space => self.auto_orbit = !self.auto_orbit,
            _ => {}
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        if self.auto_orbit {
            self.yaw += ORBIT_SPEED * dt;
        }
        self.place_camera();
        if let Err(e) = self.backend.render(&self.assets, &mut self.camera) {
            error!("frame failed: {e}");
        }
        self.window.request_redraw();
    }
}

struct App {
    obj: PathBuf,
    texture: Option<PathBuf>,
    viewer: Option<Viewer>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match Viewer::new(event_loop, &self.obj, self.texture.as_deref()) {
            Ok(viewer) => {
                viewer.window.request_redraw();
                self.viewer = Some(viewer);
            }
            Err(e) => {
                error!("failed to start viewer: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(viewer) = self.viewer.as_mut() else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(physical) => {
                if viewer.backend.resize(physical.width, physical.height) {
                    viewer.window.request_redraw();
                }
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state: ElementState::Pressed, .. },
                ..
            } => {
                if code == KeyCode::Escape {
                    event_loop.exit();
                } else {
                    viewer.handle_key(code);
                }
            }
            WindowEvent::RedrawRequested => viewer.redraw(),
            _ => {}
        }
    }
}

fn main() -> Result<(), String> {
    debug::init_logging();
    let mut args = std::env::args_os().skip(1);
    let obj = args.next().map(PathBuf::from).ok_or("usage: model_viewer <model.obj> [diffuse.png]")?;
    let texture = args.next().map(PathBuf::from);
    let event_loop = winit::event_loop::EventLoop::new().map_err(|e| e.to_string())?;
    let mut app = App { obj, texture, viewer: None };
    event_loop.run_app(&mut app).map_err(|e| e.to_string())?;
    Ok(())
}
