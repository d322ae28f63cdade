//! Demo scene in a window with the camera flying along its spline path.
//! Keys: Up/Down exposure, Left/Right gamma, [ / ] blur passes, M control-point
//! markers, Space pause the path, R restart it.
//! Run: cargo run -p debug --bin cinematic_window

use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use umbra_bridge::UmbraWindowBackend;
use umbra_renderer::{GpuAssets, RendererConfig, BLUR_AMOUNT_RANGE, EXPOSURE_RANGE, GAMMA_RANGE};
use umbra_scene::glam::Vec3;
use umbra_scene::MovingCamera;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

const EXPOSURE_STEP: f32 = 0.05;
const GAMMA_STEP: f32 = 0.1;

struct Viewer {
    window: Arc<Window>,
    backend: UmbraWindowBackend,
    assets: GpuAssets,
    camera: MovingCamera,
    last_frame: Instant,
}

#[derive(Default)]
struct App {
    viewer: Option<Viewer>,
}

impl App {
    fn create_viewer(event_loop: &ActiveEventLoop) -> Result<Viewer, String> {
        let attrs = winit::window::WindowAttributes::default()
            .with_title("Umbra cinematic")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(attrs).map_err(|e| e.to_string())?);
        let size = window.inner_size();
        let mut backend = UmbraWindowBackend::from_window(window.clone(), size.width, size.height, RendererConfig::default())
            .map_err(|e| e.to_string())?;
        let mut assets = GpuAssets::new();
        let scene = debug::demo_scene(backend.device(), backend.queue(), &mut assets);
        backend.renderer_mut().set_scene(scene);
        let camera = MovingCamera::new(Vec3::new(-8.0, 3.0, 8.0), Vec3::ZERO);
        Ok(Viewer { window, backend, assets, camera, last_frame: Instant::now() })
    }
}

impl Viewer {
    fn handle_key(&mut self, key: KeyCode) {
        let renderer = self.backend.renderer_mut();
        match key {
            KeyCode::ArrowUp | KeyCode::ArrowDown => {
                let step = if key == KeyCode::ArrowUp { EXPOSURE_STEP } else { -EXPOSURE_STEP };
                let exposure = (renderer.exposure() + step).clamp(*EXPOSURE_RANGE.start(), *EXPOSURE_RANGE.end());
                renderer.set_exposure(exposure);
                info!("exposure {exposure:.2}");
            }
            KeyCode::ArrowRight | KeyCode::ArrowLeft => {
                let step = if key == KeyCode::ArrowRight { GAMMA_STEP } else { -GAMMA_STEP };
                let gamma = (renderer.gamma() + step).clamp(*GAMMA_RANGE.start(), *GAMMA_RANGE.end());
                renderer.set_gamma(gamma);
                info!("gamma {gamma:.1}");
            }
            KeyCode::BracketRight | KeyCode::BracketLeft => {
                let amount = if key == KeyCode::BracketRight {
                    renderer.blur_amount().saturating_add(1)
                } else {
                    renderer.blur_amount().saturating_sub(1)
                };
                let amount = amount.clamp(*BLUR_AMOUNT_RANGE.start(), *BLUR_AMOUNT_RANGE.end());
                renderer.set_blur_amount(amount);
                info!("blur passes {amount}");
            }
            KeyCode::KeyM => {
                let show = !renderer.camera_control_points_shown();
                renderer.show_camera_control_points(show);
            }
            KeyCode::Space => {
                if let Some(controller) = renderer.scene_mut().and_then(|s| s.camera_controller_mut()) {
                    let enabled = !controller.is_enabled();
                    controller.set_enabled(enabled);
                }
            }
            KeyCode::KeyR => {
                if let Some(controller) = renderer.scene_mut().and_then(|s| s.camera_controller_mut()) {
                    controller.reset();
                }
            }
            _ => {}
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.backend.renderer_mut().update(dt, &mut self.camera);
        if let Err(e) = self.backend.render(&self.assets, &mut self.camera) {
            error!("frame failed: {e}");
        }
        self.window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.viewer.is_some() {
            return;
        }
        match Self::create_viewer(event_loop) {
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
    let event_loop = winit::event_loop::EventLoop::new().map_err(|e| e.to_string())?;
    let mut app = App::default();
    event_loop.run_app(&mut app).map_err(|e| e.to_string())?;
    Ok(())
}
