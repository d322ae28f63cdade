//! Renders the demo scene offscreen and writes a PNG.
//! Run: cargo run -p debug --bin offscreen_frame -- [out.png] [seconds]

use umbra_bridge::OffscreenBackend;
use umbra_renderer::{GpuAssets, RendererConfig};
use umbra_scene::glam::Vec3;
use umbra_scene::MovingCamera;

const WIDTH: u32 = 960;
const HEIGHT: u32 = 540;
const STEP: f32 = 1.0 / 60.0;

fn main() -> Result<(), String> {
    debug::init_logging();
    let mut args = std::env::args().skip(1);
    let out = args.next().unwrap_or_else(|| "umbra_frame.png".to_string());
    let seconds: f32 = match args.next() {
        Some(s) => s.parse().map_err(|e| format!("invalid seconds `{s}`: {e}"))?,
        None => 3.0,
    };

    let mut backend = OffscreenBackend::new(WIDTH, HEIGHT, RendererConfig::default()).map_err(|e| e.to_string())?;
    let mut assets = GpuAssets::new();
    let scene = debug::demo_scene(backend.device(), backend.queue(), &mut assets);
    backend.renderer_mut().set_scene(scene);
    backend.renderer_mut().show_camera_control_points(true);

    let mut camera = MovingCamera::new(Vec3::new(-8.0, 3.0, 8.0), Vec3::ZERO);
    let mut t = 0.0;
    while t < seconds {
        backend.renderer_mut().update(STEP, &mut camera);
        t += STEP;
    }
    let pixels = backend.render_to_pixels(&assets, &mut camera).map_err(|e| e.to_string())?;
    image::save_buffer(&out, &pixels, WIDTH, HEIGHT, image::ExtendedColorType::Rgba8).map_err(|e| e.to_string())?;
    if let Some(plan) = backend.renderer().last_frame_plan() {
        log::info!("passes: {:?}", plan.kinds().collect::<Vec<_>>());
    }
    println!("wrote {out} at t = {t:.2}s");
    Ok(())
}
