//! End-to-end frames through a real adapter. These need a GPU, so they are
//! ignored by default; run them with
//! `cargo test -p umbra-bridge --test offscreen -- --ignored`.
//! A missing adapter is then a failure, not a skip.

use umbra_bridge::{BridgeError, OffscreenBackend};
use umbra_renderer::{GpuAssets, RenderError, RendererConfig, STATIC_PROGRAM};
use umbra_scene::glam::Vec3;
use umbra_scene::{DirLight, MeshData, MovingCamera, RenderObject, Scene};

fn backend(width: u32, height: u32) -> OffscreenBackend {
    match OffscreenBackend::new(width, height, RendererConfig::default()) {
        Ok(backend) => backend,
        Err(BridgeError::NoAdapter) => panic!("no GPU adapter found; these tests need one"),
        Err(e) => panic!("failed to create offscreen backend: {e}"),
    }
}

fn cube_scene(backend: &OffscreenBackend, assets: &mut GpuAssets) -> Scene {
    let cube = assets.add_mesh(backend.device(), backend.queue(), "cube", &MeshData::cube());
    let mut scene = Scene::new();
    scene.add_render_object(STATIC_PROGRAM, RenderObject::with_mesh(cube));
    scene
}

fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

fn brightness(p: [u8; 4]) -> u32 {
    u32::from(p[0]) + u32::from(p[1]) + u32::from(p[2])
}

#[test]
#[ignore = "needs a GPU adapter"]
fn draw_without_scene_fails() {
    let mut backend = backend(16, 16);
    let assets = GpuAssets::new();
    let mut camera = MovingCamera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO);
    let err = backend.render(&assets, &mut camera).unwrap_err();
    assert!(matches!(err, BridgeError::Render(RenderError::NoScene)));
}

#[test]
#[ignore = "needs a GPU adapter"]
fn unlit_scene_is_black() {
    let mut backend = backend(32, 32);
    let mut assets = GpuAssets::new();
    let scene = cube_scene(&backend, &mut assets);
    backend.renderer_mut().set_scene(scene);
    let mut camera = MovingCamera::new(Vec3::new(1.5, 1.5, 3.0), Vec3::ZERO);
    let pixels = backend.render_to_pixels(&assets, &mut camera).unwrap();
    assert_eq!(pixels.len(), 32 * 32 * 4);
    assert!(pixels.chunks(4).all(|p| p[0] <= 2 && p[1] <= 2 && p[2] <= 2));
}

#[test]
#[ignore = "needs a GPU adapter"]
fn face_toward_light_is_brighter() {
    let mut backend = backend(32, 32);
    let mut assets = GpuAssets::new();
    let mut scene = cube_scene(&backend, &mut assets);
    scene.set_dir_light(DirLight::new(Vec3::new(0.1, 1.0, 0.5), Vec3::splat(0.5)));
    backend.renderer_mut().set_scene(scene);

    let mut above = MovingCamera::new(Vec3::new(0.0, 3.0, 0.01), Vec3::ZERO);
    let top = backend.render_to_pixels(&assets, &mut above).unwrap();
    let mut below = MovingCamera::new(Vec3::new(0.0, -3.0, 0.01), Vec3::ZERO);
    let bottom = backend.render_to_pixels(&assets, &mut below).unwrap();

    let top_center = brightness(pixel(&top, 32, 16, 16));
    let bottom_center = brightness(pixel(&bottom, 32, 16, 16));
    assert!(top_center > bottom_center + 30, "top {top_center}, bottom {bottom_center}");
    let plan = backend.renderer().last_frame_plan().unwrap();
    assert_eq!(plan.blur_passes(), RendererConfig::default().blur_amount as usize);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn resize_round_trip_is_stable() {
    let mut backend = backend(48, 32);
    let mut assets = GpuAssets::new();
    let mut scene = cube_scene(&backend, &mut assets);
    scene.set_dir_light(DirLight::new(Vec3::new(0.3, 1.0, 0.2), Vec3::splat(0.8)));
    backend.renderer_mut().set_scene(scene);
    let mut camera = MovingCamera::new(Vec3::new(2.0, 1.5, 3.0), Vec3::ZERO);

    let before = backend.render_to_pixels(&assets, &mut camera).unwrap();
    backend.resize(20, 24).unwrap();
    let small = backend.render_to_pixels(&assets, &mut camera).unwrap();
    assert_eq!(small.len(), 20 * 24 * 4);
    backend.resize(48, 32).unwrap();
    let after = backend.render_to_pixels(&assets, &mut camera).unwrap();
    assert_eq!(before, after);
    assert!(before.chunks(4).any(|p| brightness([p[0], p[1], p[2], p[3]]) > 0));
}

#[test]
#[ignore = "needs a GPU adapter"]
fn zero_resize_is_rejected() {
    let mut backend = backend(16, 16);
    assert!(matches!(
        backend.resize(0, 16),
        Err(BridgeError::Render(RenderError::InvalidResolution { width: 0, height: 16 }))
    ));
    assert_eq!(backend.resolution().width(), 16);
}
