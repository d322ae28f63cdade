//! Shared setup for the debug binaries: logging and the demo scene.

use std::sync::Once;

use umbra_renderer::{GpuAssets, STATIC_PROGRAM};
use umbra_scene::glam::{Mat4, Quat, Vec3};
use umbra_scene::{
    Attenuation, CameraController, DirLight, Material, MeshData, ParticleSystem, PointLight, RenderObject, Scene,
    Spline,
};

static INIT: Once = Once::new();

/// Initializes `env_logger` once. `RUST_LOG` wins; otherwise `info`, with wgpu
/// internals kept at `warn`.
pub fn init_logging() {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
            builder.filter_module("wgpu_core", log::LevelFilter::Warn);
            builder.filter_module("wgpu_hal", log::LevelFilter::Warn);
            builder.filter_module("naga", log::LevelFilter::Warn);
        }
        builder.init();
        log::debug!("logging initialized");
    });
}

pub const DEMO_PARTICLES: usize = 2000;
pub const DEMO_PATH_SECONDS: f32 = 24.0;

/// Camera path circling the pillars, looking at the scene center.
pub fn demo_camera_controller() -> CameraController {
    let movement = Spline::from_curves(vec![
        vec![Vec3::new(-8.0, 3.0, 8.0), Vec3::new(-12.0, 5.0, 0.0), Vec3::new(-8.0, 4.0, -8.0)],
        vec![Vec3::new(0.0, 6.0, -12.0), Vec3::new(8.0, 4.0, -8.0)],
        vec![Vec3::new(12.0, 3.0, 0.0), Vec3::new(8.0, 3.0, 8.0)],
        vec![Vec3::new(0.0, 4.0, 12.0), Vec3::new(-8.0, 3.0, 8.0)],
    ]);
    let target = Spline::from_curves(vec![
        vec![Vec3::new(0.0, 1.0, 0.0), Vec3::new(-2.0, 1.0, 0.0)],
        vec![Vec3::new(0.0, 2.0, -2.0), Vec3::new(2.0, 1.0, 0.0)],
        vec![Vec3::new(0.0, 1.0, 2.0)],
        vec![Vec3::new(0.0, 1.0, 0.0)],
    ]);
    CameraController::new(movement, target, DEMO_PATH_SECONDS)
}

/// Floor, a ring of pillars and some spheres, lit by a low sun and three
/// point lights, with the camera path and a particle field attached.
pub fn demo_scene(device: &wgpu::Device, queue: &wgpu::Queue, assets: &mut GpuAssets) -> Scene {
    let cube = assets.add_mesh(device, queue, "cube", &MeshData::cube());
    let sphere = assets.add_mesh(device, queue, "sphere", &MeshData::uv_sphere(32, 16));
    let mut scene = Scene::new();

    let mut floor = RenderObject::with_mesh(cube);
    floor.set_model_matrix(Mat4::from_scale_rotation_translation(
        Vec3::new(30.0, 0.2, 30.0),
        Quat::IDENTITY,
        Vec3::new(0.0, -0.1, 0.0),
    ));
    floor.set_material(Material::new(Vec3::new(0.6, 0.6, 0.65), 0.2));
    scene.add_render_object(STATIC_PROGRAM, floor);

    for i in 0..8 {
        let angle = i as f32 * std::f32::consts::TAU / 8.0;
        let mut pillar = RenderObject::with_mesh(cube);
        pillar.set_model_matrix(Mat4::from_scale_rotation_translation(
            Vec3::new(0.6, 3.0, 0.6),
            Quat::from_rotation_y(angle),
            Vec3::new(5.0 * angle.cos(), 1.5, 5.0 * angle.sin()),
        ));
        pillar.set_material(Material::new(Vec3::new(0.8, 0.75, 0.7), 0.4));
        scene.add_render_object(STATIC_PROGRAM, pillar);
    }

    for (i, color) in [Vec3::new(0.9, 0.2, 0.2), Vec3::new(0.2, 0.8, 0.3), Vec3::new(0.2, 0.3, 0.9)].into_iter().enumerate() {
        let mut ball = RenderObject::with_mesh(sphere);
        ball.set_position(Vec3::new(-1.5 + 1.5 * i as f32, 0.6, 0.0));
        ball.set_scale(0.6);
        ball.set_material(Material::new(color, 0.8));
        scene.add_render_object(STATIC_PROGRAM, ball);
    }

    scene.set_dir_light(DirLight::new(Vec3::new(0.3, 1.0, 0.4), Vec3::splat(0.35)));
    scene.add_point_light(PointLight::new(Vec3::new(0.0, 2.5, 0.0), Vec3::new(2.0, 1.6, 1.2)));
    scene.add_point_light(PointLight::with_attenuation(
        Vec3::new(-6.0, 1.0, -6.0),
        Vec3::new(0.2, 0.4, 3.0),
        Attenuation::new(1.0, 0.35, 0.44),
    ));
    scene.add_point_light(PointLight::with_attenuation(
        Vec3::new(6.0, 1.0, 6.0),
        Vec3::new(3.0, 0.4, 0.2),
        Attenuation::new(1.0, 0.35, 0.44),
    ));
    scene.set_camera_controller(demo_camera_controller());
    scene.set_particle_system(ParticleSystem::new(DEMO_PARTICLES, 7));
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_path_splines_have_matching_curve_counts() {
        let controller = demo_camera_controller();
        assert_eq!(controller.movement_spline().num_curves(), controller.target_spline().num_curves());
        assert!((controller.duration() - DEMO_PATH_SECONDS).abs() < f32::EPSILON);
    }
}
