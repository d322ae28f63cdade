//! The set of things drawn in one frame: objects bucketed by program, lights,
//! the optional camera controller and particle system.

use log::{debug, warn};

use crate::camera::MovingCamera;
use crate::camera_controller::CameraController;
use crate::light::{DirLight, Light, PointLight};
use crate::particles::ParticleSystem;
use crate::render_object::RenderObject;

/// Number of point-light slots in the lighting uniform.
pub const MAX_POINT_LIGHTS: usize = 5;

/// Dense id of a registered geometry program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub usize);

/// Position of a render object inside its program bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub program: ProgramId,
    pub index: usize,
}

#[derive(Default)]
pub struct Scene {
    buckets: Vec<Vec<RenderObject>>,
    dir_light: Option<DirLight>,
    point_lights: Vec<PointLight>,
    camera_controller: Option<CameraController>,
    particle_system: Option<ParticleSystem>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures buckets exist for programs `0..count`.
    pub fn reserve_programs(&mut self, count: usize) {
        if self.buckets.len() < count {
            self.buckets.resize_with(count, Vec::new);
        }
    }

    pub fn add_render_object(&mut self, program: ProgramId, object: RenderObject) -> ObjectId {
        self.reserve_programs(program.0 + 1);
        let bucket = &mut self.buckets[program.0];
        bucket.push(object);
        ObjectId { program, index: bucket.len() - 1 }
    }

    /// Removes an object; later objects in the same bucket shift down by one.
    pub fn remove_render_object(&mut self, id: ObjectId) -> Option<RenderObject> {
        let bucket = self.buckets.get_mut(id.program.0)?;
        (id.index < bucket.len()).then(|| bucket.remove(id.index))
    }

    pub fn render_object(&self, id: ObjectId) -> Option<&RenderObject> {
        self.buckets.get(id.program.0)?.get(id.index)
    }

    pub fn render_object_mut(&mut self, id: ObjectId) -> Option<&mut RenderObject> {
        self.buckets.get_mut(id.program.0)?.get_mut(id.index)
    }

    /// Objects registered under `program`; empty for unknown programs.
    pub fn render_objects(&self, program: ProgramId) -> &[RenderObject] {
        self.buckets.get(program.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn buckets(&self) -> impl Iterator<Item = (ProgramId, &[RenderObject])> {
        self.buckets.iter().enumerate().map(|(i, b)| (ProgramId(i), b.as_slice()))
    }

    pub fn program_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn object_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn has_render_objects(&self) -> bool {
        self.buckets.iter().any(|b| !b.is_empty())
    }

    pub fn dir_light(&self) -> Option<&DirLight> {
        self.dir_light.as_ref()
    }

    pub fn dir_light_mut(&mut self) -> Option<&mut DirLight> {
        self.dir_light.as_mut()
    }

    pub fn set_dir_light(&mut self, light: DirLight) {
        self.dir_light = Some(light);
    }

    pub fn clear_dir_light(&mut self) -> Option<DirLight> {
        self.dir_light.take()
    }

    /// Appends a point light. Returns `false` and leaves the scene untouched when
    /// all slots are taken.
    pub fn add_point_light(&mut self, light: PointLight) -> bool {
        if self.point_lights.len() >= MAX_POINT_LIGHTS {
            warn!("point light rejected: all {MAX_POINT_LIGHTS} slots in use");
            return false;
        }
        self.point_lights.push(light);
        true
    }

    pub fn remove_point_light(&mut self, index: usize) -> Option<PointLight> {
        (index < self.point_lights.len()).then(|| self.point_lights.remove(index))
    }

    pub fn point_lights(&self) -> &[PointLight] {
        &self.point_lights
    }

    pub fn point_light_mut(&mut self, index: usize) -> Option<&mut PointLight> {
        self.point_lights.get_mut(index)
    }

    /// Directional lights replace the current one; point lights are appended
    /// subject to the slot bound.
    pub fn insert_light(&mut self, light: impl Into<Light>) -> bool {
        match light.into() {
            Light::Directional(l) => {
                self.set_dir_light(l);
                true
            }
            Light::Point(l) => self.add_point_light(l),
        }
    }

    pub fn camera_controller(&self) -> Option<&CameraController> {
        self.camera_controller.as_ref()
    }

    pub fn camera_controller_mut(&mut self) -> Option<&mut CameraController> {
        self.camera_controller.as_mut()
    }

    pub fn set_camera_controller(&mut self, controller: CameraController) {
        self.camera_controller = Some(controller);
    }

    pub fn clear_camera_controller(&mut self) -> Option<CameraController> {
        self.camera_controller.take()
    }

    pub fn particle_system(&self) -> Option<&ParticleSystem> {
        self.particle_system.as_ref()
    }

    pub fn set_particle_system(&mut self, system: ParticleSystem) {
        debug!("scene particle system set ({} particles)", system.len());
        self.particle_system = Some(system);
    }

    pub fn clear_particle_system(&mut self) -> Option<ParticleSystem> {
        self.particle_system.take()
    }

    /// Advances the camera path and the particle clock.
    pub fn update(&mut self, dt: f32, camera: &mut MovingCamera) {
        if let Some(controller) = self.camera_controller.as_mut() {
            controller.update(dt, camera);
        }
        if let Some(particles) = self.particle_system.as_mut() {
            particles.update(dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spline::Spline;
    use glam::Vec3;

    #[test]
    fn sixth_point_light_is_rejected() {
        let mut scene = Scene::new();
        for i in 0..MAX_POINT_LIGHTS {
            assert!(scene.add_point_light(PointLight::new(Vec3::splat(i as f32), Vec3::ONE)));
        }
        let before = scene.point_lights().to_vec();
        assert!(!scene.add_point_light(PointLight::new(Vec3::splat(99.0), Vec3::ONE)));
        assert_eq!(scene.point_lights(), before.as_slice());
    }

    #[test]
    fn adding_to_unknown_program_grows_buckets() {
        let mut scene = Scene::new();
        let id = scene.add_render_object(ProgramId(3), RenderObject::new());
        assert_eq!(scene.program_count(), 4);
        assert_eq!(id, ObjectId { program: ProgramId(3), index: 0 });
        assert!(scene.render_objects(ProgramId(0)).is_empty());
        assert!(scene.render_objects(ProgramId(17)).is_empty());
        assert!(scene.has_render_objects());
        assert!(scene.remove_render_object(id).is_some());
        assert!(!scene.has_render_objects());
    }

    #[test]
    fn insert_light_dispatches_on_variant() {
        let mut scene = Scene::new();
        assert!(scene.insert_light(DirLight::new(Vec3::Y, Vec3::ONE)));
        assert!(scene.insert_light(DirLight::new(Vec3::X, Vec3::ONE)));
        assert_eq!(scene.dir_light().map(DirLight::direction), Some(Vec3::X));
        assert!(scene.insert_light(PointLight::default()));
        assert_eq!(scene.point_lights().len(), 1);
    }

    #[test]
    fn update_drives_controller_and_particles() {
        let mut scene = Scene::new();
        scene.set_camera_controller(CameraController::new(
            Spline::from_curves(vec![vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)]]),
            Spline::from_curves(vec![vec![Vec3::new(0.0, 0.0, -10.0)]]),
            4.0,
        ));
        scene.set_particle_system(ParticleSystem::new(8, 3));
        let mut cam = MovingCamera::new(Vec3::Z, Vec3::ZERO);
        scene.update(1.0, &mut cam);
        assert!(cam.position().abs_diff_eq(Vec3::X, 1e-5));
        assert_eq!(scene.particle_system().map(ParticleSystem::time), Some(1.0));
    }
}
