//! Drives a camera along a movement spline while aiming it along a target spline.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::camera::MovingCamera;
use crate::spline::Spline;

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone, Debug)]
pub struct CameraController {
    movement: Spline,
    target: Spline,
    enabled: bool,
    elapsed: f32,
    duration: f32,
    revision: u64,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(Spline::new(), Spline::new(), 1.0)
    }
}

impl CameraController {
    /// `duration` is the time in seconds to traverse both splines; non-positive
    /// values fall back to one second.
    pub fn new(movement: Spline, target: Spline, duration: f32) -> Self {
        Self {
            movement,
            target,
            enabled: true,
            elapsed: 0.0,
            duration: if duration > 0.0 { duration } else { 1.0 },
            revision: next_revision(),
        }
    }

    pub fn update(&mut self, dt: f32, camera: &mut MovingCamera) {
        if !self.enabled {
            return;
        }
        self.elapsed += dt;
        let progress = self.progress();
        if progress >= 1.0 {
            return;
        }
        if let Some(p) = self.movement.point(progress * self.movement.num_curves() as f32) {
            camera.move_to(p);
        }
        if let Some(t) = self.target.point(progress * self.target.num_curves() as f32) {
            camera.look_at(t);
        }
    }

    pub fn progress(&self) -> f32 {
        self.elapsed / self.duration
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Ignored unless positive.
    pub fn set_duration(&mut self, duration: f32) {
        if duration > 0.0 {
            self.duration = duration;
        }
    }

    pub fn movement_spline(&self) -> &Spline {
        &self.movement
    }

    pub fn target_spline(&self) -> &Spline {
        &self.target
    }

    pub fn set_movement_spline(&mut self, spline: Spline) {
        self.movement = spline;
        self.revision = next_revision();
    }

    pub fn set_target_spline(&mut self, spline: Spline) {
        self.target = spline;
        self.revision = next_revision();
    }

    pub fn movement_control_points(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.movement.control_points()
    }

    pub fn target_control_points(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.target.control_points()
    }

    /// Changes whenever the control points change; unique across controllers.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_line() -> CameraController {
        CameraController::new(
            Spline::from_curves(vec![vec![Vec3::new(0.0, 0.0, 10.0), Vec3::new(10.0, 0.0, 10.0)]]),
            Spline::from_curves(vec![vec![Vec3::ZERO]]),
            2.0,
        )
    }

    #[test]
    fn camera_follows_progress() {
        let mut ctrl = straight_line();
        let mut cam = MovingCamera::new(Vec3::Z, Vec3::ZERO);
        ctrl.update(1.0, &mut cam);
        assert!(cam.position().abs_diff_eq(Vec3::new(5.0, 0.0, 10.0), 1e-5));
        cam.update_if_changed();
        let expected = (Vec3::ZERO - cam.position()).normalize();
        assert!(cam.direction().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn stops_once_finished() {
        let mut ctrl = straight_line();
        let mut cam = MovingCamera::new(Vec3::Z, Vec3::ZERO);
        ctrl.update(1.5, &mut cam);
        let held = cam.position();
        ctrl.update(5.0, &mut cam);
        assert!(ctrl.is_finished());
        assert_eq!(cam.position(), held);
    }

    #[test]
    fn disabled_controller_leaves_camera_alone() {
        let mut ctrl = straight_line();
        ctrl.set_enabled(false);
        let mut cam = MovingCamera::new(Vec3::Z, Vec3::ZERO);
        ctrl.update(1.0, &mut cam);
        assert_eq!(cam.position(), Vec3::Z);
        assert_eq!(ctrl.progress(), 0.0);
    }

    #[test]
    fn replacing_splines_bumps_revision() {
        let mut ctrl = straight_line();
        let before = ctrl.revision();
        ctrl.set_target_spline(Spline::new());
        assert_ne!(ctrl.revision(), before);
        ctrl.set_duration(-1.0);
        assert_eq!(ctrl.duration(), 2.0);
    }
}
