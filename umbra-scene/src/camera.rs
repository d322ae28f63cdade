//! Yaw/pitch fly camera with cached view and projection.

use glam::{Mat4, Vec2, Vec3};

const PITCH_LIMIT: f32 = 89.0;

#[derive(Clone, Debug)]
pub struct MovingCamera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    fov_degrees: f32,
    near: f32,
    far: f32,
    aspect: f32,

    direction: Vec3,
    up: Vec3,
    right: Vec3,
    view: Mat4,
    projection: Mat4,
    up_to_date: bool,
}

impl MovingCamera {
    /// Camera at `position` facing `target`. Matrices are valid immediately.
    pub fn new(position: Vec3, target: Vec3) -> Self {
        let mut cam = Self {
            position,
            yaw: -90.0,
            pitch: 0.0,
            fov_degrees: 60.0,
            near: 0.1,
            far: 100.0,
            aspect: 800.0 / 600.0,
            direction: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            up_to_date: false,
        };
        cam.look_at(target);
        cam.update();
        cam
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    pub fn set_resolution(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
        self.up_to_date = false;
    }

    pub fn move_to(&mut self, position: Vec3) {
        self.position = position;
        self.up_to_date = false;
    }

    pub fn move_by(&mut self, delta: Vec3) {
        self.position += delta;
        self.up_to_date = false;
    }

    /// Points the camera at `target`. A target at the camera position is ignored.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(d) = (target - self.position).try_normalize() else {
            return;
        };
        self.yaw = d.z.atan2(d.x).to_degrees();
        self.pitch = d.y.clamp(-1.0, 1.0).asin().to_degrees().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.up_to_date = false;
    }

    /// Mouse-look: `delta.x` turns left, `delta.y` looks up, both in degrees.
    pub fn rotate(&mut self, delta: Vec2) {
        self.yaw -= delta.x;
        self.pitch = (self.pitch + delta.y).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.up_to_date = false;
    }

    pub fn zoom(&mut self, amount: f32) {
        self.fov_degrees = (self.fov_degrees - amount).clamp(1.0, 90.0);
        self.up_to_date = false;
    }

    /// Recomputes the cached matrices if anything changed. Returns whether it did,
    /// so callers know when to push camera uniforms again.
    pub fn update_if_changed(&mut self) -> bool {
        if self.up_to_date {
            return false;
        }
        self.update();
        true
    }

    fn update(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.direction = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = Vec3::Y.cross(-self.direction).normalize();
        self.up = (-self.direction).cross(self.right);
        self.view = Mat4::look_to_rh(self.position, self.direction, self.up);
        self.projection = Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far);
        self.up_to_date = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_camera_faces_its_target() {
        let cam = MovingCamera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        assert!(cam.direction().abs_diff_eq(Vec3::NEG_Z, 1e-5), "{:?}", cam.direction());
        let clip = cam.view_projection().project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn dirty_flag_reports_changes_once() {
        let mut cam = MovingCamera::new(Vec3::Z, Vec3::ZERO);
        assert!(!cam.update_if_changed());
        cam.move_by(Vec3::X);
        assert!(cam.update_if_changed());
        assert!(!cam.update_if_changed());
        assert_eq!(cam.position(), Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn pitch_and_zoom_are_clamped() {
        let mut cam = MovingCamera::new(Vec3::Z, Vec3::ZERO);
        cam.rotate(Vec2::new(0.0, 500.0));
        assert_eq!(cam.pitch(), 89.0);
        cam.zoom(100.0);
        assert_eq!(cam.fov_degrees(), 1.0);
        cam.zoom(-500.0);
        assert_eq!(cam.fov_degrees(), 90.0);
    }

    #[test]
    fn zero_resolution_is_ignored() {
        let mut cam = MovingCamera::new(Vec3::Z, Vec3::ZERO);
        cam.set_resolution(0, 600);
        assert!(!cam.update_if_changed());
        cam.set_resolution(1920, 1080);
        assert!(cam.update_if_changed());
        assert!((cam.aspect_ratio() - 16.0 / 9.0).abs() < 1e-6);
    }
}
