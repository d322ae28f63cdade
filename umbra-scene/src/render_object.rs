//! Drawable scene entries: transform, material, texture and mesh references.

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::error::SceneError;
use crate::handle::{MeshHandle, ModelHandle, TextureHandle};

/// Upper bound of the bone palette uploaded per animated object.
pub const MAX_BONES: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub diffuse: Vec3,
    pub specular: f32,
}

impl Material {
    pub const fn new(diffuse: Vec3, specular: f32) -> Self {
        Self { diffuse, specular }
    }
}

/// What the object draws; resolved through the asset table at draw time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Drawable {
    Mesh(MeshHandle),
    Animated(ModelHandle),
}

#[derive(Clone, Debug)]
pub struct RenderObject {
    drawable: Option<Drawable>,
    position: Vec3,
    scale: f32,
    rotation: Quat,
    material: Option<Material>,
    diffuse_texture: Option<TextureHandle>,
    normal_texture: Option<TextureHandle>,
    bones: Vec<Mat4>,
    model: Mat4,
    normal_matrix: Mat3,
}

impl Default for RenderObject {
    fn default() -> Self {
        Self {
            drawable: None,
            position: Vec3::ZERO,
            scale: 1.0,
            rotation: Quat::IDENTITY,
            material: None,
            diffuse_texture: None,
            normal_texture: None,
            bones: Vec::new(),
            model: Mat4::IDENTITY,
            normal_matrix: Mat3::IDENTITY,
        }
    }
}

impl RenderObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mesh(mesh: MeshHandle) -> Self {
        Self { drawable: Some(Drawable::Mesh(mesh)), ..Self::default() }
    }

    pub fn with_animated_model(model: ModelHandle) -> Self {
        Self { drawable: Some(Drawable::Animated(model)), ..Self::default() }
    }

    pub fn drawable(&self) -> Option<Drawable> {
        self.drawable
    }

    pub fn set_mesh(&mut self, mesh: MeshHandle) {
        self.drawable = Some(Drawable::Mesh(mesh));
    }

    pub fn set_animated_model(&mut self, model: ModelHandle) {
        self.drawable = Some(Drawable::Animated(model));
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.recalculate_model_matrix();
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
        self.recalculate_model_matrix();
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.recalculate_model_matrix();
    }

    /// Rotation of `angle` radians around `axis`.
    pub fn set_rotation_axis_angle(&mut self, axis: Vec3, angle: f32) {
        self.set_rotation(Quat::from_axis_angle(axis.normalize_or(Vec3::Y), angle));
    }

    /// Overrides the model matrix directly; the stored position/scale/rotation are
    /// left as they were and apply again on the next transform setter.
    pub fn set_model_matrix(&mut self, model: Mat4) {
        self.model = model;
        self.normal_matrix = if model.determinant().abs() > f32::EPSILON {
            Mat3::from_mat4(model.inverse().transpose())
        } else {
            Mat3::IDENTITY
        };
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    pub fn normal_matrix(&self) -> Mat3 {
        self.normal_matrix
    }

    pub fn material(&self) -> Option<Material> {
        self.material
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = Some(material);
    }

    pub fn diffuse_texture(&self) -> Option<TextureHandle> {
        self.diffuse_texture
    }

    pub fn set_diffuse_texture(&mut self, texture: TextureHandle) {
        self.diffuse_texture = Some(texture);
    }

    pub fn normal_texture(&self) -> Option<TextureHandle> {
        self.normal_texture
    }

    pub fn set_normal_texture(&mut self, texture: TextureHandle) {
        self.normal_texture = Some(texture);
    }

    /// Final bone matrices produced by the animation evaluator for this frame.
    pub fn set_bone_transforms(&mut self, bones: &[Mat4]) -> Result<(), SceneError> {
        if bones.len() > MAX_BONES {
            return Err(SceneError::TooManyBones { count: bones.len(), max: MAX_BONES });
        }
        self.bones.clear();
        self.bones.extend_from_slice(bones);
        Ok(())
    }

    pub fn bone_transforms(&self) -> &[Mat4] {
        &self.bones
    }

    fn recalculate_model_matrix(&mut self) {
        let model = Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.position);
        self.set_model_matrix(model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mat3_close(a: Mat3, b: Mat3) {
        assert!(a.abs_diff_eq(b, 1e-5), "{a:?} != {b:?}");
    }

    #[test]
    fn model_is_translate_rotate_scale() {
        let mut obj = RenderObject::new();
        obj.set_scale(2.0);
        obj.set_rotation_axis_angle(Vec3::Y, std::f32::consts::FRAC_PI_2);
        obj.set_position(Vec3::new(1.0, 2.0, 3.0));
        let p = obj.model_matrix().transform_point3(Vec3::X);
        assert!(p.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5), "{p:?}");
    }

    #[test]
    fn normal_matrix_tracks_every_transform_change() {
        let mut obj = RenderObject::new();
        obj.set_scale(4.0);
        assert_mat3_close(obj.normal_matrix(), Mat3::from_diagonal(Vec3::splat(0.25)));
        obj.set_rotation_axis_angle(Vec3::Z, 0.7);
        let expected = Mat3::from_mat4(obj.model_matrix()).inverse().transpose();
        assert_mat3_close(obj.normal_matrix(), expected);
        obj.set_position(Vec3::splat(9.0));
        assert_mat3_close(obj.normal_matrix(), expected);
    }

    #[test]
    fn singular_model_falls_back_to_identity_normals() {
        let mut obj = RenderObject::new();
        obj.set_scale(0.0);
        assert_eq!(obj.normal_matrix(), Mat3::IDENTITY);
    }

    #[test]
    fn bone_palette_is_bounded() {
        let mut obj = RenderObject::new();
        assert!(obj.set_bone_transforms(&[Mat4::IDENTITY; MAX_BONES]).is_ok());
        let err = obj.set_bone_transforms(&vec![Mat4::IDENTITY; MAX_BONES + 1]).unwrap_err();
        assert_eq!(err, SceneError::TooManyBones { count: MAX_BONES + 1, max: MAX_BONES });
        assert_eq!(obj.bone_transforms().len(), MAX_BONES);
    }
}
