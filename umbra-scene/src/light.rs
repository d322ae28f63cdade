//! Directional and point lights.

use glam::Vec3;

/// Intensity ratio below which a point light is considered invisible (256/5).
pub const VISIBILITY_THRESHOLD: f32 = 256.0 / 5.0;

/// Point light falloff: `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    /// Attenuation pushed for empty light slots; keeps the shading denominator at 1.
    pub const UNUSED: Attenuation = Attenuation { constant: 1.0, linear: 0.0, quadratic: 0.0 };

    pub const fn new(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self { constant, linear, quadratic }
    }

    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self::new(1.0, 0.14, 0.07)
    }
}

/// Distance at which a light of `color` attenuated by `attenuation` drops below
/// the visibility threshold.
pub fn light_radius(color: Vec3, attenuation: Attenuation) -> f32 {
    let Attenuation { constant, linear, quadratic } = attenuation;
    let light_max = color.max_element();
    let c = constant - VISIBILITY_THRESHOLD * light_max;
    if quadratic <= 0.0 {
        if linear <= 0.0 {
            return f32::INFINITY;
        }
        return (-c / linear).max(0.0);
    }
    let discriminant = linear * linear - 4.0 * quadratic * c;
    if discriminant < 0.0 {
        return 0.0;
    }
    ((-linear + discriminant.sqrt()) / (2.0 * quadratic)).max(0.0)
}

#[derive(Clone, Debug, PartialEq)]
pub struct DirLight {
    direction: Vec3,
    color: Vec3,
}

impl DirLight {
    /// `direction` points toward the light source and is normalized.
    pub fn new(direction: Vec3, color: Vec3) -> Self {
        Self { direction: direction.normalize_or(Vec3::Y), color }
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.normalize_or(self.direction);
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }
}

impl Default for DirLight {
    fn default() -> Self {
        Self::new(Vec3::ONE, Vec3::ONE)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    position: Vec3,
    color: Vec3,
    attenuation: Attenuation,
    radius: f32,
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self::with_attenuation(position, color, Attenuation::default())
    }

    pub fn with_attenuation(position: Vec3, color: Vec3, attenuation: Attenuation) -> Self {
        Self { position, color, attenuation, radius: light_radius(color, attenuation) }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn attenuation(&self) -> Attenuation {
        self.attenuation
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
        self.radius = light_radius(self.color, self.attenuation);
    }

    pub fn set_attenuation(&mut self, constant: f32, linear: f32, quadratic: f32) {
        self.attenuation = Attenuation::new(constant, linear, quadratic);
        self.radius = light_radius(self.color, self.attenuation);
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ONE)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Light {
    Directional(DirLight),
    Point(PointLight),
}

impl Light {
    pub fn color(&self) -> Vec3 {
        match self {
            Light::Directional(l) => l.color(),
            Light::Point(l) => l.color(),
        }
    }
}

impl From<DirLight> for Light {
    fn from(light: DirLight) -> Self {
        Light::Directional(light)
    }
}

impl From<PointLight> for Light {
    fn from(light: PointLight) -> Self {
        Light::Point(light)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_matches_closed_form() {
        let light = PointLight::with_attenuation(Vec3::ZERO, Vec3::splat(1.5), Attenuation::new(1.0, 0.14, 0.07));
        let (c, l, q, max) = (1.0f32, 0.14f32, 0.07f32, 1.5f32);
        let expected = (-l + (l * l - 4.0 * q * (c - (256.0 / 5.0) * max)).sqrt()) / (2.0 * q);
        assert_eq!(light.radius(), expected);
        assert!((light.radius() - 31.922).abs() < 1e-3);
    }

    #[test]
    fn radius_follows_color_and_attenuation() {
        let mut light = PointLight::new(Vec3::ZERO, Vec3::ONE);
        let before = light.radius();
        light.set_color(Vec3::new(0.2, 4.0, 0.1));
        let brighter = light.radius();
        assert!(brighter > before);
        assert_eq!(brighter, light_radius(Vec3::new(0.2, 4.0, 0.1), light.attenuation()));
        light.set_attenuation(1.0, 0.7, 1.8);
        assert!(light.radius() < brighter);
    }

    #[test]
    fn degenerate_attenuation_does_not_produce_nan() {
        assert_eq!(light_radius(Vec3::ONE, Attenuation::UNUSED), f32::INFINITY);
        let linear_only = light_radius(Vec3::ONE, Attenuation::new(1.0, 0.5, 0.0));
        assert!((linear_only - (VISIBILITY_THRESHOLD - 1.0) / 0.5).abs() < 1e-4);
        assert_eq!(light_radius(Vec3::ZERO, Attenuation::default()), 0.0);
    }

    #[test]
    fn direction_is_normalized_on_set() {
        let mut light = DirLight::new(Vec3::new(0.1, 1.0, 0.5), Vec3::splat(0.5));
        assert!((light.direction().length() - 1.0).abs() < 1e-6);
        light.set_direction(Vec3::new(0.0, 0.0, -3.0));
        assert_eq!(light.direction(), Vec3::NEG_Z);
    }

    #[test]
    fn unused_attenuation_is_unity() {
        assert_eq!(Attenuation::UNUSED.factor(0.0), 1.0);
        assert_eq!(Attenuation::UNUSED.factor(42.0), 1.0);
    }
}
