//! Seeded particle field. Particles are generated once on the CPU and animated
//! on the GPU from their initial state and the system clock.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

/// Minimal PCG32 (XSH RR) generator; deterministic for a given seed.
#[derive(Clone, Debug)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    const MULTIPLIER: u64 = 6364136223846793005;

    pub fn new(seed: u64, stream: u64) -> Self {
        let mut rng = Self { state: 0, inc: (stream << 1) | 1 };
        rng.step();
        rng.state = rng.state.wrapping_add(seed);
        rng.step();
        rng
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(seed, 0x9E37_79B9_7F4A_7C15)
    }

    #[inline]
    fn step(&mut self) {
        self.state = self.state.wrapping_mul(Self::MULTIPLIER).wrapping_add(self.inc);
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.step();
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        xorshifted.rotate_right((old >> 59) as u32)
    }

    /// Uniform in `[0, 1)` with 24 bits of precision.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        const SCALE: f32 = 1.0 / (1u32 << 24) as f32;
        (self.next_u32() >> 8) as f32 * SCALE
    }

    /// Uniform in `[lo, hi)`.
    #[inline]
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// Exponentially distributed sample with rate `lambda`.
    pub fn exponential(&mut self, lambda: f32) -> f32 {
        -(1.0 - self.next_f32()).ln() / lambda
    }
}

/// GPU vertex layout of one particle, 32 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Particle {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub lifetime: f32,
    pub kind: u32,
}

const LIFETIME_RATE: f32 = 0.1;

#[derive(Clone, Debug)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    time: f32,
    revision: u64,
}

impl ParticleSystem {
    /// Spawns `count` particles in the box x∈[-17,13], y∈[0,15], z∈[-15,15].
    /// Every fourth particle is of kind 1.
    pub fn new(count: usize, seed: u64) -> Self {
        let mut rng = Pcg32::from_seed(seed);
        let particles = (1..=count)
            .map(|i| {
                let position = Vec3::new(rng.range(-17.0, 13.0), rng.range(0.0, 15.0), rng.range(-15.0, 15.0));
                let velocity = Vec3::new(rng.range(-0.25, 0.25), rng.range(0.0, 0.5), rng.range(-0.25, 0.25));
                Particle {
                    position: position.to_array(),
                    velocity: velocity.to_array(),
                    lifetime: rng.exponential(LIFETIME_RATE),
                    kind: u32::from(i % 4 == 0),
                }
            })
            .collect();
        Self { particles, time: 0.0, revision: NEXT_REVISION.fetch_add(1, Ordering::Relaxed) }
    }

    pub fn update(&mut self, dt: f32) {
        self.time += dt;
    }

    /// Seconds since creation; uploaded as the animation clock.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Identifies this particle set; the renderer re-uploads when it changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_field() {
        let a = ParticleSystem::new(64, 7);
        let b = ParticleSystem::new(64, 7);
        assert_eq!(a.particles(), b.particles());
        assert_ne!(a.revision(), b.revision());
    }

    #[test]
    fn particles_stay_in_spawn_box() {
        let system = ParticleSystem::new(1000, 42);
        for p in system.particles() {
            assert!((-17.0..13.0).contains(&p.position[0]));
            assert!((0.0..15.0).contains(&p.position[1]));
            assert!((-15.0..15.0).contains(&p.position[2]));
            assert!(p.lifetime.is_finite() && p.lifetime >= 0.0);
        }
        let kind_one = system.particles().iter().filter(|p| p.kind == 1).count();
        assert_eq!(kind_one, 250);
    }

    #[test]
    fn clock_advances() {
        let mut system = ParticleSystem::new(4, 1);
        system.update(0.25);
        system.update(0.5);
        assert_eq!(system.time(), 0.75);
        assert_eq!(std::mem::size_of::<Particle>(), 32);
    }
}
