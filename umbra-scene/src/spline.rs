//! Piecewise Bézier paths for scripted camera moves.

use glam::Vec3;

/// Point at `t` on the Bézier curve with the given control points.
pub fn de_casteljau(points: &[Vec3], t: f32) -> Option<Vec3> {
    let mut work = points.to_vec();
    let n = work.len();
    for j in 1..n {
        for i in 0..n - j {
            work[i] = work[i].lerp(work[i + 1], t);
        }
    }
    work.first().copied()
}

/// Chain of Bézier curves. Curve `k > 0` implicitly starts at the last control
/// point of curve `k - 1`, so consecutive curves join without repeating points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Spline {
    curves: Vec<Vec<Vec3>>,
}

impl Spline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_curves(curves: Vec<Vec<Vec3>>) -> Self {
        let mut spline = Self::new();
        for curve in curves {
            spline.add_curve(curve);
        }
        spline
    }

    /// Empty curves are dropped.
    pub fn add_curve(&mut self, points: Vec<Vec3>) {
        if !points.is_empty() {
            self.curves.push(points);
        }
    }

    pub fn curves(&self) -> &[Vec<Vec3>] {
        &self.curves
    }

    pub fn num_curves(&self) -> usize {
        self.curves.len()
    }

    pub fn control_points(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.curves.iter().flatten().copied()
    }

    /// `t` spans `[0, num_curves]`: the integer part selects the curve, the
    /// fraction is the local parameter. Values outside are clamped to the ends.
    pub fn point(&self, t: f32) -> Option<Vec3> {
        let last = self.curves.len().checked_sub(1)?;
        let t = t.max(0.0);
        let index = (t as usize).min(last);
        let local = (t - index as f32).min(1.0);
        if index == 0 {
            return de_casteljau(&self.curves[0], local);
        }
        let previous = self.curves[index - 1].last().copied()?;
        let mut curve = Vec::with_capacity(self.curves[index].len() + 1);
        curve.push(previous);
        curve.extend_from_slice(&self.curves[index]);
        de_casteljau(&curve, local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quadratic_midpoint() {
        let p = de_casteljau(&[Vec3::ZERO, Vec3::new(1.0, 2.0, 0.0), Vec3::new(2.0, 0.0, 0.0)], 0.5).unwrap();
        assert!(p.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
        assert_eq!(de_casteljau(&[], 0.3), None);
    }

    #[test]
    fn curves_chain_through_previous_endpoint() {
        let spline = Spline::from_curves(vec![
            vec![Vec3::ZERO, Vec3::X],
            vec![Vec3::new(1.0, 1.0, 0.0)],
        ]);
        assert_eq!(spline.point(1.0), Some(Vec3::X));
        let mid = spline.point(1.5).unwrap();
        assert!(mid.abs_diff_eq(Vec3::new(1.0, 0.5, 0.0), 1e-6));
    }

    #[test]
    fn parameter_is_clamped() {
        let spline = Spline::from_curves(vec![vec![Vec3::ZERO, Vec3::X], vec![Vec3::Y]]);
        assert_eq!(spline.point(-3.0), Some(Vec3::ZERO));
        assert_eq!(spline.point(9.0), Some(Vec3::Y));
        assert_eq!(Spline::new().point(0.5), None);
    }
}
