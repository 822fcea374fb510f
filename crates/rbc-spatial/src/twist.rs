//! Spatial velocity vectors.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

use crate::Wrench;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which frame an angular velocity is expressed in when extrapolating a pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExtrapolationFrame {
    /// Velocity is expressed in the moving body's own frame; the rotational
    /// increment multiplies on the right.
    Body,
    /// Velocity is expressed in the world-aligned frame; the rotational
    /// increment multiplies on the left.
    World,
}

/// 6D spatial velocity: translational velocity `v` (free component) and
/// angular velocity `w` (line component).
///
/// Twists are contravariant: under a rigid transform the line component
/// rotates, and the translation couples the (rotated) line component into the
/// free component via a cross product.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Twist {
    /// Translational velocity (free component).
    pub v: Vector3<f64>,
    /// Angular velocity (line component).
    pub w: Vector3<f64>,
}

impl Twist {
    /// Create a twist from translational and angular parts.
    #[inline]
    #[must_use]
    pub fn new(v: Vector3<f64>, w: Vector3<f64>) -> Self {
        Self { v, w }
    }

    /// The zero twist.
    #[inline]
    #[must_use]
    pub fn zero() -> Self {
        Self {
            v: Vector3::zeros(),
            w: Vector3::zeros(),
        }
    }

    /// Euclidean norm over all six components.
    #[must_use]
    pub fn norm(&self) -> f64 {
        (self.v.norm_squared() + self.w.norm_squared()).sqrt()
    }

    /// 1-norm (sum of absolute component values).
    #[must_use]
    pub fn norm1(&self) -> f64 {
        self.v.abs().sum() + self.w.abs().sum()
    }

    /// Infinity norm (largest absolute component value).
    #[must_use]
    pub fn norm_inf(&self) -> f64 {
        self.v.abs().max().max(self.w.abs().max())
    }

    /// `self + s * other`, without an intermediate allocation.
    #[must_use]
    pub fn scaled_add(&self, s: f64, other: &Twist) -> Twist {
        Twist::new(self.v + s * other.v, self.w + s * other.w)
    }

    /// `s1 * a + s2 * b`.
    #[must_use]
    pub fn combine(s1: f64, a: &Twist, s2: f64, b: &Twist) -> Twist {
        Twist::new(s1 * a.v + s2 * b.v, s1 * a.w + s2 * b.w)
    }

    /// Linear interpolation: `(1 - t) * self + t * other`.
    #[must_use]
    pub fn interpolate(&self, other: &Twist, t: f64) -> Twist {
        Twist::combine(1.0 - t, self, t, other)
    }

    /// Rotate both components by `r` (rotation-only transform).
    #[must_use]
    pub fn rotate(&self, r: &UnitQuaternion<f64>) -> Twist {
        Twist::new(r * self.v, r * self.w)
    }

    /// Rotate both components by the inverse of `r`.
    #[must_use]
    pub fn inverse_rotate(&self, r: &UnitQuaternion<f64>) -> Twist {
        Twist::new(r.inverse() * self.v, r.inverse() * self.w)
    }

    /// Re-express this twist, given in frame B, in frame A, where `x_ab` is
    /// the pose of B in A.
    ///
    /// `w' = R w`, `v' = R v + p × w'`: the translational part couples the
    /// line component into the free component.
    #[must_use]
    pub fn transform(&self, x_ab: &Isometry3<f64>) -> Twist {
        let w = x_ab.rotation * self.w;
        let v = x_ab.rotation * self.v + x_ab.translation.vector.cross(&w);
        Twist::new(v, w)
    }

    /// Inverse of [`Twist::transform`]: re-express an A-frame twist in frame B.
    #[must_use]
    pub fn inverse_transform(&self, x_ab: &Isometry3<f64>) -> Twist {
        let rinv = x_ab.rotation.inverse();
        let w = rinv * self.w;
        let v = rinv * (self.v - x_ab.translation.vector.cross(&self.w));
        Twist::new(v, w)
    }

    /// Spatial cross product of two twists (a motion vector), used for bias
    /// and coriolis terms: `(v₁, w₁) × (v₂, w₂) = (w₁ × v₂ + v₁ × w₂, w₁ × w₂)`.
    #[must_use]
    pub fn cross(&self, other: &Twist) -> Twist {
        Twist::new(
            self.w.cross(&other.v) + self.v.cross(&other.w),
            self.w.cross(&other.w),
        )
    }

    /// Mechanical power: `f · v + m · w`.
    #[must_use]
    pub fn dot(&self, wr: &Wrench) -> f64 {
        wr.f.dot(&self.v) + wr.m.dot(&self.w)
    }

    /// Interpret this twist as a finite displacement over a unit step and
    /// return the corresponding rigid transform: translation `v`, rotation
    /// the axis-angle exponential of `w`.
    #[must_use]
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.v),
            UnitQuaternion::from_scaled_axis(self.w),
        )
    }

    /// Inverse of [`Twist::to_isometry`]: extract the displacement twist of a
    /// rigid transform (translation plus the axis-angle logarithm of the
    /// rotation).
    #[must_use]
    pub fn from_isometry(x: &Isometry3<f64>) -> Twist {
        Twist::new(x.translation.vector, x.rotation.scaled_axis())
    }

    /// First-order pose extrapolation: advance `x` by this twist over the
    /// step `h`.
    ///
    /// With [`ExtrapolationFrame::Body`] the twist is taken in the moving
    /// frame (`R ← R·exp(h ŵ)`, `p ← p + h R v`); with
    /// [`ExtrapolationFrame::World`] it is world-aligned
    /// (`R ← exp(h ŵ)·R`, `p ← p + h v`).
    pub fn extrapolate_transform(&self, x: &mut Isometry3<f64>, h: f64, frame: ExtrapolationFrame) {
        let dq = UnitQuaternion::from_scaled_axis(h * self.w);
        match frame {
            ExtrapolationFrame::Body => {
                x.translation.vector += h * (x.rotation * self.v);
                x.rotation *= dq;
            }
            ExtrapolationFrame::World => {
                x.translation.vector += h * self.v;
                x.rotation = dq * x.rotation;
            }
        }
    }
}

impl std::ops::Add for Twist {
    type Output = Twist;
    fn add(self, rhs: Twist) -> Twist {
        Twist::new(self.v + rhs.v, self.w + rhs.w)
    }
}

impl std::ops::Sub for Twist {
    type Output = Twist;
    fn sub(self, rhs: Twist) -> Twist {
        Twist::new(self.v - rhs.v, self.w - rhs.w)
    }
}

impl std::ops::Neg for Twist {
    type Output = Twist;
    fn neg(self) -> Twist {
        Twist::new(-self.v, -self.w)
    }
}

impl std::ops::Mul<f64> for Twist {
    type Output = Twist;
    fn mul(self, s: f64) -> Twist {
        Twist::new(self.v * s, self.w * s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_2;

    fn test_transform() -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(1.0, -2.0, 0.5),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.3, -0.1, 0.7)),
        )
    }

    #[test]
    fn test_transform_round_trip() {
        let x = test_transform();
        let tw = Twist::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(-0.5, 0.1, 0.9));
        let back = tw.transform(&x).inverse_transform(&x);
        assert_relative_eq!(back.v, tw.v, epsilon = 1e-12);
        assert_relative_eq!(back.w, tw.w, epsilon = 1e-12);
    }

    #[test]
    fn test_power_invariance() {
        // wrench · twist must be frame-invariant under the shared rule
        let x = test_transform();
        let tw = Twist::new(Vector3::new(0.2, -1.0, 0.4), Vector3::new(1.1, 0.0, -0.3));
        let wr = Wrench::new(Vector3::new(-0.7, 0.2, 2.0), Vector3::new(0.5, 0.5, -1.5));
        let p0 = tw.dot(&wr);
        let p1 = tw.transform(&x).dot(&wr.transform(&x));
        assert_relative_eq!(p0, p1, epsilon = 1e-12);
    }

    #[test]
    fn test_pure_rotation_transform() {
        let x = Isometry3::from_parts(
            Translation3::new(0.0, 0.0, 0.0),
            UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.0, FRAC_PI_2)),
        );
        let tw = Twist::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0));
        let t = tw.transform(&x);
        assert_relative_eq!(t.v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(t.w, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_isometry_round_trip() {
        let tw = Twist::new(Vector3::new(0.4, -0.2, 1.0), Vector3::new(0.1, 0.8, -0.5));
        let back = Twist::from_isometry(&tw.to_isometry());
        assert_relative_eq!(back.v, tw.v, epsilon = 1e-12);
        assert_relative_eq!(back.w, tw.w, epsilon = 1e-12);
    }

    #[test]
    fn test_extrapolate_world_vs_body() {
        let tw = Twist::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let mut xb = test_transform();
        let mut xw = xb;
        tw.extrapolate_transform(&mut xb, 0.1, ExtrapolationFrame::Body);
        tw.extrapolate_transform(&mut xw, 0.1, ExtrapolationFrame::World);
        // Both rotate by the same angle, but about different axes in general.
        assert_relative_eq!(xb.rotation.angle(), xw.rotation.angle(), epsilon = 1e-9);
    }

    #[test]
    fn test_cross_jacobi() {
        // twist cross product is a Lie bracket: antisymmetric
        let a = Twist::new(Vector3::new(1.0, 0.0, 2.0), Vector3::new(0.0, 1.0, 0.5));
        let b = Twist::new(Vector3::new(-1.0, 0.5, 0.0), Vector3::new(0.3, 0.0, 1.0));
        let ab = a.cross(&b);
        let ba = b.cross(&a);
        assert_relative_eq!(ab.v, -ba.v, epsilon = 1e-12);
        assert_relative_eq!(ab.w, -ba.w, epsilon = 1e-12);
    }

    #[test]
    fn test_norms() {
        let tw = Twist::new(Vector3::new(3.0, 0.0, 0.0), Vector3::new(0.0, -4.0, 0.0));
        assert_relative_eq!(tw.norm(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(tw.norm1(), 7.0, epsilon = 1e-12);
        assert_relative_eq!(tw.norm_inf(), 4.0, epsilon = 1e-12);
    }
}
