//! Spatial force vectors.

use nalgebra::{Isometry3, UnitQuaternion, Vector3};

use crate::Twist;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 6D spatial force: moment `m` (free component) and force `f` (line
/// component).
///
/// The component ordering is swapped relative to [`Twist`] (force is the
/// line component), which makes `wrench · twist` invariant under the same
/// transform rule twists use.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Wrench {
    /// Moment (free component).
    pub m: Vector3<f64>,
    /// Force (line component).
    pub f: Vector3<f64>,
}

impl Wrench {
    /// Create a wrench from moment and force parts.
    #[inline]
    #[must_use]
    pub fn new(m: Vector3<f64>, f: Vector3<f64>) -> Self {
        Self { m, f }
    }

    /// The zero wrench.
    #[inline]
    #[must_use]
    pub fn zero() -> Self {
        Self {
            m: Vector3::zeros(),
            f: Vector3::zeros(),
        }
    }

    /// A pure force along `f` with no moment.
    #[inline]
    #[must_use]
    pub fn from_force(f: Vector3<f64>) -> Self {
        Self {
            m: Vector3::zeros(),
            f,
        }
    }

    /// A pure moment along `m` with no force.
    #[inline]
    #[must_use]
    pub fn from_moment(m: Vector3<f64>) -> Self {
        Self {
            m,
            f: Vector3::zeros(),
        }
    }

    /// Euclidean norm over all six components.
    #[must_use]
    pub fn norm(&self) -> f64 {
        (self.m.norm_squared() + self.f.norm_squared()).sqrt()
    }

    /// 1-norm (sum of absolute component values).
    #[must_use]
    pub fn norm1(&self) -> f64 {
        self.m.abs().sum() + self.f.abs().sum()
    }

    /// Infinity norm (largest absolute component value).
    #[must_use]
    pub fn norm_inf(&self) -> f64 {
        self.m.abs().max().max(self.f.abs().max())
    }

    /// `self + s * other`.
    #[must_use]
    pub fn scaled_add(&self, s: f64, other: &Wrench) -> Wrench {
        Wrench::new(self.m + s * other.m, self.f + s * other.f)
    }

    /// `s1 * a + s2 * b`.
    #[must_use]
    pub fn combine(s1: f64, a: &Wrench, s2: f64, b: &Wrench) -> Wrench {
        Wrench::new(s1 * a.m + s2 * b.m, s1 * a.f + s2 * b.f)
    }

    /// Linear interpolation: `(1 - t) * self + t * other`.
    #[must_use]
    pub fn interpolate(&self, other: &Wrench, t: f64) -> Wrench {
        Wrench::combine(1.0 - t, self, t, other)
    }

    /// Rotate both components by `r` (rotation-only transform).
    #[must_use]
    pub fn rotate(&self, r: &UnitQuaternion<f64>) -> Wrench {
        Wrench::new(r * self.m, r * self.f)
    }

    /// Rotate both components by the inverse of `r`.
    #[must_use]
    pub fn inverse_rotate(&self, r: &UnitQuaternion<f64>) -> Wrench {
        Wrench::new(r.inverse() * self.m, r.inverse() * self.f)
    }

    /// Re-express this wrench, given in frame B, in frame A, where `x_ab` is
    /// the pose of B in A.
    ///
    /// `f' = R f`, `m' = R m + p × f'`: the same rule as [`Twist::transform`]
    /// because the covariant components are stored swapped.
    #[must_use]
    pub fn transform(&self, x_ab: &Isometry3<f64>) -> Wrench {
        let f = x_ab.rotation * self.f;
        let m = x_ab.rotation * self.m + x_ab.translation.vector.cross(&f);
        Wrench::new(m, f)
    }

    /// Inverse of [`Wrench::transform`].
    #[must_use]
    pub fn inverse_transform(&self, x_ab: &Isometry3<f64>) -> Wrench {
        let rinv = x_ab.rotation.inverse();
        let f = rinv * self.f;
        let m = rinv * (self.m - x_ab.translation.vector.cross(&self.f));
        Wrench::new(m, f)
    }

    /// Mechanical power: `f · v + m · w`.
    #[must_use]
    pub fn dot(&self, tw: &Twist) -> f64 {
        self.f.dot(&tw.v) + self.m.dot(&tw.w)
    }
}

impl std::ops::Add for Wrench {
    type Output = Wrench;
    fn add(self, rhs: Wrench) -> Wrench {
        Wrench::new(self.m + rhs.m, self.f + rhs.f)
    }
}

impl std::ops::Sub for Wrench {
    type Output = Wrench;
    fn sub(self, rhs: Wrench) -> Wrench {
        Wrench::new(self.m - rhs.m, self.f - rhs.f)
    }
}

impl std::ops::Neg for Wrench {
    type Output = Wrench;
    fn neg(self) -> Wrench {
        Wrench::new(-self.m, -self.f)
    }
}

impl std::ops::Mul<f64> for Wrench {
    type Output = Wrench;
    fn mul(self, s: f64) -> Wrench {
        Wrench::new(self.m * s, self.f * s)
    }
}
