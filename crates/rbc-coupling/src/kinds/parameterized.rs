//! One-parameter pose curves supplied by the caller.

use nalgebra::{Isometry3, Vector6};
use rbc_spatial::{Twist, Wrench};
use tracing::warn;

use super::{
    vec6_of_twist, wrench_of_vec6, JointKinematics, KindLayout, UpdateCtx, VelocityCoupling,
};
use crate::{CoordinateRange, CouplingError, MotionType, Result};

/// Differencing step for curve tangents and wrench derivatives.
const DIFF_STEP: f64 = 1e-6;

/// Number of coarse samples taken over the scan window before refinement.
const SCAN_SAMPLES: usize = 64;

/// A smooth pose as a function of one scalar parameter.
///
/// Implementors supply [`PoseCurve::pose`]; the default [`PoseCurve::tangent`]
/// differentiates it numerically, and may be overridden where an analytic
/// derivative is available.
pub trait PoseCurve: std::fmt::Debug + Send + Sync {
    /// Pose at parameter `s`, in the coupling's home frame.
    fn pose(&self, s: f64) -> Isometry3<f64>;

    /// Derivative of the pose with respect to `s`, as a twist in the home
    /// frame (origin velocity plus angular rate).
    fn tangent(&self, s: f64) -> Twist {
        let x0 = self.pose(s - DIFF_STEP);
        let x1 = self.pose(s + DIFF_STEP);
        let v = (x1.translation.vector - x0.translation.vector) / (2.0 * DIFF_STEP);
        let w = (x1.rotation * x0.rotation.inverse()).scaled_axis() / (2.0 * DIFF_STEP);
        Twist::new(v, w)
    }
}

/// Frame constrained to a caller-supplied pose curve: one coordinate `s`.
#[derive(Debug)]
pub struct Parameterized {
    curve: Box<dyn PoseCurve>,
    range: CoordinateRange,
    scan_radius: f64,
    coupling: VelocityCoupling,
}

impl Parameterized {
    /// Curve joint over `curve`, with the coordinate limited to `range`.
    ///
    /// `scan_radius` bounds the projection search around the previous
    /// parameter value when the range is unbounded.
    #[must_use]
    pub fn new(
        curve: Box<dyn PoseCurve>,
        range: CoordinateRange,
        scan_radius: f64,
        coupling: VelocityCoupling,
    ) -> Self {
        Self {
            curve,
            range,
            scan_radius,
            coupling,
        }
    }

    /// Pose distance from the curve at `s` to `tfd`.
    fn cost(&self, s: f64, tfd: &Isometry3<f64>) -> f64 {
        Twist::from_isometry(&(tfd * self.curve.pose(s).inverse())).norm()
    }

    /// Nearest curve parameter to `tfd`: coarse scan plus bounded ternary
    /// refinement. The scan covers the coordinate range when it is finite
    /// and a window around `prev` otherwise.
    fn project_parameter(&self, tfd: &Isometry3<f64>, prev: f64) -> f64 {
        let (lo, hi) = if self.range.min().is_finite() && self.range.max().is_finite() {
            (self.range.min(), self.range.max())
        } else {
            (prev - self.scan_radius, prev + self.scan_radius)
        };
        if hi - lo < 1e-15 {
            return self.range.clamp(lo);
        }

        let step = (hi - lo) / (SCAN_SAMPLES as f64);
        let mut best_s = lo;
        let mut best_cost = f64::INFINITY;
        for i in 0..=SCAN_SAMPLES {
            let s = lo + step * (i as f64);
            let c = self.cost(s, tfd);
            if c < best_cost {
                best_cost = c;
                best_s = s;
            }
        }
        if !self.range.contains(best_s) {
            // Window scans can wander past a one-sided bound.
            warn!(parameter = best_s, "curve projection clamped to range");
            return self.range.clamp(best_s);
        }

        let mut a = (best_s - step).max(lo);
        let mut b = (best_s + step).min(hi);
        for _ in 0..48 {
            let m1 = a + (b - a) / 3.0;
            let m2 = b - (b - a) / 3.0;
            if self.cost(m1, tfd) < self.cost(m2, tfd) {
                b = m2;
            } else {
                a = m1;
            }
        }
        self.range.clamp(0.5 * (a + b))
    }

    /// Complement of the tangent in the 6D twist space, together with the
    /// canonical seed of each direction (seeds 0-2 are translational).
    fn complement_basis(&self, s: f64) -> [(Vector6<f64>, usize); 5] {
        let t6 = vec6_of_twist(&self.curve.tangent(s));
        let n = t6.norm();
        let unit = if n > 1e-12 { t6 / n } else { Vector6::zeros() };
        let mut basis = [(Vector6::zeros(), 0usize); 5];
        let mut found = 0;
        for k in 0..6 {
            if found == 5 {
                break;
            }
            let mut r: Vector6<f64> = Vector6::zeros();
            r[k] = 1.0;
            r -= unit * unit.dot(&r);
            for (u, _) in basis.iter().take(found) {
                r -= *u * u.dot(&r);
            }
            if r.norm() > 1e-6 {
                basis[found] = (r.normalize(), k);
                found += 1;
            }
        }
        basis
    }

    /// Dual of the tangent: `t / |t|²`, so that `dual · tangent = 1`.
    fn dual(&self, s: f64) -> Vector6<f64> {
        let t6 = vec6_of_twist(&self.curve.tangent(s));
        let n2 = t6.norm_squared();
        if n2 < 1e-24 {
            warn!(parameter = s, "curve tangent vanished; dual unavailable");
            return Vector6::zeros();
        }
        t6 / n2
    }
}

impl JointKinematics for Parameterized {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("s", self.range, MotionType::Linear);
        // Sample the basis once to classify each blocked direction.
        let probe = if self.range.min().is_finite() {
            self.range.min()
        } else {
            0.0
        };
        for (_, seed) in self.complement_basis(probe) {
            l.add_bilateral(if seed < 3 {
                MotionType::Linear
            } else {
                MotionType::Rotary
            });
        }
        l
    }

    fn validate(&self) -> Result<()> {
        if !(self.scan_radius > 0.0) {
            return Err(CouplingError::InvalidPolicy {
                reason: format!("curve scan radius {} must be positive", self.scan_radius),
            });
        }
        Ok(())
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        self.curve.pose(coords[0])
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, prev: &[f64], out: &mut [f64]) {
        out[0] = self.project_parameter(tcd, prev[0]);
    }

    fn coordinate_twist(&self, _index: usize, coords: &[f64]) -> Twist {
        self.curve.tangent(coords[0])
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        let s = ctx.coords[0];
        let basis = self.complement_basis(s);
        let dual = self.dual(s);
        for (i, (b, _)) in basis.iter().enumerate() {
            ctx.constraints[i].wrench = wrench_of_vec6(b);
            ctx.constraints[i].dot_wrench = Wrench::zero();
        }
        ctx.constraints[5].wrench = wrench_of_vec6(&dual);
        ctx.constraints[5].dot_wrench = Wrench::zero();

        if self.coupling == VelocityCoupling::Exact {
            let rate = dual.dot(&vec6_of_twist(ctx.vel));
            let (s0, s1) = (s - DIFF_STEP * rate, s + DIFF_STEP * rate);
            let (b0, b1) = (self.complement_basis(s0), self.complement_basis(s1));
            for i in 0..5 {
                ctx.constraints[i].dot_wrench =
                    wrench_of_vec6(&((b1[i].0 - b0[i].0) / (2.0 * DIFF_STEP)));
            }
            let (d0, d1) = (self.dual(s0), self.dual(s1));
            ctx.constraints[5].dot_wrench = wrench_of_vec6(&((d1 - d0) / (2.0 * DIFF_STEP)));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    /// A helix: advance along z while turning about it.
    #[derive(Debug)]
    struct Helix {
        pitch: f64,
    }

    impl PoseCurve for Helix {
        fn pose(&self, s: f64) -> Isometry3<f64> {
            Isometry3::new(
                Vector3::new(s.cos(), s.sin(), self.pitch * s),
                Vector3::new(0.0, 0.0, s),
            )
        }
    }

    fn helix_joint(coupling: VelocityCoupling) -> Parameterized {
        Parameterized::new(
            Box::new(Helix { pitch: 0.5 }),
            CoordinateRange::unlimited(),
            2.0,
            coupling,
        )
    }

    #[test]
    fn test_numeric_tangent_matches_helix() {
        let h = Helix { pitch: 0.5 };
        let s = 1.2;
        let t = h.tangent(s);
        assert_relative_eq!(
            t.v,
            Vector3::new(-s.sin(), s.cos(), 0.5),
            epsilon = 1e-8
        );
        assert_relative_eq!(t.w, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-8);
    }

    #[test]
    fn test_projection_recovers_parameter() {
        let k = helix_joint(VelocityCoupling::Exact);
        let tcd = k.coords_to_tcd(&[0.9]);
        let mut out = [0.0];
        k.tcd_to_coords(&tcd, &[0.7], &mut out);
        assert_relative_eq!(out[0], 0.9, epsilon = 1e-5);
    }

    #[test]
    fn test_projection_respects_finite_range() {
        let k = Parameterized::new(
            Box::new(Helix { pitch: 0.5 }),
            CoordinateRange::new(-1.0, 1.0).unwrap(),
            2.0,
            VelocityCoupling::Exact,
        );
        // Target beyond the range end projects to the end.
        let tcd = Helix { pitch: 0.5 }.pose(1.8);
        let mut out = [0.0];
        k.tcd_to_coords(&tcd, &[0.9], &mut out);
        assert_relative_eq!(out[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_complement_annihilates_tangent() {
        let k = helix_joint(VelocityCoupling::Exact);
        let s = 0.4;
        let t6 = vec6_of_twist(&k.curve.tangent(s));
        for (b, _) in k.complement_basis(s) {
            assert_relative_eq!(b.dot(&t6), 0.0, epsilon = 1e-7);
            assert_relative_eq!(b.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_dual_normalization() {
        let k = helix_joint(VelocityCoupling::Exact);
        let s = -0.3;
        let t6 = vec6_of_twist(&k.curve.tangent(s));
        assert_relative_eq!(k.dual(s).dot(&t6), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_nonpositive_scan_radius() {
        let k = Parameterized::new(
            Box::new(Helix { pitch: 0.5 }),
            CoordinateRange::unlimited(),
            0.0,
            VelocityCoupling::Exact,
        );
        assert!(k.validate().is_err());
    }
}
