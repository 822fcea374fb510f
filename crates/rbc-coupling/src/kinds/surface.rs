//! Kinds whose translation rides on a surface: the ellipsoid joint and the
//! piecewise-planar slide.

use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, Vector3, Vector6};
use rbc_spatial::{nearest_angle, Twist, Wrench};
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{
    iso, nearest_z_angle, rot_z, vec6_of_twist, wrench_of_vec6, JointKinematics, KindLayout,
    UpdateCtx, VelocityCoupling,
};
use crate::{CoordinateRange, CouplingError, MotionType, Result};

/// Differencing step for wrench-derivative estimates.
const DIFF_STEP: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Ellipsoid
// ---------------------------------------------------------------------------

/// Frame origin constrained to an ellipsoid surface, frame z along the
/// outward normal, with a free spin about it: coordinates
/// `[phi (longitude), lambda (latitude), theta (spin)]`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ellipsoid {
    semi_axes: [f64; 3],
    ranges: [CoordinateRange; 3],
    coupling: VelocityCoupling,
}

impl Ellipsoid {
    /// Ellipsoid joint with semi-axes `[a, b, c]`, coordinate ranges in order
    /// `[phi, lambda, theta]`, and the chosen velocity-coupling strategy.
    #[must_use]
    pub fn new(
        semi_axes: [f64; 3],
        ranges: [CoordinateRange; 3],
        coupling: VelocityCoupling,
    ) -> Self {
        Self {
            semi_axes,
            ranges,
            coupling,
        }
    }

    fn surface_point(&self, phi: f64, lambda: f64) -> Vector3<f64> {
        let [a, b, c] = self.semi_axes;
        let (sp, cp) = phi.sin_cos();
        let (sl, cl) = lambda.sin_cos();
        Vector3::new(a * cl * cp, b * cl * sp, c * sl)
    }

    /// Surface frame at `(phi, lambda)`: z along the outward normal, x along
    /// the longitude tangent (latitude tangent at the poles), y completing.
    fn surface_frame(&self, phi: f64, lambda: f64) -> Rotation3<f64> {
        let [a, b, c] = self.semi_axes;
        let (sp, cp) = phi.sin_cos();
        let (sl, cl) = lambda.sin_cos();
        let normal = Vector3::new(cl * cp / a, cl * sp / b, sl / c).normalize();
        let d_phi = Vector3::new(-a * cl * sp, b * cl * cp, 0.0);
        let tangent = if d_phi.norm() > 1e-9 {
            d_phi.normalize()
        } else {
            Vector3::new(-a * sl * cp, -b * sl * sp, c * cl).normalize()
        };
        let y = normal.cross(&tangent);
        Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[tangent, y, normal]))
    }

    /// Nearest `(phi, lambda)` on the surface to an arbitrary point,
    /// resolving the longitude branch toward `prev_phi`.
    fn closest_params(&self, p: &Vector3<f64>, prev_phi: f64, prev_lambda: f64) -> (f64, f64) {
        let [a, b, c] = self.semi_axes;
        let q = self.closest_point(p, prev_phi, prev_lambda);
        let h = (q.x / a).hypot(q.y / b);
        let lambda = (q.z / c).atan2(h);
        let phi = if h < 1e-8 {
            // At a pole the longitude is unobservable.
            prev_phi
        } else {
            nearest_angle(prev_phi, (q.y / b).atan2(q.x / a))
        };
        (phi, lambda)
    }

    /// Closest point on the ellipsoid to `p`, by solving
    /// `f(t) = Σ (aᵢ pᵢ / (t + aᵢ²))² − 1 = 0` for the Lagrange multiplier
    /// `t` (Newton with a bisection safeguard). Falls back to radial scaling
    /// when the iteration fails to bracket.
    fn closest_point(&self, p: &Vector3<f64>, prev_phi: f64, prev_lambda: f64) -> Vector3<f64> {
        let [a, b, c] = self.semi_axes;
        let axes2 = [a * a, b * b, c * c];
        let f = |t: f64| -> (f64, f64) {
            let mut val = -1.0;
            let mut deriv = 0.0;
            for (axis2, pc) in axes2.iter().zip([p.x, p.y, p.z]) {
                let s = axis2.sqrt() * pc / (t + axis2);
                val += s * s;
                deriv += -2.0 * s * s / (t + axis2);
            }
            (val, deriv)
        };

        let min_axis2 = axes2[0].min(axes2[1]).min(axes2[2]);
        let mut lo = -min_axis2 + 1e-12 * min_axis2.max(1.0);
        let mut hi = lo.max(0.0) + min_axis2;
        let mut expand = 0;
        while f(hi).0 > 0.0 && expand < 64 {
            hi = hi * 2.0 + min_axis2;
            expand += 1;
        }
        if f(lo).0 < 0.0 || f(hi).0 > 0.0 {
            warn!("ellipsoid projection failed to bracket; using radial scaling");
            let s = ((p.x / a).powi(2) + (p.y / b).powi(2) + (p.z / c).powi(2)).sqrt();
            if s < 1e-12 {
                return self.surface_point(prev_phi, prev_lambda);
            }
            return p / s;
        }

        let mut t = 0.5 * (lo + hi);
        for _ in 0..64 {
            let (val, deriv) = f(t);
            if val.abs() < 1e-14 {
                break;
            }
            if val > 0.0 {
                lo = t;
            } else {
                hi = t;
            }
            let newton = if deriv.abs() > 1e-300 {
                t - val / deriv
            } else {
                f64::NAN
            };
            t = if newton.is_finite() && newton > lo && newton < hi {
                newton
            } else {
                0.5 * (lo + hi)
            };
        }
        Vector3::new(
            axes2[0] * p.x / (t + axes2[0]),
            axes2[1] * p.y / (t + axes2[1]),
            axes2[2] * p.z / (t + axes2[2]),
        )
    }

    /// Angular velocity of the surface frame per unit rate of coordinate
    /// `index` (0 = phi, 1 = lambda), by central differencing of the frame.
    fn frame_omega(&self, phi: f64, lambda: f64, index: usize) -> Vector3<f64> {
        let d = DIFF_STEP;
        let (args0, args1) = match index {
            0 => ((phi - d, lambda), (phi + d, lambda)),
            _ => ((phi, lambda - d), (phi, lambda + d)),
        };
        let r = self.surface_frame(phi, lambda);
        let r0 = self.surface_frame(args0.0, args0.1);
        let r1 = self.surface_frame(args1.0, args1.1);
        let mut omega = Vector3::zeros();
        for k in 0..3 {
            let ck: Vector3<f64> = r.matrix().column(k).into_owned();
            let dck: Vector3<f64> =
                (r1.matrix().column(k) - r0.matrix().column(k)) / (2.0 * d);
            omega += 0.5 * ck.cross(&dck);
        }
        omega
    }

    fn twist(&self, index: usize, coords: &[f64]) -> Twist {
        let (phi, lambda) = (coords[0], coords[1]);
        let [a, b, c] = self.semi_axes;
        let (sp, cp) = phi.sin_cos();
        let (sl, cl) = lambda.sin_cos();
        match index {
            0 => Twist::new(
                Vector3::new(-a * cl * sp, b * cl * cp, 0.0),
                self.frame_omega(phi, lambda, 0),
            ),
            1 => Twist::new(
                Vector3::new(-a * sl * cp, -b * sl * sp, c * cl),
                self.frame_omega(phi, lambda, 1),
            ),
            _ => {
                // Spin about the normal; the origin does not move.
                let n = self.surface_frame(phi, lambda) * Vector3::z();
                Twist::new(Vector3::zeros(), n)
            }
        }
    }

    fn jacobian(&self, coords: &[f64]) -> [Vector6<f64>; 3] {
        let mut cols = [Vector6::zeros(); 3];
        for (i, col) in cols.iter_mut().enumerate() {
            *col = vec6_of_twist(&self.twist(i, coords));
        }
        cols
    }

    /// Orthonormal complement of the coordinate-twist span, paired so that a
    /// 6-vector `(v, w)` acts as the wrench `(m = w, f = v)`.
    fn complement_basis(&self, coords: &[f64]) -> [Vector6<f64>; 3] {
        let j = self.jacobian(coords);
        let mut span: Vec<Vector6<f64>> = Vec::with_capacity(6);
        for col in &j {
            let mut r = *col;
            for u in &span {
                r -= *u * u.dot(&r);
            }
            if r.norm() > 1e-9 {
                span.push(r.normalize());
            }
        }
        let mut basis = [Vector6::zeros(); 3];
        let mut found = 0;
        for k in 0..6 {
            if found == 3 {
                break;
            }
            let mut r: Vector6<f64> = Vector6::zeros();
            r[k] = 1.0;
            for u in &span {
                r -= *u * u.dot(&r);
            }
            for u in basis.iter().take(found) {
                r -= *u * u.dot(&r);
            }
            if r.norm() > 1e-6 {
                basis[found] = r.normalize();
                found += 1;
            }
        }
        basis
    }

    /// Dual wrenches of the coordinate twists: columns of `J (JᵀJ)⁻¹`.
    fn dual_wrenches(&self, coords: &[f64]) -> [Vector6<f64>; 3] {
        let j = self.jacobian(coords);
        let mut gram = Matrix3::zeros();
        for (i, a) in j.iter().enumerate() {
            for (k, b) in j.iter().enumerate() {
                gram[(i, k)] = a.dot(b);
            }
        }
        let Some(inv) = gram.try_inverse() else {
            warn!("ellipsoid coordinate twists degenerate; duals unavailable");
            return [Vector6::zeros(); 3];
        };
        let mut out = [Vector6::zeros(); 3];
        for (i, col) in out.iter_mut().enumerate() {
            for (k, jc) in j.iter().enumerate() {
                *col += *jc * inv[(k, i)];
            }
        }
        out
    }

    /// Coordinate rates that best reproduce `vel` through the Jacobian
    /// (normal-equations least squares).
    fn coordinate_rates(&self, coords: &[f64], vel: &Twist) -> [f64; 3] {
        let duals = self.dual_wrenches(coords);
        let v6 = vec6_of_twist(vel);
        [duals[0].dot(&v6), duals[1].dot(&v6), duals[2].dot(&v6)]
    }
}

impl JointKinematics for Ellipsoid {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("phi", self.ranges[0], MotionType::Rotary);
        l.add_coordinate("lambda", self.ranges[1], MotionType::Rotary);
        l.add_coordinate("theta", self.ranges[2], MotionType::Rotary);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn validate(&self) -> Result<()> {
        if self.semi_axes.iter().any(|a| !(*a > 0.0)) {
            return Err(CouplingError::InvalidPolicy {
                reason: format!("ellipsoid semi-axes {:?} must be positive", self.semi_axes),
            });
        }
        Ok(())
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        let r = self.surface_frame(coords[0], coords[1]) * rot_z(coords[2]);
        iso(self.surface_point(coords[0], coords[1]), &r)
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, prev: &[f64], out: &mut [f64]) {
        let (phi, lambda) = self.closest_params(&tcd.translation.vector, prev[0], prev[1]);
        out[0] = phi;
        out[1] = lambda;
        // Spin is whatever rotation remains after the surface frame.
        let m = self.surface_frame(phi, lambda).inverse()
            * tcd.rotation.to_rotation_matrix();
        out[2] = nearest_angle(prev[2], nearest_z_angle(&m));
    }

    fn coordinate_twist(&self, index: usize, coords: &[f64]) -> Twist {
        self.twist(index, coords)
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        let coords = ctx.coords;
        match self.coupling {
            VelocityCoupling::Ignore => {
                // Frame-aligned directions, held momentarily fixed. The
                // angular directions do not exactly annihilate the surface
                // twists; that cross term is the ignored coupling.
                let frame = self.surface_frame(coords[0], coords[1]);
                ctx.constraints[0].wrench =
                    Wrench::from_force(frame * Vector3::z());
                ctx.constraints[1].wrench =
                    Wrench::from_moment(frame * Vector3::x());
                ctx.constraints[2].wrench =
                    Wrench::from_moment(frame * Vector3::y());
                for c in ctx.constraints[..3].iter_mut() {
                    c.dot_wrench = Wrench::zero();
                }
                let duals = self.dual_wrenches(coords);
                for i in 0..3 {
                    ctx.constraints[3 + i].wrench = wrench_of_vec6(&duals[i]);
                    ctx.constraints[3 + i].dot_wrench = Wrench::zero();
                }
            }
            VelocityCoupling::Exact => {
                let rates = self.coordinate_rates(coords, ctx.vel);
                let shift = |s: f64| -> [f64; 3] {
                    [
                        coords[0] + s * rates[0],
                        coords[1] + s * rates[1],
                        coords[2] + s * rates[2],
                    ]
                };
                let (minus, plus) = (shift(-DIFF_STEP), shift(DIFF_STEP));

                let basis = self.complement_basis(coords);
                let (b0, b1) = (self.complement_basis(&minus), self.complement_basis(&plus));
                for i in 0..3 {
                    ctx.constraints[i].wrench = wrench_of_vec6(&basis[i]);
                    ctx.constraints[i].dot_wrench =
                        wrench_of_vec6(&((b1[i] - b0[i]) / (2.0 * DIFF_STEP)));
                }

                let duals = self.dual_wrenches(coords);
                let (d0, d1) = (self.dual_wrenches(&minus), self.dual_wrenches(&plus));
                for i in 0..3 {
                    ctx.constraints[3 + i].wrench = wrench_of_vec6(&duals[i]);
                    ctx.constraints[3 + i].dot_wrench =
                        wrench_of_vec6(&((d1[i] - d0[i]) / (2.0 * DIFF_STEP)));
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SegmentedPlanar
// ---------------------------------------------------------------------------

/// Frame origin constrained to a surface swept from an x-z polyline along y.
///
/// Segment normals are `(−dz, 0, dx)` normalized, so the polyline's winding
/// chooses which side is the allowed one. With `unilateral` set the surface
/// only pushes; otherwise it binds both ways.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentedPlanar {
    points: Vec<(f64, f64)>,
    unilateral: bool,
}

impl SegmentedPlanar {
    /// Surface from `(x, z)` polyline vertices.
    #[must_use]
    pub fn new(points: Vec<(f64, f64)>, unilateral: bool) -> Self {
        Self { points, unilateral }
    }

    /// Nearest polyline point to `(x, z)` and the normal of the segment it
    /// lies on.
    fn nearest(&self, x: f64, z: f64) -> ((f64, f64), Vector3<f64>) {
        let mut best_d2 = f64::INFINITY;
        let mut best = (self.points[0].0, self.points[0].1);
        let mut best_n = Vector3::x();
        for pair in self.points.windows(2) {
            let (x0, z0) = pair[0];
            let (x1, z1) = pair[1];
            let (dx, dz) = (x1 - x0, z1 - z0);
            let len2 = dx * dx + dz * dz;
            if len2 < 1e-24 {
                continue;
            }
            let t = (((x - x0) * dx + (z - z0) * dz) / len2).clamp(0.0, 1.0);
            let (cx, cz) = (x0 + t * dx, z0 + t * dz);
            let d2 = (x - cx).powi(2) + (z - cz).powi(2);
            if d2 < best_d2 {
                best_d2 = d2;
                best = (cx, cz);
                let inv_len = 1.0 / len2.sqrt();
                best_n = Vector3::new(-dz * inv_len, 0.0, dx * inv_len);
            }
        }
        (best, best_n)
    }
}

impl JointKinematics for SegmentedPlanar {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        if self.unilateral {
            l.add_policy_unilateral(MotionType::Linear);
        } else {
            l.add_bilateral(MotionType::Linear);
        }
        l
    }

    fn validate(&self) -> Result<()> {
        if self.points.len() < 2 {
            return Err(CouplingError::InvalidPolicy {
                reason: "segmented surface needs at least two polyline points".to_owned(),
            });
        }
        Ok(())
    }

    fn coords_to_tcd(&self, _coords: &[f64]) -> Isometry3<f64> {
        // No coordinate parameterization: position on the surface is free.
        Isometry3::identity()
    }

    fn tcd_to_coords(&self, _tcd: &Isometry3<f64>, _prev: &[f64], _out: &mut [f64]) {}

    fn project(&self, tfd: &Isometry3<f64>, _prev: &[f64], _out: &mut [f64]) -> Isometry3<f64> {
        let p = tfd.translation.vector;
        let ((cx, cz), _) = self.nearest(p.x, p.z);
        Isometry3::from_parts(Translation3::new(cx, p.y, cz), tfd.rotation)
    }

    fn coordinate_twist(&self, _index: usize, _coords: &[f64]) -> Twist {
        Twist::zero()
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        let p = ctx.tgd.translation.vector;
        let (_, n) = self.nearest(p.x, p.z);
        let c = &mut ctx.constraints[0];
        c.wrench = Wrench::from_force(n);
        c.dot_wrench = Wrench::zero();
        if self.unilateral {
            c.distance = n.dot(&ctx.err.v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn unit_ranges() -> [CoordinateRange; 3] {
        [CoordinateRange::unlimited(); 3]
    }

    #[test]
    fn test_ellipsoid_point_and_frame() {
        let e = Ellipsoid::new([2.0, 1.0, 0.5], unit_ranges(), VelocityCoupling::Exact);
        // Equator at phi = 0: the point sits on +x, the normal points out.
        let p = e.surface_point(0.0, 0.0);
        assert_relative_eq!(p, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
        let n = e.surface_frame(0.0, 0.0) * Vector3::z();
        assert_relative_eq!(n, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn test_ellipsoid_round_trip() {
        let e = Ellipsoid::new([2.0, 1.0, 0.5], unit_ranges(), VelocityCoupling::Exact);
        let coords = [0.8, -0.4, 1.7];
        let tcd = e.coords_to_tcd(&coords);
        let mut out = [0.0; 3];
        e.tcd_to_coords(&tcd, &[0.0; 3], &mut out);
        for i in 0..3 {
            assert_relative_eq!(out[i], coords[i], epsilon = 1e-7);
        }
    }

    #[test]
    fn test_ellipsoid_projection_pulls_to_surface() {
        let e = Ellipsoid::new([2.0, 1.0, 0.5], unit_ranges(), VelocityCoupling::Exact);
        let q = e.closest_point(&Vector3::new(5.0, 1.0, 0.2), 0.0, 0.0);
        let residual =
            (q.x / 2.0).powi(2) + (q.y / 1.0).powi(2) + (q.z / 0.5).powi(2) - 1.0;
        assert_relative_eq!(residual, 0.0, epsilon = 1e-9);
        // The projection of an outside point must be closer than the point.
        assert!((q - Vector3::new(5.0, 1.0, 0.2)).norm() < 5.0);
    }

    #[test]
    fn test_ellipsoid_projection_inside_point() {
        let e = Ellipsoid::new([2.0, 1.0, 0.5], unit_ranges(), VelocityCoupling::Exact);
        let q = e.closest_point(&Vector3::new(0.3, 0.1, 0.05), 0.0, 0.0);
        let residual =
            (q.x / 2.0).powi(2) + (q.y / 1.0).powi(2) + (q.z / 0.5).powi(2) - 1.0;
        assert_relative_eq!(residual, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ellipsoid_duals_invert_jacobian() {
        let e = Ellipsoid::new([2.0, 1.0, 0.5], unit_ranges(), VelocityCoupling::Exact);
        let coords = [0.6, 0.3, -0.9];
        let j = e.jacobian(&coords);
        let duals = e.dual_wrenches(&coords);
        for i in 0..3 {
            for k in 0..3 {
                let want = if i == k { 1.0 } else { 0.0 };
                assert_relative_eq!(duals[i].dot(&j[k]), want, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_ellipsoid_complement_annihilates_twists() {
        let e = Ellipsoid::new([2.0, 1.0, 0.5], unit_ranges(), VelocityCoupling::Exact);
        let coords = [0.6, 0.3, -0.9];
        let j = e.jacobian(&coords);
        let basis = e.complement_basis(&coords);
        for b in &basis {
            assert_relative_eq!(b.norm(), 1.0, epsilon = 1e-9);
            for t in &j {
                assert_relative_eq!(b.dot(t), 0.0, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_segmented_nearest_and_normal() {
        // A flat floor at z = 0 from x = −1 to x = 1: normal is +z when the
        // polyline runs in +x.
        let s = SegmentedPlanar::new(vec![(-1.0, 0.0), (1.0, 0.0)], true);
        let ((cx, cz), n) = s.nearest(0.25, 0.5);
        assert_relative_eq!(cx, 0.25, epsilon = 1e-12);
        assert_relative_eq!(cz, 0.0, epsilon = 1e-12);
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
        // Beyond the end the projection clamps to the vertex.
        let ((cx, _), _) = s.nearest(3.0, 0.5);
        assert_relative_eq!(cx, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_segmented_projection_keeps_y_and_rotation() {
        let s = SegmentedPlanar::new(vec![(-1.0, 0.0), (1.0, 0.0)], false);
        let tfd = Isometry3::new(
            Vector3::new(0.5, 7.0, 0.3),
            Vector3::new(0.0, FRAC_PI_2, 0.0),
        );
        let tgd = s.project(&tfd, &[], &mut []);
        assert_relative_eq!(
            tgd.translation.vector,
            Vector3::new(0.5, 7.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(tgd.rotation.angle_to(&tfd.rotation), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_segmented_requires_two_points() {
        let s = SegmentedPlanar::new(vec![(0.0, 0.0)], false);
        assert!(s.validate().is_err());
    }
}
