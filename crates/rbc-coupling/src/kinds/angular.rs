//! Multi-axis rotational kinds: the Hooke joint, the skewed roll-pitch
//! joint, the three-angle gimbal, and the fully free connection.
//!
//! These are the kinds whose limit duals move with the configuration, so the
//! constraint fill computes wrench derivatives from the extracted coordinate
//! rates rather than stamping constants.

use nalgebra::{Isometry3, Rotation3, Vector3};
use rbc_spatial::{rotation_to_rpy, rpy_to_rotation, EulerFilter, Twist, Wrench};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{iso, JointKinematics, KindLayout, UpdateCtx};
use crate::{CoordinateRange, CouplingError, MotionType, Result};

/// Below this |cos pitch| the gimbal extraction switches to the
/// degenerate-branch handling in [`EulerFilter`].
const GIMBAL_EPS: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Shared Z-Y-X angle kinematics (gimbal, free, and the spherical rpy policy)
// ---------------------------------------------------------------------------

/// Angular coordinate twists of the intrinsic Z-Y-X decomposition, in order
/// roll, pitch, yaw.
pub(super) fn rpy_twists(rpy: &[f64]) -> [Vector3<f64>; 3] {
    let (sr, cr) = rpy[0].sin_cos();
    let (sp, cp) = rpy[1].sin_cos();
    [
        Vector3::z(),
        Vector3::new(-sr, cr, 0.0),
        Vector3::new(cr * cp, sr * cp, -sp),
    ]
}

/// Clamp cos(pitch) away from zero, keeping its sign.
fn clamped_cp(cp: f64) -> f64 {
    if cp >= 0.0 {
        cp.max(GIMBAL_EPS)
    } else {
        cp.min(-GIMBAL_EPS)
    }
}

/// Dual moments of [`rpy_twists`]: `dualᵢ · twistⱼ = δᵢⱼ`. Near gimbal lock
/// cos(pitch) is clamped, degrading the duals smoothly instead of failing.
pub(super) fn rpy_duals(rpy: &[f64]) -> [Vector3<f64>; 3] {
    let (sr, cr) = rpy[0].sin_cos();
    let (sp, cp) = rpy[1].sin_cos();
    let cp = clamped_cp(cp);
    [
        Vector3::new(cr * sp / cp, sr * sp / cp, 1.0),
        Vector3::new(-sr, cr, 0.0),
        Vector3::new(cr / cp, sr / cp, 0.0),
    ]
}

/// Angle rates recovered from an angular velocity via the dual basis.
pub(super) fn rpy_rates(rpy: &[f64], w: &Vector3<f64>) -> [f64; 3] {
    let duals = rpy_duals(rpy);
    [duals[0].dot(w), duals[1].dot(w), duals[2].dot(w)]
}

/// Time derivatives of [`rpy_duals`] under the given angle rates.
pub(super) fn rpy_dual_dots(rpy: &[f64], rates: &[f64; 3]) -> [Vector3<f64>; 3] {
    let (sr, cr) = rpy[0].sin_cos();
    let (sp, cp) = rpy[1].sin_cos();
    let cp = clamped_cp(cp);
    let cp2 = cp * cp;
    let (dr, dp) = (rates[0], rates[1]);
    [
        Vector3::new(
            -sr * dr * sp / cp + cr * dp / cp2,
            cr * dr * sp / cp + sr * dp / cp2,
            0.0,
        ),
        Vector3::new(-cr * dr, -sr * dr, 0.0),
        Vector3::new(
            -sr * dr / cp + cr * sp * dp / cp2,
            cr * dr / cp + sr * sp * dp / cp2,
            0.0,
        ),
    ]
}

/// Extract Z-Y-X angles from a rotation, resolving branch and gimbal-lock
/// ambiguity toward `prev`.
pub(super) fn extract_rpy(r: &Rotation3<f64>, prev: &[f64; 3]) -> [f64; 3] {
    let raw = rotation_to_rpy(r);
    let (filtered, _) = EulerFilter::filter(prev, &raw, GIMBAL_EPS);
    filtered
}

// ---------------------------------------------------------------------------
// Universal
// ---------------------------------------------------------------------------

/// Hooke joint: rotation `alpha` about x, then `beta` about the moved y.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Universal {
    alpha_range: CoordinateRange,
    beta_range: CoordinateRange,
}

impl Universal {
    /// Universal joint with ranges for the two bending angles.
    #[must_use]
    pub fn new(alpha_range: CoordinateRange, beta_range: CoordinateRange) -> Self {
        Self {
            alpha_range,
            beta_range,
        }
    }
}

impl JointKinematics for Universal {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("alpha", self.alpha_range, MotionType::Rotary);
        l.add_coordinate("beta", self.beta_range, MotionType::Rotary);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        let r = Rotation3::from_axis_angle(&Vector3::x_axis(), coords[0])
            * Rotation3::from_axis_angle(&Vector3::y_axis(), coords[1]);
        iso(Vector3::zeros(), &r)
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, _prev: &[f64], out: &mut [f64]) {
        let r = tcd.rotation.to_rotation_matrix();
        out[0] = r[(2, 1)].atan2(r[(1, 1)]);
        out[1] = r[(0, 2)].atan2(r[(0, 0)]);
    }

    fn coordinate_twist(&self, index: usize, coords: &[f64]) -> Twist {
        let w = match index {
            0 => Vector3::x(),
            // The beta axis is the moved y axis.
            _ => {
                let (sa, ca) = coords[0].sin_cos();
                Vector3::new(0.0, ca, sa)
            }
        };
        Twist::new(Vector3::zeros(), w)
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        let (sa, ca) = ctx.coords[0].sin_cos();
        // Third axis of the cross: blocked rotation direction.
        let n = Vector3::new(0.0, -sa, ca);
        let da = ctx.vel.w.x;
        let n_dot = da * Vector3::new(0.0, -ca, -sa);

        ctx.constraints[0].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_force(Vector3::z());
        ctx.constraints[3].wrench = Wrench::from_moment(n);
        ctx.constraints[3].dot_wrench = Wrench::from_moment(n_dot);

        // Limit duals: alpha pairs with ex, beta with the moved y.
        let u = Vector3::new(0.0, ca, sa);
        let u_dot = da * Vector3::new(0.0, -sa, ca);
        ctx.constraints[4].wrench = Wrench::from_moment(Vector3::x());
        ctx.constraints[4].dot_wrench = Wrench::zero();
        ctx.constraints[5].wrench = Wrench::from_moment(u);
        ctx.constraints[5].dot_wrench = Wrench::from_moment(u_dot);
    }
}

// ---------------------------------------------------------------------------
// RollPitch
// ---------------------------------------------------------------------------

/// Roll about z followed by pitch about an axis skewed away from y by a
/// fixed angle. At zero skew this degenerates to two perpendicular hinges.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RollPitch {
    skew: f64,
    roll_range: CoordinateRange,
    pitch_range: CoordinateRange,
}

impl RollPitch {
    /// Roll-pitch joint with the given skew angle (radians) and coordinate
    /// ranges.
    #[must_use]
    pub fn new(skew: f64, roll_range: CoordinateRange, pitch_range: CoordinateRange) -> Self {
        Self {
            skew,
            roll_range,
            pitch_range,
        }
    }

    /// Pitch axis in frame D at roll angle `r`: `Rz(r) · (0, cos s, sin s)`.
    fn pitch_axis(&self, roll: f64) -> Vector3<f64> {
        let (ss, cs) = self.skew.sin_cos();
        let (srr, crr) = roll.sin_cos();
        Vector3::new(-srr * cs, crr * cs, ss)
    }
}

impl JointKinematics for RollPitch {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("roll", self.roll_range, MotionType::Rotary);
        l.add_coordinate("pitch", self.pitch_range, MotionType::Rotary);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn validate(&self) -> Result<()> {
        if self.skew.cos().abs() < 1e-6 {
            return Err(CouplingError::InvalidPolicy {
                reason: format!(
                    "roll-pitch skew {} puts the pitch axis parallel to the roll axis",
                    self.skew
                ),
            });
        }
        Ok(())
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        let u0 = self.pitch_axis(0.0);
        let r = super::rot_z(coords[0])
            * Rotation3::from_axis_angle(&nalgebra::Unit::new_normalize(u0), coords[1]);
        iso(Vector3::zeros(), &r)
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, _prev: &[f64], out: &mut [f64]) {
        // R · Rx(skew) = Rz(roll) · Rx(skew) · Ry(pitch), so the z-y factors
        // read off directly.
        let m = tcd.rotation.to_rotation_matrix()
            * Rotation3::from_axis_angle(&Vector3::x_axis(), self.skew);
        out[1] = (-m[(2, 0)]).atan2(m[(2, 2)]);
        out[0] = (-m[(0, 1)]).atan2(m[(1, 1)]);
    }

    fn coordinate_twist(&self, index: usize, coords: &[f64]) -> Twist {
        let w = match index {
            0 => Vector3::z(),
            _ => self.pitch_axis(coords[0]),
        };
        Twist::new(Vector3::zeros(), w)
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        let (ss, cs) = self.skew.sin_cos();
        let cs2 = cs * cs;
        let u = self.pitch_axis(ctx.coords[0]);
        let ez = Vector3::z();

        // Rates from the (non-orthogonal) axis pair {ez, u}.
        let wz = ctx.vel.w.z;
        let wu = ctx.vel.w.dot(&u);
        let roll_rate = (wz - ss * wu) / cs2;
        let u_dot = roll_rate * ez.cross(&u);

        // Blocked rotation: the swung x axis.
        let (srr, crr) = ctx.coords[0].sin_cos();
        let n = Vector3::new(crr, srr, 0.0);
        let n_dot = roll_rate * ez.cross(&n);

        ctx.constraints[0].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_force(Vector3::z());
        ctx.constraints[3].wrench = Wrench::from_moment(n);
        ctx.constraints[3].dot_wrench = Wrench::from_moment(n_dot);

        // Dual basis of {ez, u}: ez·u = sin(skew).
        let w_roll = (ez - ss * u) / cs2;
        let w_pitch = (u - ss * ez) / cs2;
        ctx.constraints[4].wrench = Wrench::from_moment(w_roll);
        ctx.constraints[4].dot_wrench = Wrench::from_moment(-ss * u_dot / cs2);
        ctx.constraints[5].wrench = Wrench::from_moment(w_pitch);
        ctx.constraints[5].dot_wrench = Wrench::from_moment(u_dot / cs2);
    }
}

// ---------------------------------------------------------------------------
// Gimbal
// ---------------------------------------------------------------------------

/// Three-angle intrinsic Z-Y-X rotational joint with per-angle limits.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gimbal {
    ranges: [CoordinateRange; 3],
}

impl Gimbal {
    /// Ranges in coordinate order `[roll, pitch, yaw]`.
    #[must_use]
    pub fn new(ranges: [CoordinateRange; 3]) -> Self {
        Self { ranges }
    }
}

impl JointKinematics for Gimbal {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("roll", self.ranges[0], MotionType::Rotary);
        l.add_coordinate("pitch", self.ranges[1], MotionType::Rotary);
        l.add_coordinate("yaw", self.ranges[2], MotionType::Rotary);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        iso(
            Vector3::zeros(),
            &rpy_to_rotation(coords[0], coords[1], coords[2]),
        )
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, prev: &[f64], out: &mut [f64]) {
        let reference = [prev[0], prev[1], prev[2]];
        let angles = extract_rpy(&tcd.rotation.to_rotation_matrix(), &reference);
        out.copy_from_slice(&angles);
    }

    fn coordinate_twist(&self, index: usize, coords: &[f64]) -> Twist {
        Twist::new(Vector3::zeros(), rpy_twists(coords)[index])
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_force(Vector3::z());

        let duals = rpy_duals(ctx.coords);
        let rates = rpy_rates(ctx.coords, &ctx.vel.w);
        let dots = rpy_dual_dots(ctx.coords, &rates);
        for i in 0..3 {
            ctx.constraints[3 + i].wrench = Wrench::from_moment(duals[i]);
            ctx.constraints[3 + i].dot_wrench = Wrench::from_moment(dots[i]);
        }
    }
}

// ---------------------------------------------------------------------------
// Free
// ---------------------------------------------------------------------------

/// All six degrees of freedom, each with an optional range: coordinates
/// `[x, y, z, roll, pitch, yaw]`. No bilateral directions.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Free {
    ranges: [CoordinateRange; 6],
}

impl Free {
    /// Ranges in coordinate order `[x, y, z, roll, pitch, yaw]`.
    #[must_use]
    pub fn new(ranges: [CoordinateRange; 6]) -> Self {
        Self { ranges }
    }
}

impl Default for Free {
    fn default() -> Self {
        Self::new([CoordinateRange::unlimited(); 6])
    }
}

impl JointKinematics for Free {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("x", self.ranges[0], MotionType::Linear);
        l.add_coordinate("y", self.ranges[1], MotionType::Linear);
        l.add_coordinate("z", self.ranges[2], MotionType::Linear);
        l.add_coordinate("roll", self.ranges[3], MotionType::Rotary);
        l.add_coordinate("pitch", self.ranges[4], MotionType::Rotary);
        l.add_coordinate("yaw", self.ranges[5], MotionType::Rotary);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        iso(
            Vector3::new(coords[0], coords[1], coords[2]),
            &rpy_to_rotation(coords[3], coords[4], coords[5]),
        )
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, prev: &[f64], out: &mut [f64]) {
        out[..3].copy_from_slice(tcd.translation.vector.as_slice());
        let reference = [prev[3], prev[4], prev[5]];
        let angles = extract_rpy(&tcd.rotation.to_rotation_matrix(), &reference);
        out[3..].copy_from_slice(&angles);
    }

    fn coordinate_twist(&self, index: usize, coords: &[f64]) -> Twist {
        match index {
            0 => Twist::new(Vector3::x(), Vector3::zeros()),
            1 => Twist::new(Vector3::y(), Vector3::zeros()),
            2 => Twist::new(Vector3::z(), Vector3::zeros()),
            i => Twist::new(Vector3::zeros(), rpy_twists(&coords[3..])[i - 3]),
        }
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_force(Vector3::z());

        let rpy = &ctx.coords[3..];
        let duals = rpy_duals(rpy);
        let rates = rpy_rates(rpy, &ctx.vel.w);
        let dots = rpy_dual_dots(rpy, &rates);
        for i in 0..3 {
            ctx.constraints[3 + i].wrench = Wrench::from_moment(duals[i]);
            ctx.constraints[3 + i].dot_wrench = Wrench::from_moment(dots[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_universal_round_trip() {
        let k = Universal::new(CoordinateRange::unlimited(), CoordinateRange::unlimited());
        let coords = [0.6, -1.1];
        let tcd = k.coords_to_tcd(&coords);
        let mut out = [0.0; 2];
        k.tcd_to_coords(&tcd, &[0.0; 2], &mut out);
        assert_relative_eq!(out[0], coords[0], epsilon = 1e-12);
        assert_relative_eq!(out[1], coords[1], epsilon = 1e-12);
    }

    #[test]
    fn test_roll_pitch_round_trip() {
        let k = RollPitch::new(
            0.4,
            CoordinateRange::unlimited(),
            CoordinateRange::unlimited(),
        );
        let coords = [1.3, -0.8];
        let tcd = k.coords_to_tcd(&coords);
        let mut out = [0.0; 2];
        k.tcd_to_coords(&tcd, &[0.0; 2], &mut out);
        assert_relative_eq!(out[0], coords[0], epsilon = 1e-12);
        assert_relative_eq!(out[1], coords[1], epsilon = 1e-12);
    }

    #[test]
    fn test_roll_pitch_rejects_degenerate_skew() {
        let k = RollPitch::new(
            std::f64::consts::FRAC_PI_2,
            CoordinateRange::unlimited(),
            CoordinateRange::unlimited(),
        );
        assert!(k.validate().is_err());
    }

    #[test]
    fn test_rpy_duals_invert_twists() {
        let rpy = [0.7, -0.3, 1.9];
        let twists = rpy_twists(&rpy);
        let duals = rpy_duals(&rpy);
        for i in 0..3 {
            for j in 0..3 {
                let want = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(duals[i].dot(&twists[j]), want, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_rpy_rates_recover_angle_velocities() {
        // ω assembled from known rates must give those rates back.
        let rpy = [0.2, 0.9, -1.4];
        let rates = [0.5, -0.25, 1.5];
        let twists = rpy_twists(&rpy);
        let w = rates[0] * twists[0] + rates[1] * twists[1] + rates[2] * twists[2];
        let got = rpy_rates(&rpy, &w);
        for i in 0..3 {
            assert_relative_eq!(got[i], rates[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rpy_dual_dots_match_differencing() {
        let rpy = [0.3, -0.6, 0.8];
        let rates = [0.4, 1.1, -0.7];
        let h = 1e-7;
        let advanced = [
            rpy[0] + h * rates[0],
            rpy[1] + h * rates[1],
            rpy[2] + h * rates[2],
        ];
        let d0 = rpy_duals(&rpy);
        let d1 = rpy_duals(&advanced);
        let dots = rpy_dual_dots(&rpy, &rates);
        for i in 0..3 {
            let numeric = (d1[i] - d0[i]) / h;
            assert_relative_eq!(dots[i], numeric, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_free_round_trip() {
        let k = Free::default();
        let coords = [1.0, -2.0, 0.5, 0.4, -0.9, 2.1];
        let tcd = k.coords_to_tcd(&coords);
        let mut out = [0.0; 6];
        k.tcd_to_coords(&tcd, &[0.0; 6], &mut out);
        for i in 0..6 {
            assert_relative_eq!(out[i], coords[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_gimbal_extraction_tracks_previous_branch() {
        let k = Gimbal::new([CoordinateRange::unlimited(); 3]);
        // Angles whose principal extraction lands on the other branch.
        let coords = [3.0, 1.2, -2.9];
        let tcd = k.coords_to_tcd(&coords);
        let mut out = [0.0; 3];
        k.tcd_to_coords(&tcd, &coords, &mut out);
        for i in 0..3 {
            assert_relative_eq!(out[i], coords[i], epsilon = 1e-10);
        }
    }
}
