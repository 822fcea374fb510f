//! Euler-angle branch resolution.
//!
//! Intrinsic Z-Y-X angles (roll about z, then pitch about the moved y, then
//! yaw about the moved x) generically admit two decompositions of the same
//! rotation, and none at all at gimbal lock. [`EulerFilter`] picks the branch
//! nearest a reference triple so that continuous motion extracts continuous
//! angles; [`nearest_angle`] is the underlying 2π-wraparound rule shared with
//! rotary joint coordinates.

use nalgebra::{Rotation3, Vector3};
use std::f64::consts::{PI, TAU};

/// Return the representative of `angle` (mod 2π) lying in
/// `(reference − π, reference + π]`.
///
/// Continuous rotation re-extracted through this rule never produces a
/// spurious 2π jump.
#[must_use]
pub fn nearest_angle(reference: f64, angle: f64) -> f64 {
    let mut d = (angle - reference) % TAU;
    if d > PI {
        d -= TAU;
    } else if d <= -PI {
        d += TAU;
    }
    reference + d
}

/// Build the rotation `Rz(roll) · Ry(pitch) · Rx(yaw)`.
#[must_use]
pub fn rpy_to_rotation(roll: f64, pitch: f64, yaw: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), roll)
        * Rotation3::from_axis_angle(&Vector3::y_axis(), pitch)
        * Rotation3::from_axis_angle(&Vector3::x_axis(), yaw)
}

/// Extract `(roll, pitch, yaw)` with `R = Rz(roll) · Ry(pitch) · Rx(yaw)`.
///
/// Returns the principal branch with `pitch ∈ [−π/2, π/2]`. At gimbal lock
/// (`cos pitch == 0`) roll and yaw are not individually determined; this
/// function reports `roll = 0` and folds the resolvable combination into yaw.
/// Use [`EulerFilter::filter`] when a reference triple is available.
#[must_use]
pub fn rotation_to_rpy(r: &Rotation3<f64>) -> [f64; 3] {
    let cp = (r[(0, 0)] * r[(0, 0)] + r[(1, 0)] * r[(1, 0)]).sqrt();
    let pitch = (-r[(2, 0)]).atan2(cp);
    if cp < 1e-15 {
        // Gimbal lock. At pitch = +π/2 only yaw − roll is observable,
        // at pitch = −π/2 only yaw + roll.
        if r[(2, 0)] < 0.0 {
            [0.0, pitch, r[(0, 1)].atan2(r[(0, 2)])]
        } else {
            [0.0, pitch, (-r[(0, 1)]).atan2(-r[(0, 2)])]
        }
    } else {
        [
            r[(1, 0)].atan2(r[(0, 0)]),
            pitch,
            r[(2, 1)].atan2(r[(2, 2)]),
        ]
    }
}

/// Resolves Euler-angle branch ambiguity and gimbal-lock degeneracy against a
/// reference triple.
#[derive(Debug, Clone, Copy, Default)]
pub struct EulerFilter;

impl EulerFilter {
    /// Adjust a candidate `(roll, pitch, yaw)` triple to the decomposition
    /// branch nearest `reference`.
    ///
    /// Away from gimbal lock the two available branches,
    /// `(r, p, y)` and `(r + π, π − p, y + π)`, are both wrapped to the
    /// reference and the closer one (least squared distance) is returned with
    /// a `false` flag.
    ///
    /// Within `eps` of gimbal lock (`|cos pitch| < eps`) roll and yaw are not
    /// individually resolvable: the reference roll is kept, the
    /// reference-consistent combination of roll ± yaw is preserved in yaw,
    /// and the flag is `true` (result shifted).
    #[must_use]
    pub fn filter(reference: &[f64; 3], candidate: &[f64; 3], eps: f64) -> ([f64; 3], bool) {
        let [r, p, y] = *candidate;
        if p.cos().abs() < eps {
            // Gimbal lock: at pitch near +π/2 the rotation fixes y − r, near
            // −π/2 it fixes y + r. Keep the reference roll and solve for yaw.
            let pitch = nearest_angle(reference[1], p);
            let roll = reference[0];
            let yaw = if p.sin() > 0.0 {
                nearest_angle(reference[2], roll + (y - r))
            } else {
                nearest_angle(reference[2], (y + r) - roll)
            };
            ([roll, pitch, yaw], true)
        } else {
            let a = [
                nearest_angle(reference[0], r),
                nearest_angle(reference[1], p),
                nearest_angle(reference[2], y),
            ];
            let b = [
                nearest_angle(reference[0], r + PI),
                nearest_angle(reference[1], PI - p),
                nearest_angle(reference[2], y + PI),
            ];
            let dist = |s: &[f64; 3]| {
                (s[0] - reference[0]).powi(2)
                    + (s[1] - reference[1]).powi(2)
                    + (s[2] - reference[2]).powi(2)
            };
            if dist(&a) <= dist(&b) {
                (a, false)
            } else {
                (b, false)
            }
        }
    }
}
