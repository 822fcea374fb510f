//! Ball joint with pluggable rotation limits.

use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use rbc_spatial::{Twist, Wrench};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::angular::{extract_rpy, rpy_dual_dots, rpy_duals, rpy_rates, rpy_twists};
use super::{iso, normalized_derivative, JointKinematics, KindLayout, UpdateCtx};
use crate::{CoordinateRange, CouplingError, MotionType, Result};

/// Rotation-limit policy for a [`Spherical`] joint, fixed at construction.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SphericalLimit {
    /// Unlimited rotation.
    None,
    /// The joint's z axis may tilt away from the home z axis by at most
    /// `max_tilt` radians; spin about the tilted axis is free.
    TiltCone {
        /// Maximum tilt angle (radians).
        max_tilt: f64,
    },
    /// The total rotation angle is limited, with the limit modulated per
    /// rotation-axis component by positive weights.
    RotationAngle {
        /// Per-axis angle weights; larger weight allows more rotation about
        /// that axis.
        weights: [f64; 3],
    },
    /// Independent ranges on the intrinsic Z-Y-X roll, pitch and yaw angles.
    /// The only policy that parameterizes the joint with coordinates.
    RpyBox {
        /// Ranges in order `[roll, pitch, yaw]`.
        ranges: [CoordinateRange; 3],
    },
    /// Maximum tilt as a function of tilt azimuth, sampled on a closed
    /// polyline and interpolated periodically.
    CurveBoundary {
        /// `(azimuth, max_tilt)` samples, strictly ascending in azimuth over
        /// one period.
        samples: Vec<(f64, f64)>,
    },
}

/// Ball joint: free rotation about the home origin, with a limit policy.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spherical {
    limit: SphericalLimit,
}

impl Spherical {
    /// Spherical joint with the given limit policy.
    #[must_use]
    pub fn new(limit: SphericalLimit) -> Self {
        Self { limit }
    }
}

/// Tilt of a rotation's z axis away from home z, and the (unnormalized)
/// axis the limiting moment acts about.
fn tilt_of(zc: &Vector3<f64>) -> (f64, Vector3<f64>) {
    let tilt = zc.z.clamp(-1.0, 1.0).acos();
    (tilt, Vector3::z().cross(zc))
}

/// Normalize the tilt axis, falling back to x when the tilt vanishes.
fn tilt_axis_unit(n: &Vector3<f64>) -> Vector3<f64> {
    if n.norm() < 1e-8 {
        Vector3::x()
    } else {
        n.normalize()
    }
}

/// Periodic piecewise-linear interpolation of `(azimuth, value)` samples.
fn interpolate_boundary(samples: &[(f64, f64)], azimuth: f64) -> f64 {
    use std::f64::consts::TAU;
    if samples.len() == 1 {
        return samples[0].1;
    }
    let first = samples[0].0;
    // Fold the query into [first, first + 2π).
    let mut az = (azimuth - first) % TAU;
    if az < 0.0 {
        az += TAU;
    }
    az += first;
    for pair in samples.windows(2) {
        let (a0, v0) = pair[0];
        let (a1, v1) = pair[1];
        if az >= a0 && az <= a1 {
            let t = (az - a0) / (a1 - a0);
            return v0 + t * (v1 - v0);
        }
    }
    // Wraparound segment from the last sample back to the first.
    let (a0, v0) = samples[samples.len() - 1];
    let (a1, v1) = (samples[0].0 + TAU, samples[0].1);
    let t = ((az - a0) / (a1 - a0)).clamp(0.0, 1.0);
    v0 + t * (v1 - v0)
}

impl JointKinematics for Spherical {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        if let SphericalLimit::RpyBox { ranges } = &self.limit {
            l.add_coordinate("roll", ranges[0], MotionType::Rotary);
            l.add_coordinate("pitch", ranges[1], MotionType::Rotary);
            l.add_coordinate("yaw", ranges[2], MotionType::Rotary);
        }
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        match &self.limit {
            SphericalLimit::TiltCone { .. }
            | SphericalLimit::RotationAngle { .. }
            | SphericalLimit::CurveBoundary { .. } => {
                l.add_policy_unilateral(MotionType::Rotary);
            }
            SphericalLimit::None | SphericalLimit::RpyBox { .. } => {}
        }
        l
    }

    fn validate(&self) -> Result<()> {
        match &self.limit {
            SphericalLimit::TiltCone { max_tilt } => {
                if !(*max_tilt > 0.0 && *max_tilt <= std::f64::consts::PI) {
                    return Err(CouplingError::InvalidPolicy {
                        reason: format!("tilt cone limit {max_tilt} outside (0, pi]"),
                    });
                }
            }
            SphericalLimit::RotationAngle { weights } => {
                if weights.iter().any(|w| !(*w > 0.0)) {
                    return Err(CouplingError::InvalidPolicy {
                        reason: format!("rotation-angle weights {weights:?} must be positive"),
                    });
                }
            }
            SphericalLimit::CurveBoundary { samples } => {
                if samples.is_empty() {
                    return Err(CouplingError::InvalidPolicy {
                        reason: "curve boundary needs at least one sample".to_owned(),
                    });
                }
                if samples.windows(2).any(|p| p[1].0 <= p[0].0)
                    || samples[samples.len() - 1].0 - samples[0].0 >= std::f64::consts::TAU
                {
                    return Err(CouplingError::InvalidPolicy {
                        reason: "curve boundary azimuths must ascend within one period"
                            .to_owned(),
                    });
                }
                if samples.iter().any(|s| !(s.1 > 0.0)) {
                    return Err(CouplingError::InvalidPolicy {
                        reason: "curve boundary tilts must be positive".to_owned(),
                    });
                }
            }
            SphericalLimit::None | SphericalLimit::RpyBox { .. } => {}
        }
        Ok(())
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        match &self.limit {
            SphericalLimit::RpyBox { .. } => iso(
                Vector3::zeros(),
                &rbc_spatial::rpy_to_rotation(coords[0], coords[1], coords[2]),
            ),
            // No coordinate parameterization: the manifold is all of SO(3).
            _ => Isometry3::identity(),
        }
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, prev: &[f64], out: &mut [f64]) {
        if let SphericalLimit::RpyBox { .. } = &self.limit {
            let reference = [prev[0], prev[1], prev[2]];
            let angles = extract_rpy(&tcd.rotation.to_rotation_matrix(), &reference);
            out.copy_from_slice(&angles);
        }
    }

    fn project(&self, tfd: &Isometry3<f64>, prev: &[f64], out: &mut [f64]) -> Isometry3<f64> {
        // Rotation is free; only the translation is constrained to the origin.
        self.tcd_to_coords(tfd, prev, out);
        Isometry3::from_parts(nalgebra::Translation3::identity(), tfd.rotation)
    }

    fn coordinate_twist(&self, index: usize, coords: &[f64]) -> Twist {
        match &self.limit {
            SphericalLimit::RpyBox { .. } => {
                Twist::new(Vector3::zeros(), rpy_twists(coords)[index])
            }
            _ => Twist::zero(),
        }
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_force(Vector3::z());

        let r = ctx.tgd.rotation;
        let zc = r * Vector3::z();
        let w = ctx.vel.w;

        match &self.limit {
            SphericalLimit::None => {}
            SphericalLimit::RpyBox { .. } => {
                let duals = rpy_duals(ctx.coords);
                let rates = rpy_rates(ctx.coords, &w);
                let dots = rpy_dual_dots(ctx.coords, &rates);
                for i in 0..3 {
                    ctx.constraints[3 + i].wrench = Wrench::from_moment(duals[i]);
                    ctx.constraints[3 + i].dot_wrench = Wrench::from_moment(dots[i]);
                }
            }
            SphericalLimit::TiltCone { max_tilt } => {
                let (tilt, n) = tilt_of(&zc);
                let nh = tilt_axis_unit(&n);
                let n_dot = Vector3::z().cross(&w.cross(&zc));
                let nh_dot = normalized_derivative(&n, &n_dot);
                let c = &mut ctx.constraints[3];
                c.wrench = Wrench::from_moment(-nh);
                c.dot_wrench = Wrench::from_moment(-nh_dot);
                c.distance = max_tilt - tilt;
            }
            SphericalLimit::CurveBoundary { samples } => {
                let (tilt, n) = tilt_of(&zc);
                let nh = tilt_axis_unit(&n);
                let n_dot = Vector3::z().cross(&w.cross(&zc));
                let nh_dot = normalized_derivative(&n, &n_dot);
                // Azimuth of the tilt direction; at the pole any value works
                // because the tilt itself vanishes there.
                let azimuth = if zc.x.abs() < 1e-12 && zc.y.abs() < 1e-12 {
                    0.0
                } else {
                    zc.y.atan2(zc.x)
                };
                let c = &mut ctx.constraints[3];
                c.wrench = Wrench::from_moment(-nh);
                c.dot_wrench = Wrench::from_moment(-nh_dot);
                c.distance = interpolate_boundary(samples, azimuth) - tilt;
            }
            SphericalLimit::RotationAngle { weights } => {
                let scaled = r.scaled_axis();
                let theta = scaled.norm();
                let axis = if theta < 1e-8 {
                    Vector3::z()
                } else {
                    scaled / theta
                };
                let allowed = |a: &Vector3<f64>| {
                    let s = (a.x / weights[0]).powi(2)
                        + (a.y / weights[1]).powi(2)
                        + (a.z / weights[2]).powi(2);
                    1.0 / s.sqrt()
                };
                // The wrench derivative comes from differencing the axis a
                // short step along the current spin; an analytic form exists
                // but is not worth its weight here.
                let delta = 1e-6;
                let r1 = UnitQuaternion::from_scaled_axis(delta * w) * r;
                let s1 = r1.scaled_axis();
                let t1 = s1.norm();
                let a1 = if t1 < 1e-8 { axis } else { s1 / t1 };
                let c = &mut ctx.constraints[3];
                c.wrench = Wrench::from_moment(-axis);
                c.dot_wrench = Wrench::from_moment((axis - a1) / delta);
                c.distance = allowed(&axis) - theta;
            }
        }
    }
}
