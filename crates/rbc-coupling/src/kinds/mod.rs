//! The closed set of joint kinds.
//!
//! Every concrete kind implements [`JointKinematics`]: the shared capability
//! contract {project, declare layout, update constraints, convert
//! coordinates}. [`CouplingKind`] is the tagged union the engine dispatches
//! through: one case per joint kind, each carrying its own parameter
//! struct.
//!
//! Frame conventions used by every kind:
//!
//! - `TCD` maps frame C (on the constraint manifold) to frame D (the
//!   coupling's home frame).
//! - Constraint wrenches, their derivatives, error twists and relative
//!   velocities are all expressed in frame D.
//! - A coordinate's *twist* is the derivative of TCD with respect to that
//!   coordinate: translational part = velocity of C's origin, angular part =
//!   angular velocity, both in D.
//! - A coordinate's *dual wrench* `wᵢ` satisfies `wᵢ · tⱼ = δᵢⱼ` over the
//!   coordinate twists; range-limit directions store the dual of their
//!   coordinate (the engine flips its sign for upper-limit engagement).

mod angular;
mod axial;
mod parameterized;
mod spherical;
mod surface;

pub use angular::{Free, Gimbal, RollPitch, Universal};
pub use axial::{
    Cylindrical, FixedAxis, Hinge, Planar, PlanarTranslation, RotationSense, SlottedHinge, Slider,
    Solid,
};
pub use parameterized::{Parameterized, PoseCurve};
pub use spherical::{Spherical, SphericalLimit};
pub use surface::{Ellipsoid, SegmentedPlanar};

use nalgebra::{Isometry3, Rotation3, Translation3, UnitQuaternion, Vector3, Vector6};
use rbc_spatial::{Twist, Wrench};

use crate::{ConstraintInfo, CoordinateRange, MotionType, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which of two divergent velocity-coupling update strategies a surface or
/// curve kind uses for its wrench derivatives.
///
/// The exact strategy differentiates the constraint basis along the current
/// motion; the other deliberately ignores the surface-coupling terms as an
/// approximation. Both are preserved behind this configuration choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VelocityCoupling {
    /// Differentiate the constraint directions along the current motion.
    #[default]
    Exact,
    /// Treat the constraint directions as momentarily fixed (zero wrench
    /// derivative for the coupled terms).
    Ignore,
}

/// Declaration of one coordinate in a kind's layout.
#[derive(Debug, Clone)]
pub(crate) struct CoordinateDecl {
    pub name: &'static str,
    pub range: CoordinateRange,
    pub motion: MotionType,
}

/// A kind's fixed layout: declared once, at coupling construction.
///
/// The engine materializes the constraint array as bilaterals first, then one
/// range-limit slot per coordinate (in coordinate order), then policy slots.
/// That ordering is part of the checkpoint format.
#[derive(Debug, Clone, Default)]
pub(crate) struct KindLayout {
    pub coordinates: Vec<CoordinateDecl>,
    pub bilaterals: Vec<MotionType>,
    pub policy_slots: Vec<MotionType>,
}

impl KindLayout {
    /// Append a coordinate (its range-limit slot is implied). Returns the
    /// coordinate index.
    pub fn add_coordinate(
        &mut self,
        name: &'static str,
        range: CoordinateRange,
        motion: MotionType,
    ) -> usize {
        self.coordinates.push(CoordinateDecl {
            name,
            range,
            motion,
        });
        self.coordinates.len() - 1
    }

    /// Append a bilateral constraint direction.
    pub fn add_bilateral(&mut self, motion: MotionType) {
        self.bilaterals.push(motion);
    }

    /// Append a unilateral direction not tied to a coordinate (limit-policy
    /// directions such as a tilt cone).
    pub fn add_policy_unilateral(&mut self, motion: MotionType) {
        self.policy_slots.push(motion);
    }
}

/// Per-step context handed to a kind's constraint update.
pub(crate) struct UpdateCtx<'a> {
    /// Projected pose (C in D).
    pub tgd: &'a Isometry3<f64>,
    /// Pose error of F relative to the projection, in D.
    pub err: &'a Twist,
    /// Relative velocity of the coupled bodies, in D.
    pub vel: &'a Twist,
    /// Current coordinate values.
    pub coords: &'a [f64],
    /// Constraint storage, in layout order (bilaterals first).
    pub constraints: &'a mut [ConstraintInfo],
}

/// The capability contract every joint kind supplies.
pub(crate) trait JointKinematics {
    /// Declare coordinates and constraint directions. Called once.
    fn layout(&self) -> KindLayout;

    /// Validate construction parameters. Configuration errors are rejected
    /// here, at the call that introduces them.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Exact map from a coordinate vector to TCD.
    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64>;

    /// Exact inverse of [`JointKinematics::coords_to_tcd`], resolving branch
    /// ambiguity toward `prev`. Must also accept off-manifold poses, for
    /// which it extracts the nearest-point coordinates.
    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, prev: &[f64], out: &mut [f64]);

    /// Project an arbitrary pose onto the constraint manifold. The default
    /// extracts nearest-point coordinates and rebuilds the pose from them.
    fn project(&self, tfd: &Isometry3<f64>, prev: &[f64], out: &mut [f64]) -> Isometry3<f64> {
        self.tcd_to_coords(tfd, prev, out);
        self.coords_to_tcd(out)
    }

    /// Derivative of TCD with respect to coordinate `index`, as a twist in D.
    fn coordinate_twist(&self, index: usize, coords: &[f64]) -> Twist;

    /// Recompute wrenches and wrench derivatives for every bilateral
    /// direction, the dual wrenches for every coordinate-limit slot, and
    /// distance/wrench for policy-managed unilateral slots.
    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>);
}

/// The closed set of joint kinds, dispatched through [`JointKinematics`].
#[derive(Debug)]
pub enum CouplingKind {
    /// One rotational DOF about z.
    Hinge(Hinge),
    /// One translational DOF along z.
    Slider(Slider),
    /// Translation along and rotation about z.
    Cylindrical(Cylindrical),
    /// Rotation about z plus a translational slot along x.
    SlottedHinge(SlottedHinge),
    /// Free translation plus rotation about z.
    FixedAxis(FixedAxis),
    /// Translation in the x-y plane plus rotation about z.
    Planar(Planar),
    /// Translation in the x-y plane only.
    PlanarTranslation(PlanarTranslation),
    /// Rigid connection: zero DOF.
    Solid(Solid),
    /// Hooke joint: rotation about x, then about the moved y.
    Universal(Universal),
    /// Roll about z, pitch about a skewed y′.
    RollPitch(RollPitch),
    /// Intrinsic Z-Y-X roll/pitch/yaw with per-angle limits.
    Gimbal(Gimbal),
    /// Ball joint with a construction-selected limit policy.
    Spherical(Spherical),
    /// All six DOF free, each with an optional range.
    Free(Free),
    /// Frame origin on an ellipsoid surface, spinning about the normal.
    Ellipsoid(Ellipsoid),
    /// Origin on a piecewise-planar surface.
    SegmentedPlanar(SegmentedPlanar),
    /// One coordinate along a user-supplied pose curve.
    Parameterized(Parameterized),
}

impl CouplingKind {
    pub(crate) fn kinematics(&self) -> &dyn JointKinematics {
        match self {
            Self::Hinge(k) => k,
            Self::Slider(k) => k,
            Self::Cylindrical(k) => k,
            Self::SlottedHinge(k) => k,
            Self::FixedAxis(k) => k,
            Self::Planar(k) => k,
            Self::PlanarTranslation(k) => k,
            Self::Solid(k) => k,
            Self::Universal(k) => k,
            Self::RollPitch(k) => k,
            Self::Gimbal(k) => k,
            Self::Spherical(k) => k,
            Self::Free(k) => k,
            Self::Ellipsoid(k) => k,
            Self::SegmentedPlanar(k) => k,
            Self::Parameterized(k) => k,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Build an isometry from a translation vector and rotation matrix.
pub(crate) fn iso(p: Vector3<f64>, r: &Rotation3<f64>) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::from(p),
        UnitQuaternion::from_rotation_matrix(r),
    )
}

/// Rotation about z by `theta`.
pub(crate) fn rot_z(theta: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Vector3::z_axis(), theta)
}

/// The z-rotation angle nearest (in the Frobenius sense) to an arbitrary
/// rotation: `atan2(R10 − R01, R00 + R11)`. Exact for on-manifold input.
pub(crate) fn nearest_z_angle(r: &Rotation3<f64>) -> f64 {
    (r[(1, 0)] - r[(0, 1)]).atan2(r[(0, 0)] + r[(1, 1)])
}

/// Derivative of `normalize(u)` given `u` and `du`, with the vanishing-norm
/// case clamped.
pub(crate) fn normalized_derivative(u: &Vector3<f64>, du: &Vector3<f64>) -> Vector3<f64> {
    let n = u.norm().max(1e-12);
    let uh = u / n;
    (du - uh * uh.dot(du)) / n
}

/// Zero out a slice of constraint wrenches and derivatives before a refill.
pub(crate) fn clear_constraints(constraints: &mut [ConstraintInfo]) {
    for c in constraints {
        c.wrench = Wrench::zero();
        c.dot_wrench = Wrench::zero();
    }
}

/// Pack a twist into the 6-vector `(v, w)` used by the least-squares and
/// Gram-Schmidt machinery.
pub(super) fn vec6_of_twist(t: &Twist) -> Vector6<f64> {
    let mut out = Vector6::zeros();
    out.fixed_rows_mut::<3>(0).copy_from(&t.v);
    out.fixed_rows_mut::<3>(3).copy_from(&t.w);
    out
}

/// Interpret a 6-vector `(cv, cw)` as the wrench `(m = cw, f = cv)`, the
/// pairing under which `wrench · twist` equals the Euclidean 6-dot.
pub(super) fn wrench_of_vec6(c: &Vector6<f64>) -> Wrench {
    Wrench::new(
        c.fixed_rows::<3>(3).into_owned(),
        c.fixed_rows::<3>(0).into_owned(),
    )
}
