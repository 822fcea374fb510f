//! Constraint records: the internal per-direction state and the
//! solver-facing views.

use nalgebra::{Isometry3, Point3};
use rbc_spatial::Wrench;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::MotionType;

/// Internal record for one potential constraint direction of a coupling.
///
/// One of these exists for every bilateral direction and every potential
/// unilateral direction (`numBilaterals + maxUnilaterals` in total); storage
/// is allocated eagerly at coupling construction and never resized.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintInfo {
    /// Constraint wrench, expressed in the coupling frame.
    pub(crate) wrench: Wrench,
    /// Time derivative of the wrench under the current relative velocity.
    pub(crate) dot_wrench: Wrench,
    /// Signed constraint violation along this direction (negative when
    /// violated).
    pub(crate) distance: f64,
    /// Constraint compliance (inverse stiffness); 0 = rigid.
    pub(crate) compliance: f64,
    /// Constraint damping, active when compliance is non-zero.
    pub(crate) damping: f64,
    /// 0 = inactive, ±1 = engaged, sign selecting the violated side.
    pub(crate) engaged: i8,
    /// Bilateral directions are always engaged and never break.
    pub(crate) bilateral: bool,
    /// Whether this direction restricts linear or rotary motion.
    pub(crate) motion: MotionType,
    /// Impulse multiplier from the last solve, scattered back by the caller.
    pub(crate) multiplier: f64,
    /// Separation speed along the constraint normal (for break hysteresis).
    pub(crate) contact_speed: f64,
    /// Separation acceleration along the normal, written back by the solver.
    pub(crate) contact_accel: f64,
    /// Owning coordinate, for range-limit directions.
    pub(crate) coordinate: Option<usize>,
}

impl ConstraintInfo {
    pub(crate) fn new(bilateral: bool, motion: MotionType, coordinate: Option<usize>) -> Self {
        Self {
            wrench: Wrench::zero(),
            dot_wrench: Wrench::zero(),
            distance: 0.0,
            compliance: 0.0,
            damping: 0.0,
            engaged: if bilateral { 1 } else { 0 },
            bilateral,
            motion,
            multiplier: 0.0,
            contact_speed: 0.0,
            contact_accel: 0.0,
            coordinate,
        }
    }

    /// Constraint wrench in the coupling frame.
    #[must_use]
    pub fn wrench(&self) -> Wrench {
        self.wrench
    }

    /// Time derivative of the constraint wrench.
    #[must_use]
    pub fn dot_wrench(&self) -> Wrench {
        self.dot_wrench
    }

    /// Signed violation distance (negative = violated).
    #[must_use]
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Compliance (inverse stiffness).
    #[must_use]
    pub fn compliance(&self) -> f64 {
        self.compliance
    }

    /// Damping.
    #[must_use]
    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Engagement flag: 0 inactive, ±1 engaged (sign = violated side).
    #[must_use]
    pub fn engaged(&self) -> i8 {
        self.engaged
    }

    /// Whether this direction is bilateral.
    #[must_use]
    pub fn is_bilateral(&self) -> bool {
        self.bilateral
    }

    /// Linear or rotary.
    #[must_use]
    pub fn motion_type(&self) -> MotionType {
        self.motion
    }

    /// Multiplier from the most recent impulse scatter.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Separation speed along the constraint normal.
    #[must_use]
    pub fn contact_speed(&self) -> f64 {
        self.contact_speed
    }

    /// Separation acceleration along the constraint normal.
    #[must_use]
    pub fn contact_accel(&self) -> f64 {
        self.contact_accel
    }
}

/// Solver-facing constraint record: one per engaged-or-bilateral direction,
/// with the wrench expressed in both body frames.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyConstraint {
    /// Constraint wrench in body A's frame.
    pub wrench_a: Wrench,
    /// Constraint wrench in body B's frame.
    pub wrench_b: Wrench,
    /// Wrench time derivative (coupling frame).
    pub dot_wrench: Wrench,
    /// Signed violation distance.
    pub distance: f64,
    /// Compliance.
    pub compliance: f64,
    /// Damping.
    pub damping: f64,
    /// Solved multiplier.
    pub multiplier: f64,
    /// Separation speed (break hysteresis input).
    pub contact_speed: f64,
    /// Separation acceleration (break hysteresis input).
    pub contact_accel: f64,
    /// Friction force limit for this direction.
    pub friction_limit: f64,
    /// Current friction force value.
    pub friction_value: f64,
    /// Optional contact point, for contact-like constraints.
    pub contact_point: Option<Point3<f64>>,
    /// Whether the source direction is bilateral.
    pub bilateral: bool,
}

impl RigidBodyConstraint {
    /// Build a solver-facing record from an internal direction, expressing
    /// the coupling-frame wrench in each body's frame. `tca` / `tcb` are the
    /// poses of the coupling frame in bodies A and B.
    #[must_use]
    pub fn from_info(
        info: &ConstraintInfo,
        tca: &Isometry3<f64>,
        tcb: &Isometry3<f64>,
    ) -> Self {
        Self {
            wrench_a: info.wrench.transform(tca),
            wrench_b: info.wrench.transform(tcb),
            dot_wrench: info.dot_wrench,
            distance: info.distance,
            compliance: info.compliance,
            damping: info.damping,
            multiplier: info.multiplier,
            contact_speed: info.contact_speed,
            contact_accel: info.contact_accel,
            friction_limit: 0.0,
            friction_value: 0.0,
            contact_point: None,
            bilateral: info.bilateral,
        }
    }
}

/// Contact data traveling alongside constraints, produced and consumed by
/// the external solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactInfo {
    /// Contact point in the coupling frame.
    pub point: Point3<f64>,
    /// Contact normal.
    pub normal: nalgebra::Vector3<f64>,
    /// Penetration depth (positive = penetrating).
    pub penetration: f64,
}

/// Friction data for a constraint direction, produced and consumed by the
/// external solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrictionInfo {
    /// Friction coefficient.
    pub mu: f64,
    /// Index of the normal-force constraint this friction row couples to.
    pub contact_index: usize,
    /// Stiction creep tolerance.
    pub stiction_creep: f64,
}
