//! Kinds whose axes are fixed in the home frame: hinges, sliders, and their
//! planar and rigid combinations.
//!
//! Every kind here has constant constraint wrenches in frame D, so all
//! wrench derivatives are zero and the constraint fill is a one-time stamp
//! repeated each step.

use nalgebra::{Isometry3, Vector3};
use rbc_spatial::{Twist, Wrench};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{iso, nearest_z_angle, rot_z, JointKinematics, KindLayout, UpdateCtx};
use crate::{CoordinateRange, MotionType};

/// Sense of a hinge's rotation coordinate relative to the +z axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RotationSense {
    /// Positive coordinate = right-hand rotation about +z.
    #[default]
    Positive,
    /// Positive coordinate = right-hand rotation about −z.
    Negative,
}

impl RotationSense {
    fn factor(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

/// One rotational coordinate `theta` about the z axis.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hinge {
    range: CoordinateRange,
    sense: RotationSense,
}

impl Hinge {
    /// Hinge with the given coordinate range and sense.
    #[must_use]
    pub fn new(range: CoordinateRange, sense: RotationSense) -> Self {
        Self { range, sense }
    }
}

impl JointKinematics for Hinge {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("theta", self.range, MotionType::Rotary);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        iso(Vector3::zeros(), &rot_z(self.sense.factor() * coords[0]))
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, _prev: &[f64], out: &mut [f64]) {
        out[0] = self.sense.factor() * nearest_z_angle(&tcd.rotation.to_rotation_matrix());
    }

    fn coordinate_twist(&self, _index: usize, _coords: &[f64]) -> Twist {
        Twist::new(Vector3::zeros(), self.sense.factor() * Vector3::z())
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_force(Vector3::z());
        ctx.constraints[3].wrench = Wrench::from_moment(Vector3::x());
        ctx.constraints[4].wrench = Wrench::from_moment(Vector3::y());
        ctx.constraints[5].wrench = Wrench::from_moment(self.sense.factor() * Vector3::z());
    }
}

/// One translational coordinate `z` along the z axis.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Slider {
    range: CoordinateRange,
}

impl Slider {
    /// Slider with the given coordinate range.
    #[must_use]
    pub fn new(range: CoordinateRange) -> Self {
        Self { range }
    }
}

impl JointKinematics for Slider {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("z", self.range, MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        Isometry3::translation(0.0, 0.0, coords[0])
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, _prev: &[f64], out: &mut [f64]) {
        out[0] = tcd.translation.vector.z;
    }

    fn coordinate_twist(&self, _index: usize, _coords: &[f64]) -> Twist {
        Twist::new(Vector3::z(), Vector3::zeros())
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_moment(Vector3::x());
        ctx.constraints[3].wrench = Wrench::from_moment(Vector3::y());
        ctx.constraints[4].wrench = Wrench::from_moment(Vector3::z());
        ctx.constraints[5].wrench = Wrench::from_force(Vector3::z());
    }
}

/// Translation along z plus rotation about z: coordinates `[z, theta]`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cylindrical {
    z_range: CoordinateRange,
    theta_range: CoordinateRange,
}

impl Cylindrical {
    /// Cylindrical joint with ranges for the slide and the turn.
    #[must_use]
    pub fn new(z_range: CoordinateRange, theta_range: CoordinateRange) -> Self {
        Self {
            z_range,
            theta_range,
        }
    }
}

impl JointKinematics for Cylindrical {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("z", self.z_range, MotionType::Linear);
        l.add_coordinate("theta", self.theta_range, MotionType::Rotary);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        iso(Vector3::new(0.0, 0.0, coords[0]), &rot_z(coords[1]))
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, _prev: &[f64], out: &mut [f64]) {
        out[0] = tcd.translation.vector.z;
        out[1] = nearest_z_angle(&tcd.rotation.to_rotation_matrix());
    }

    fn coordinate_twist(&self, index: usize, _coords: &[f64]) -> Twist {
        match index {
            0 => Twist::new(Vector3::z(), Vector3::zeros()),
            _ => Twist::new(Vector3::zeros(), Vector3::z()),
        }
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_moment(Vector3::x());
        ctx.constraints[3].wrench = Wrench::from_moment(Vector3::y());
        ctx.constraints[4].wrench = Wrench::from_force(Vector3::z());
        ctx.constraints[5].wrench = Wrench::from_moment(Vector3::z());
    }
}

/// Rotation about z plus a translational slot along x: coordinates
/// `[x, theta]`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlottedHinge {
    x_range: CoordinateRange,
    theta_range: CoordinateRange,
}

impl SlottedHinge {
    /// Slotted hinge with ranges for the slot and the turn.
    #[must_use]
    pub fn new(x_range: CoordinateRange, theta_range: CoordinateRange) -> Self {
        Self {
            x_range,
            theta_range,
        }
    }
}

impl JointKinematics for SlottedHinge {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("x", self.x_range, MotionType::Linear);
        l.add_coordinate("theta", self.theta_range, MotionType::Rotary);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        iso(Vector3::new(coords[0], 0.0, 0.0), &rot_z(coords[1]))
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, _prev: &[f64], out: &mut [f64]) {
        out[0] = tcd.translation.vector.x;
        out[1] = nearest_z_angle(&tcd.rotation.to_rotation_matrix());
    }

    fn coordinate_twist(&self, index: usize, _coords: &[f64]) -> Twist {
        match index {
            0 => Twist::new(Vector3::x(), Vector3::zeros()),
            _ => Twist::new(Vector3::zeros(), Vector3::z()),
        }
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::z());
        ctx.constraints[2].wrench = Wrench::from_moment(Vector3::x());
        ctx.constraints[3].wrench = Wrench::from_moment(Vector3::y());
        ctx.constraints[4].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[5].wrench = Wrench::from_moment(Vector3::z());
    }
}

/// Free translation plus rotation about z: coordinates `[x, y, z, theta]`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixedAxis {
    ranges: [CoordinateRange; 4],
}

impl FixedAxis {
    /// Ranges in coordinate order `[x, y, z, theta]`.
    #[must_use]
    pub fn new(ranges: [CoordinateRange; 4]) -> Self {
        Self { ranges }
    }
}

impl JointKinematics for FixedAxis {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("x", self.ranges[0], MotionType::Linear);
        l.add_coordinate("y", self.ranges[1], MotionType::Linear);
        l.add_coordinate("z", self.ranges[2], MotionType::Linear);
        l.add_coordinate("theta", self.ranges[3], MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        iso(
            Vector3::new(coords[0], coords[1], coords[2]),
            &rot_z(coords[3]),
        )
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, _prev: &[f64], out: &mut [f64]) {
        out[..3].copy_from_slice(tcd.translation.vector.as_slice());
        out[3] = nearest_z_angle(&tcd.rotation.to_rotation_matrix());
    }

    fn coordinate_twist(&self, index: usize, _coords: &[f64]) -> Twist {
        match index {
            0 => Twist::new(Vector3::x(), Vector3::zeros()),
            1 => Twist::new(Vector3::y(), Vector3::zeros()),
            2 => Twist::new(Vector3::z(), Vector3::zeros()),
            _ => Twist::new(Vector3::zeros(), Vector3::z()),
        }
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_moment(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_moment(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[3].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[4].wrench = Wrench::from_force(Vector3::z());
        ctx.constraints[5].wrench = Wrench::from_moment(Vector3::z());
    }
}

/// Translation in the x-y plane plus rotation about z: coordinates
/// `[x, y, theta]`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Planar {
    ranges: [CoordinateRange; 3],
}

impl Planar {
    /// Ranges in coordinate order `[x, y, theta]`.
    #[must_use]
    pub fn new(ranges: [CoordinateRange; 3]) -> Self {
        Self { ranges }
    }
}

impl JointKinematics for Planar {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("x", self.ranges[0], MotionType::Linear);
        l.add_coordinate("y", self.ranges[1], MotionType::Linear);
        l.add_coordinate("theta", self.ranges[2], MotionType::Rotary);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        iso(Vector3::new(coords[0], coords[1], 0.0), &rot_z(coords[2]))
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, _prev: &[f64], out: &mut [f64]) {
        out[0] = tcd.translation.vector.x;
        out[1] = tcd.translation.vector.y;
        out[2] = nearest_z_angle(&tcd.rotation.to_rotation_matrix());
    }

    fn coordinate_twist(&self, index: usize, _coords: &[f64]) -> Twist {
        match index {
            0 => Twist::new(Vector3::x(), Vector3::zeros()),
            1 => Twist::new(Vector3::y(), Vector3::zeros()),
            _ => Twist::new(Vector3::zeros(), Vector3::z()),
        }
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::z());
        ctx.constraints[1].wrench = Wrench::from_moment(Vector3::x());
        ctx.constraints[2].wrench = Wrench::from_moment(Vector3::y());
        ctx.constraints[3].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[4].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[5].wrench = Wrench::from_moment(Vector3::z());
    }
}

/// Translation in the x-y plane with no rotation: coordinates `[x, y]`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlanarTranslation {
    ranges: [CoordinateRange; 2],
}

impl PlanarTranslation {
    /// Ranges in coordinate order `[x, y]`.
    #[must_use]
    pub fn new(ranges: [CoordinateRange; 2]) -> Self {
        Self { ranges }
    }
}

impl JointKinematics for PlanarTranslation {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        l.add_coordinate("x", self.ranges[0], MotionType::Linear);
        l.add_coordinate("y", self.ranges[1], MotionType::Linear);
        l.add_bilateral(MotionType::Linear);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l.add_bilateral(MotionType::Rotary);
        l
    }

    fn coords_to_tcd(&self, coords: &[f64]) -> Isometry3<f64> {
        Isometry3::translation(coords[0], coords[1], 0.0)
    }

    fn tcd_to_coords(&self, tcd: &Isometry3<f64>, _prev: &[f64], out: &mut [f64]) {
        out[0] = tcd.translation.vector.x;
        out[1] = tcd.translation.vector.y;
    }

    fn coordinate_twist(&self, index: usize, _coords: &[f64]) -> Twist {
        match index {
            0 => Twist::new(Vector3::x(), Vector3::zeros()),
            _ => Twist::new(Vector3::y(), Vector3::zeros()),
        }
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::z());
        ctx.constraints[1].wrench = Wrench::from_moment(Vector3::x());
        ctx.constraints[2].wrench = Wrench::from_moment(Vector3::y());
        ctx.constraints[3].wrench = Wrench::from_moment(Vector3::z());
        ctx.constraints[4].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[5].wrench = Wrench::from_force(Vector3::y());
    }
}

/// Rigid connection: no coordinates, six bilateral directions.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Solid;

impl Solid {
    /// Rigid connection.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl JointKinematics for Solid {
    fn layout(&self) -> KindLayout {
        let mut l = KindLayout::default();
        for _ in 0..3 {
            l.add_bilateral(MotionType::Linear);
        }
        for _ in 0..3 {
            l.add_bilateral(MotionType::Rotary);
        }
        l
    }

    fn coords_to_tcd(&self, _coords: &[f64]) -> Isometry3<f64> {
        Isometry3::identity()
    }

    fn tcd_to_coords(&self, _tcd: &Isometry3<f64>, _prev: &[f64], _out: &mut [f64]) {}

    fn coordinate_twist(&self, _index: usize, _coords: &[f64]) -> Twist {
        Twist::zero()
    }

    fn update_constraints(&self, ctx: &mut UpdateCtx<'_>) {
        ctx.constraints[0].wrench = Wrench::from_force(Vector3::x());
        ctx.constraints[1].wrench = Wrench::from_force(Vector3::y());
        ctx.constraints[2].wrench = Wrench::from_force(Vector3::z());
        ctx.constraints[3].wrench = Wrench::from_moment(Vector3::x());
        ctx.constraints[4].wrench = Wrench::from_moment(Vector3::y());
        ctx.constraints[5].wrench = Wrench::from_moment(Vector3::z());
    }
}
