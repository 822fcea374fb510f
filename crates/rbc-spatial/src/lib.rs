//! Spatial vector algebra for rigid-body coupling constraints.
//!
//! Implements 6D twists (spatial velocities), wrenches (spatial forces) and
//! spatial inertia in the free/line decomposition: a spatial vector carries a
//! *free* 3-vector and a *line* 3-vector, and twists and wrenches swap the two
//! so that `wrench · twist` (mechanical power) is invariant under the shared
//! rigid-transform rule.
//!
//! This crate is pure math, with no constraint state and no engine. See
//! `rbc-coupling` for the joint-coupling engine built on top of it.
//!
//! # Conventions
//!
//! - `Twist { v, w }`: `v` = translational velocity (free), `w` = angular
//!   velocity (line).
//! - `Wrench { m, f }`: `m` = moment (free), `f` = force (line).
//! - Transforms use [`nalgebra::Isometry3`]; a transform `X_AB` (pose of
//!   frame B in frame A) re-expresses a B-frame spatial vector in frame A.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::suboptimal_flops, clippy::missing_errors_doc)]

mod error;
mod euler;
mod inertia;
mod twist;
mod wrench;

pub use error::SpatialError;
pub use euler::{nearest_angle, rotation_to_rpy, rpy_to_rotation, EulerFilter};
pub use inertia::SpatialInertia;
pub use twist::{ExtrapolationFrame, Twist};
pub use wrench::Wrench;

/// Result type for spatial-algebra operations.
pub type Result<T> = std::result::Result<T, SpatialError>;

use nalgebra::{Matrix3, Vector3};

/// Cross-product matrix: `skew(v) * w == v × w`.
#[inline]
#[must_use]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}
