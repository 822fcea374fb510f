//! Joint couplings between rigid bodies.
//!
//! A [`RigidBodyCoupling`] wraps one joint kind (hinge, slider, ball,
//! surface ride, pose curve and friends) and turns it into the material an
//! external constraint solver consumes: a fixed set of bilateral constraint
//! directions, named coordinates with range limits, unilateral limit
//! directions with engagement hysteresis, and the impulse scatter back into
//! forces. Spatial algebra comes from [`rbc_spatial`].
//!
//! The per-step protocol:
//!
//! 1. [`RigidBodyCoupling::project_to_constraints`] pulls the input pose onto
//!    the joint's constraint manifold and refreshes the coordinates.
//! 2. [`RigidBodyCoupling::update_constraints`] recomputes every constraint
//!    direction, its violation distance and its wrench derivative, and runs
//!    the limit engagement machine.
//! 3. The solver consumes [`RigidBodyCoupling::solver_constraints`] and hands
//!    impulses back through [`RigidBodyCoupling::set_bilateral_impulses`] and
//!    [`RigidBodyCoupling::set_unilateral_impulses`].

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]

mod constraint;
mod coordinate;
mod coupling;
mod error;
pub mod kinds;

pub use constraint::{ConstraintInfo, ContactInfo, FrictionInfo, RigidBodyConstraint};
pub use coordinate::{Coordinate, CoordinateRange, MotionType};
pub use coupling::RigidBodyCoupling;
pub use error::CouplingError;
pub use kinds::{CouplingKind, PoseCurve, SphericalLimit, VelocityCoupling};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CouplingError>;
