//! Named scalar degrees of freedom.

use rbc_spatial::nearest_angle;

use crate::{CouplingError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether a coordinate (or constraint direction) is translational or
/// rotational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotionType {
    /// Translational motion (meters).
    Linear,
    /// Rotational motion (radians), with 2π-wraparound semantics.
    Rotary,
}

/// Validated `[min, max]` range for a coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoordinateRange {
    min: f64,
    max: f64,
}

impl CoordinateRange {
    /// Create a range; `min > max` is rejected immediately.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if min > max {
            return Err(CouplingError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// A range imposing no limits.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// Lower bound.
    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether `value` lies within the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Whether both bounds are infinite.
    #[must_use]
    pub fn is_unlimited(&self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }

    /// Clamp a value into the range.
    #[must_use]
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl Default for CoordinateRange {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// A named scalar degree of freedom of a coupling.
///
/// Coordinates are created once at coupling construction and live for the
/// coupling's lifetime; only their values change per step. A coordinate may
/// be wired to the unilateral constraint direction that enforces its range.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    name: String,
    value: f64,
    range: CoordinateRange,
    motion: MotionType,
    limit_constraint: Option<usize>,
}

impl Coordinate {
    pub(crate) fn new(
        name: &str,
        range: CoordinateRange,
        motion: MotionType,
        limit_constraint: Option<usize>,
    ) -> Self {
        Self {
            name: name.to_owned(),
            value: 0.0,
            range,
            motion,
            limit_constraint,
        }
    }

    /// Coordinate name (e.g. `"theta"`, `"z"`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Allowed range.
    #[must_use]
    pub fn range(&self) -> CoordinateRange {
        self.range
    }

    /// Linear or rotary.
    #[must_use]
    pub fn motion_type(&self) -> MotionType {
        self.motion
    }

    /// Index of the unilateral constraint direction enforcing this
    /// coordinate's range, if any.
    #[must_use]
    pub fn limit_constraint(&self) -> Option<usize> {
        self.limit_constraint
    }

    pub(crate) fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    /// Store a freshly extracted representative of `raw`. Rotary coordinates
    /// take the branch nearest the previous value so continuous rotation
    /// never sees a 2π jump.
    pub(crate) fn update_value(&mut self, raw: f64) {
        self.value = match self.motion {
            MotionType::Linear => raw,
            MotionType::Rotary => nearest_angle(self.value, raw),
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let err = CoordinateRange::new(1.0, -1.0).unwrap_err();
        assert!(matches!(err, CouplingError::InvalidRange { .. }));
    }

    #[test]
    fn test_rotary_value_tracks_previous_branch() {
        let mut c = Coordinate::new(
            "theta",
            CoordinateRange::unlimited(),
            MotionType::Rotary,
            None,
        );
        c.set_value(3.0);
        // A principal-value extraction just past π should continue upward,
        // not wrap to −π.
        c.update_value(3.2 - TAU);
        assert_relative_eq!(c.value(), 3.2, epsilon = 1e-12);
        assert!(c.value() > 3.0 - PI && c.value() <= 3.0 + PI);
    }

    #[test]
    fn test_linear_value_untouched() {
        let mut c = Coordinate::new("z", CoordinateRange::unlimited(), MotionType::Linear, None);
        c.set_value(10.0);
        c.update_value(-4.0);
        assert_relative_eq!(c.value(), -4.0, epsilon = 1e-12);
    }
}
