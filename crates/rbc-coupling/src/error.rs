//! Error types for coupling configuration and state transfer.

use thiserror::Error;

/// Errors that can occur configuring or driving a coupling.
///
/// Degenerate-geometry conditions (gimbal lock, vanishing tilt axes,
/// zero-length projection gradients) are deliberately *not* represented here:
/// they occur routinely during ordinary motion and are absorbed by documented
/// fallback branches inside the joint kinds.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CouplingError {
    /// A coordinate range with `min > max`.
    #[error("invalid coordinate range: min {min} > max {max}")]
    InvalidRange {
        /// Lower bound supplied.
        min: f64,
        /// Upper bound supplied.
        max: f64,
    },

    /// A joint-kind parameter or limit policy that cannot be honored.
    #[error("invalid coupling configuration: {reason}")]
    InvalidPolicy {
        /// Which parameter was rejected.
        reason: String,
    },

    /// An impulse vector shorter than the constraints it must cover.
    #[error("constraint count mismatch: need {expected} impulses from offset {offset}, got {actual}")]
    ConstraintCountMismatch {
        /// Constraints expecting an impulse.
        expected: usize,
        /// Offset the scatter started at.
        offset: usize,
        /// Impulses actually available.
        actual: usize,
    },

    /// A checkpoint buffer of the wrong length.
    #[error("state buffer length mismatch: expected {expected}, got {actual}")]
    StateSizeMismatch {
        /// Required buffer length.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
}
