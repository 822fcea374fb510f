//! Error types for spatial-algebra operations.

use thiserror::Error;

/// Errors that can occur in spatial-inertia operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpatialError {
    /// The rotational inertia block is not symmetric positive definite, so it
    /// cannot be factored for inversion.
    #[error("rotational inertia is not symmetric positive definite")]
    NotPositiveDefinite,

    /// Inverting an inertia with zero mass.
    #[error("spatial inertia has zero mass")]
    ZeroMass,

    /// A text form contained the wrong number of values.
    #[error("expected 13 or 36 inertia values, got {count}")]
    ParseCount {
        /// Number of values actually present.
        count: usize,
    },

    /// A text form could not be parsed as numbers.
    #[error("malformed inertia literal: {reason}")]
    Parse {
        /// What was wrong with the literal.
        reason: String,
    },

    /// A 36-value matrix form does not have spatial-inertia structure
    /// (symmetric rotational block, diagonal mass block, skew coupling block).
    #[error("inertia matrix is not structure-consistent: {reason}")]
    Structure {
        /// Which structural check failed.
        reason: String,
    },
}
