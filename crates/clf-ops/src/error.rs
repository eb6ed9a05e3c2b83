//! Operator validation errors.

use thiserror::Error;

/// Result type for operator construction and validation.
pub type OpResult<T> = Result<T, OpError>;

/// Errors raised by operator records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpError {
    /// Array entry count disagrees with the declared dimensions.
    #[error("expected {expected} array values, found {found}")]
    ArrayLength {
        /// Count the dims call for.
        expected: usize,
        /// Count actually parsed.
        found: usize,
    },

    /// Dims attribute is not a legal shape for the op.
    #[error("illegal array dimensions {0}")]
    ArrayDimensions(String),

    /// A matrix inverse was requested but the matrix is singular.
    #[error("singular matrix cannot be inverted")]
    SingularMatrix,

    /// Parameter set is not legal for the chosen style.
    #[error("{0}")]
    Validation(String),

    /// Adjacent operators have inconsistent bit depths.
    #[error("bit depth mismatch between operators: {0} does not match {1}")]
    BitDepthMismatch(String, String),
}

impl OpError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        OpError::Validation(msg.into())
    }
}
