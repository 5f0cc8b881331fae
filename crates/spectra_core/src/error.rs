//! Error types for spectra_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur when building or validating spectral data.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid tensor shape provided.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        got: String,
    },

    /// Shape mismatch between tensors.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// An argument is out of range or otherwise malformed.
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Cube axes are not in the ordering an operation requires.
    #[error("Invalid orientation: expected {expected}, got {got}")]
    OrientationMismatch {
        /// Required axis ordering.
        expected: String,
        /// Ordering carried by the cube.
        got: String,
    },

    /// A required component was never constructed.
    #[error("Component not initialized: {0}")]
    Uninitialized(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl CoreError {
    /// Shorthand for an [`CoreError::InvalidArgument`] with a named parameter.
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
