//! Error types for attribution strategies.

use thiserror::Error;

use spectra_core::CoreError;

/// Result type alias using [`ExplainError`].
pub type Result<T> = std::result::Result<T, ExplainError>;

/// Errors that can occur while computing attributions.
///
/// Failures raised by wrapped attribution methods or model closures
/// propagate unchanged through `?`; there is no retry and no partial-result
/// recovery.
#[derive(Error, Debug)]
pub enum ExplainError {
    /// Core validation error.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// An argument is out of range or otherwise malformed.
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A smoothing-method string is not one of the recognized names.
    #[error("Unknown smoothing method {0:?}, expected one of 'smoothgrad', 'smoothgrad_sq', 'vargrad'")]
    UnknownMethod(String),

    /// A required component was never constructed.
    #[error("Component not initialized: {0}")]
    Uninitialized(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl ExplainError {
    /// Shorthand for an [`ExplainError::InvalidArgument`] with a named parameter.
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
