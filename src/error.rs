//! Error types for ragdoll simulation.

use thiserror::Error;

/// Errors that can occur when stepping the ragdoll simulation.
///
/// Numerical-safety problems inside a tick (a non-finite velocity, a
/// degenerate bone) are handled locally by skipping the affected update and
/// never surface here. Only malformed step *inputs* produce an error, and in
/// that case the skeleton is left completely unmodified.
#[derive(Debug, Error)]
pub enum RagdollError {
    /// Configuration error (e.g. damping outside `(0, 1]`).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Numerical error in a step parameter (`NaN`, infinity).
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

impl RagdollError {
    /// Create an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a numerical error.
    pub fn numerical_error(msg: impl Into<String>) -> Self {
        Self::NumericalError(msg.into())
    }
}

/// Result type for ragdoll simulation operations.
pub type Result<T> = std::result::Result<T, RagdollError>;
