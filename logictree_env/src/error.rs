//! Error types for the job environment.

use thiserror::Error;

/// Errors raised while resolving job parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// A parameter value could not be parsed or is out of range
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidParameter {
        key: String,
        value: String,
        reason: String,
    },
}

impl EnvError {
    /// Creates an invalid-parameter error.
    pub fn invalid(key: &str, value: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
