//! Model validation errors.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while parsing or validating model values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown filter kind: {0}")]
    UnknownFilterKind(String),

    #[error("Invalid filter configuration: {0}")]
    InvalidFilter(String),

    #[error("Unsupported container: {0}")]
    UnsupportedContainer(String),

    #[error("Invalid output specification: {0}")]
    InvalidOutput(String),

    #[error("Unknown frame policy: {0}")]
    UnknownFramePolicy(String),
}

impl ModelError {
    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }

    pub fn invalid_output(msg: impl Into<String>) -> Self {
        Self::InvalidOutput(msg.into())
    }
}
