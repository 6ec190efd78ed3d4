//! Pipeline error types.

use signpose_media::MediaError;
use signpose_models::ModelError;
use signpose_storage::StorageError;
use std::fmt;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Coarse failure class reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad filter, schema, output or render parameters
    Configuration,
    /// A keypoint object is missing, unreadable or inconsistent
    SourceData,
    /// The video could not be produced
    Encoding,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::SourceData => "source_data",
            ErrorKind::Encoding => "encoding",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Bad source data at {key}: {message}")]
    SourceData { key: String, message: String },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn source_data(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::SourceData {
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Configuration(_) => ErrorKind::Configuration,
            PipelineError::SourceData { .. } => ErrorKind::SourceData,
            PipelineError::Encoding(_) | PipelineError::Io(_) => ErrorKind::Encoding,
            PipelineError::Storage(StorageError::ConfigError(_)) => ErrorKind::Configuration,
            PipelineError::Storage(_) => ErrorKind::SourceData,
            PipelineError::Media(e) if e.is_configuration() => ErrorKind::Configuration,
            PipelineError::Media(e) if e.is_source_data() => ErrorKind::SourceData,
            PipelineError::Media(_) => ErrorKind::Encoding,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_source_data(&self) -> bool {
        self.kind() == ErrorKind::SourceData
    }

    /// Key of the offending object, for source data errors.
    pub fn source_key(&self) -> Option<&str> {
        match self {
            PipelineError::SourceData { key, .. } => Some(key),
            _ => None,
        }
    }
}

impl From<ModelError> for PipelineError {
    fn from(e: ModelError) -> Self {
        PipelineError::Configuration(e.to_string())
    }
}
