//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during smoothing, rendering and encoding.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid skeleton schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid keypoints: {0}")]
    InvalidKeypoints(String),

    #[error("Failed to decode keypoint array: {0}")]
    DecodeFailed(String),

    #[error("Encoding failed: {0}")]
    EncodeFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema(message.into())
    }

    pub fn invalid_keypoints(message: impl Into<String>) -> Self {
        Self::InvalidKeypoints(message.into())
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self::DecodeFailed(message.into())
    }

    pub fn encode_failed(message: impl Into<String>) -> Self {
        Self::EncodeFailed(message.into())
    }

    /// Whether the error was caused by caller-supplied configuration
    /// rather than by source data or the encoder.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidConfig(_) | MediaError::InvalidSchema(_)
        )
    }

    /// Whether the error came from decoding or validating source keypoints.
    pub fn is_source_data(&self) -> bool {
        matches!(
            self,
            MediaError::DecodeFailed(_) | MediaError::InvalidKeypoints(_)
        )
    }
}

impl From<signpose_models::ModelError> for MediaError {
    fn from(e: signpose_models::ModelError) -> Self {
        MediaError::InvalidConfig(e.to_string())
    }
}
