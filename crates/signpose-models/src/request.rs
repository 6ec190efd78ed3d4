//! Render requests.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clip::ClipLocation;
use crate::error::ModelError;
use crate::filter::FilterConfig;
use crate::output::OutputSpec;

/// What to do with a frame object that cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum FramePolicy {
    /// Fail the run, naming the offending object
    #[default]
    Abort,
    /// Log and drop the frame; remaining frames keep contiguous ids
    Skip,
}

impl FramePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FramePolicy::Abort => "abort",
            FramePolicy::Skip => "skip",
        }
    }
}

impl fmt::Display for FramePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FramePolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(FramePolicy::Abort),
            "skip" => Ok(FramePolicy::Skip),
            _ => Err(ModelError::UnknownFramePolicy(s.to_string())),
        }
    }
}

/// One render run: ordered clips, the filter to apply, and the output video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RenderRequest {
    /// Clip locations in playback order
    pub clips: Vec<ClipLocation>,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub output: OutputSpec,
}

impl RenderRequest {
    pub fn new(clips: Vec<ClipLocation>) -> Self {
        Self {
            clips,
            filter: FilterConfig::default(),
            output: OutputSpec::default(),
        }
    }
}
