//! Pipeline configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use signpose_media::{RenderConfig, DEFAULT_REMAP_THRESHOLD};
use signpose_models::FramePolicy;

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Work directory for per-run scratch space
    pub work_dir: PathBuf,
    /// What to do with a frame that cannot be read
    pub frame_policy: FramePolicy,
    /// Maximum clips fetched concurrently
    pub max_parallel_reads: usize,
    /// Drawing parameters
    pub render: RenderConfig,
    /// Shoulder confidence needed to synthesize the neck
    pub remap_threshold: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/signpose"),
            frame_policy: FramePolicy::Abort,
            max_parallel_reads: 4,
            render: RenderConfig::default(),
            remap_threshold: DEFAULT_REMAP_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    ///
    /// Only binaries call this; library code takes explicit values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let kpt_threshold = std::env::var("SIGNPOSE_KPT_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.render.kpt_threshold);

        Self {
            work_dir: std::env::var("SIGNPOSE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            frame_policy: std::env::var("SIGNPOSE_FRAME_POLICY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_policy),
            max_parallel_reads: std::env::var("SIGNPOSE_MAX_PARALLEL_READS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_parallel_reads),
            render: RenderConfig {
                kpt_threshold,
                ..defaults.render
            },
            remap_threshold: defaults.remap_threshold,
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_frame_policy(mut self, policy: FramePolicy) -> Self {
        self.frame_policy = policy;
        self
    }
}
