//! Shared data models for the SignPose skeleton renderer.
//!
//! This crate provides Serde-serializable types for:
//! - Pose instances and keypoints
//! - Keyed clip locations
//! - Temporal filter configuration
//! - Output container/codec selection
//! - Render requests and run identifiers

pub mod clip;
pub mod error;
pub mod filter;
pub mod output;
pub mod pose;
pub mod request;
pub mod run;

// Re-export common types
pub use clip::ClipLocation;
pub use error::{ModelError, ModelResult};
pub use filter::{FilterConfig, FilterKind};
pub use output::{Container, OutputSpec};
pub use pose::{Keypoint, PoseInstance};
pub use request::{FramePolicy, RenderRequest};
pub use run::RunId;
