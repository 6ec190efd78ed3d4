//! Skeleton video rendering pipeline.
//!
//! This crate provides:
//! - Keypoint clip aggregation with explicit frame ordering
//! - The render pipeline entry point
//! - Run configuration, workspaces and structured logging

pub mod aggregator;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod workspace;

pub use aggregator::{Aggregation, AggregationStats, KeypointAggregator};
pub use config::PipelineConfig;
pub use error::{ErrorKind, PipelineError, PipelineResult};
pub use logging::{RunLogger, Stage, StageTimer};
pub use pipeline::{RenderOutcome, RenderPipeline, SinkOutcome};
pub use workspace::RunWorkspace;
