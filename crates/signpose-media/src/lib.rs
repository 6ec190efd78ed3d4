//! Skeleton smoothing, rendering and video encoding.
//!
//! This crate provides:
//! - Skeleton schemas and the detection → display convention remap
//! - Temporal smoothing filters over closed keypoint sequences
//! - `.npy` keypoint frame decoding
//! - Per-frame skeleton rasterization
//! - Streaming FFmpeg encoding, probing and retiming

pub mod canvas;
pub mod command;
pub mod decode;
pub mod encoder;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod remap;
pub mod renderer;
pub mod retime;
pub mod schema;
pub mod smoothing;

pub use canvas::Canvas;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use decode::decode_keypoints;
pub use encoder::{encode_frames, FfmpegSink, FrameSink, MemorySink, VideoEncoder};
pub use error::{MediaError, MediaResult};
pub use fs_utils::{move_file, publish_via_scratch};
pub use probe::{get_duration, probe_video, VideoInfo};
pub use remap::{SkeletonRemapper, DEFAULT_REMAP_THRESHOLD};
pub use renderer::{RenderConfig, RenderedFrame, SkeletonRenderer};
pub use retime::retime_video;
pub use schema::{Rgb, SkeletonSchema, WHOLEBODY_OPENPOSE_KEYPOINTS};
pub use smoothing::{build_filter, smooth, TemporalFilter, TemporalSmoother};
