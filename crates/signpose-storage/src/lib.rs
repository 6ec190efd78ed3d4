//! Keyed object storage for per-frame keypoint clips.
//!
//! This crate provides:
//! - The read-only `KeypointStore` abstraction
//! - An S3-compatible client
//! - A local filesystem store
//! - Frame key parsing for clip prefixes

pub mod client;
pub mod error;
pub mod keys;
pub mod local;
pub mod store;

pub use client::{S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use keys::{classify_key, frame_keys, parse_frame_index, FrameKey};
pub use local::LocalStore;
pub use store::KeypointStore;
