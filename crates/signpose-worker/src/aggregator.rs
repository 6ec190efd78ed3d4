//! Concatenating keyed clips into one ordered pose sequence.
//!
//! Each clip is a folder of `<frame-index>.npy` objects. Frames are ordered by
//! their parsed index, never by listing order, and sequence ids are assigned
//! only after every clip has been read, in caller order.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use signpose_media::decode_keypoints;
use signpose_models::{ClipLocation, FramePolicy, Keypoint, PoseInstance};
use signpose_storage::{FrameKey, KeypointStore};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, PipelineResult};

/// Counts reported alongside an aggregated sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Clips requested
    pub clips: usize,
    /// Frames kept
    pub frames: usize,
    /// Frames dropped under [`FramePolicy::Skip`]
    pub skipped: usize,
}

/// An ordered pose sequence with contiguous ids `1..=frames`.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub poses: Vec<PoseInstance>,
    pub stats: AggregationStats,
}

impl Aggregation {
    /// Keypoints per pose, or `None` for an empty sequence.
    pub fn num_keypoints(&self) -> Option<usize> {
        self.poses.first().map(|p| p.num_keypoints())
    }
}

/// One decoded frame before ids are assigned.
#[derive(Debug)]
struct LoadedFrame {
    key: String,
    keypoints: Vec<Keypoint>,
}

#[derive(Debug)]
struct LoadedClip {
    clip: ClipLocation,
    frames: Vec<LoadedFrame>,
    skipped: usize,
}

/// Reads clips from a [`KeypointStore`].
#[derive(Clone)]
pub struct KeypointAggregator {
    store: Arc<dyn KeypointStore>,
    policy: FramePolicy,
    max_parallel_reads: usize,
}

impl KeypointAggregator {
    pub fn new(store: Arc<dyn KeypointStore>, policy: FramePolicy) -> Self {
        Self {
            store,
            policy,
            max_parallel_reads: 4,
        }
    }

    /// Limit the number of clips read at once (at least one).
    pub fn with_max_parallel_reads(mut self, n: usize) -> Self {
        self.max_parallel_reads = n.max(1);
        self
    }

    pub fn policy(&self) -> FramePolicy {
        self.policy
    }

    /// Read every clip and concatenate them in the given order.
    pub async fn aggregate(&self, clips: &[ClipLocation]) -> PipelineResult<Aggregation> {
        let loaded: Vec<LoadedClip> = stream::iter(clips.iter().cloned())
            .map(|clip| self.load_clip(clip))
            .buffered(self.max_parallel_reads)
            .try_collect()
            .await?;

        let mut stats = AggregationStats {
            clips: clips.len(),
            ..AggregationStats::default()
        };
        let mut expected_keypoints: Option<usize> = None;
        let mut poses = Vec::new();

        for clip in loaded {
            stats.skipped += clip.skipped;
            if clip.frames.is_empty() {
                warn!(clip = %clip.clip, "Clip has no frames");
                continue;
            }

            for frame in clip.frames {
                let k = frame.keypoints.len();
                match expected_keypoints {
                    None => expected_keypoints = Some(k),
                    Some(expected) if expected != k => {
                        return Err(PipelineError::source_data(
                            frame.key,
                            format!("frame has {} keypoints, expected {}", k, expected),
                        ));
                    }
                    Some(_) => {}
                }
                let sequence_id = poses.len() as u64 + 1;
                poses.push(PoseInstance::new(sequence_id, frame.keypoints));
            }
        }

        stats.frames = poses.len();
        info!(
            clips = stats.clips,
            frames = stats.frames,
            skipped = stats.skipped,
            "Aggregated keypoint clips"
        );

        Ok(Aggregation { poses, stats })
    }

    /// List, order and decode one clip.
    async fn load_clip(&self, clip: ClipLocation) -> PipelineResult<LoadedClip> {
        let listed = self.store.list_clip(&clip).await?;
        debug!(
            clip = %clip,
            backend = self.store.backend_name(),
            objects = listed.len(),
            "Listed clip"
        );

        let mut skipped = 0usize;
        let mut indexed: Vec<(u64, String)> = Vec::with_capacity(listed.len());
        for entry in listed {
            match entry {
                FrameKey::Frame { key, index } => indexed.push((index, key)),
                FrameKey::Malformed { key } => {
                    self.reject(&key, "frame name is not a numeric index")?;
                    skipped += 1;
                }
            }
        }

        indexed.sort();
        warn_on_gaps(&clip, &indexed);

        let mut frames = Vec::with_capacity(indexed.len());
        for (_, key) in indexed {
            match self.load_frame(&key).await {
                Ok(keypoints) => frames.push(LoadedFrame { key, keypoints }),
                Err(message) => {
                    self.reject(&key, &message)?;
                    skipped += 1;
                }
            }
        }

        Ok(LoadedClip {
            clip,
            frames,
            skipped,
        })
    }

    async fn load_frame(&self, key: &str) -> Result<Vec<Keypoint>, String> {
        let bytes = self.store.get(key).await.map_err(|e| e.to_string())?;
        decode_keypoints(&bytes).map_err(|e| e.to_string())
    }

    /// Apply the frame policy to an unreadable frame.
    fn reject(&self, key: &str, message: &str) -> PipelineResult<()> {
        match self.policy {
            FramePolicy::Abort => Err(PipelineError::source_data(key, message)),
            FramePolicy::Skip => {
                warn!(key = %key, "Skipping frame: {}", message);
                Ok(())
            }
        }
    }
}

/// Warn when a clip's sorted indices are not exactly `1..=n`.
fn warn_on_gaps(clip: &ClipLocation, indexed: &[(u64, String)]) {
    let contiguous = indexed
        .iter()
        .enumerate()
        .all(|(pos, (index, _))| *index == pos as u64 + 1);
    if !contiguous {
        let first = indexed.first().map(|(i, _)| *i);
        let last = indexed.last().map(|(i, _)| *i);
        warn!(
            clip = %clip,
            frames = indexed.len(),
            first = ?first,
            last = ?last,
            "Frame indices are not contiguous from 1; ordering by index"
        );
    }
}
