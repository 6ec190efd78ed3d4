//! Detection-to-display keypoint convention remapping.
//!
//! The detection convention is COCO-WholeBody (133 points). The display
//! convention inserts a synthetic neck at index 17 and reorders the body
//! joints into OpenPose order.

use signpose_models::{Keypoint, PoseInstance};

use crate::error::{MediaError, MediaResult};

/// Left shoulder in the detection convention.
pub const LEFT_SHOULDER: usize = 5;
/// Right shoulder in the detection convention.
pub const RIGHT_SHOULDER: usize = 6;
/// Index at which the synthetic neck is inserted.
pub const NECK_INDEX: usize = 17;

/// Source indices (in the neck-expanded array) gathered by the permutation.
pub const REMAP_SOURCE: [usize; 15] = [17, 6, 8, 10, 7, 9, 12, 14, 16, 13, 15, 2, 1, 4, 3];
/// Destination indices written by the permutation.
pub const REMAP_DEST: [usize; 15] = [1, 2, 3, 4, 6, 7, 8, 9, 10, 12, 13, 14, 15, 16, 17];

/// Default neck visibility threshold.
pub const DEFAULT_REMAP_THRESHOLD: f32 = 0.3;

/// Converts detection-convention keypoints into the display convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonRemapper {
    threshold: f32,
}

impl Default for SkeletonRemapper {
    fn default() -> Self {
        Self::new(DEFAULT_REMAP_THRESHOLD)
    }
}

impl SkeletonRemapper {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Remap one keypoint array (K₀ points) into K₀ + 1 display points.
    pub fn remap(&self, keypoints: &[Keypoint]) -> MediaResult<Vec<Keypoint>> {
        if keypoints.len() < NECK_INDEX {
            return Err(MediaError::invalid_config(format!(
                "remapping needs at least {} keypoints, got {}",
                NECK_INDEX,
                keypoints.len()
            )));
        }

        let left = &keypoints[LEFT_SHOULDER];
        let right = &keypoints[RIGHT_SHOULDER];
        let mut neck = Keypoint::midpoint(left, right);
        neck.confidence = if left.confidence > self.threshold && right.confidence > self.threshold {
            1.0
        } else {
            0.0
        };

        let mut expanded = Vec::with_capacity(keypoints.len() + 1);
        expanded.extend_from_slice(&keypoints[..NECK_INDEX]);
        expanded.push(neck);
        expanded.extend_from_slice(&keypoints[NECK_INDEX..]);

        // Gathers read the expanded array as it was before any write.
        let mut display = expanded.clone();
        for (dst, src) in REMAP_DEST.iter().zip(REMAP_SOURCE.iter()) {
            display[*dst] = expanded[*src];
        }

        Ok(display)
    }

    /// Remap a pose instance, keeping its sequence id.
    pub fn remap_instance(&self, pose: &PoseInstance) -> MediaResult<PoseInstance> {
        Ok(PoseInstance::new(pose.sequence_id, self.remap(&pose.keypoints)?))
    }
}
