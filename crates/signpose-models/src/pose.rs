//! Pose instances and keypoints.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single 2D keypoint with detection confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Detection confidence; 1.0 when the source carried no confidence channel
    pub confidence: f32,
}

impl Keypoint {
    pub const fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Keypoint from a two-channel source (no confidence).
    pub const fn from_xy(x: f32, y: f32) -> Self {
        Self::new(x, y, 1.0)
    }

    /// Midpoint of two keypoints; confidence is left at zero for the caller to set.
    pub fn midpoint(a: &Keypoint, b: &Keypoint) -> Self {
        Self::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0, 0.0)
    }

    /// Whether the keypoint reaches the given visibility threshold.
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// One person's pose in one frame, tagged with its playback position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PoseInstance {
    /// Contiguous playback index, starting at 1 within a run
    pub sequence_id: u64,
    /// Keypoints in the convention of the producing stage
    pub keypoints: Vec<Keypoint>,
}

impl PoseInstance {
    pub fn new(sequence_id: u64, keypoints: Vec<Keypoint>) -> Self {
        Self {
            sequence_id,
            keypoints,
        }
    }

    /// Number of keypoints (K).
    pub fn num_keypoints(&self) -> usize {
        self.keypoints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midpoint() {
        let a = Keypoint::new(10.0, 10.0, 0.9);
        let b = Keypoint::new(20.0, 30.0, 0.9);
        let mid = Keypoint::midpoint(&a, &b);
        assert_eq!(mid.x, 15.0);
        assert_eq!(mid.y, 20.0);
        assert_eq!(mid.confidence, 0.0);
    }

    #[test]
    fn test_visibility_threshold_is_inclusive() {
        let kp = Keypoint::new(0.0, 0.0, 0.3);
        assert!(kp.is_visible(0.3));
        assert!(!kp.is_visible(0.31));
    }

    #[test]
    fn test_pose_serialization() {
        let pose = PoseInstance::new(7, vec![Keypoint::from_xy(1.0, 2.0)]);
        let json = serde_json::to_string(&pose).unwrap();
        assert!(json.contains("\"sequence_id\":7"));
        let parsed: PoseInstance = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pose);
    }
}
