//! Temporal smoothing of keypoint trajectories.
//!
//! Filters operate on a closed sequence laid out as `[T, K, 2]` (frames,
//! keypoints, x/y). Output always has the input's shape; sequence ids,
//! ordering and confidences pass through unchanged.

mod gaussian;
mod linalg;
mod one_euro;
mod savgol;
mod smoothnet;

use ndarray::{Array3, ArrayView3};
use signpose_models::{FilterConfig, Keypoint, PoseInstance};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

pub use gaussian::GaussianFilter;
pub use one_euro::OneEuroFilter;
pub use savgol::SavitzkyGolayFilter;
pub use smoothnet::{
    LinearWeights, ResidualBlockWeights, SmoothNetCheckpoint, SmoothNetFilter, SmoothNetModel,
};

/// A smoothing strategy over a complete `[T, K, 2]` trajectory.
pub trait TemporalFilter: Send {
    /// Filter name for logs.
    fn name(&self) -> &'static str;

    /// Smooth the trajectory; the result has the same shape as `coords`.
    fn filter(&mut self, coords: ArrayView3<f64>) -> Array3<f64>;
}

/// Build the filter for a configuration, validating it first.
pub fn build_filter(config: &FilterConfig) -> MediaResult<Box<dyn TemporalFilter>> {
    config.validate()?;

    let filter: Box<dyn TemporalFilter> = match config {
        FilterConfig::Gaussian { window_size, sigma } => {
            Box::new(GaussianFilter::new(*window_size, *sigma))
        }
        FilterConfig::OneEuro {
            min_cutoff,
            beta,
            d_cutoff,
            ..
        } => Box::new(OneEuroFilter::new(*min_cutoff, *beta, *d_cutoff)),
        FilterConfig::SavitzkyGolay {
            window_size,
            polyorder,
        } => Box::new(SavitzkyGolayFilter::new(*window_size, *polyorder)),
        FilterConfig::SmoothNet {
            window_size,
            checkpoint,
        } => {
            let path = checkpoint.as_ref().ok_or_else(|| {
                MediaError::invalid_config("smoothnet: a checkpoint path is required")
            })?;
            let model = SmoothNetModel::from_json_file(path)?;
            if model.window_size() != *window_size {
                return Err(MediaError::invalid_config(format!(
                    "smoothnet: checkpoint window {} does not match configured window {}",
                    model.window_size(),
                    window_size
                )));
            }
            Box::new(SmoothNetFilter::new(model))
        }
    };

    debug!("Built {} filter", filter.name());
    Ok(filter)
}

/// Applies one temporal filter to a pose sequence.
pub struct TemporalSmoother {
    filter: Box<dyn TemporalFilter>,
}

impl TemporalSmoother {
    /// Create a smoother for a configuration.
    pub fn new(config: &FilterConfig) -> MediaResult<Self> {
        Ok(Self {
            filter: build_filter(config)?,
        })
    }

    /// Create a smoother around an already-built filter.
    pub fn with_filter(filter: Box<dyn TemporalFilter>) -> Self {
        Self { filter }
    }

    pub fn filter_name(&self) -> &'static str {
        self.filter.name()
    }

    /// Smooth a closed sequence.
    pub fn smooth(&mut self, poses: Vec<PoseInstance>) -> MediaResult<Vec<PoseInstance>> {
        if poses.is_empty() {
            return Ok(poses);
        }

        let coords = poses_to_array(&poses)?;
        let smoothed = self.filter.filter(coords.view());
        if smoothed.shape() != coords.shape() {
            return Err(MediaError::invalid_keypoints(format!(
                "{} filter changed shape {:?} to {:?}",
                self.filter.name(),
                coords.shape(),
                smoothed.shape()
            )));
        }

        info!(
            "Smoothed {} frames x {} keypoints with {} filter",
            poses.len(),
            coords.shape()[1],
            self.filter.name()
        );

        Ok(apply_coordinates(poses, &smoothed))
    }
}

/// Smooth a closed sequence with the filter named by `config`.
pub fn smooth(poses: Vec<PoseInstance>, config: &FilterConfig) -> MediaResult<Vec<PoseInstance>> {
    TemporalSmoother::new(config)?.smooth(poses)
}

/// Lay out pose coordinates as `[T, K, 2]`.
pub fn poses_to_array(poses: &[PoseInstance]) -> MediaResult<Array3<f64>> {
    let k = poses.first().map(|p| p.num_keypoints()).unwrap_or(0);
    if let Some(bad) = poses.iter().find(|p| p.num_keypoints() != k) {
        return Err(MediaError::invalid_keypoints(format!(
            "frame {} has {} keypoints, expected {}",
            bad.sequence_id,
            bad.num_keypoints(),
            k
        )));
    }

    let mut coords = Array3::<f64>::zeros((poses.len(), k, 2));
    for (t, pose) in poses.iter().enumerate() {
        for (j, kp) in pose.keypoints.iter().enumerate() {
            coords[[t, j, 0]] = kp.x as f64;
            coords[[t, j, 1]] = kp.y as f64;
        }
    }
    Ok(coords)
}

/// Write smoothed x/y back, keeping ids and confidences.
fn apply_coordinates(poses: Vec<PoseInstance>, coords: &Array3<f64>) -> Vec<PoseInstance> {
    poses
        .into_iter()
        .enumerate()
        .map(|(t, pose)| {
            let keypoints = pose
                .keypoints
                .iter()
                .enumerate()
                .map(|(j, kp)| {
                    Keypoint::new(
                        coords[[t, j, 0]] as f32,
                        coords[[t, j, 1]] as f32,
                        kp.confidence,
                    )
                })
                .collect();
            PoseInstance::new(pose.sequence_id, keypoints)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use signpose_models::FilterKind;

    fn jittery_poses(t: usize, k: usize) -> Vec<PoseInstance> {
        (0..t)
            .map(|i| {
                let jitter = if i % 2 == 0 { 1.0 } else { -1.0 };
                let kps = (0..k)
                    .map(|j| {
                        Keypoint::new(i as f32 + jitter, j as f32 * 10.0, 0.5 + j as f32 * 0.1)
                    })
                    .collect();
                PoseInstance::new(i as u64 + 1, kps)
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let out = smooth(Vec::new(), &FilterConfig::default()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_confidence_and_ids_pass_through() {
        let poses = jittery_poses(12, 3);
        let out = smooth(poses.clone(), &FilterConfig::gaussian(5)).unwrap();
        assert_eq!(out.len(), poses.len());
        for (a, b) in poses.iter().zip(out.iter()) {
            assert_eq!(a.sequence_id, b.sequence_id);
            for (ka, kb) in a.keypoints.iter().zip(b.keypoints.iter()) {
                assert_eq!(ka.confidence, kb.confidence);
            }
        }
    }

    #[test]
    fn test_mismatched_keypoint_counts_rejected() {
        let mut poses = jittery_poses(4, 3);
        poses[2].keypoints.pop();
        let err = smooth(poses, &FilterConfig::gaussian(3)).unwrap_err();
        assert!(err.is_source_data());
    }

    #[test]
    fn test_invalid_config_rejected_before_filtering() {
        let err = build_filter(&FilterConfig::gaussian(0)).err().unwrap();
        assert!(err.is_configuration());

        let err = build_filter(&FilterKind::SmoothNet.default_config()).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_checkpoint_file_is_configuration_error() {
        let config = FilterConfig::SmoothNet {
            window_size: 8,
            checkpoint: Some("/nonexistent/smoothnet.json".into()),
        };
        assert!(build_filter(&config).err().unwrap().is_configuration());
    }

    #[test]
    fn test_poses_to_array_layout() {
        let poses = jittery_poses(2, 2);
        let arr = poses_to_array(&poses).unwrap();
        assert_eq!(arr.shape(), &[2, 2, 2]);
        assert_eq!(arr[[1, 1, 1]], 10.0);
        assert_eq!(arr[[1, 0, 0]], 0.0);
    }
}
