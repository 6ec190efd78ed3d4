//! Decoding per-frame `.npy` keypoint arrays.

use ndarray::{ArrayD, Axis, Ix3};
use ndarray_npy::ReadNpyExt;
use signpose_models::Keypoint;

use crate::error::{MediaError, MediaResult};

/// Read an `.npy` payload as f64, accepting f32 or f64 element types.
fn read_npy_f64(bytes: &[u8]) -> MediaResult<ArrayD<f64>> {
    match ArrayD::<f32>::read_npy(bytes) {
        Ok(arr) => Ok(arr.mapv(f64::from)),
        Err(f32_err) => ArrayD::<f64>::read_npy(bytes).map_err(|f64_err| {
            MediaError::decode_failed(format!(
                "not a float32/float64 npy array ({}; {})",
                f32_err, f64_err
            ))
        }),
    }
}

/// Decode one frame object into the keypoints of its first instance.
///
/// The array is `[instances, K, D]` with D ∈ {2, 3}; a `[K, D]` array is
/// taken as a single instance. D = 2 carries no confidence, so every
/// keypoint gets confidence 1.0.
pub fn decode_keypoints(bytes: &[u8]) -> MediaResult<Vec<Keypoint>> {
    let arr = read_npy_f64(bytes)?;
    let shape = arr.shape().to_vec();

    let arr = match arr.ndim() {
        2 => arr.insert_axis(Axis(0)),
        3 => arr,
        n => {
            return Err(MediaError::decode_failed(format!(
                "expected a 2-D or 3-D keypoint array, got {}-D shape {:?}",
                n, shape
            )))
        }
    };
    let arr = arr
        .into_dimensionality::<Ix3>()
        .map_err(|e| MediaError::decode_failed(format!("shape {:?}: {}", shape, e)))?;

    let (instances, k, d) = arr.dim();
    if instances == 0 {
        return Err(MediaError::invalid_keypoints("frame has no pose instances"));
    }
    if k == 0 {
        return Err(MediaError::invalid_keypoints("frame has no keypoints"));
    }
    if d != 2 && d != 3 {
        return Err(MediaError::invalid_keypoints(format!(
            "expected 2 or 3 values per keypoint, got {}",
            d
        )));
    }

    let first = arr.index_axis(Axis(0), 0);
    let keypoints: Vec<Keypoint> = first
        .outer_iter()
        .map(|row| {
            let (x, y) = (row[0] as f32, row[1] as f32);
            if d == 3 {
                Keypoint::new(x, y, row[2] as f32)
            } else {
                Keypoint::from_xy(x, y)
            }
        })
        .collect();

    if let Some(i) = keypoints
        .iter()
        .position(|kp| !(kp.x.is_finite() && kp.y.is_finite() && kp.confidence.is_finite()))
    {
        return Err(MediaError::invalid_keypoints(format!(
            "keypoint {} has non-finite values",
            i
        )));
    }

    Ok(keypoints)
}
