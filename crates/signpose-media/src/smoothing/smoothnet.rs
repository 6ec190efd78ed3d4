//! SmoothNet: a learned fixed-window trajectory smoother.
//!
//! The network maps a window of W samples of one coordinate track to W
//! refined samples:
//!
//! ```text
//! h   = lrelu(E·x + e)
//! h   = h + lrelu(B2·lrelu(B1·h + b1) + b2)   (per residual block)
//! out = D·h + d
//! ```
//!
//! Every stride-1 window is evaluated and overlapping outputs are averaged.

use std::path::Path;

use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView3};
use serde::{Deserialize, Serialize};

use super::TemporalFilter;
use crate::error::{MediaError, MediaResult};

const LEAKY_RELU_SLOPE: f64 = 0.1;

fn leaky_relu(x: f64) -> f64 {
    if x >= 0.0 {
        x
    } else {
        LEAKY_RELU_SLOPE * x
    }
}

/// Serialized weights of one fully-connected layer (`weight` is out × in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWeights {
    pub weight: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

/// Serialized weights of one residual block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualBlockWeights {
    pub fc1: LinearWeights,
    pub fc2: LinearWeights,
}

/// JSON checkpoint layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothNetCheckpoint {
    pub window_size: usize,
    pub encoder: LinearWeights,
    #[serde(default)]
    pub blocks: Vec<ResidualBlockWeights>,
    pub decoder: LinearWeights,
}

#[derive(Debug, Clone)]
struct Linear {
    weight: Array2<f64>,
    bias: Array1<f64>,
}

impl Linear {
    fn from_weights(
        name: &str,
        w: &LinearWeights,
        inputs: usize,
        outputs: usize,
    ) -> MediaResult<Self> {
        if w.weight.len() != outputs || w.weight.iter().any(|row| row.len() != inputs) {
            return Err(MediaError::invalid_config(format!(
                "smoothnet: {} weight must be {}x{}",
                name, outputs, inputs
            )));
        }
        if w.bias.len() != outputs {
            return Err(MediaError::invalid_config(format!(
                "smoothnet: {} bias must have {} entries, got {}",
                name,
                outputs,
                w.bias.len()
            )));
        }

        let flat: Vec<f64> = w.weight.iter().flatten().copied().collect();
        let weight = Array2::from_shape_vec((outputs, inputs), flat)
            .map_err(|e| MediaError::invalid_config(format!("smoothnet: {}: {}", name, e)))?;

        Ok(Self {
            weight,
            bias: Array1::from(w.bias.clone()),
        })
    }

    fn forward(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.weight.dot(&x) + &self.bias
    }
}

#[derive(Debug, Clone)]
struct ResidualBlock {
    fc1: Linear,
    fc2: Linear,
}

impl ResidualBlock {
    fn forward(&self, h: Array1<f64>) -> Array1<f64> {
        let inner = self.fc1.forward(h.view()).mapv(leaky_relu);
        let update = self.fc2.forward(inner.view()).mapv(leaky_relu);
        h + update
    }
}

/// Loaded SmoothNet network.
#[derive(Debug, Clone)]
pub struct SmoothNetModel {
    window_size: usize,
    encoder: Linear,
    blocks: Vec<ResidualBlock>,
    decoder: Linear,
}

impl SmoothNetModel {
    /// Build a model from checkpoint weights, checking every dimension.
    pub fn from_checkpoint(checkpoint: &SmoothNetCheckpoint) -> MediaResult<Self> {
        let w = checkpoint.window_size;
        if w == 0 {
            return Err(MediaError::invalid_config("smoothnet: window_size must be positive"));
        }
        let hidden = checkpoint.encoder.weight.len();
        if hidden == 0 {
            return Err(MediaError::invalid_config("smoothnet: encoder has no outputs"));
        }

        let encoder = Linear::from_weights("encoder", &checkpoint.encoder, w, hidden)?;
        let blocks = checkpoint
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| -> MediaResult<ResidualBlock> {
                Ok(ResidualBlock {
                    fc1: Linear::from_weights(&format!("block {} fc1", i), &b.fc1, hidden, hidden)?,
                    fc2: Linear::from_weights(&format!("block {} fc2", i), &b.fc2, hidden, hidden)?,
                })
            })
            .collect::<MediaResult<Vec<_>>>()?;
        let decoder = Linear::from_weights("decoder", &checkpoint.decoder, hidden, w)?;

        Ok(Self {
            window_size: w,
            encoder,
            blocks,
            decoder,
        })
    }

    /// Parse a JSON checkpoint.
    pub fn from_json_str(json: &str) -> MediaResult<Self> {
        let checkpoint: SmoothNetCheckpoint = serde_json::from_str(json).map_err(|e| {
            MediaError::invalid_config(format!("smoothnet: invalid checkpoint: {}", e))
        })?;
        Self::from_checkpoint(&checkpoint)
    }

    /// Load a JSON checkpoint file.
    pub fn from_json_file(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            MediaError::invalid_config(format!(
                "smoothnet: cannot read checkpoint {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Refine one window of exactly `window_size` samples.
    pub fn forward(&self, window: ArrayView1<f64>) -> Array1<f64> {
        let mut h = self.encoder.forward(window).mapv(leaky_relu);
        for block in &self.blocks {
            h = block.forward(h);
        }
        self.decoder.forward(h.view())
    }

    /// Smooth a whole track of any length.
    fn smooth_track(&self, track: ArrayView1<f64>) -> Array1<f64> {
        let n = track.len();
        let w = self.window_size;
        if n == 0 {
            return Array1::zeros(0);
        }

        if n < w {
            // Edge-pad at the front, keep the last n outputs.
            let mut padded = Array1::from_elem(w, track[0]);
            padded.slice_mut(s![w - n..]).assign(&track);
            let out = self.forward(padded.view());
            return out.slice(s![w - n..]).to_owned();
        }

        let mut sum = Array1::<f64>::zeros(n);
        let mut count = Array1::<f64>::zeros(n);
        for start in 0..=n - w {
            let out = self.forward(track.slice(s![start..start + w]));
            let mut sum_window = sum.slice_mut(s![start..start + w]);
            sum_window += &out;
            count.slice_mut(s![start..start + w]).mapv_inplace(|c| c + 1.0);
        }
        sum / count
    }
}

/// SmoothNet applied per coordinate track.
#[derive(Debug, Clone)]
pub struct SmoothNetFilter {
    model: SmoothNetModel,
}

impl SmoothNetFilter {
    pub fn new(model: SmoothNetModel) -> Self {
        Self { model }
    }
}

impl TemporalFilter for SmoothNetFilter {
    fn name(&self) -> &'static str {
        "smoothnet"
    }

    fn filter(&mut self, coords: ArrayView3<f64>) -> Array3<f64> {
        let mut out = coords.to_owned();
        let (_, k, d) = coords.dim();
        for j in 0..k {
            for c in 0..d {
                let smoothed = self.model.smooth_track(coords.slice(s![.., j, c]));
                out.slice_mut(s![.., j, c]).assign(&smoothed);
            }
        }
        out
    }
}
