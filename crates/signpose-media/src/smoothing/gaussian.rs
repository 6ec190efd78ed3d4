//! Gaussian-weighted moving average.

use ndarray::{Array3, ArrayView3, Axis};

use super::TemporalFilter;

/// Gaussian filter with a symmetric window that shrinks at the sequence ends.
///
/// Formula: P_smooth[t] = Σ(P[t+i] × K[i]) / Σ(K[i]) for |i| ≤ r_t,
/// where K[i] = exp(-i²/(2σ²)) and r_t = min(r, t, T-1-t).
#[derive(Debug, Clone)]
pub struct GaussianFilter {
    radius: usize,
    kernel: Vec<f64>,
}

impl GaussianFilter {
    pub fn new(window_size: usize, sigma: f64) -> Self {
        let radius = window_size.saturating_sub(1) / 2;
        Self {
            radius,
            kernel: compute_gaussian_kernel(radius, sigma),
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }
}

/// Weights for offsets `0..=radius`; `kernel[0]` is the center weight.
fn compute_gaussian_kernel(radius: usize, sigma: f64) -> Vec<f64> {
    let two_sigma_sq = 2.0 * sigma * sigma;
    (0..=radius)
        .map(|i| (-(i as f64 * i as f64) / two_sigma_sq).exp())
        .collect()
}

impl TemporalFilter for GaussianFilter {
    fn name(&self) -> &'static str {
        "gaussian"
    }

    fn filter(&mut self, coords: ArrayView3<f64>) -> Array3<f64> {
        let n = coords.len_of(Axis(0));
        let mut out = coords.to_owned();
        if self.radius == 0 || n < 3 {
            return out;
        }

        for t in 0..n {
            let r = self.radius.min(t).min(n - 1 - t);
            if r == 0 {
                continue;
            }

            let mut acc = coords.index_axis(Axis(0), t).mapv(|v| v * self.kernel[0]);
            let mut sum_weights = self.kernel[0];
            for d in 1..=r {
                let w = self.kernel[d];
                acc.scaled_add(w, &coords.index_axis(Axis(0), t - d));
                acc.scaled_add(w, &coords.index_axis(Axis(0), t + d));
                sum_weights += 2.0 * w;
            }
            out.index_axis_mut(Axis(0), t)
                .assign(&acc.mapv(|v| v / sum_weights));
        }

        out
    }
}
