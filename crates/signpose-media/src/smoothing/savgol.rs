//! Savitzky-Golay filter: local least-squares polynomial fit.

use ndarray::{s, Array3, ArrayView3, Axis};

use super::linalg::solve_linear_system;
use super::TemporalFilter;

/// Savitzky-Golay filter.
///
/// The effective window is the largest odd length that fits both the
/// configured window and the sequence. Frames within half a window of either
/// end are evaluated on the first/last full window at their own position.
#[derive(Debug, Clone)]
pub struct SavitzkyGolayFilter {
    window_size: usize,
    polyorder: usize,
}

impl SavitzkyGolayFilter {
    pub fn new(window_size: usize, polyorder: usize) -> Self {
        Self {
            window_size,
            polyorder,
        }
    }

    /// Window actually used for a sequence of `len` frames.
    pub fn effective_window(&self, len: usize) -> usize {
        let w = self.window_size.min(len);
        if w == 0 {
            0
        } else if w % 2 == 0 {
            w - 1
        } else {
            w
        }
    }
}

/// Weights that evaluate the least-squares fit of degree `polyorder`
/// over `window` samples at sample `pos`.
///
/// Solves (AᵀA) z = v(pos) with A[j][i] = (j - half)^i and returns A z.
fn savgol_weights(window: usize, polyorder: usize, pos: usize) -> Vec<f64> {
    let half = (window / 2) as f64;
    let degree = polyorder.min(window - 1);

    let powers = |x: f64| -> Vec<f64> {
        let mut row = Vec::with_capacity(degree + 1);
        let mut p = 1.0;
        for _ in 0..=degree {
            row.push(p);
            p *= x;
        }
        row
    };

    let a: Vec<Vec<f64>> = (0..window).map(|j| powers(j as f64 - half)).collect();

    let mut ata = vec![vec![0.0; degree + 1]; degree + 1];
    for (i, ata_row) in ata.iter_mut().enumerate() {
        for (k, cell) in ata_row.iter_mut().enumerate() {
            *cell = a.iter().map(|row| row[i] * row[k]).sum();
        }
    }

    let v = powers(pos as f64 - half);
    match solve_linear_system(&ata, &v) {
        Some(z) => a
            .iter()
            .map(|row| row.iter().zip(z.iter()).map(|(x, y)| x * y).sum::<f64>())
            .collect(),
        None => vec![1.0 / window as f64; window],
    }
}

fn dot(weights: &[f64], values: &[f64]) -> f64 {
    weights.iter().zip(values.iter()).map(|(w, v)| w * v).sum()
}

impl TemporalFilter for SavitzkyGolayFilter {
    fn name(&self) -> &'static str {
        "savitzky-golay"
    }

    fn filter(&mut self, coords: ArrayView3<f64>) -> Array3<f64> {
        let n = coords.len_of(Axis(0));
        let window = self.effective_window(n);
        let mut out = coords.to_owned();
        if window <= 1 {
            return out;
        }

        let half = window / 2;
        let weights: Vec<Vec<f64>> = (0..window)
            .map(|pos| savgol_weights(window, self.polyorder, pos))
            .collect();

        let (_, k, d) = coords.dim();
        for j in 0..k {
            for c in 0..d {
                let track: Vec<f64> = coords.slice(s![.., j, c]).to_vec();
                for t in 0..n {
                    let (start, pos) = if t < half {
                        (0, t)
                    } else if t + half >= n {
                        (n - window, t - (n - window))
                    } else {
                        (t - half, half)
                    };
                    out[[t, j, c]] = dot(&weights[pos], &track[start..start + window]);
                }
            }
        }

        out
    }
}
