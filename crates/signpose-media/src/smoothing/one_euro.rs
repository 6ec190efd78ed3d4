//! One-Euro filter: a low-pass filter whose cutoff rises with speed.

use ndarray::{s, Array3, ArrayView3};

use super::TemporalFilter;

/// Frame period; the sequence is filtered in frame units.
const FRAME_PERIOD: f64 = 1.0;

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f64, cutoff: f64) -> f64 {
    let r = 2.0 * std::f64::consts::PI * cutoff * te;
    r / (r + 1.0)
}

/// One-Euro state for a single scalar track.
struct ScalarFilter {
    min_cutoff: f64,
    beta: f64,
    d_cutoff: f64,
    x_prev: Option<f64>,
    dx_prev: f64,
}

impl ScalarFilter {
    fn new(min_cutoff: f64, beta: f64, d_cutoff: f64) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff,
            x_prev: None,
            dx_prev: 0.0,
        }
    }

    fn filter(&mut self, value: f64) -> f64 {
        let prev = match self.x_prev {
            Some(prev) => prev,
            None => {
                self.x_prev = Some(value);
                return value;
            }
        };

        let a_d = smoothing_factor(FRAME_PERIOD, self.d_cutoff);
        let dx = (value - prev) / FRAME_PERIOD;
        let dx_hat = a_d * dx + (1.0 - a_d) * self.dx_prev;

        let cutoff = self.min_cutoff + self.beta * dx_hat.abs();
        let a = smoothing_factor(FRAME_PERIOD, cutoff);
        let x_hat = a * value + (1.0 - a) * prev;

        self.x_prev = Some(x_hat);
        self.dx_prev = dx_hat;
        x_hat
    }
}

/// One-Euro filter applied independently to every coordinate track.
#[derive(Debug, Clone)]
pub struct OneEuroFilter {
    min_cutoff: f64,
    beta: f64,
    d_cutoff: f64,
}

impl OneEuroFilter {
    pub fn new(min_cutoff: f64, beta: f64, d_cutoff: f64) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff,
        }
    }
}

impl TemporalFilter for OneEuroFilter {
    fn name(&self) -> &'static str {
        "one-euro"
    }

    fn filter(&mut self, coords: ArrayView3<f64>) -> Array3<f64> {
        let mut out = coords.to_owned();
        let (_, k, d) = coords.dim();

        for j in 0..k {
            for c in 0..d {
                let mut track = ScalarFilter::new(self.min_cutoff, self.beta, self.d_cutoff);
                for (t, value) in coords.slice(s![.., j, c]).iter().enumerate() {
                    out[[t, j, c]] = track.filter(*value);
                }
            }
        }

        out
    }
}
