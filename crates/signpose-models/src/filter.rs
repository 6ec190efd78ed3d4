//! Temporal filter configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ModelError, ModelResult};

/// Default Gaussian window (frames)
pub const DEFAULT_GAUSSIAN_WINDOW: usize = 11;
/// Default Gaussian sigma (frames)
pub const DEFAULT_GAUSSIAN_SIGMA: f64 = 4.0;
/// Default One-Euro minimum cutoff frequency
pub const DEFAULT_ONE_EURO_MIN_CUTOFF: f64 = 0.004;
/// Default One-Euro speed coefficient
pub const DEFAULT_ONE_EURO_BETA: f64 = 0.7;
/// Default One-Euro derivative cutoff frequency
pub const DEFAULT_ONE_EURO_D_CUTOFF: f64 = 1.0;
/// Default Savitzky-Golay window (frames)
pub const DEFAULT_SAVGOL_WINDOW: usize = 11;
/// Default Savitzky-Golay polynomial order
pub const DEFAULT_SAVGOL_POLYORDER: usize = 2;
/// Default SmoothNet window (frames)
pub const DEFAULT_SMOOTHNET_WINDOW: usize = 32;

/// Window used for a plain render request (matches the production pipeline).
pub const DEFAULT_RUN_WINDOW: usize = 3;

/// Filter kind tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    Gaussian,
    OneEuro,
    SavitzkyGolay,
    #[serde(rename = "smoothnet")]
    SmoothNet,
}

impl FilterKind {
    pub const ALL: &'static [FilterKind] = &[
        FilterKind::Gaussian,
        FilterKind::OneEuro,
        FilterKind::SavitzkyGolay,
        FilterKind::SmoothNet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Gaussian => "gaussian",
            FilterKind::OneEuro => "one-euro",
            FilterKind::SavitzkyGolay => "savitzky-golay",
            FilterKind::SmoothNet => "smoothnet",
        }
    }

    /// Configuration of this kind with every parameter at its default.
    pub fn default_config(&self) -> FilterConfig {
        match self {
            FilterKind::Gaussian => FilterConfig::Gaussian {
                window_size: DEFAULT_GAUSSIAN_WINDOW,
                sigma: DEFAULT_GAUSSIAN_SIGMA,
            },
            FilterKind::OneEuro => FilterConfig::OneEuro {
                window_size: 1,
                min_cutoff: DEFAULT_ONE_EURO_MIN_CUTOFF,
                beta: DEFAULT_ONE_EURO_BETA,
                d_cutoff: DEFAULT_ONE_EURO_D_CUTOFF,
            },
            FilterKind::SavitzkyGolay => FilterConfig::SavitzkyGolay {
                window_size: DEFAULT_SAVGOL_WINDOW,
                polyorder: DEFAULT_SAVGOL_POLYORDER,
            },
            FilterKind::SmoothNet => FilterConfig::SmoothNet {
                window_size: DEFAULT_SMOOTHNET_WINDOW,
                checkpoint: None,
            },
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "gaussian" | "gaussianfilter" => Ok(FilterKind::Gaussian),
            "one-euro" | "oneeuro" | "oneeurofilter" => Ok(FilterKind::OneEuro),
            "savitzky-golay" | "savgol" | "savizkygolayfilter" | "savitzkygolayfilter" => {
                Ok(FilterKind::SavitzkyGolay)
            }
            "smoothnet" | "smoothnetfilter" => Ok(FilterKind::SmoothNet),
            _ => Err(ModelError::UnknownFilterKind(s.to_string())),
        }
    }
}

/// Temporal smoothing configuration.
///
/// Serialized with a `kind` tag:
///
/// ```json
/// { "kind": "gaussian", "window_size": 3, "sigma": 4.0 }
/// ```
///
/// An unrecognized `kind` fails deserialization, so no smoothing can start
/// with an unknown filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FilterConfig {
    /// Gaussian-weighted moving average.
    #[serde(alias = "GaussianFilter")]
    Gaussian {
        #[serde(default = "default_gaussian_window")]
        window_size: usize,
        #[serde(default = "default_gaussian_sigma")]
        sigma: f64,
    },

    /// Adaptive low-pass filter driven by velocity.
    #[serde(alias = "OneEuroFilter")]
    OneEuro {
        /// Accepted for shape parity with the windowed filters; unused.
        #[serde(default = "default_one")]
        window_size: usize,
        #[serde(default = "default_min_cutoff")]
        min_cutoff: f64,
        #[serde(default = "default_beta")]
        beta: f64,
        #[serde(default = "default_d_cutoff")]
        d_cutoff: f64,
    },

    /// Local polynomial least-squares fit.
    #[serde(alias = "SavizkyGolayFilter", alias = "SavitzkyGolayFilter")]
    SavitzkyGolay {
        #[serde(default = "default_savgol_window")]
        window_size: usize,
        #[serde(default = "default_savgol_polyorder")]
        polyorder: usize,
    },

    /// Learned fixed-window smoothing network.
    #[serde(rename = "smoothnet", alias = "SmoothNetFilter")]
    SmoothNet {
        #[serde(default = "default_smoothnet_window")]
        window_size: usize,
        /// JSON weights file
        #[serde(default)]
        checkpoint: Option<PathBuf>,
    },
}

fn default_gaussian_window() -> usize {
    DEFAULT_GAUSSIAN_WINDOW
}
fn default_gaussian_sigma() -> f64 {
    DEFAULT_GAUSSIAN_SIGMA
}
fn default_one() -> usize {
    1
}
fn default_min_cutoff() -> f64 {
    DEFAULT_ONE_EURO_MIN_CUTOFF
}
fn default_beta() -> f64 {
    DEFAULT_ONE_EURO_BETA
}
fn default_d_cutoff() -> f64 {
    DEFAULT_ONE_EURO_D_CUTOFF
}
fn default_savgol_window() -> usize {
    DEFAULT_SAVGOL_WINDOW
}
fn default_savgol_polyorder() -> usize {
    DEFAULT_SAVGOL_POLYORDER
}
fn default_smoothnet_window() -> usize {
    DEFAULT_SMOOTHNET_WINDOW
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig::Gaussian {
            window_size: DEFAULT_RUN_WINDOW,
            sigma: DEFAULT_GAUSSIAN_SIGMA,
        }
    }
}

impl FilterConfig {
    /// Gaussian filter with the given window and default sigma.
    pub fn gaussian(window_size: usize) -> Self {
        FilterConfig::Gaussian {
            window_size,
            sigma: DEFAULT_GAUSSIAN_SIGMA,
        }
    }

    /// Default configuration of `kind`, with the window replaced.
    pub fn with_kind_and_window(kind: FilterKind, window_size: usize) -> Self {
        kind.default_config().with_window(window_size)
    }

    /// Returns a new config with updated window size.
    pub fn with_window(mut self, window: usize) -> Self {
        match &mut self {
            FilterConfig::Gaussian { window_size, .. }
            | FilterConfig::OneEuro { window_size, .. }
            | FilterConfig::SavitzkyGolay { window_size, .. }
            | FilterConfig::SmoothNet { window_size, .. } => *window_size = window,
        }
        self
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            FilterConfig::Gaussian { .. } => FilterKind::Gaussian,
            FilterConfig::OneEuro { .. } => FilterKind::OneEuro,
            FilterConfig::SavitzkyGolay { .. } => FilterKind::SavitzkyGolay,
            FilterConfig::SmoothNet { .. } => FilterKind::SmoothNet,
        }
    }

    pub fn window_size(&self) -> usize {
        match self {
            FilterConfig::Gaussian { window_size, .. }
            | FilterConfig::OneEuro { window_size, .. }
            | FilterConfig::SavitzkyGolay { window_size, .. }
            | FilterConfig::SmoothNet { window_size, .. } => *window_size,
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> ModelResult<()> {
        if self.window_size() == 0 {
            return Err(ModelError::invalid_filter(format!(
                "{}: window_size must be positive",
                self.kind()
            )));
        }

        match self {
            FilterConfig::Gaussian { sigma, .. } => {
                if !sigma.is_finite() || *sigma <= 0.0 {
                    return Err(ModelError::invalid_filter(format!(
                        "gaussian: sigma must be positive, got {}",
                        sigma
                    )));
                }
            }
            FilterConfig::OneEuro {
                min_cutoff,
                beta,
                d_cutoff,
                ..
            } => {
                if !min_cutoff.is_finite() || *min_cutoff <= 0.0 {
                    return Err(ModelError::invalid_filter(format!(
                        "one-euro: min_cutoff must be positive, got {}",
                        min_cutoff
                    )));
                }
                if !d_cutoff.is_finite() || *d_cutoff <= 0.0 {
                    return Err(ModelError::invalid_filter(format!(
                        "one-euro: d_cutoff must be positive, got {}",
                        d_cutoff
                    )));
                }
                if !beta.is_finite() || *beta < 0.0 {
                    return Err(ModelError::invalid_filter(format!(
                        "one-euro: beta must be non-negative, got {}",
                        beta
                    )));
                }
            }
            FilterConfig::SavitzkyGolay { .. } => {}
            FilterConfig::SmoothNet { checkpoint, .. } => {
                if checkpoint.is_none() {
                    return Err(ModelError::invalid_filter(
                        "smoothnet: a checkpoint path is required",
                    ));
                }
            }
        }

        Ok(())
    }
}

impl FromStr for FilterConfig {
    type Err = ModelError;

    /// Parse a bare kind name into its default configuration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<FilterKind>()?.default_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let cfg: FilterConfig = serde_json::from_str(r#"{"kind": "gaussian"}"#).unwrap();
        assert_eq!(
            cfg,
            FilterConfig::Gaussian {
                window_size: 11,
                sigma: 4.0
            }
        );

        let cfg: FilterConfig =
            serde_json::from_str(r#"{"kind": "savitzky-golay", "window_size": 7}"#).unwrap();
        assert_eq!(cfg.kind(), FilterKind::SavitzkyGolay);
        assert_eq!(cfg.window_size(), 7);
    }

    #[test]
    fn test_deserialize_legacy_type_names() {
        let cfg: FilterConfig =
            serde_json::from_str(r#"{"kind": "GaussianFilter", "window_size": 3}"#).unwrap();
        assert_eq!(cfg, FilterConfig::gaussian(3));

        let cfg: FilterConfig = serde_json::from_str(r#"{"kind": "OneEuroFilter"}"#).unwrap();
        assert_eq!(cfg.kind(), FilterKind::OneEuro);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let result: Result<FilterConfig, _> =
            serde_json::from_str(r#"{"kind": "kalman", "window_size": 3}"#);
        assert!(result.is_err());

        let parsed = "kalman".parse::<FilterConfig>();
        assert_eq!(
            parsed,
            Err(ModelError::UnknownFilterKind("kalman".to_string()))
        );
    }

    #[test]
    fn test_kind_round_trip_names() {
        for kind in FilterKind::ALL {
            assert_eq!(kind.as_str().parse::<FilterKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_validate() {
        assert!(FilterConfig::gaussian(3).validate().is_ok());
        assert!(FilterConfig::gaussian(0).validate().is_err());
        assert!(FilterConfig::Gaussian {
            window_size: 3,
            sigma: 0.0
        }
        .validate()
        .is_err());
        assert!(FilterKind::SmoothNet.default_config().validate().is_err());
        assert!(FilterKind::OneEuro.default_config().validate().is_ok());
    }

    #[test]
    fn test_default_run_filter() {
        let cfg = FilterConfig::default();
        assert_eq!(cfg.kind(), FilterKind::Gaussian);
        assert_eq!(cfg.window_size(), 3);
    }

    #[test]
    fn test_with_window() {
        let cfg = FilterConfig::with_kind_and_window(FilterKind::OneEuro, 5);
        assert_eq!(cfg.window_size(), 5);
        assert_eq!(cfg.kind(), FilterKind::OneEuro);
    }
}
