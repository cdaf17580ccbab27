//! Conversions between log-domain predictions and frame durations.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Clamp range for predicted token durations, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationBounds {
    #[serde(default)]
    pub min: f32,
    #[serde(default = "default_max_token_duration")]
    pub max: f32,
}

fn default_max_token_duration() -> f32 {
    75.0
}

impl Default for DurationBounds {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: default_max_token_duration(),
        }
    }
}

impl DurationBounds {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Convert log-domain predictions into frame durations:
    /// `clamp(exp(x) - 1, min, max)`.
    pub fn durations_from_log(&self, log_durations: ArrayView2<'_, f32>) -> Array2<f32> {
        log_durations.mapv(|x| (x.exp() - 1.0).clamp(self.min, self.max))
    }
}

/// Convert integer frame counts to the float representation used for
/// length regulation.
pub fn to_float_durations(durations: ArrayView2<'_, usize>) -> Array2<f32> {
    durations.mapv(|d| d as f32)
}
