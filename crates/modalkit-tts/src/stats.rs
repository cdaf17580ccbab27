//! Pitch normalisation statistics computed once from a training corpus.

use crate::error::{AcousticError, AcousticResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mean and standard deviation of voiced pitch over a training corpus.
///
/// Loaded once when the model is constructed and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchStats {
    pub mean: f32,
    pub std: f32,
}

impl Default for PitchStats {
    fn default() -> Self {
        Self {
            mean: 0.0,
            std: 1.0,
        }
    }
}

impl PitchStats {
    pub fn new(mean: f32, std: f32) -> Self {
        Self { mean, std }
    }

    pub fn validate(&self) -> AcousticResult<()> {
        if !self.mean.is_finite() {
            return Err(AcousticError::InvalidConfig(format!(
                "pitch mean must be finite, got {}",
                self.mean
            )));
        }
        if !self.std.is_finite() || self.std <= 0.0 {
            return Err(AcousticError::InvalidConfig(format!(
                "pitch std must be finite and positive, got {}",
                self.std
            )));
        }
        Ok(())
    }

    /// Compute statistics over voiced (non-zero) pitch values.
    pub fn from_voiced<'a>(values: impl IntoIterator<Item = &'a f32>) -> Option<Self> {
        let voiced: Vec<f64> = values
            .into_iter()
            .filter(|v| **v != 0.0)
            .map(|v| f64::from(*v))
            .collect();
        if voiced.is_empty() {
            return None;
        }
        let n = voiced.len() as f64;
        let mean = voiced.iter().sum::<f64>() / n;
        let var = voiced.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean: mean as f32,
            std: var.sqrt() as f32,
        })
    }

    /// Normalise a pitch value in Hz. Unvoiced frames (exactly zero) stay zero.
    pub fn normalize(&self, hz: f32) -> f32 {
        if hz == 0.0 {
            0.0
        } else {
            (hz - self.mean) / self.std
        }
    }

    pub fn denormalize(&self, normalized: f32) -> f32 {
        normalized * self.std + self.mean
    }

    /// A shift in Hz expressed in normalised units.
    pub fn shift(&self, hz: f32) -> f32 {
        hz / self.std
    }

    /// Load statistics from a JSON or TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AcousticResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| AcousticError::Io {
            path: display.clone(),
            source,
        })?;

        let stats: PitchStats = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&raw).map_err(|err| AcousticError::Parse {
                path: display.clone(),
                reason: err.to_string(),
            })?,
            _ => serde_json::from_str(&raw).map_err(|err| AcousticError::Parse {
                path: display.clone(),
                reason: err.to_string(),
            })?,
        };
        stats.validate()?;
        log::info!(
            "loaded pitch statistics from {display}: mean={} std={}",
            stats.mean,
            stats.std
        );
        Ok(stats)
    }
}
