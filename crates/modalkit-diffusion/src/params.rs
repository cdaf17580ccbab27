//! User-facing sampling parameters

use crate::error::{DiffusionError, DiffusionResult, read_config_file};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Sampling parameters as written in an inference config.
///
/// Sampler, guider, thresholder and discretization are kept as their tag
/// strings; [`SamplerConfig::from_params`](crate::SamplerConfig::from_params)
/// resolves them and rejects unknown tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    #[serde(default = "default_sampler")]
    pub sampler: String,
    #[serde(default = "default_guider")]
    pub guider: String,
    #[serde(default = "default_thresholder")]
    pub thresholder: String,
    #[serde(default = "default_discretization")]
    pub discretization: String,

    /// Number of denoising steps
    #[serde(default = "default_steps")]
    pub steps: usize,
    /// Classifier-free guidance scale
    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default = "default_sigma_min")]
    pub sigma_min: f32,
    #[serde(default = "default_sigma_max")]
    pub sigma_max: f32,
    #[serde(default = "default_rho")]
    pub rho: f32,

    #[serde(default)]
    pub s_churn: f32,
    #[serde(default)]
    pub s_tmin: f32,
    #[serde(default = "default_s_tmax")]
    pub s_tmax: f32,
    #[serde(default = "default_one")]
    pub s_noise: f32,
    #[serde(default = "default_one")]
    pub eta: f32,
    #[serde(default = "default_order")]
    pub order: usize,

    #[serde(default = "default_size")]
    pub width: usize,
    #[serde(default = "default_size")]
    pub height: usize,

    /// Fraction of the schedule applied to an input image; 1.0 disables
    /// img2img truncation
    #[serde(default = "default_one")]
    pub img2img_strength: f32,

    #[serde(default)]
    pub crop_coords_top: usize,
    #[serde(default)]
    pub crop_coords_left: usize,
    #[serde(default = "default_aesthetic_score")]
    pub aesthetic_score: f32,
    #[serde(default = "default_negative_aesthetic_score")]
    pub negative_aesthetic_score: f32,
}

fn default_sampler() -> String {
    "EulerEDMSampler".to_string()
}

fn default_guider() -> String {
    "VanillaCFG".to_string()
}

fn default_thresholder() -> String {
    "None".to_string()
}

fn default_discretization() -> String {
    "LegacyDDPMDiscretization".to_string()
}

fn default_steps() -> usize {
    40
}

fn default_scale() -> f32 {
    5.0
}

fn default_sigma_min() -> f32 {
    0.0292
}

fn default_sigma_max() -> f32 {
    14.6146
}

fn default_rho() -> f32 {
    3.0
}

fn default_s_tmax() -> f32 {
    999.0
}

fn default_one() -> f32 {
    1.0
}

fn default_order() -> usize {
    4
}

fn default_size() -> usize {
    1024
}

fn default_aesthetic_score() -> f32 {
    6.0
}

fn default_negative_aesthetic_score() -> f32 {
    2.5
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            sampler: default_sampler(),
            guider: default_guider(),
            thresholder: default_thresholder(),
            discretization: default_discretization(),
            steps: default_steps(),
            scale: default_scale(),
            sigma_min: default_sigma_min(),
            sigma_max: default_sigma_max(),
            rho: default_rho(),
            s_churn: 0.0,
            s_tmin: 0.0,
            s_tmax: default_s_tmax(),
            s_noise: default_one(),
            eta: default_one(),
            order: default_order(),
            width: default_size(),
            height: default_size(),
            img2img_strength: default_one(),
            crop_coords_top: 0,
            crop_coords_left: 0,
            aesthetic_score: default_aesthetic_score(),
            negative_aesthetic_score: default_negative_aesthetic_score(),
        }
    }
}

impl SamplingParams {
    pub fn with_sampler(mut self, sampler: impl Into<String>) -> Self {
        self.sampler = sampler.into();
        self
    }

    pub fn with_guider(mut self, guider: impl Into<String>) -> Self {
        self.guider = guider.into();
        self
    }

    pub fn with_discretization(mut self, discretization: impl Into<String>) -> Self {
        self.discretization = discretization.into();
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_img2img_strength(mut self, strength: f32) -> Self {
        self.img2img_strength = strength;
        self
    }

    /// Check numeric ranges. Tags are resolved separately.
    pub fn validate(&self) -> DiffusionResult<()> {
        if self.steps == 0 {
            return Err(DiffusionError::InvalidParameter(
                "steps must be at least 1".to_string(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(DiffusionError::InvalidParameter(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.img2img_strength > 0.0 && self.img2img_strength <= 1.0) {
            return Err(DiffusionError::InvalidParameter(format!(
                "img2img_strength must be in (0, 1], got {}",
                self.img2img_strength
            )));
        }
        Ok(())
    }

    /// The parameters as a value dictionary, the starting point of every
    /// engine request.
    pub fn to_value_map(&self) -> DiffusionResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(DiffusionError::InvalidParameter(format!(
                "sampling parameters serialized to {other}"
            ))),
        }
    }

    /// Load parameters from a JSON or TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> DiffusionResult<Self> {
        let params: SamplingParams = read_config_file(path.as_ref())?;
        params.validate()?;
        Ok(params)
    }
}
