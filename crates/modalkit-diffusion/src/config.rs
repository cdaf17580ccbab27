//! Structural configuration of the diffusion model behind a pipeline

use crate::error::{DiffusionError, DiffusionResult, read_config_file};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model facts the pipeline needs to shape engine requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Legacy (SD 1.x style) models are sampled without zeroed text
    /// embeddings for the unconditional branch
    #[serde(default)]
    pub is_legacy: bool,

    /// Channel multipliers of the first-stage autoencoder
    #[serde(default = "default_ch_mult")]
    pub ch_mult: Vec<usize>,

    /// Input channels of the denoising UNet (latent channels)
    #[serde(default = "default_in_channels")]
    pub in_channels: usize,
}

fn default_ch_mult() -> Vec<usize> {
    vec![1, 2, 4, 4]
}

fn default_in_channels() -> usize {
    4
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            is_legacy: false,
            ch_mult: default_ch_mult(),
            in_channels: default_in_channels(),
        }
    }
}

impl PipelineConfig {
    pub fn with_legacy(mut self, is_legacy: bool) -> Self {
        self.is_legacy = is_legacy;
        self
    }

    pub fn with_ch_mult(mut self, ch_mult: Vec<usize>) -> Self {
        self.ch_mult = ch_mult;
        self
    }

    pub fn with_in_channels(mut self, in_channels: usize) -> Self {
        self.in_channels = in_channels;
        self
    }

    /// Pixel-to-latent downsampling factor, `2^(len(ch_mult) - 1)`.
    pub fn vae_scale_factor(&self) -> usize {
        1 << self.ch_mult.len().saturating_sub(1)
    }

    /// Embedders whose unconditional embeddings are zeroed.
    pub fn force_uc_zero_embeddings(&self) -> Vec<String> {
        if self.is_legacy {
            Vec::new()
        } else {
            vec!["txt".to_string()]
        }
    }

    pub fn validate(&self) -> DiffusionResult<()> {
        if self.ch_mult.is_empty() {
            return Err(DiffusionError::InvalidParameter(
                "ch_mult must have at least one entry".to_string(),
            ));
        }
        if self.in_channels == 0 {
            return Err(DiffusionError::InvalidParameter(
                "in_channels must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON or TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> DiffusionResult<Self> {
        let config: PipelineConfig = read_config_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }
}
