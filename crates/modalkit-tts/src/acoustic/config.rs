//! Configuration for the acoustic model

use crate::durations::DurationBounds;
use crate::error::{AcousticError, AcousticResult};
use crate::regulate::LengthRegulator;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Structural configuration of an [`AcousticModel`](super::AcousticModel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcousticConfig {
    /// Number of speakers; a lookup table is required above one
    #[serde(default = "default_n_speakers")]
    pub n_speakers: usize,

    /// Width of the token hidden space
    #[serde(default = "default_symbols_embedding_dim")]
    pub symbols_embedding_dim: usize,

    /// Number of mel bins produced by the projection
    #[serde(default = "default_n_mel_channels")]
    pub n_mel_channels: usize,

    /// Clamp range for predicted durations
    #[serde(default)]
    pub durations: DurationBounds,

    /// Length regulation options
    #[serde(default)]
    pub regulator: LengthRegulator,

    /// Condition the duration/pitch/energy predictors on the speaker
    #[serde(default)]
    pub speaker_emb_condition_prosody: bool,

    /// Condition the decoder on the speaker
    #[serde(default)]
    pub speaker_emb_condition_decoder: bool,

    /// Condition the alignment network on the speaker
    #[serde(default)]
    pub speaker_emb_condition_aligner: bool,
}

fn default_n_speakers() -> usize {
    1
}

fn default_symbols_embedding_dim() -> usize {
    384
}

fn default_n_mel_channels() -> usize {
    80
}

impl Default for AcousticConfig {
    fn default() -> Self {
        Self {
            n_speakers: default_n_speakers(),
            symbols_embedding_dim: default_symbols_embedding_dim(),
            n_mel_channels: default_n_mel_channels(),
            durations: DurationBounds::default(),
            regulator: LengthRegulator::default(),
            speaker_emb_condition_prosody: false,
            speaker_emb_condition_decoder: false,
            speaker_emb_condition_aligner: false,
        }
    }
}

impl AcousticConfig {
    pub fn with_n_speakers(mut self, n_speakers: usize) -> Self {
        self.n_speakers = n_speakers;
        self
    }

    pub fn with_symbols_embedding_dim(mut self, dim: usize) -> Self {
        self.symbols_embedding_dim = dim;
        self
    }

    pub fn with_n_mel_channels(mut self, n_mel_channels: usize) -> Self {
        self.n_mel_channels = n_mel_channels;
        self
    }

    pub fn with_max_token_duration(mut self, max: f32) -> Self {
        self.durations.max = max;
        self
    }

    pub fn with_regulator(mut self, regulator: LengthRegulator) -> Self {
        self.regulator = regulator;
        self
    }

    pub fn with_prosody_conditioning(mut self, enabled: bool) -> Self {
        self.speaker_emb_condition_prosody = enabled;
        self
    }

    pub fn with_decoder_conditioning(mut self, enabled: bool) -> Self {
        self.speaker_emb_condition_decoder = enabled;
        self
    }

    pub fn with_aligner_conditioning(mut self, enabled: bool) -> Self {
        self.speaker_emb_condition_aligner = enabled;
        self
    }

    pub fn validate(&self) -> AcousticResult<()> {
        if self.n_speakers == 0 {
            return Err(AcousticError::InvalidConfig(
                "n_speakers must be at least 1".to_string(),
            ));
        }
        if self.symbols_embedding_dim == 0 || self.n_mel_channels == 0 {
            return Err(AcousticError::InvalidConfig(
                "symbols_embedding_dim and n_mel_channels must be non-zero".to_string(),
            ));
        }
        let DurationBounds { min, max } = self.durations;
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
            return Err(AcousticError::InvalidConfig(format!(
                "invalid duration bounds [{min}, {max}]"
            )));
        }
        if self.regulator.group_size == 0 {
            return Err(AcousticError::InvalidConfig(
                "regulator.group_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON or TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AcousticResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| AcousticError::Io {
            path: display.clone(),
            source,
        })?;
        let parse_err = |reason: String| AcousticError::Parse {
            path: display.clone(),
            reason,
        };

        let config: AcousticConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&raw).map_err(|err| parse_err(err.to_string()))?,
            _ => serde_json::from_str(&raw).map_err(|err| parse_err(err.to_string()))?,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AcousticConfig::default();
        assert_eq!(config.n_speakers, 1);
        assert_eq!(config.symbols_embedding_dim, 384);
        assert_eq!(config.n_mel_channels, 80);
        assert_eq!(config.durations.max, 75.0);
        assert_eq!(config.regulator.group_size, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = AcousticConfig::default()
            .with_n_speakers(4)
            .with_symbols_embedding_dim(256)
            .with_max_token_duration(50.0)
            .with_prosody_conditioning(true)
            .with_regulator(LengthRegulator::new().with_group_size(2));

        assert_eq!(config.n_speakers, 4);
        assert_eq!(config.symbols_embedding_dim, 256);
        assert_eq!(config.durations.max, 50.0);
        assert!(config.speaker_emb_condition_prosody);
        assert!(!config.speaker_emb_condition_decoder);
        assert_eq!(config.regulator.group_size, 2);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AcousticConfig =
            serde_json::from_str(r#"{"n_speakers": 3, "durations": {"max": 40.0}}"#).unwrap();
        assert_eq!(config.n_speakers, 3);
        assert_eq!(config.n_mel_channels, 80);
        assert_eq!(config.durations.min, 0.0);
        assert_eq!(config.durations.max, 40.0);
    }

    #[test]
    fn test_rejects_inverted_duration_bounds() {
        let mut config = AcousticConfig::default();
        config.durations = DurationBounds::new(10.0, 5.0);
        assert!(matches!(
            config.validate(),
            Err(AcousticError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acoustic.toml");
        std::fs::write(
            &path,
            "n_speakers = 2\nn_mel_channels = 64\n\n[regulator]\ngroup_size = 2\n",
        )
        .unwrap();

        let config = AcousticConfig::from_file(&path).unwrap();
        assert_eq!(config.n_speakers, 2);
        assert_eq!(config.n_mel_channels, 64);
        assert_eq!(config.regulator.group_size, 2);
        assert_eq!(config.regulator.max_frames, None);
    }
}
