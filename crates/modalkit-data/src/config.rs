//! Dataset configuration as it appears under a model's `train_ds`/`validation_ds`.

use crate::error::{DataError, DataResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A path, a list of paths, or a list of single-path buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSpec {
    Single(String),
    List(Vec<String>),
    Buckets(Vec<Vec<String>>),
}

impl PathSpec {
    /// Every path, with buckets flattened.
    pub fn paths(&self) -> Vec<String> {
        match self {
            PathSpec::Single(path) => vec![path.clone()],
            PathSpec::List(paths) => paths.clone(),
            PathSpec::Buckets(buckets) => buckets.iter().flatten().cloned().collect(),
        }
    }
}

/// How Lhotse Shar shards are shuffled across dataloader workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSeed", into = "RawSeed")]
pub enum ShardSeed {
    /// Each worker draws a seed from system entropy when iteration starts
    #[default]
    Trng,
    /// Each worker derives a seed from the global seed when iteration starts
    Randomized,
    /// Every worker uses this seed, so data is duplicated across workers
    Fixed(u64),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawSeed {
    Int(u64),
    Name(String),
}

impl TryFrom<RawSeed> for ShardSeed {
    type Error = DataError;

    fn try_from(raw: RawSeed) -> Result<Self, Self::Error> {
        match raw {
            RawSeed::Int(seed) => Ok(ShardSeed::Fixed(seed)),
            RawSeed::Name(name) => name.parse(),
        }
    }
}

impl From<ShardSeed> for RawSeed {
    fn from(seed: ShardSeed) -> Self {
        match seed {
            ShardSeed::Fixed(seed) => RawSeed::Int(seed),
            other => RawSeed::Name(other.to_string()),
        }
    }
}

impl std::fmt::Display for ShardSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardSeed::Trng => write!(f, "trng"),
            ShardSeed::Randomized => write!(f, "randomized"),
            ShardSeed::Fixed(seed) => write!(f, "{seed}"),
        }
    }
}

impl std::str::FromStr for ShardSeed {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "trng" => Ok(ShardSeed::Trng),
            "randomized" => Ok(ShardSeed::Randomized),
            other => other
                .parse::<u64>()
                .map(ShardSeed::Fixed)
                .map_err(|_| DataError::InvalidSeed(s.to_string())),
        }
    }
}

/// One Lhotse Shar source: a directory, optionally with a mixing weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SharEntry {
    Path(PathBuf),
    Weighted(PathBuf, f64),
}

/// `lhotse.shar_path`: one directory or several (weighted) directories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SharPaths {
    Single(PathBuf),
    Many(Vec<SharEntry>),
}

/// The `lhotse` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LhotseConfig {
    /// Regular (non-tarred) Lhotse manifest
    #[serde(default)]
    pub cuts_path: Option<PathBuf>,

    /// Lhotse Shar (tarred) data
    #[serde(default)]
    pub shar_path: Option<SharPaths>,

    #[serde(default)]
    pub shar_seed: ShardSeed,

    /// Manifest key holding the transcript
    #[serde(default = "default_text_field")]
    pub text_field: String,

    /// Manifest key holding the language
    #[serde(default = "default_lang_field")]
    pub lang_field: String,
}

fn default_text_field() -> String {
    "text".to_string()
}

fn default_lang_field() -> String {
    "lang".to_string()
}

impl Default for LhotseConfig {
    fn default() -> Self {
        Self {
            cuts_path: None,
            shar_path: None,
            shar_seed: ShardSeed::default(),
            text_field: default_text_field(),
            lang_field: default_lang_field(),
        }
    }
}

/// Dataset configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// NeMo JSON-lines manifest(s)
    #[serde(default)]
    pub manifest_filepath: Option<PathSpec>,

    /// Audio tar files matching the manifest(s); presence marks NeMo data as tarred
    #[serde(default)]
    pub tarred_audio_filepaths: Option<PathSpec>,

    /// Shuffle tar shards
    #[serde(default)]
    pub shuffle: bool,

    #[serde(default)]
    pub lhotse: LhotseConfig,
}

impl DataConfig {
    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest_filepath = Some(PathSpec::Single(manifest.into()));
        self
    }

    pub fn with_tarred_audio(mut self, tars: PathSpec) -> Self {
        self.tarred_audio_filepaths = Some(tars);
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_cuts_path(mut self, cuts_path: impl Into<PathBuf>) -> Self {
        self.lhotse.cuts_path = Some(cuts_path.into());
        self
    }

    pub fn with_shar_path(mut self, shar_path: SharPaths) -> Self {
        self.lhotse.shar_path = Some(shar_path);
        self
    }

    pub fn with_shar_seed(mut self, seed: ShardSeed) -> Self {
        self.lhotse.shar_seed = seed;
        self
    }

    /// Load a configuration from a JSON or TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: display.clone(),
            source,
        })?;
        let parsed = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&raw).map_err(|err| err.to_string()),
            _ => serde_json::from_str(&raw).map_err(|err| err.to_string()),
        };
        parsed.map_err(|reason| DataError::Parse {
            path: display,
            reason,
        })
    }
}
