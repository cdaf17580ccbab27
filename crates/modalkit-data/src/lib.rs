//! # ModalKit Data
//!
//! Resolves a dataset configuration into the source that should be read:
//! a NeMo JSON-lines manifest (optionally backed by audio tar shards) or a
//! Lhotse manifest (optionally in the tarred Shar format).
//!
//! ```
//! use modalkit_data::{CutSetSource, DataConfig, read_cutset_from_config};
//!
//! let config: DataConfig =
//!     serde_json::from_str(r#"{"lhotse": {"shar_path": "/data/shar", "shar_seed": 1234}}"#)?;
//! let (source, is_tarred) = read_cutset_from_config(&config)?;
//! assert!(is_tarred);
//! assert!(matches!(source, CutSetSource::LhotseShar(_)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod cutset;
pub mod error;
pub mod manifest;

pub use config::{DataConfig, LhotseConfig, PathSpec, ShardSeed, SharEntry, SharPaths};
pub use cutset::{CutSetSource, NemoTarredSource, SharSource, read_cutset_from_config};
pub use error::{DataError, DataResult};
pub use manifest::{AudioExample, ManifestIter, NemoManifest};
