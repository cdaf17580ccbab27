//! Resolution of a dataset configuration into the cut set that should be read.
//!
//! Reading tar shards and multiplexing sources is the job of the consumer;
//! this module decides *what* to read and with which weights.

use crate::config::{DataConfig, PathSpec, ShardSeed, SharEntry, SharPaths};
use crate::error::{DataError, DataResult};
use crate::manifest::NemoManifest;
use std::path::PathBuf;

/// A NeMo manifest whose audio lives in tar shards.
#[derive(Debug, Clone, PartialEq)]
pub struct NemoTarredSource {
    pub manifest: NemoManifest,
    pub tar_paths: Vec<String>,
    pub shuffle_shards: bool,
}

/// A Lhotse Shar directory. Shards are always shuffled and the source repeats.
#[derive(Debug, Clone, PartialEq)]
pub struct SharSource {
    pub in_dir: PathBuf,
    pub seed: ShardSeed,
    /// Mixing weight; `None` means proportional to the number of cuts
    pub weight: Option<f64>,
}

/// What to read, as decided by [`read_cutset_from_config`].
#[derive(Debug, Clone, PartialEq)]
pub enum CutSetSource {
    NemoManifest(NemoManifest),
    NemoTarred(NemoTarredSource),
    /// Several tarred buckets, each weighted by its number of entries
    NemoTarredMux {
        sources: Vec<NemoTarredSource>,
        weights: Vec<usize>,
    },
    LhotseCuts { cuts_path: PathBuf },
    LhotseShar(SharSource),
    LhotseSharMux(Vec<SharSource>),
}

impl CutSetSource {
    pub fn is_tarred(&self) -> bool {
        !matches!(
            self,
            CutSetSource::NemoManifest(_) | CutSetSource::LhotseCuts { .. }
        )
    }
}

/// Decide between NeMo and Lhotse manifests and between tarred and plain data.
///
/// Returns the source together with whether it is tarred.
pub fn read_cutset_from_config(config: &DataConfig) -> DataResult<(CutSetSource, bool)> {
    let lhotse = &config.lhotse;
    let use_nemo_manifest = lhotse.cuts_path.is_none() && lhotse.shar_path.is_none();

    let source = if use_nemo_manifest {
        let manifest = config
            .manifest_filepath
            .as_ref()
            .ok_or(DataError::MissingSource)?;
        read_nemo_manifest(config, manifest)?
    } else {
        read_lhotse_manifest(config)?
    };
    let is_tarred = source.is_tarred();
    Ok((source, is_tarred))
}

fn read_lhotse_manifest(config: &DataConfig) -> DataResult<CutSetSource> {
    let lhotse = &config.lhotse;
    let Some(shar_path) = &lhotse.shar_path else {
        let cuts_path = lhotse.cuts_path.clone().ok_or(DataError::MissingSource)?;
        log::info!("Initializing Lhotse CutSet from '{}'", cuts_path.display());
        return Ok(CutSetSource::LhotseCuts { cuts_path });
    };

    if lhotse.cuts_path.is_some() {
        log::warn!("lhotse.cuts_path will be ignored because lhotse.shar_path was provided");
    }
    let seed = lhotse.shar_seed;
    match shar_path {
        SharPaths::Single(in_dir) => {
            log::info!(
                "Initializing Lhotse Shar CutSet (tarred) from a single data source: '{}'",
                in_dir.display()
            );
            Ok(CutSetSource::LhotseShar(SharSource {
                in_dir: in_dir.clone(),
                seed,
                weight: None,
            }))
        }
        SharPaths::Many(entries) => {
            if entries.is_empty() {
                return Err(DataError::InvalidConfig(
                    "lhotse.shar_path is an empty list".to_string(),
                ));
            }
            log::info!(
                "Initializing Lhotse Shar CutSet (tarred) from {} data sources with a weighted multiplexer",
                entries.len()
            );
            let mut sources = Vec::with_capacity(entries.len());
            for entry in entries {
                let (in_dir, weight) = match entry {
                    SharEntry::Path(path) => (path.clone(), None),
                    SharEntry::Weighted(path, weight) => {
                        if !weight.is_finite() || *weight < 0.0 {
                            return Err(DataError::InvalidConfig(format!(
                                "mixing weight for '{}' must be a non-negative number, got {weight}",
                                path.display()
                            )));
                        }
                        (path.clone(), Some(*weight))
                    }
                };
                log::info!("- path={} weight={weight:?}", in_dir.display());
                sources.push(SharSource {
                    in_dir,
                    seed,
                    weight,
                });
            }
            Ok(CutSetSource::LhotseSharMux(sources))
        }
    }
}

fn read_nemo_manifest(config: &DataConfig, manifest: &PathSpec) -> DataResult<CutSetSource> {
    let lhotse = &config.lhotse;
    let open = |path: &str| {
        NemoManifest::new(path).with_fields(lhotse.text_field.as_str(), lhotse.lang_field.as_str())
    };

    let Some(tars) = &config.tarred_audio_filepaths else {
        let PathSpec::Single(path) = manifest else {
            return Err(DataError::InvalidConfig(
                "non-tarred NeMo data takes a single manifest_filepath".to_string(),
            ));
        };
        log::info!("Initializing Lhotse CutSet from a single NeMo manifest (non-tarred): '{path}'");
        return Ok(CutSetSource::NemoManifest(open(path)));
    };

    if let PathSpec::Single(path) = manifest {
        log::info!("Initializing Lhotse CutSet from a single NeMo manifest (tarred): '{path}'");
        return Ok(CutSetSource::NemoTarred(NemoTarredSource {
            manifest: open(path),
            tar_paths: tars.paths(),
            shuffle_shards: config.shuffle,
        }));
    }

    let manifests = single_path_buckets("manifest_filepath", manifest)?;
    let tar_buckets = single_path_buckets("tarred_audio_filepaths", tars)?;
    if manifests.len() != tar_buckets.len() {
        return Err(DataError::InvalidConfig(format!(
            "{} manifest buckets but {} tarred audio buckets",
            manifests.len(),
            tar_buckets.len()
        )));
    }

    log::info!(
        "Initializing Lhotse CutSet from {} tarred NeMo manifest sources with a weighted multiplexer",
        manifests.len()
    );
    let mut sources = Vec::with_capacity(manifests.len());
    let mut weights = Vec::with_capacity(manifests.len());
    for (manifest_path, tar_path) in manifests.into_iter().zip(tar_buckets) {
        let source = NemoTarredSource {
            manifest: open(manifest_path),
            tar_paths: vec![tar_path.to_string()],
            shuffle_shards: config.shuffle,
        };
        let weight = source.manifest.len()?;
        log::info!("- path={manifest_path} weight={weight}");
        sources.push(source);
        weights.push(weight);
    }
    Ok(CutSetSource::NemoTarredMux { sources, weights })
}

/// Bucketed paths must look like `[[p1], [p2], ...]`.
fn single_path_buckets<'a>(key: &str, paths: &'a PathSpec) -> DataResult<Vec<&'a str>> {
    let invalid = || {
        DataError::InvalidConfig(format!(
            "{key} must be a path or a list of single-path buckets"
        ))
    };
    let PathSpec::Buckets(buckets) = paths else {
        return Err(invalid());
    };
    buckets
        .iter()
        .map(|bucket| match bucket.as_slice() {
            [path] => Ok(path.as_str()),
            _ => Err(invalid()),
        })
        .collect()
}
