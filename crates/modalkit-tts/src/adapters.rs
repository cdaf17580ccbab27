//! Optional adapter capability for sub-networks.
//!
//! Only modules that can host adapters implement [`SupportsAdapters`]. A
//! module built from several adapter-capable layers composes them with
//! [`LayeredAdapters`], which forwards every call to each layer.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Configuration of a single adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Input (and output) width of the adapter. Filled in from the host
    /// module when left unset.
    #[serde(default)]
    pub in_features: Option<usize>,
    /// Bottleneck width.
    pub dim: usize,
    #[serde(default)]
    pub dropout: f32,
}

impl AdapterConfig {
    pub fn new(dim: usize) -> Self {
        Self {
            in_features: None,
            dim,
            dropout: 0.0,
        }
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    /// Set the input width to the host module's width.
    pub fn with_input_dim(mut self, module_dim: usize) -> Self {
        self.in_features = Some(module_dim);
        self
    }
}

/// Capability of hosting named adapters.
pub trait SupportsAdapters {
    fn add_adapter(&mut self, name: &str, config: AdapterConfig);

    /// Whether at least one adapter is registered.
    fn is_adapter_available(&self) -> bool;

    /// Enable or disable one adapter, or all of them when `name` is `None`.
    fn set_enabled_adapters(&mut self, name: Option<&str>, enabled: bool);

    /// Sorted names of the enabled adapters.
    fn enabled_adapters(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq)]
struct AdapterEntry {
    config: AdapterConfig,
    enabled: bool,
}

/// Adapter registry of a single layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterSet {
    module_dim: Option<usize>,
    adapters: BTreeMap<String, AdapterEntry>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose adapters default to the given input width.
    pub fn for_module(module_dim: usize) -> Self {
        Self {
            module_dim: Some(module_dim),
            adapters: BTreeMap::new(),
        }
    }

    pub fn config(&self, name: &str) -> Option<&AdapterConfig> {
        self.adapters.get(name).map(|entry| &entry.config)
    }
}

impl SupportsAdapters for AdapterSet {
    fn add_adapter(&mut self, name: &str, mut config: AdapterConfig) {
        if config.in_features.is_none() {
            config.in_features = self.module_dim;
        }
        if self.adapters.contains_key(name) {
            log::warn!("replacing existing adapter '{name}'");
        }
        self.adapters.insert(
            name.to_string(),
            AdapterEntry {
                config,
                enabled: true,
            },
        );
    }

    fn is_adapter_available(&self) -> bool {
        !self.adapters.is_empty()
    }

    fn set_enabled_adapters(&mut self, name: Option<&str>, enabled: bool) {
        match name {
            Some(name) => {
                if let Some(entry) = self.adapters.get_mut(name) {
                    entry.enabled = enabled;
                } else {
                    log::warn!("adapter '{name}' is not registered");
                }
            }
            None => self
                .adapters
                .values_mut()
                .for_each(|entry| entry.enabled = enabled),
        }
    }

    fn enabled_adapters(&self) -> Vec<String> {
        self.adapters
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Adapter capability of a module made of several adapter-capable layers.
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredAdapters<L> {
    filter_size: usize,
    layers: Vec<L>,
}

impl<L: SupportsAdapters> LayeredAdapters<L> {
    pub fn new(filter_size: usize, layers: Vec<L>) -> Self {
        Self {
            filter_size,
            layers,
        }
    }

    pub fn layers(&self) -> &[L] {
        &self.layers
    }
}

impl LayeredAdapters<AdapterSet> {
    /// `n_layers` empty registries sized to `filter_size`.
    pub fn with_layers(filter_size: usize, n_layers: usize) -> Self {
        Self::new(
            filter_size,
            (0..n_layers)
                .map(|_| AdapterSet::for_module(filter_size))
                .collect(),
        )
    }
}

impl<L: SupportsAdapters> SupportsAdapters for LayeredAdapters<L> {
    fn add_adapter(&mut self, name: &str, config: AdapterConfig) {
        let config = config.with_input_dim(self.filter_size);
        for layer in &mut self.layers {
            layer.add_adapter(name, config.clone());
        }
    }

    fn is_adapter_available(&self) -> bool {
        self.layers.iter().any(|layer| layer.is_adapter_available())
    }

    fn set_enabled_adapters(&mut self, name: Option<&str>, enabled: bool) {
        for layer in &mut self.layers {
            layer.set_enabled_adapters(name, enabled);
        }
    }

    fn enabled_adapters(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .layers
            .iter()
            .flat_map(|layer| layer.enabled_adapters())
            .collect();
        names.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_tracks_enabled_adapters() {
        let mut set = AdapterSet::for_module(256);
        assert!(!set.is_adapter_available());

        set.add_adapter("speaker_b", AdapterConfig::new(32));
        set.add_adapter("speaker_a", AdapterConfig::new(16));
        assert!(set.is_adapter_available());
        assert_eq!(set.enabled_adapters(), vec!["speaker_a", "speaker_b"]);
        assert_eq!(set.config("speaker_a").unwrap().in_features, Some(256));

        set.set_enabled_adapters(Some("speaker_b"), false);
        assert_eq!(set.enabled_adapters(), vec!["speaker_a"]);

        set.set_enabled_adapters(None, false);
        assert!(set.enabled_adapters().is_empty());
        assert!(set.is_adapter_available());
    }

    #[test]
    fn layered_adapters_forward_to_every_layer() {
        let mut predictor = LayeredAdapters::with_layers(384, 2);
        predictor.add_adapter("style", AdapterConfig::new(64).with_input_dim(999));

        for layer in predictor.layers() {
            let config = layer.config("style").unwrap();
            assert_eq!(config.in_features, Some(384));
            assert_eq!(config.dim, 64);
        }
        assert!(predictor.is_adapter_available());
        assert_eq!(predictor.enabled_adapters(), vec!["style"]);

        predictor.set_enabled_adapters(Some("style"), false);
        assert!(predictor.enabled_adapters().is_empty());
    }

    #[test]
    fn layered_names_are_deduplicated_and_sorted() {
        let mut first = AdapterSet::new();
        first.add_adapter("b", AdapterConfig::new(8));
        first.add_adapter("a", AdapterConfig::new(8));
        let mut second = AdapterSet::new();
        second.add_adapter("c", AdapterConfig::new(8));
        second.add_adapter("a", AdapterConfig::new(8));

        let layered = LayeredAdapters::new(128, vec![first, second]);

        assert_eq!(layered.enabled_adapters(), vec!["a", "b", "c"]);
    }
}
