use thiserror::Error;

/// Diffusion pipeline errors
#[derive(Error, Debug)]
pub enum DiffusionError {
    /// A sampler, guider, thresholder or discretization tag with no implementation
    #[error("Unsupported {kind}: {value}")]
    UnsupportedConfiguration { kind: &'static str, value: String },

    /// Parameter out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Input image has the wrong layout
    #[error("Invalid input image: {0}")]
    InvalidImage(String),

    /// Failure reported by the diffusion engine
    #[error("Diffusion engine error: {0}")]
    Engine(String),

    /// IO error while reading a configuration file
    #[error("IO error while reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DiffusionError {
    pub(crate) fn unsupported(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            kind,
            value: value.into(),
        }
    }
}

/// Result type for diffusion operations
pub type DiffusionResult<T> = Result<T, DiffusionError>;

/// Read a JSON or TOML file, chosen by extension.
pub(crate) fn read_config_file<T: serde::de::DeserializeOwned>(
    path: &std::path::Path,
) -> DiffusionResult<T> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| DiffusionError::Io {
        path: display.clone(),
        source,
    })?;
    let parsed = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&raw).map_err(|err| err.to_string()),
        _ => serde_json::from_str(&raw).map_err(|err| err.to_string()),
    };
    parsed.map_err(|reason| DiffusionError::Parse {
        path: display,
        reason,
    })
}
