use thiserror::Error;

/// Data source errors
#[derive(Error, Debug)]
pub enum DataError {
    /// Neither a NeMo manifest nor a Lhotse source was configured
    #[error(
        "No data source configured\nSuggestion: specify either manifest_filepath, lhotse.cuts_path, or lhotse.shar_path"
    )]
    MissingSource,

    /// Inconsistent or malformed configuration
    #[error("Invalid data configuration: {0}")]
    InvalidConfig(String),

    /// Unrecognised shard seed
    #[error("Invalid shar_seed '{0}': expected \"trng\", \"randomized\" or an integer")]
    InvalidSeed(String),

    #[error("IO error while reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A manifest line is not a valid entry
    #[error("Invalid manifest entry at {path}:{line}: {reason}")]
    Manifest {
        path: String,
        line: usize,
        reason: String,
    },

    /// Configuration file could not be parsed
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

/// Result type for data operations
pub type DataResult<T> = Result<T, DataError>;
