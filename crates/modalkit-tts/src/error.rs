use thiserror::Error;

/// Errors raised by the feature aligner and the alignment search.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlignError {
    #[error("Batch size mismatch: signal has {signal} rows, durations have {durations}")]
    BatchMismatch { signal: usize, durations: usize },

    #[error(
        "Duration sum mismatch in row {row}: durations cover {actual} frames but the signal has {expected}\nSuggestion: durations must partition the frame axis exactly"
    )]
    DurationSumMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid sequence length in row {row}: {reason}")]
    InvalidLength { row: usize, reason: String },
}

/// Errors raised by the length regulator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegulateError {
    #[error("Batch size mismatch: {what} has {actual} rows, expected {expected}")]
    BatchMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Token count mismatch: durations have {durations} tokens, features have {features}")]
    TokenMismatch { durations: usize, features: usize },

    #[error("Invalid pace {value} for row {row}: pace must be finite and greater than zero")]
    InvalidPace { row: usize, value: f32 },

    #[error("Invalid duration {value} at row {row}, token {token}: durations must be finite and non-negative")]
    InvalidDuration { row: usize, token: usize, value: f32 },

    #[error(
        "Duration {value} at row {row}, token {token} is too large to expand after pace scaling\nSuggestion: check the duration predictor output and the pace"
    )]
    DurationOverflow { row: usize, token: usize, value: f32 },

    #[error("Frame count of row {row} overflows")]
    FrameOverflow { row: usize },

    #[error("Invalid group size: {0}. Group size must be at least 1")]
    InvalidGroupSize(usize),
}

/// Errors raised while orchestrating an acoustic model call.
#[derive(Debug, Error)]
pub enum AcousticError {
    #[error("Alignment error: {0}")]
    Align(#[from] AlignError),

    #[error("Length regulation error: {0}")]
    Regulate(#[from] RegulateError),

    #[error(
        "Unsupported combination: spectrogram given while alignment learning is disabled\nSuggestion: pass durations without a spectrogram, or enable the alignment network"
    )]
    UnsupportedCombination,

    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sub-network '{module}' failed: {reason}")]
    Module { module: &'static str, reason: String },

    #[error("IO error while reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },
}

impl AcousticError {
    /// Wrap a failure reported by an opaque sub-network.
    pub fn module(module: &'static str, reason: impl Into<String>) -> Self {
        Self::Module {
            module,
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(what: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            what,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}

pub type AlignResult<T> = Result<T, AlignError>;
pub type RegulateResult<T> = Result<T, RegulateError>;
pub type AcousticResult<T> = Result<T, AcousticError>;
