//! Duration-based acoustic model orchestration.
//!
//! The neural sub-networks are opaque: any type implementing the traits in
//! this module can be plugged into an [`AcousticModel`]. The model owns the
//! control flow between them: speaker conditioning, prosody prediction,
//! alignment, feature averaging and length regulation.

mod config;
mod io;
mod model;
mod source;
mod speaker;

pub use config::AcousticConfig;
pub use io::{ForwardInputs, ForwardOutputs, InferInputs, InferOutputs, ReferenceSpeech};
pub use model::{AcousticModel, AcousticModelBuilder};
pub use source::DurationSource;
pub use speaker::SpeakerTable;

use crate::error::AcousticResult;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

/// Encoder output: `(B, T, D)` hidden states and a `(B, T)` mask holding
/// `1.0` for real tokens and `0.0` for padding.
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub hidden: Array3<f32>,
    pub mask: Array2<f32>,
}

impl Encoded {
    /// Number of real tokens per row.
    pub fn lengths(&self) -> Vec<usize> {
        self.mask
            .rows()
            .into_iter()
            .map(|row| row.iter().filter(|v| **v > 0.0).count())
            .collect()
    }
}

/// Soft text-to-spectrogram attention.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftAlignment {
    /// `(B, T_spec, T_text)` attention probabilities.
    pub soft: Array3<f32>,
    /// `(B, T_spec, T_text)` attention log-probabilities.
    pub log_prob: Array3<f32>,
}

/// Token encoder (embedding plus feed-forward transformer).
pub trait TextEncoder: Send + Sync {
    fn encode(
        &self,
        tokens: ArrayView2<'_, u32>,
        conditioning: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<Encoded>;

    /// Raw `(B, T, D)` token embeddings, used by the alignment network.
    fn embed(&self, tokens: ArrayView2<'_, u32>) -> AcousticResult<Array3<f32>>;
}

/// Predicts one value per token (log-duration, pitch or energy).
pub trait TemporalPredictor: Send + Sync {
    fn predict(
        &self,
        hidden: ArrayView3<'_, f32>,
        mask: ArrayView2<'_, f32>,
        conditioning: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<Array2<f32>>;
}

/// Learns the text-to-spectrogram alignment during training.
pub trait AlignmentNetwork: Send + Sync {
    /// `spec` is `(B, n_mel, T_spec)`, `text_embedding` is `(B, T_text, D)`
    /// and `attn_prior` is `(B, T_spec, T_text)`.
    fn align(
        &self,
        spec: ArrayView3<'_, f32>,
        text_embedding: ArrayView3<'_, f32>,
        text_mask: ArrayView2<'_, f32>,
        attn_prior: Option<ArrayView3<'_, f32>>,
        conditioning: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<SoftAlignment>;
}

/// Produces the `(B, 1, D)` speaker conditioning from a looked-up speaker
/// embedding, a reference utterance or an external embedding.
pub trait SpeakerEncoder: Send + Sync {
    fn encode(
        &self,
        speaker_embedding: Option<ArrayView3<'_, f32>>,
        reference: Option<&ReferenceSpeech<'_>>,
        external_embedding: Option<ArrayView2<'_, f32>>,
    ) -> AcousticResult<Option<Array3<f32>>>;
}

/// Lifts a `(B, T)` scalar track into the `(B, T, D)` hidden space.
pub trait FeatureEmbedding: Send + Sync {
    fn embed(&self, values: ArrayView2<'_, f32>) -> AcousticResult<Array3<f32>>;
}

/// Frame-level decoder over the regulated sequence.
pub trait FrameDecoder: Send + Sync {
    fn decode(
        &self,
        frames: ArrayView3<'_, f32>,
        frame_counts: &[usize],
        conditioning: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<Array3<f32>>;
}

/// Maps `(B, F, D)` decoder states to a `(B, n_mel, F)` spectrogram.
pub trait MelProjection: Send + Sync {
    fn project(&self, hidden: ArrayView3<'_, f32>) -> AcousticResult<Array3<f32>>;
}
