//! ModalKit prelude: the types most callers need from every member crate.

// Text-to-speech
pub use crate::tts::acoustic::{
    AlignmentNetwork, FeatureEmbedding, ForwardInputs, ForwardOutputs, FrameDecoder,
    InferInputs, InferOutputs, MelProjection, SpeakerEncoder, TemporalPredictor, TextEncoder,
};
pub use crate::tts::adapters::SupportsAdapters;
pub use crate::tts::{AcousticConfig, AcousticModel, LengthRegulator, Pace, PitchStats};

// Prompts
pub use crate::prompts::{FormatterKind, PromptFormatter, TextTokenizer, Turn};

// Diffusion
pub use crate::diffusion::{DiffusionEngine, PipelineConfig, SamplingParams, SamplingPipeline};

// Data
pub use crate::data::{CutSetSource, DataConfig, read_cutset_from_config};

// Errors
pub use crate::data::DataError;
pub use crate::diffusion::DiffusionError;
pub use crate::prompts::PromptError;
pub use crate::tts::AcousticError;

// Utils
pub use crate::init_logging;
