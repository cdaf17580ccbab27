//! # ModalKit TTS
//!
//! Building blocks for duration-based (FastPitch-style) acoustic models.
//!
//! The neural sub-networks themselves are opaque: this crate owns the tensor
//! plumbing between them.
//!
//! ## Features
//!
//! - **Feature alignment**: average frame-level pitch or energy over token
//!   intervals, ignoring unvoiced frames ([`align::average_features`])
//! - **Hard alignment**: monotonic alignment search over soft attention
//!   ([`align::binarize_attention`])
//! - **Length regulation**: expand token features onto the frame axis with a
//!   speaking pace ([`regulate::LengthRegulator`])
//! - **Orchestration**: the training and inference control flow of the
//!   acoustic model over pluggable sub-networks ([`acoustic::AcousticModel`])
//! - **Adapters**: registry of lightweight adapter modules for fine-tuning
//!   ([`adapters::SupportsAdapters`])
//!
//! ## Example
//!
//! ```rust
//! use modalkit_tts::regulate::{LengthRegulator, Pace};
//! use ndarray::array;
//!
//! let durations = array![[3.0f32, 0.0, 1.0]];
//! let features = array![[[1.0f32, 1.0], [9.0, 9.0], [2.0, 2.0]]];
//!
//! let regulated = LengthRegulator::new()
//!     .regulate(durations.view(), features.view(), &Pace::default())
//!     .unwrap();
//!
//! assert_eq!(regulated.frame_counts, vec![4]);
//! assert_eq!(regulated.frames.dim(), (1, 4, 2));
//! ```

pub mod acoustic;
pub mod adapters;
pub mod align;
pub mod durations;
pub mod error;
pub mod regulate;
pub mod stats;

pub use acoustic::{AcousticConfig, AcousticModel, DurationSource};
pub use align::{
    average_features, average_features_with_lengths, binarize_attention, hard_durations,
};
pub use error::{AcousticError, AcousticResult, AlignError, RegulateError};
pub use regulate::{LengthRegulator, Pace, Regulated};
pub use stats::PitchStats;
