//! # ModalKit Prompts
//!
//! Prompt formatters that render multi-turn dialogs through per-role
//! templates and tokenize them for training or inference.
//!
//! A formatter declares one [`TurnTemplate`] per role. Slots appear in the
//! template as `|name|`; every turn must provide exactly the declared slots.
//! Encoding a dialog yields the full token sequence, the context before the
//! final answer, the answer itself and a mask marking the tokens produced by
//! the inference role.
//!
//! ## Formats
//!
//! - `canary`: speech recognition and translation prompts
//! - `mistral`: Mistral instruct chat
//!
//! ## Tokenizers
//!
//! Any [`TextTokenizer`] can back a formatter. Enable the `hf-tokenizers`
//! feature to use a HuggingFace `tokenizer.json`.
//!
//! ## Example
//!
//! ```rust
//! use modalkit_prompts::{FormatterKind, PromptResult, TextTokenizer, Turn};
//! use std::sync::Arc;
//!
//! struct Bytes;
//!
//! impl TextTokenizer for Bytes {
//!     fn text_to_ids(&self, text: &str) -> PromptResult<Vec<u32>> {
//!         Ok(text.bytes().map(u32::from).collect())
//!     }
//! }
//!
//! let formatter = FormatterKind::Mistral.build(Arc::new(Bytes));
//! let encoded = formatter
//!     .encode_dialog(&[
//!         Turn::new("user").with_slot("message", "Hi"),
//!         Turn::new("assistant").with_slot("message", "Hello"),
//!     ])
//!     .unwrap();
//!
//! assert_eq!(encoded.answer_ids.unwrap().len(), "Hello</s>".len());
//! ```

pub mod canary;
pub mod error;
pub mod formatter;
pub mod mistral;
pub mod registry;
pub mod tokenizer;

pub use canary::CanaryPromptFormatter;
pub use error::{PromptError, PromptResult};
pub use formatter::{EncodedDialog, PromptFormatter, SlotValues, Turn, TurnTemplate, mangle_slot};
pub use mistral::MistralPromptFormatter;
pub use registry::{FormatterKind, formatter_for};
pub use tokenizer::TextTokenizer;

#[cfg(feature = "hf-tokenizers")]
pub use tokenizer::load_hf_tokenizer;
