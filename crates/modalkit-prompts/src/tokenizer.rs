use crate::error::PromptResult;
use std::sync::Arc;

/// Converts rendered prompt text into token ids.
pub trait TextTokenizer: Send + Sync {
    fn text_to_ids(&self, text: &str) -> PromptResult<Vec<u32>>;
}

impl<T: TextTokenizer + ?Sized> TextTokenizer for Arc<T> {
    fn text_to_ids(&self, text: &str) -> PromptResult<Vec<u32>> {
        (**self).text_to_ids(text)
    }
}

/// HuggingFace tokenizers. Special tokens are expected to appear literally
/// in the rendered prompt, so none are added during encoding.
#[cfg(feature = "hf-tokenizers")]
impl TextTokenizer for tokenizers::Tokenizer {
    fn text_to_ids(&self, text: &str) -> PromptResult<Vec<u32>> {
        let encoding = self.encode(text, false).map_err(|e| {
            crate::error::PromptError::Tokenizer(format!("Failed to encode text: {}", e))
        })?;
        Ok(encoding.get_ids().to_vec())
    }
}

/// Load a HuggingFace `tokenizer.json`.
#[cfg(feature = "hf-tokenizers")]
pub fn load_hf_tokenizer(
    path: impl AsRef<std::path::Path>,
) -> PromptResult<Arc<dyn TextTokenizer>> {
    let path = path.as_ref();
    let tokenizer = tokenizers::Tokenizer::from_file(path).map_err(|e| {
        crate::error::PromptError::Tokenizer(format!(
            "Failed to load tokenizer from {}: {}",
            path.display(),
            e
        ))
    })?;
    log::info!("loaded tokenizer from {}", path.display());
    Ok(Arc::new(tokenizer))
}
