use crate::canary::CanaryPromptFormatter;
use crate::error::PromptError;
use crate::formatter::PromptFormatter;
use crate::mistral::MistralPromptFormatter;
use crate::tokenizer::TextTokenizer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Registered prompt formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    Canary,
    Mistral,
}

impl FormatterKind {
    pub const ALL: [FormatterKind; 2] = [FormatterKind::Canary, FormatterKind::Mistral];

    pub fn name(&self) -> &'static str {
        match self {
            FormatterKind::Canary => CanaryPromptFormatter::NAME,
            FormatterKind::Mistral => MistralPromptFormatter::NAME,
        }
    }

    /// Instantiate the formatter around a tokenizer.
    pub fn build(self, tokenizer: Arc<dyn TextTokenizer>) -> Box<dyn PromptFormatter> {
        match self {
            FormatterKind::Canary => Box::new(CanaryPromptFormatter::new(tokenizer)),
            FormatterKind::Mistral => Box::new(MistralPromptFormatter::new(tokenizer)),
        }
    }
}

impl std::fmt::Display for FormatterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for FormatterKind {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "canary" => Ok(FormatterKind::Canary),
            "mistral" => Ok(FormatterKind::Mistral),
            _ => Err(PromptError::UnknownFormatter(s.to_string())),
        }
    }
}

/// Look up a formatter by its registered name.
pub fn formatter_for(
    name: &str,
    tokenizer: Arc<dyn TextTokenizer>,
) -> Result<Box<dyn PromptFormatter>, PromptError> {
    let kind: FormatterKind = name.parse()?;
    log::debug!("using prompt format {kind}");
    Ok(kind.build(tokenizer))
}
