use crate::formatter::{PromptFormatter, SlotValues, TurnTemplate};
use crate::tokenizer::TextTokenizer;
use std::sync::Arc;

pub const CANARY_BOS: &str = "<|startoftranscript|>";
pub const CANARY_EOS: &str = "<|endoftext|>";
pub const CANARY_PNC: &str = "<|pnc|>";
pub const CANARY_NOPNC: &str = "<|nopnc|>";
pub const CANARY_TRANSCRIBE: &str = "<|transcribe|>";
pub const CANARY_TRANSLATE: &str = "<|translate|>";

const USER: TurnTemplate = TurnTemplate {
    template: "<|startoftranscript|>|SOURCE_LANG||TASK||TARGET_LANG||PNC|",
    slots: &["|SOURCE_LANG|", "|TASK|", "|TARGET_LANG|", "|PNC|"],
};

const ASSISTANT: TurnTemplate = TurnTemplate {
    template: "|TEXT|<|endoftext|>",
    slots: &["|TEXT|"],
};

/// Prompt format of the Canary speech recognition and translation models.
///
/// Manifest-style slot values (`"en"`, `"asr"`, `"yes"`) are mapped onto the
/// special tokens the model expects before rendering.
pub struct CanaryPromptFormatter {
    tokenizer: Arc<dyn TextTokenizer>,
}

impl CanaryPromptFormatter {
    pub const NAME: &'static str = "canary";

    pub fn new(tokenizer: Arc<dyn TextTokenizer>) -> Self {
        Self { tokenizer }
    }
}

impl PromptFormatter for CanaryPromptFormatter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn inference_role(&self) -> &'static str {
        "assistant"
    }

    fn template(&self, role: &str) -> Option<TurnTemplate> {
        match role {
            "user" => Some(USER),
            "assistant" => Some(ASSISTANT),
            _ => None,
        }
    }

    fn tokenizer(&self) -> &dyn TextTokenizer {
        self.tokenizer.as_ref()
    }

    fn map_slot_values(&self, values: SlotValues) -> SlotValues {
        map_to_special_tokens(values)
    }
}

/// Map manifest values onto Canary special tokens. Values that already are
/// the expected special tokens pass through.
pub fn map_to_special_tokens(mut values: SlotValues) -> SlotValues {
    for key in ["|SOURCE_LANG|", "|TARGET_LANG|"] {
        if let Some(lang) = values.get_mut(key) {
            if !(lang.starts_with("<|") && lang.ends_with("|>")) {
                *lang = format!("<|{lang}|>");
            }
        }
    }

    if let Some(pnc) = values.get_mut("|PNC|") {
        if *pnc != CANARY_PNC && *pnc != CANARY_NOPNC {
            let enabled = matches!(pnc.as_str(), "yes" | "1" | "True" | "true");
            *pnc = if enabled { CANARY_PNC } else { CANARY_NOPNC }.to_string();
        }
    }

    if let Some(task) = values.get_mut("|TASK|") {
        if *task != CANARY_TRANSCRIBE && *task != CANARY_TRANSLATE {
            let transcribe = *task == "asr";
            *task = if transcribe { CANARY_TRANSCRIBE } else { CANARY_TRANSLATE }.to_string();
        }
    }

    values
}
