use crate::formatter::{PromptFormatter, TurnTemplate};
use crate::tokenizer::TextTokenizer;
use std::sync::Arc;

pub const MISTRAL_BOS: &str = "<s>";
pub const MISTRAL_PROMPT_BEGIN: &str = "[INST]";
pub const MISTRAL_PROMPT_END: &str = "[/INST]";
pub const MISTRAL_END_OF_TURN: &str = "</s>";

const USER: TurnTemplate = TurnTemplate {
    template: "[INST] |message| [/INST] ",
    slots: &["message"],
};

const ASSISTANT: TurnTemplate = TurnTemplate {
    template: "|message|</s>",
    slots: &["message"],
};

/// Chat format of Mistral-7B-Instruct.
pub struct MistralPromptFormatter {
    tokenizer: Arc<dyn TextTokenizer>,
}

impl MistralPromptFormatter {
    pub const NAME: &'static str = "mistral";

    pub fn new(tokenizer: Arc<dyn TextTokenizer>) -> Self {
        Self { tokenizer }
    }
}

impl PromptFormatter for MistralPromptFormatter {
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

    fn preamble(&self) -> Option<&'static str> {
        Some(MISTRAL_BOS)
    }

    fn tokenizer(&self) -> &dyn TextTokenizer {
        self.tokenizer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::Turn;
    use crate::formatter::tests::{CharTokenizer, decode};

    #[test]
    fn renders_multi_turn_chat() {
        let formatter = MistralPromptFormatter::new(Arc::new(CharTokenizer));
        let turns = vec![
            Turn::new("user").with_slot("message", "Hi"),
            Turn::new("assistant").with_slot("message", "Hello"),
            Turn::new("user").with_slot("message", "Bye"),
            Turn::new("assistant").with_slot("message", "Ciao"),
        ];

        let encoded = formatter.encode_dialog(&turns).unwrap();

        assert_eq!(
            decode(&encoded.input_ids),
            "<s>[INST] Hi [/INST] Hello</s>[INST] Bye [/INST] Ciao</s>"
        );
        assert_eq!(
            decode(&encoded.context_ids),
            "<s>[INST] Hi [/INST] Hello</s>[INST] Bye [/INST] "
        );
        assert_eq!(decode(encoded.answer_ids.as_deref().unwrap()), "Ciao</s>");
        // preamble is never part of the loss
        assert!(encoded.mask[..3].iter().all(|m| !m));
        assert_eq!(
            encoded.mask.iter().filter(|m| **m).count(),
            "Hello</s>".len() + "Ciao</s>".len()
        );
    }
}
