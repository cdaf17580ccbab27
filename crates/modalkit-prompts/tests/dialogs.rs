use modalkit_prompts::{
    FormatterKind, PromptError, PromptResult, TextTokenizer, Turn, formatter_for,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Whitespace tokenizer that also splits off `<|...|>` and `[...]` specials,
/// assigning ids in order of first appearance.
#[derive(Default)]
struct VocabTokenizer {
    vocab: Mutex<HashMap<String, u32>>,
}

impl VocabTokenizer {
    fn id(&self, piece: &str) -> u32 {
        let mut vocab = self.vocab.lock().unwrap();
        let next = vocab.len() as u32;
        *vocab.entry(piece.to_string()).or_insert(next)
    }

    fn id_of(&self, piece: &str) -> Option<u32> {
        self.vocab.lock().unwrap().get(piece).copied()
    }
}

impl TextTokenizer for VocabTokenizer {
    fn text_to_ids(&self, text: &str) -> PromptResult<Vec<u32>> {
        let spaced = text
            .replace("<|", " <|")
            .replace("|>", "|> ")
            .replace("</s>", " </s> ")
            .replace("<s>", " <s> ");
        Ok(spaced.split_whitespace().map(|piece| self.id(piece)).collect())
    }
}

#[test]
fn canary_dialog_from_manifest_values() {
    let tokenizer = Arc::new(VocabTokenizer::default());
    let formatter = formatter_for("canary", tokenizer.clone()).unwrap();

    let turns: Vec<Turn> = serde_json::from_str(
        r#"[
            {"role": "user", "slots": {"SOURCE_LANG": "en", "TASK": "ast", "TARGET_LANG": "de", "PNC": "no"}},
            {"role": "assistant", "slots": {"TEXT": "guten tag"}}
        ]"#,
    )
    .unwrap();
    let encoded = formatter.encode_dialog(&turns).unwrap();

    let context: Vec<u32> = [
        "<|startoftranscript|>",
        "<|en|>",
        "<|translate|>",
        "<|de|>",
        "<|nopnc|>",
    ]
    .iter()
    .map(|piece| tokenizer.id_of(piece).unwrap())
    .collect();
    assert_eq!(encoded.context_ids, context);

    let answer = encoded.answer_ids.unwrap();
    assert_eq!(answer.len(), 3);
    assert_eq!(
        answer.last().copied(),
        tokenizer.id_of("<|endoftext|>")
    );
    assert_eq!(encoded.mask, vec![false, false, false, false, false, true, true, true]);
}

#[test]
fn formats_share_the_tokenizer_but_not_templates() {
    let tokenizer: Arc<dyn TextTokenizer> = Arc::new(VocabTokenizer::default());
    let turn = Turn::new("user").with_slot("message", "hello");

    let mistral = FormatterKind::Mistral.build(tokenizer.clone());
    assert!(mistral.encode_dialog(&[turn.clone()]).is_ok());

    let canary = FormatterKind::Canary.build(tokenizer);
    let err = canary.encode_dialog(&[turn]).unwrap_err();
    assert!(matches!(err, PromptError::MissingSlots { .. }));
}
