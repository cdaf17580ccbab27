//! Template-driven dialog encoding shared by every prompt format.

use crate::error::{PromptError, PromptResult};
use crate::tokenizer::TextTokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Slot name to value.
pub type SlotValues = BTreeMap<String, String>;

/// Template of one role's turn. Slots appear in the template as `|name|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTemplate {
    pub template: &'static str,
    pub slots: &'static [&'static str],
}

/// One turn of a dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    #[serde(default)]
    pub slots: SlotValues,
}

impl Turn {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            slots: SlotValues::new(),
        }
    }

    pub fn with_slot(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.slots.insert(name.into(), value.into());
        self
    }
}

/// Token ids of an encoded dialog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedDialog {
    /// Every turn, preamble included.
    pub input_ids: Vec<u32>,
    /// Everything before the final inference-role turn.
    pub context_ids: Vec<u32>,
    /// The final turn when it belongs to the inference role.
    pub answer_ids: Option<Vec<u32>>,
    /// `true` for tokens produced by the inference role, aligned with `input_ids`.
    pub mask: Vec<bool>,
}

/// Wrap a slot name in pipes unless it already is.
pub fn mangle_slot(name: &str) -> String {
    if name.len() >= 2 && name.starts_with('|') && name.ends_with('|') {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

/// A registered prompt format.
///
/// Implementors provide templates and the tokenizer; turn and dialog encoding
/// come from the provided methods.
pub trait PromptFormatter: Send + Sync {
    /// Name the format is registered under.
    fn name(&self) -> &'static str;

    /// Role whose turns the model generates.
    fn inference_role(&self) -> &'static str;

    fn template(&self, role: &str) -> Option<TurnTemplate>;

    /// Text encoded before the first turn.
    fn preamble(&self) -> Option<&'static str> {
        None
    }

    fn tokenizer(&self) -> &dyn TextTokenizer;

    /// Rewrite slot values (keyed by mangled slot name) before rendering.
    fn map_slot_values(&self, values: SlotValues) -> SlotValues {
        values
    }

    /// Render one turn and tokenize it.
    fn encode_turn(
        &self,
        role: &str,
        template: &TurnTemplate,
        values: &SlotValues,
    ) -> PromptResult<Vec<u32>> {
        let values: SlotValues = values
            .iter()
            .map(|(name, value)| (mangle_slot(name), value.clone()))
            .collect();
        let values = self.map_slot_values(values);

        let expected: BTreeSet<String> = template.slots.iter().map(|s| mangle_slot(s)).collect();
        let missing: Vec<String> = expected
            .iter()
            .filter(|slot| !values.contains_key(*slot))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(PromptError::MissingSlots {
                role: role.to_string(),
                slots: missing,
            });
        }
        let unexpected: Vec<String> = values
            .keys()
            .filter(|slot| !expected.contains(*slot))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(PromptError::UnexpectedSlots {
                role: role.to_string(),
                slots: unexpected,
            });
        }

        let mut prompt = template.template.to_string();
        for (slot, value) in &values {
            prompt = prompt.replace(slot.as_str(), value);
        }
        log::trace!("rendered {role} turn: {prompt:?}");
        self.tokenizer().text_to_ids(&prompt)
    }

    /// Encode a full dialog, splitting off the answer when the last turn
    /// belongs to the inference role.
    fn encode_dialog(&self, turns: &[Turn]) -> PromptResult<EncodedDialog> {
        let Some(last) = turns.last() else {
            return Err(PromptError::EmptyDialog);
        };

        let mut encoded = EncodedDialog::default();
        if let Some(preamble) = self.preamble() {
            let ids = self.tokenizer().text_to_ids(preamble)?;
            encoded.mask.extend(std::iter::repeat_n(false, ids.len()));
            encoded.input_ids.extend(ids);
        }

        let mut last_ids = Vec::new();
        for turn in turns {
            let template = self
                .template(&turn.role)
                .ok_or_else(|| PromptError::UnknownRole {
                    formatter: self.name().to_string(),
                    role: turn.role.clone(),
                })?;
            let ids = self.encode_turn(&turn.role, &template, &turn.slots)?;
            let is_answer = turn.role == self.inference_role();
            encoded.mask.extend(std::iter::repeat_n(is_answer, ids.len()));
            encoded.input_ids.extend_from_slice(&ids);
            last_ids = ids;
        }

        if last.role == self.inference_role() {
            let context_len = encoded.input_ids.len() - last_ids.len();
            encoded.context_ids = encoded.input_ids[..context_len].to_vec();
            encoded.answer_ids = Some(last_ids);
        } else {
            encoded.context_ids = encoded.input_ids.clone();
        }
        log::debug!(
            "encoded {} turns with {}: {} tokens",
            turns.len(),
            self.name(),
            encoded.input_ids.len()
        );
        Ok(encoded)
    }
}
