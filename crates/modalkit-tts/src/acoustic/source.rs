use crate::error::{AcousticError, AcousticResult};

/// Which durations drive the length regulator for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationSource {
    /// Hard durations extracted from the learned attention.
    AttentionHard,
    /// Durations supplied by the caller.
    Given,
    /// Durations from the duration predictor.
    Predicted,
}

impl DurationSource {
    /// | spec | learn_alignment | durs | source |
    /// |------|-----------------|------|--------|
    /// | yes  | yes             | any  | attention |
    /// | no   | any             | yes  | given |
    /// | no   | any             | no   | predicted |
    /// | yes  | no              | any  | error |
    pub fn select(
        spec_known: bool,
        learn_alignment: bool,
        durs_given: bool,
    ) -> AcousticResult<Self> {
        match (spec_known, learn_alignment, durs_given) {
            (true, true, _) => Ok(Self::AttentionHard),
            (false, _, true) => Ok(Self::Given),
            (false, _, false) => Ok(Self::Predicted),
            (true, false, _) => Err(AcousticError::UnsupportedCombination),
        }
    }
}
