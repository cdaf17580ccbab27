//! Expansion of token-level features onto the frame axis.

use crate::error::{RegulateError, RegulateResult};
use ndarray::{Array2, Array3, ArrayView1, ArrayView2, ArrayView3, s};
use serde::{Deserialize, Serialize};

/// Speaking rate applied to durations before rounding. Larger values produce
/// fewer frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pace {
    Uniform(f32),
    PerExample(Vec<f32>),
}

impl Pace {
    fn resolve(&self, batch: usize) -> RegulateResult<Vec<f32>> {
        let values = match self {
            Pace::Uniform(value) => vec![*value; batch],
            Pace::PerExample(values) => {
                if values.len() != batch {
                    return Err(RegulateError::BatchMismatch {
                        what: "pace",
                        expected: batch,
                        actual: values.len(),
                    });
                }
                values.clone()
            }
        };

        for (row, &value) in values.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(RegulateError::InvalidPace { row, value });
            }
        }
        Ok(values)
    }
}

impl Default for Pace {
    fn default() -> Self {
        Pace::Uniform(1.0)
    }
}

impl From<f32> for Pace {
    fn from(value: f32) -> Self {
        Pace::Uniform(value)
    }
}

impl From<Vec<f32>> for Pace {
    fn from(values: Vec<f32>) -> Self {
        Pace::PerExample(values)
    }
}

/// Result of a length regulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Regulated {
    /// `(B, F_max, D)` features, zero-padded after each row's frame count.
    pub frames: Array3<f32>,
    /// Unpadded frame count of every row.
    pub frame_counts: Vec<usize>,
}

impl Regulated {
    pub fn max_frames(&self) -> usize {
        self.frames.dim().1
    }
}

/// Repeats each token's feature vector by its pace-scaled duration.
///
/// Durations are divided by the pace and rounded half-up
/// (`floor(d / pace + 0.5)`), so `2.5` becomes three frames and `0.49` none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LengthRegulator {
    /// Truncate the output to at most this many frames.
    #[serde(default)]
    pub max_frames: Option<usize>,
    /// Round every row's frame count up to a multiple of this value by
    /// extending the last valid token.
    #[serde(default = "default_group_size")]
    pub group_size: usize,
}

fn default_group_size() -> usize {
    1
}

impl Default for LengthRegulator {
    fn default() -> Self {
        Self {
            max_frames: None,
            group_size: default_group_size(),
        }
    }
}

impl LengthRegulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size;
        self
    }

    /// Expand `(B, T, D)` features by `(B, T)` durations.
    pub fn regulate(
        &self,
        durations: ArrayView2<'_, f32>,
        features: ArrayView3<'_, f32>,
        pace: &Pace,
    ) -> RegulateResult<Regulated> {
        self.regulate_with_lengths(durations, features, pace, None)
    }

    /// Like [`regulate`](Self::regulate), with the number of valid tokens per
    /// row so group padding lands on the last real token instead of padding.
    pub fn regulate_with_lengths(
        &self,
        durations: ArrayView2<'_, f32>,
        features: ArrayView3<'_, f32>,
        pace: &Pace,
        token_lens: Option<&[usize]>,
    ) -> RegulateResult<Regulated> {
        let repetitions = self.repetitions(durations, pace, token_lens)?;
        let (batch, tokens) = repetitions.dim();
        let (feature_rows, feature_tokens, dim) = features.dim();
        if feature_rows != batch {
            return Err(RegulateError::BatchMismatch {
                what: "features",
                expected: batch,
                actual: feature_rows,
            });
        }
        if feature_tokens != tokens {
            return Err(RegulateError::TokenMismatch {
                durations: tokens,
                features: feature_tokens,
            });
        }

        let mut frame_counts = repetitions
            .rows()
            .into_iter()
            .enumerate()
            .map(|(row, reps)| row_total(row, reps))
            .collect::<RegulateResult<Vec<usize>>>()?;
        if let Some(limit) = self.max_frames {
            for count in frame_counts.iter_mut() {
                *count = (*count).min(limit);
            }
        }
        let max_len = frame_counts.iter().copied().max().unwrap_or(0);

        let mut frames = Array3::<f32>::zeros((batch, max_len, dim));
        for row in 0..batch {
            let limit = frame_counts[row];
            let mut cursor = 0;
            for token in 0..tokens {
                if cursor >= limit {
                    break;
                }
                let end = (cursor + repetitions[[row, token]]).min(limit);
                let source = features.slice(s![row, token, ..]);
                for frame in cursor..end {
                    frames.slice_mut(s![row, frame, ..]).assign(&source);
                }
                cursor = end;
            }
        }

        log::debug!("regulated {batch} rows of {tokens} tokens into {max_len} frames");
        Ok(Regulated {
            frames,
            frame_counts,
        })
    }

    /// Integer repetition counts after pace scaling, rounding and group padding.
    pub fn repetitions(
        &self,
        durations: ArrayView2<'_, f32>,
        pace: &Pace,
        token_lens: Option<&[usize]>,
    ) -> RegulateResult<Array2<usize>> {
        if self.group_size == 0 {
            return Err(RegulateError::InvalidGroupSize(self.group_size));
        }
        let (batch, tokens) = durations.dim();
        let paces = pace.resolve(batch)?;
        if let Some(lens) = token_lens {
            if lens.len() != batch {
                return Err(RegulateError::BatchMismatch {
                    what: "token lengths",
                    expected: batch,
                    actual: lens.len(),
                });
            }
        }

        let mut repetitions = Array2::<usize>::zeros((batch, tokens));
        for ((row, token), &duration) in durations.indexed_iter() {
            if !duration.is_finite() || duration < 0.0 {
                return Err(RegulateError::InvalidDuration {
                    row,
                    token,
                    value: duration,
                });
            }
            let scaled = duration / paces[row];
            if !scaled.is_finite() || scaled >= MAX_TOKEN_FRAMES {
                return Err(RegulateError::DurationOverflow {
                    row,
                    token,
                    value: scaled,
                });
            }
            repetitions[[row, token]] = round_half_up(scaled);
        }

        if self.group_size > 1 && tokens > 0 {
            for row in 0..batch {
                let total = row_total(row, repetitions.row(row))?;
                let pad = (self.group_size - total % self.group_size) % self.group_size;
                if pad == 0 {
                    continue;
                }
                let last = token_lens
                    .map(|lens| lens[row].clamp(1, tokens) - 1)
                    .unwrap_or(tokens - 1);
                total
                    .checked_add(pad)
                    .ok_or(RegulateError::FrameOverflow { row })?;
                repetitions[[row, last]] += pad;
            }
        }

        Ok(repetitions)
    }
}

/// Upper bound on the pace-scaled duration of a single token, in frames.
const MAX_TOKEN_FRAMES: f32 = 16_777_216.0;

fn round_half_up(value: f32) -> usize {
    (value + 0.5).floor() as usize
}

fn row_total(row: usize, repetitions: ArrayView1<'_, usize>) -> RegulateResult<usize> {
    repetitions
        .iter()
        .try_fold(0usize, |total, &reps| total.checked_add(reps))
        .ok_or(RegulateError::FrameOverflow { row })
}
