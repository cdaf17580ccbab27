//! Token-level averaging of frame-level prosody signals.
//!
//! Pitch and energy are measured per spectrogram frame, while the acoustic
//! model predicts them per input token. [`average_features`] collapses the
//! frame axis onto the token axis using the token durations, ignoring
//! unvoiced (exactly zero) frames.

mod mas;

pub use mas::{binarize_attention, hard_durations};

use crate::error::{AlignError, AlignResult};
use ndarray::{Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis, s};

/// Average a `(B, C, F)` signal over the token intervals described by
/// `(B, T)` durations, producing a `(B, C, T)` array.
///
/// Token `t` of row `b` covers the frames `[start, end)` where `end` is the
/// running sum of the durations up to and including `t`. Only non-zero frames
/// count towards the average; a token without any non-zero frame averages to
/// exactly `0.0`.
///
/// Every row of `durations` must sum to `F`.
pub fn average_features(
    signal: ArrayView3<'_, f32>,
    durations: ArrayView2<'_, usize>,
) -> AlignResult<Array3<f32>> {
    average_features_with_lengths(signal, durations, None)
}

/// [`average_features`] over a padded batch. Row `b` holds
/// `signal_lens[b] <= F` valid frames and its durations must sum to exactly
/// that; the padding after it is never read. Without `signal_lens` every row
/// is `F` frames long.
pub fn average_features_with_lengths(
    signal: ArrayView3<'_, f32>,
    durations: ArrayView2<'_, usize>,
    signal_lens: Option<&[usize]>,
) -> AlignResult<Array3<f32>> {
    let (batch, channels, frames) = signal.dim();
    let (duration_rows, tokens) = durations.dim();
    if batch != duration_rows {
        return Err(AlignError::BatchMismatch {
            signal: batch,
            durations: duration_rows,
        });
    }
    if let Some(lens) = signal_lens {
        if lens.len() != batch {
            return Err(AlignError::BatchMismatch {
                signal: lens.len(),
                durations: duration_rows,
            });
        }
    }

    let mut averages = Array3::<f32>::zeros((batch, channels, tokens));
    for (row, row_durations) in durations.outer_iter().enumerate() {
        let valid = signal_lens.map_or(frames, |lens| lens[row]);
        if valid > frames {
            return Err(AlignError::InvalidLength {
                row,
                reason: format!("{valid} valid frames exceed the {frames} frames of the signal"),
            });
        }
        let ends = cumulative_ends(row_durations);
        let covered = ends.last().copied().unwrap_or(0);
        if covered != valid {
            return Err(AlignError::DurationSumMismatch {
                row,
                expected: valid,
                actual: covered,
            });
        }

        for channel in 0..channels {
            let lane = signal.slice(s![row, channel, ..valid]);
            let cums = PaddedCumsums::new(lane);

            let mut start = 0;
            for (token, &end) in ends.iter().enumerate() {
                averages[[row, channel, token]] = cums.interval_mean(start, end);
                start = end;
            }
        }
    }

    log::trace!("averaged {batch}x{channels} lanes of {frames} frames onto {tokens} tokens");
    Ok(averages)
}

/// Single-channel variant of [`average_features`]: `(B, F)` in, `(B, T)` out.
pub fn average_features_1d(
    signal: ArrayView2<'_, f32>,
    durations: ArrayView2<'_, usize>,
    signal_lens: Option<&[usize]>,
) -> AlignResult<Array2<f32>> {
    let averaged =
        average_features_with_lengths(signal.insert_axis(Axis(1)), durations, signal_lens)?;
    Ok(averaged.index_axis_move(Axis(1), 0))
}

fn cumulative_ends(durations: ArrayView1<'_, usize>) -> Vec<usize> {
    durations
        .iter()
        .scan(0usize, |total, &duration| {
            *total += duration;
            Some(*total)
        })
        .collect()
}

/// Running value sums and running non-zero counts, both left-padded with a
/// zero so that `cum[end] - cum[start]` covers `[start, end)`.
struct PaddedCumsums {
    values: Vec<f64>,
    active: Vec<usize>,
}

impl PaddedCumsums {
    fn new(lane: ArrayView1<'_, f32>) -> Self {
        let mut values = Vec::with_capacity(lane.len() + 1);
        let mut active = Vec::with_capacity(lane.len() + 1);
        values.push(0.0);
        active.push(0);

        let (mut value_total, mut active_total) = (0.0f64, 0usize);
        for &sample in lane.iter() {
            value_total += f64::from(sample);
            if sample != 0.0 {
                active_total += 1;
            }
            values.push(value_total);
            active.push(active_total);
        }

        Self { values, active }
    }

    fn interval_mean(&self, start: usize, end: usize) -> f32 {
        let count = self.active[end] - self.active[start];
        if count == 0 {
            return 0.0;
        }
        let sum = self.values[end] - self.values[start];
        (sum / count as f64) as f32
    }
}
