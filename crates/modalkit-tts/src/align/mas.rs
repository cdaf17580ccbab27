use crate::error::{AlignError, AlignResult};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, s};

/// Turn soft `(B, T_spec, T_text)` attention into a hard monotonic alignment.
///
/// Each example is decoded independently over its valid region
/// `[..spec_lens[b], ..text_lens[b]]` with a width-one monotonic alignment
/// search: every frame is assigned to exactly one token, token indices never
/// decrease, and the path starts at the first token and ends at the last.
/// Positions outside the valid region are zero.
pub fn binarize_attention(
    attn_soft: ArrayView3<'_, f32>,
    text_lens: &[usize],
    spec_lens: &[usize],
) -> AlignResult<Array3<f32>> {
    let (batch, max_spec, max_text) = attn_soft.dim();
    for lens in [text_lens.len(), spec_lens.len()] {
        if lens != batch {
            return Err(AlignError::BatchMismatch {
                signal: batch,
                durations: lens,
            });
        }
    }

    let mut attn_hard = Array3::<f32>::zeros((batch, max_spec, max_text));
    for row in 0..batch {
        let (text_len, spec_len) = (text_lens[row], spec_lens[row]);
        validate_lengths(row, text_len, spec_len, max_text, max_spec)?;

        let region = attn_soft.slice(s![row, ..spec_len, ..text_len]);
        let path = monotonic_path(region);
        attn_hard
            .slice_mut(s![row, ..spec_len, ..text_len])
            .assign(&path);
    }

    Ok(attn_hard)
}

/// Per-token frame counts of a hard `(B, T_spec, T_text)` alignment.
pub fn hard_durations(attn_hard: ArrayView3<'_, f32>) -> Array2<usize> {
    attn_hard
        .sum_axis(Axis(1))
        .mapv(|frames| frames.round().max(0.0) as usize)
}

fn validate_lengths(
    row: usize,
    text_len: usize,
    spec_len: usize,
    max_text: usize,
    max_spec: usize,
) -> AlignResult<()> {
    let reason = if text_len == 0 {
        Some("text length must be at least 1".to_string())
    } else if text_len > max_text || spec_len > max_spec {
        Some(format!(
            "lengths ({spec_len} frames, {text_len} tokens) exceed the attention shape ({max_spec}, {max_text})"
        ))
    } else if spec_len < text_len {
        Some(format!(
            "{spec_len} frames cannot cover {text_len} tokens with a monotonic alignment"
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AlignError::InvalidLength { row, reason }),
        None => Ok(()),
    }
}

fn monotonic_path(attn: ArrayView2<'_, f32>) -> Array2<f32> {
    let (frames, tokens) = attn.dim();
    let log_attn = attn.mapv(f32::ln);

    let mut log_p = Array2::<f32>::from_elem((frames, tokens), f32::NEG_INFINITY);
    let mut backptr = Array2::<usize>::zeros((frames, tokens));
    log_p[[0, 0]] = log_attn[[0, 0]];

    for i in 1..frames {
        for j in 0..tokens {
            let (mut best, mut from) = (log_p[[i - 1, j]], j);
            // ties advance to the next token
            if j > 0 && log_p[[i - 1, j - 1]] >= best {
                best = log_p[[i - 1, j - 1]];
                from = j - 1;
            }
            log_p[[i, j]] = log_attn[[i, j]] + best;
            backptr[[i, j]] = from;
        }
    }

    let mut path = Array2::<f32>::zeros((frames, tokens));
    let mut token = tokens - 1;
    for frame in (0..frames).rev() {
        path[[frame, token]] = 1.0;
        token = backptr[[frame, token]];
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn peaked_attention(frames_per_token: &[usize], tokens: usize) -> Array2<f32> {
        let frames: usize = frames_per_token.iter().sum();
        let mut attn = Array2::<f32>::from_elem((frames, tokens), 0.1);
        let mut frame = 0;
        for (token, &count) in frames_per_token.iter().enumerate() {
            for _ in 0..count {
                attn[[frame, token]] = 0.8;
                frame += 1;
            }
        }
        attn
    }

    #[test]
    fn follows_the_peaked_path() {
        let attn = peaked_attention(&[2, 1, 2], 3).insert_axis(Axis(0));

        let hard = binarize_attention(attn.view(), &[3], &[5]).unwrap();
        let durations = hard_durations(hard.view());

        assert_eq!(durations, array![[2usize, 1, 2]]);
    }

    #[test]
    fn every_frame_is_assigned_exactly_once() {
        let attn = Array3::<f32>::from_elem((1, 7, 3), 0.5);

        let hard = binarize_attention(attn.view(), &[3], &[7]).unwrap();

        for frame in 0..7 {
            let assigned: f32 = hard.slice(s![0, frame, ..]).sum();
            assert_eq!(assigned, 1.0);
        }
        let durations = hard_durations(hard.view());
        assert_eq!(durations.row(0).sum(), 7);
        assert!(durations.row(0).iter().all(|&d| d >= 1));
    }

    #[test]
    fn padding_stays_zero() {
        let mut attn = Array3::<f32>::from_elem((2, 6, 4), 0.25);
        attn.slice_mut(s![0, .., ..]).fill(0.5);

        let hard = binarize_attention(attn.view(), &[2, 4], &[3, 6]).unwrap();

        assert_eq!(hard.slice(s![0, 3.., ..]).sum(), 0.0);
        assert_eq!(hard.slice(s![0, .., 2..]).sum(), 0.0);
        let durations = hard_durations(hard.view());
        assert_eq!(durations.row(0).sum(), 3);
        assert_eq!(durations.row(1).sum(), 6);
    }

    #[test]
    fn rejects_more_tokens_than_frames() {
        let attn = Array3::<f32>::from_elem((1, 2, 3), 0.5);

        let err = binarize_attention(attn.view(), &[3], &[2]).unwrap_err();
        assert!(matches!(err, AlignError::InvalidLength { row: 0, .. }));
    }
}
