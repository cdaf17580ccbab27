use modalkit_tts::acoustic::{
    AcousticConfig, AcousticModel, AlignmentNetwork, Encoded, FeatureEmbedding, ForwardInputs,
    FrameDecoder, InferInputs, MelProjection, SoftAlignment, SpeakerTable, TemporalPredictor,
    TextEncoder,
};
use modalkit_tts::Pace;
use modalkit_tts::error::{AcousticError, AcousticResult};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, array};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const DIM: usize = 2;
const N_MEL: usize = 3;

/// Hidden state of a token is its id on every channel; id 0 is padding.
struct MockEncoder;

impl TextEncoder for MockEncoder {
    fn encode(
        &self,
        tokens: ArrayView2<'_, u32>,
        conditioning: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<Encoded> {
        let mut hidden = self.embed(tokens)?;
        if let Some(cond) = conditioning {
            for ((b, t, d), value) in hidden.indexed_iter_mut() {
                if tokens[[b, t]] != 0 {
                    *value += cond[[b, 0, d]];
                }
            }
        }
        let mask = tokens.mapv(|tok| if tok == 0 { 0.0 } else { 1.0 });
        Ok(Encoded { hidden, mask })
    }

    fn embed(&self, tokens: ArrayView2<'_, u32>) -> AcousticResult<Array3<f32>> {
        let (batch, len) = tokens.dim();
        Ok(Array3::from_shape_fn((batch, len, DIM), |(b, t, _)| {
            tokens[[b, t]] as f32
        }))
    }
}

/// Returns `ln(1 + d)` for fixed durations `d`.
struct FixedDurations(Array2<f32>);

impl TemporalPredictor for FixedDurations {
    fn predict(
        &self,
        _hidden: ArrayView3<'_, f32>,
        _mask: ArrayView2<'_, f32>,
        _conditioning: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<Array2<f32>> {
        Ok(self.0.mapv(f32::ln_1p))
    }
}

/// Predicts a constant on real tokens and records whether it was conditioned.
struct ConstPredictor {
    value: f32,
    conditioned: Arc<AtomicBool>,
}

impl ConstPredictor {
    fn new(value: f32) -> Self {
        Self {
            value,
            conditioned: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl TemporalPredictor for ConstPredictor {
    fn predict(
        &self,
        _hidden: ArrayView3<'_, f32>,
        mask: ArrayView2<'_, f32>,
        conditioning: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<Array2<f32>> {
        if conditioning.is_some() {
            self.conditioned.store(true, Ordering::SeqCst);
        }
        Ok(mask.mapv(|m| m * self.value))
    }
}

/// Broadcasts a scalar track over the hidden channels.
struct ScalarEmbedding;

impl FeatureEmbedding for ScalarEmbedding {
    fn embed(&self, values: ArrayView2<'_, f32>) -> AcousticResult<Array3<f32>> {
        let (batch, len) = values.dim();
        Ok(Array3::from_shape_fn((batch, len, DIM), |(b, t, _)| {
            values[[b, t]]
        }))
    }
}

struct IdentityDecoder;

impl FrameDecoder for IdentityDecoder {
    fn decode(
        &self,
        frames: ArrayView3<'_, f32>,
        _frame_counts: &[usize],
        _conditioning: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<Array3<f32>> {
        Ok(frames.to_owned())
    }
}

/// Every mel bin is the sum of the hidden channels.
struct SumProjection;

impl MelProjection for SumProjection {
    fn project(&self, hidden: ArrayView3<'_, f32>) -> AcousticResult<Array3<f32>> {
        let (batch, frames, _) = hidden.dim();
        Ok(Array3::from_shape_fn((batch, N_MEL, frames), |(b, _, f)| {
            hidden.slice(ndarray::s![b, f, ..]).sum()
        }))
    }
}

/// Splits the spectrogram evenly across the tokens.
struct EvenAligner;

impl AlignmentNetwork for EvenAligner {
    fn align(
        &self,
        spec: ArrayView3<'_, f32>,
        text_embedding: ArrayView3<'_, f32>,
        _text_mask: ArrayView2<'_, f32>,
        _attn_prior: Option<ArrayView3<'_, f32>>,
        _conditioning: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<SoftAlignment> {
        let (batch, _, spec_len) = spec.dim();
        let text_len = text_embedding.dim().1;
        let soft = Array3::from_shape_fn((batch, spec_len, text_len), |(_, s, t)| {
            if t == s * text_len / spec_len { 0.9 } else { 0.1 }
        });
        let log_prob = soft.mapv(f32::ln);
        Ok(SoftAlignment { soft, log_prob })
    }
}

fn config() -> AcousticConfig {
    AcousticConfig::default()
        .with_symbols_embedding_dim(DIM)
        .with_n_mel_channels(N_MEL)
}

fn model_with(durations: Array2<f32>) -> AcousticModel {
    AcousticModel::builder(config())
        .encoder(MockEncoder)
        .decoder(IdentityDecoder)
        .duration_predictor(FixedDurations(durations))
        .pitch_predictor(ConstPredictor::new(0.5))
        .pitch_embedding(ScalarEmbedding)
        .projection(SumProjection)
        .build()
        .unwrap()
}

#[test]
fn model_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AcousticModel>();
}

#[test]
fn infer_expands_tokens_by_predicted_durations() {
    let model = model_with(array![[2.0, 1.0, 3.0]]);
    let text = array![[1u32, 2, 3]];

    let out = model.infer(InferInputs::new(text.view())).unwrap();

    assert_eq!(out.frame_counts, vec![6]);
    assert_eq!(out.spect.dim(), (1, N_MEL, 6));
    // (token id + pitch embedding 0.5) summed over both channels
    let first_bin: Vec<f32> = out.spect.slice(ndarray::s![0, 0, ..]).to_vec();
    assert_eq!(first_bin, vec![3.0, 3.0, 5.0, 7.0, 7.0, 7.0]);
    assert!(out.volume.is_none());
}

#[test]
fn infer_applies_pace_and_pitch_shift() {
    let model = model_with(array![[2.0, 2.0, 4.0]]);
    let text = array![[1u32, 2, 3]];
    let shift = model.uniform_pitch_shift(1, 3, 1.0);

    let out = model
        .infer(
            InferInputs::new(text.view())
                .with_pace(2.0)
                .with_pitch_shift(shift.view()),
        )
        .unwrap();

    assert_eq!(out.frame_counts, vec![4]);
    assert_eq!(out.pitch_predicted, array![[1.5f32, 1.5, 1.5]]);
}

#[test]
fn infer_regulates_volume_with_the_features() {
    let model = model_with(array![[2.0, 1.0, 3.0]]);
    let text = array![[1u32, 2, 3]];
    let volume = array![[0.1f32, 0.2, 0.3]];

    let out = model
        .infer(InferInputs::new(text.view()).with_volume(volume.view()))
        .unwrap();

    assert_eq!(
        out.volume.unwrap(),
        array![[0.1f32, 0.1, 0.2, 0.3, 0.3, 0.3]]
    );
}

#[test]
fn infer_rejects_energy_of_the_wrong_length() {
    let model = AcousticModel::builder(config())
        .encoder(MockEncoder)
        .decoder(IdentityDecoder)
        .duration_predictor(FixedDurations(array![[1.0, 1.0]]))
        .pitch_predictor(ConstPredictor::new(0.0))
        .pitch_embedding(ScalarEmbedding)
        .energy(ConstPredictor::new(0.0), ScalarEmbedding)
        .projection(SumProjection)
        .build()
        .unwrap();
    let text = array![[1u32, 2]];
    let energy = array![[1.0f32, 2.0, 3.0]];

    let err = model
        .infer(InferInputs::new(text.view()).with_energy(energy.view()))
        .unwrap_err();

    assert!(matches!(err, AcousticError::ShapeMismatch { what: "energy", .. }));
}

#[test]
fn forward_with_given_durations_averages_frame_pitch() {
    let model = model_with(array![[5.0, 5.0]]);
    let text = array![[1u32, 2]];
    let durs = array![[2usize, 2]];
    let pitch = array![[0.0f32, 2.0, 0.0, 4.0]];

    let out = model
        .forward(
            ForwardInputs::new(text.view())
                .with_durs(durs.view())
                .with_pitch(pitch.view())
                .training(true),
        )
        .unwrap();

    assert_eq!(out.pitch.unwrap(), array![[2.0f32, 4.0]]);
    assert_eq!(out.frame_counts, vec![4]);
    assert!(out.attn_hard.is_none());
    assert!(out.energy_pred.is_none());
}

#[test]
fn forward_without_durations_uses_predictions() {
    let model = model_with(array![[1.0, 2.0]]);
    let text = array![[1u32, 2]];

    let out = model.forward(ForwardInputs::new(text.view())).unwrap();

    assert_eq!(out.frame_counts, vec![3]);
    assert!(out.pitch.is_none());
    assert_eq!(out.pitch_predicted, array![[0.5f32, 0.5]]);
}

#[test]
fn forward_learns_alignment_from_the_spectrogram() {
    let model = AcousticModel::builder(config())
        .encoder(MockEncoder)
        .decoder(IdentityDecoder)
        .duration_predictor(FixedDurations(array![[1.0, 1.0]]))
        .pitch_predictor(ConstPredictor::new(0.0))
        .pitch_embedding(ScalarEmbedding)
        .aligner(EvenAligner)
        .projection(SumProjection)
        .build()
        .unwrap();
    let text = array![[1u32, 2]];
    let spec = Array3::<f32>::zeros((1, N_MEL, 4));
    let pitch = array![[0.0f32, 2.0, 0.0, 4.0]];

    let out = model
        .forward(
            ForwardInputs::new(text.view())
                .with_spec(spec.view(), None)
                .with_pitch(pitch.view())
                .training(true),
        )
        .unwrap();

    assert_eq!(out.attn_hard_dur.unwrap(), array![[2usize, 2]]);
    assert_eq!(out.attn_soft.unwrap().dim(), (1, 4, 2));
    assert_eq!(out.pitch.unwrap(), array![[2.0f32, 4.0]]);
    // regulated by the attention durations, not the predicted ones
    assert_eq!(out.frame_counts, vec![4]);
}

#[test]
fn forward_aligns_a_padded_batch() {
    let model = AcousticModel::builder(config())
        .encoder(MockEncoder)
        .decoder(IdentityDecoder)
        .duration_predictor(FixedDurations(array![[1.0, 1.0], [1.0, 0.0]]))
        .pitch_predictor(ConstPredictor::new(0.0))
        .pitch_embedding(ScalarEmbedding)
        .aligner(EvenAligner)
        .projection(SumProjection)
        .build()
        .unwrap();
    let text = array![[1u32, 2], [1, 0]];
    let spec = Array3::<f32>::zeros((2, N_MEL, 6));
    let mel_lens = [6usize, 4];
    // frames past the second row's length hold garbage
    let pitch = array![
        [1.0f32, 3.0, 5.0, 7.0, 9.0, 11.0],
        [2.0, 4.0, 6.0, 8.0, 99.0, 99.0]
    ];

    let out = model
        .forward(
            ForwardInputs::new(text.view())
                .with_spec(spec.view(), Some(&mel_lens))
                .with_pitch(pitch.view())
                .training(true),
        )
        .unwrap();

    let attn_hard_dur = out.attn_hard_dur.unwrap();
    assert_eq!(attn_hard_dur, array![[3usize, 3], [4, 0]]);
    assert_eq!(attn_hard_dur.sum_axis(ndarray::Axis(1)).to_vec(), vec![6, 4]);
    assert_eq!(out.pitch.unwrap(), array![[3.0f32, 9.0], [5.0, 0.0]]);
    assert_eq!(out.frame_counts, vec![6, 4]);
    assert_eq!(out.spect.dim(), (2, N_MEL, 6));
}

#[test]
fn given_durations_bound_each_row_of_a_padded_batch() {
    let model = model_with(array![[1.0, 1.0], [1.0, 0.0]]);
    let text = array![[1u32, 2], [1, 0]];
    let durs = array![[2usize, 2], [2, 0]];
    let pitch = array![[1.0f32, 3.0, 5.0, 7.0], [2.0, 4.0, 99.0, 99.0]];

    let out = model
        .forward(
            ForwardInputs::new(text.view())
                .with_durs(durs.view())
                .with_pitch(pitch.view())
                .training(true),
        )
        .unwrap();

    assert_eq!(out.pitch.unwrap(), array![[2.0f32, 6.0], [3.0, 0.0]]);
    assert_eq!(out.frame_counts, vec![4, 2]);
}

#[test]
fn infer_paces_each_row_separately() {
    let model = model_with(array![[2.0, 2.0, 4.0], [2.0, 4.0, 0.0]]);
    let text = array![[1u32, 2, 3], [1, 2, 0]];

    let out = model
        .infer(InferInputs::new(text.view()).with_pace(Pace::PerExample(vec![1.0, 2.0])))
        .unwrap();

    assert_eq!(out.frame_counts, vec![8, 3]);
    assert_eq!(out.spect.dim(), (2, N_MEL, 8));
    // the slower row is zero-padded after its three frames
    let second_row: Vec<f32> = out.spect.slice(ndarray::s![1, 0, ..]).to_vec();
    assert_eq!(second_row, vec![3.0, 5.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn forward_averages_energy_into_log_targets() {
    let model = AcousticModel::builder(config())
        .encoder(MockEncoder)
        .decoder(IdentityDecoder)
        .duration_predictor(FixedDurations(array![[1.0, 1.0]]))
        .pitch_predictor(ConstPredictor::new(0.0))
        .pitch_embedding(ScalarEmbedding)
        .energy(ConstPredictor::new(0.25), ScalarEmbedding)
        .projection(SumProjection)
        .build()
        .unwrap();
    let text = array![[1u32, 2]];
    let durs = array![[2usize, 2]];
    let pitch = array![[1.0f32, 1.0, 1.0, 1.0]];
    let energy = array![[1.0f32, 1.0, 3.0, 3.0]];

    let out = model
        .forward(
            ForwardInputs::new(text.view())
                .with_durs(durs.view())
                .with_pitch(pitch.view())
                .with_energy(energy.view()),
        )
        .unwrap();

    let target = out.energy_tgt.unwrap();
    assert!((target[[0, 0]] - 2.0f32.ln()).abs() < 1e-6);
    assert!((target[[0, 1]] - 4.0f32.ln()).abs() < 1e-6);
    assert_eq!(out.energy_pred.unwrap(), array![[0.25f32, 0.25]]);
}

#[test]
fn spectrogram_without_alignment_is_unsupported() {
    let model = model_with(array![[1.0, 1.0]]);
    let text = array![[1u32, 2]];
    let spec = Array3::<f32>::zeros((1, N_MEL, 4));

    let err = model
        .forward(ForwardInputs::new(text.view()).with_spec(spec.view(), None))
        .unwrap_err();

    assert!(matches!(err, AcousticError::UnsupportedCombination));
}

#[test]
fn training_without_alignment_requires_targets() {
    let model = model_with(array![[1.0, 1.0]]);
    let text = array![[1u32, 2]];
    let durs = array![[1usize, 1]];

    let err = model
        .forward(
            ForwardInputs::new(text.view())
                .with_durs(durs.view())
                .training(true),
        )
        .unwrap_err();

    assert!(matches!(err, AcousticError::MissingInput("pitch")));
}

#[test]
fn speaker_conditions_prosody_only_when_enabled() {
    for enabled in [true, false] {
        let pitch = ConstPredictor::new(0.0);
        let conditioned = Arc::clone(&pitch.conditioned);
        let model = AcousticModel::builder(
            config()
                .with_n_speakers(2)
                .with_prosody_conditioning(enabled),
        )
        .encoder(MockEncoder)
        .decoder(IdentityDecoder)
        .duration_predictor(FixedDurations(array![[1.0, 1.0]]))
        .pitch_predictor(pitch)
        .pitch_embedding(ScalarEmbedding)
        .speaker_table(SpeakerTable::new(array![[0.0f32, 0.0], [10.0, 10.0]]))
        .projection(SumProjection)
        .build()
        .unwrap();
        let text = array![[1u32, 2]];
        let speakers = [1usize];

        let out = model
            .infer(InferInputs::new(text.view()).with_speaker(&speakers))
            .unwrap();

        assert_eq!(conditioned.load(Ordering::SeqCst), enabled);
        // the speaker embedding is added to the encoder output
        assert_eq!(out.spect[[0, 0, 0]], 22.0);
    }
}

#[test]
fn builder_validates_components() {
    let err = AcousticModel::builder(config())
        .encoder(MockEncoder)
        .build()
        .unwrap_err();
    assert!(matches!(err, AcousticError::MissingInput("decoder")));

    let err = AcousticModel::builder(config().with_n_speakers(3))
        .encoder(MockEncoder)
        .decoder(IdentityDecoder)
        .duration_predictor(FixedDurations(array![[1.0]]))
        .pitch_predictor(ConstPredictor::new(0.0))
        .pitch_embedding(ScalarEmbedding)
        .projection(SumProjection)
        .build()
        .unwrap_err();
    assert!(matches!(err, AcousticError::InvalidConfig(_)));
}
