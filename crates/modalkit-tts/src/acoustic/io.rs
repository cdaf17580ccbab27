use crate::regulate::Pace;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

/// Reference utterance for a global style/speaker encoder.
#[derive(Debug, Clone)]
pub struct ReferenceSpeech<'a> {
    /// `(B, n_mel, T_ref)` reference spectrogram.
    pub spec: ArrayView3<'a, f32>,
    pub lengths: &'a [usize],
}

/// Inputs of a training-time forward pass.
#[derive(Debug, Clone)]
pub struct ForwardInputs<'a> {
    /// `(B, T_text)` token ids.
    pub text: ArrayView2<'a, u32>,
    /// `(B, T_text)` ground-truth frame counts.
    pub durs: Option<ArrayView2<'a, usize>>,
    /// `(B, T_audio)` frame-level pitch or `(B, T_text)` token-level pitch.
    pub pitch: Option<ArrayView2<'a, f32>>,
    /// `(B, T_audio)` frame-level energy.
    pub energy: Option<ArrayView2<'a, f32>>,
    pub speaker: Option<&'a [usize]>,
    pub pace: Pace,
    /// `(B, n_mel, T_spec)` target spectrogram.
    pub spec: Option<ArrayView3<'a, f32>>,
    /// `(B, T_spec, T_text)` alignment prior.
    pub attn_prior: Option<ArrayView3<'a, f32>>,
    pub mel_lens: Option<&'a [usize]>,
    pub input_lens: Option<&'a [usize]>,
    pub reference: Option<ReferenceSpeech<'a>>,
    /// `(B, D)` externally computed speaker embedding.
    pub speaker_embedding: Option<ArrayView2<'a, f32>>,
    /// Training mode enforces ground-truth inputs when alignment is not learned.
    pub training: bool,
}

impl<'a> ForwardInputs<'a> {
    pub fn new(text: ArrayView2<'a, u32>) -> Self {
        Self {
            text,
            durs: None,
            pitch: None,
            energy: None,
            speaker: None,
            pace: Pace::default(),
            spec: None,
            attn_prior: None,
            mel_lens: None,
            input_lens: None,
            reference: None,
            speaker_embedding: None,
            training: false,
        }
    }

    pub fn with_durs(mut self, durs: ArrayView2<'a, usize>) -> Self {
        self.durs = Some(durs);
        self
    }

    pub fn with_pitch(mut self, pitch: ArrayView2<'a, f32>) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_energy(mut self, energy: ArrayView2<'a, f32>) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn with_speaker(mut self, speaker: &'a [usize]) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn with_pace(mut self, pace: impl Into<Pace>) -> Self {
        self.pace = pace.into();
        self
    }

    pub fn with_spec(mut self, spec: ArrayView3<'a, f32>, mel_lens: Option<&'a [usize]>) -> Self {
        self.spec = Some(spec);
        self.mel_lens = mel_lens;
        self
    }

    pub fn with_attn_prior(mut self, attn_prior: ArrayView3<'a, f32>) -> Self {
        self.attn_prior = Some(attn_prior);
        self
    }

    pub fn with_input_lens(mut self, input_lens: &'a [usize]) -> Self {
        self.input_lens = Some(input_lens);
        self
    }

    pub fn with_reference(mut self, reference: ReferenceSpeech<'a>) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_speaker_embedding(mut self, embedding: ArrayView2<'a, f32>) -> Self {
        self.speaker_embedding = Some(embedding);
        self
    }

    pub fn training(mut self, training: bool) -> Self {
        self.training = training;
        self
    }
}

/// Outputs of a training-time forward pass.
#[derive(Debug, Clone)]
pub struct ForwardOutputs {
    /// `(B, n_mel, F)` predicted spectrogram.
    pub spect: Array3<f32>,
    pub frame_counts: Vec<usize>,
    pub durs_predicted: Array2<f32>,
    pub log_durs_predicted: Array2<f32>,
    pub pitch_predicted: Array2<f32>,
    pub attn_soft: Option<Array3<f32>>,
    pub attn_logprob: Option<Array3<f32>>,
    pub attn_hard: Option<Array3<f32>>,
    pub attn_hard_dur: Option<Array2<usize>>,
    /// Token-level pitch target actually fed to the pitch embedding.
    pub pitch: Option<Array2<f32>>,
    pub energy_pred: Option<Array2<f32>>,
    /// Token-level `ln(1 + energy)` target.
    pub energy_tgt: Option<Array2<f32>>,
}

/// Inputs of an inference call.
#[derive(Debug, Clone)]
pub struct InferInputs<'a> {
    pub text: ArrayView2<'a, u32>,
    /// `(B, T_text)` additive shift on the normalised pitch prediction.
    pub pitch_shift: Option<ArrayView2<'a, f32>>,
    pub speaker: Option<&'a [usize]>,
    /// `(B, T_text)` token-level energy replacing the prediction.
    pub energy: Option<ArrayView2<'a, f32>>,
    pub pace: Pace,
    /// `(B, T_text)` token-level volume expanded alongside the features.
    pub volume: Option<ArrayView2<'a, f32>>,
}

impl<'a> InferInputs<'a> {
    pub fn new(text: ArrayView2<'a, u32>) -> Self {
        Self {
            text,
            pitch_shift: None,
            speaker: None,
            energy: None,
            pace: Pace::default(),
            volume: None,
        }
    }

    pub fn with_pitch_shift(mut self, shift: ArrayView2<'a, f32>) -> Self {
        self.pitch_shift = Some(shift);
        self
    }

    pub fn with_speaker(mut self, speaker: &'a [usize]) -> Self {
        self.speaker = Some(speaker);
        self
    }

    pub fn with_energy(mut self, energy: ArrayView2<'a, f32>) -> Self {
        self.energy = Some(energy);
        self
    }

    pub fn with_pace(mut self, pace: impl Into<Pace>) -> Self {
        self.pace = pace.into();
        self
    }

    pub fn with_volume(mut self, volume: ArrayView2<'a, f32>) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// Outputs of an inference call.
#[derive(Debug, Clone)]
pub struct InferOutputs {
    pub spect: Array3<f32>,
    pub frame_counts: Vec<usize>,
    pub durs_predicted: Array2<f32>,
    pub log_durs_predicted: Array2<f32>,
    pub pitch_predicted: Array2<f32>,
    /// `(B, F)` frame-level volume when a volume track was supplied.
    pub volume: Option<Array2<f32>>,
}
