use super::{
    AcousticConfig, AlignmentNetwork, DurationSource, Encoded, FeatureEmbedding, ForwardInputs,
    ForwardOutputs, FrameDecoder, InferInputs, InferOutputs, MelProjection, SpeakerEncoder,
    SpeakerTable, TemporalPredictor, TextEncoder,
};
use crate::align::{average_features_1d, binarize_attention, hard_durations};
use crate::durations::to_float_durations;
use crate::error::{AcousticError, AcousticResult};
use crate::regulate::Pace;
use crate::stats::PitchStats;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Builder for [`AcousticModel`].
///
/// The encoder, decoder, duration predictor, pitch predictor, pitch
/// embedding and output projection are required. An energy predictor must
/// come with its embedding, and a speaker table is required when the
/// configuration declares more than one speaker.
pub struct AcousticModelBuilder {
    config: AcousticConfig,
    pitch_stats: PitchStats,
    encoder: Option<Box<dyn TextEncoder>>,
    decoder: Option<Box<dyn FrameDecoder>>,
    duration_predictor: Option<Box<dyn TemporalPredictor>>,
    pitch_predictor: Option<Box<dyn TemporalPredictor>>,
    pitch_embedding: Option<Box<dyn FeatureEmbedding>>,
    energy: Option<(Box<dyn TemporalPredictor>, Box<dyn FeatureEmbedding>)>,
    aligner: Option<Box<dyn AlignmentNetwork>>,
    speaker_encoder: Option<Box<dyn SpeakerEncoder>>,
    speaker_table: Option<SpeakerTable>,
    projection: Option<Box<dyn MelProjection>>,
}

impl AcousticModelBuilder {
    pub fn new(config: AcousticConfig) -> Self {
        Self {
            config,
            pitch_stats: PitchStats::default(),
            encoder: None,
            decoder: None,
            duration_predictor: None,
            pitch_predictor: None,
            pitch_embedding: None,
            energy: None,
            aligner: None,
            speaker_encoder: None,
            speaker_table: None,
            projection: None,
        }
    }

    pub fn encoder(mut self, encoder: impl TextEncoder + 'static) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    pub fn decoder(mut self, decoder: impl FrameDecoder + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    pub fn duration_predictor(mut self, predictor: impl TemporalPredictor + 'static) -> Self {
        self.duration_predictor = Some(Box::new(predictor));
        self
    }

    pub fn pitch_predictor(mut self, predictor: impl TemporalPredictor + 'static) -> Self {
        self.pitch_predictor = Some(Box::new(predictor));
        self
    }

    pub fn pitch_embedding(mut self, embedding: impl FeatureEmbedding + 'static) -> Self {
        self.pitch_embedding = Some(Box::new(embedding));
        self
    }

    pub fn energy(
        mut self,
        predictor: impl TemporalPredictor + 'static,
        embedding: impl FeatureEmbedding + 'static,
    ) -> Self {
        self.energy = Some((Box::new(predictor), Box::new(embedding)));
        self
    }

    /// Enables alignment learning.
    pub fn aligner(mut self, aligner: impl AlignmentNetwork + 'static) -> Self {
        self.aligner = Some(Box::new(aligner));
        self
    }

    pub fn speaker_encoder(mut self, encoder: impl SpeakerEncoder + 'static) -> Self {
        self.speaker_encoder = Some(Box::new(encoder));
        self
    }

    pub fn speaker_table(mut self, table: SpeakerTable) -> Self {
        self.speaker_table = Some(table);
        self
    }

    pub fn projection(mut self, projection: impl MelProjection + 'static) -> Self {
        self.projection = Some(Box::new(projection));
        self
    }

    pub fn pitch_stats(mut self, stats: PitchStats) -> Self {
        self.pitch_stats = stats;
        self
    }

    pub fn build(self) -> AcousticResult<AcousticModel> {
        self.config.validate()?;
        self.pitch_stats.validate()?;

        let speaker_table = match (self.config.n_speakers, self.speaker_table) {
            (1, _) => None,
            (n, Some(table)) => {
                if table.n_speakers() != n || table.dim() != self.config.symbols_embedding_dim {
                    return Err(AcousticError::InvalidConfig(format!(
                        "speaker table is {}x{}, expected {}x{}",
                        table.n_speakers(),
                        table.dim(),
                        n,
                        self.config.symbols_embedding_dim
                    )));
                }
                Some(table)
            }
            (n, None) => {
                return Err(AcousticError::InvalidConfig(format!(
                    "a speaker table is required for {n} speakers"
                )));
            }
        };

        let model = AcousticModel {
            encoder: self.encoder.ok_or(AcousticError::MissingInput("encoder"))?,
            decoder: self.decoder.ok_or(AcousticError::MissingInput("decoder"))?,
            duration_predictor: self
                .duration_predictor
                .ok_or(AcousticError::MissingInput("duration_predictor"))?,
            pitch_predictor: self
                .pitch_predictor
                .ok_or(AcousticError::MissingInput("pitch_predictor"))?,
            pitch_embedding: self
                .pitch_embedding
                .ok_or(AcousticError::MissingInput("pitch_embedding"))?,
            projection: self
                .projection
                .ok_or(AcousticError::MissingInput("projection"))?,
            energy: self.energy,
            aligner: self.aligner,
            speaker_encoder: self.speaker_encoder,
            speaker_table,
            pitch_stats: self.pitch_stats,
            config: self.config,
        };

        log::info!(
            "built acoustic model: {} speakers, learn_alignment={}, energy={}",
            model.config.n_speakers,
            model.learn_alignment(),
            model.energy.is_some()
        );
        Ok(model)
    }
}

/// Duration-based acoustic model: text tokens in, mel spectrogram out.
///
/// Immutable after construction, so a single instance can serve concurrent
/// inference calls through `&self`.
pub struct AcousticModel {
    config: AcousticConfig,
    pitch_stats: PitchStats,
    encoder: Box<dyn TextEncoder>,
    decoder: Box<dyn FrameDecoder>,
    duration_predictor: Box<dyn TemporalPredictor>,
    pitch_predictor: Box<dyn TemporalPredictor>,
    pitch_embedding: Box<dyn FeatureEmbedding>,
    energy: Option<(Box<dyn TemporalPredictor>, Box<dyn FeatureEmbedding>)>,
    aligner: Option<Box<dyn AlignmentNetwork>>,
    speaker_encoder: Option<Box<dyn SpeakerEncoder>>,
    speaker_table: Option<SpeakerTable>,
    projection: Box<dyn MelProjection>,
}

impl std::fmt::Debug for AcousticModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcousticModel")
            .field("config", &self.config)
            .field("pitch_stats", &self.pitch_stats)
            .field("learn_alignment", &self.learn_alignment())
            .field("energy", &self.energy.is_some())
            .finish_non_exhaustive()
    }
}

impl AcousticModel {
    pub fn builder(config: AcousticConfig) -> AcousticModelBuilder {
        AcousticModelBuilder::new(config)
    }

    pub fn config(&self) -> &AcousticConfig {
        &self.config
    }

    pub fn pitch_stats(&self) -> &PitchStats {
        &self.pitch_stats
    }

    pub fn learn_alignment(&self) -> bool {
        self.aligner.is_some()
    }

    /// A `(B, T)` pitch shift raising every token by `hz` Hertz, expressed in
    /// the normalised pitch space the predictor works in.
    pub fn uniform_pitch_shift(&self, batch: usize, tokens: usize, hz: f32) -> Array2<f32> {
        Array2::from_elem((batch, tokens), self.pitch_stats.shift(hz))
    }

    /// Training-time pass. Returns the predicted spectrogram together with
    /// every intermediate needed for the losses.
    pub fn forward(&self, inputs: ForwardInputs<'_>) -> AcousticResult<ForwardOutputs> {
        if inputs.training && !self.learn_alignment() {
            if inputs.durs.is_none() {
                return Err(AcousticError::MissingInput("durs"));
            }
            if inputs.pitch.is_none() {
                return Err(AcousticError::MissingInput("pitch"));
            }
        }
        let source = DurationSource::select(
            inputs.spec.is_some(),
            self.learn_alignment(),
            inputs.durs.is_some(),
        )?;

        let mut speaker = self.lookup_speaker(inputs.speaker)?;
        if let Some(encoder) = &self.speaker_encoder {
            speaker = encoder.encode(
                speaker.as_ref().map(|emb| emb.view()),
                inputs.reference.as_ref(),
                inputs.speaker_embedding,
            )?;
        }
        let speaker = speaker.as_ref().map(|emb| emb.view());

        let encoded = self.encode(inputs.text, speaker)?;
        let token_lens = encoded.lengths();
        let Encoded { mut hidden, mask } = encoded;
        let (log_durs_predicted, durs_predicted) = self.predict_durations(&hidden, &mask, speaker)?;

        let mut alignment = None;
        if let (Some(aligner), Some(spec)) = (&self.aligner, inputs.spec) {
            let text_embedding = self.encoder.embed(inputs.text)?;
            let conditioning = speaker.filter(|_| self.config.speaker_emb_condition_aligner);
            let soft = aligner.align(
                spec,
                text_embedding.view(),
                mask.view(),
                inputs.attn_prior,
                conditioning,
            )?;

            let spec_frames = spec.dim().2;
            let input_lens = inputs
                .input_lens
                .map_or_else(|| token_lens.clone(), <[usize]>::to_vec);
            let mel_lens = inputs
                .mel_lens
                .map_or_else(|| vec![spec_frames; input_lens.len()], <[usize]>::to_vec);
            let attn_hard = binarize_attention(soft.soft.view(), &input_lens, &mel_lens)?;
            let attn_hard_dur = hard_durations(attn_hard.view());
            log::debug!("extracted hard alignment over {spec_frames} frames");
            alignment = Some((soft, attn_hard, attn_hard_dur, mel_lens));
        }
        let attn_hard_dur = alignment
            .as_ref()
            .map(|(_, _, dur, mel_lens)| (dur, mel_lens.as_slice()));

        let pitch_predicted =
            self.predict_prosody(&*self.pitch_predictor, &hidden, &mask, speaker)?;
        let pitch = match inputs.pitch {
            Some(pitch) if self.learn_alignment() && pitch.ncols() == pitch_predicted.ncols() => {
                pitch.to_owned()
            }
            Some(pitch) => {
                let (durations, lens) =
                    self.averaging_durations(attn_hard_dur, inputs.durs, inputs.mel_lens)?;
                average_features_1d(pitch, durations, Some(&lens))?
            }
            None => pitch_predicted.clone(),
        };
        let pitch_emb = self.pitch_embedding.embed(pitch.view())?;
        add_embedding(&mut hidden, pitch_emb, "pitch embedding")?;

        let mut energy_pred = None;
        let mut energy_tgt = None;
        if let Some((predictor, embedding)) = &self.energy {
            let predicted = predictor.predict(hidden.view(), mask.view(), None)?;
            let target = match inputs.energy {
                Some(energy) => {
                    let (durations, lens) =
                        self.averaging_durations(attn_hard_dur, inputs.durs, inputs.mel_lens)?;
                    Some(average_features_1d(energy, durations, Some(&lens))?.mapv(f32::ln_1p))
                }
                None => None,
            };
            let energy_emb = embedding.embed(target.as_ref().unwrap_or(&predicted).view())?;
            add_embedding(&mut hidden, energy_emb, "energy embedding")?;
            energy_pred = Some(predicted);
            energy_tgt = target;
        }

        let regulating = match source {
            DurationSource::AttentionHard => {
                let (hard, _) =
                    attn_hard_dur.ok_or(AcousticError::MissingInput("attn_hard_dur"))?;
                to_float_durations(hard.view())
            }
            DurationSource::Given => {
                let durs = inputs.durs.ok_or(AcousticError::MissingInput("durs"))?;
                to_float_durations(durs)
            }
            DurationSource::Predicted => durs_predicted.clone(),
        };
        log::debug!("regulating with {source:?} durations");
        let (spect, frame_counts) =
            self.synthesize(regulating.view(), &hidden, &inputs.pace, &token_lens, speaker)?;

        let pitch = inputs.pitch.map(|_| pitch);
        let (attn_soft, attn_logprob, attn_hard, attn_hard_dur) = match alignment {
            Some((soft, hard, dur, _)) => (
                Some(soft.soft),
                Some(soft.log_prob),
                Some(hard),
                Some(dur),
            ),
            None => (None, None, None, None),
        };

        Ok(ForwardOutputs {
            spect,
            frame_counts,
            durs_predicted,
            log_durs_predicted,
            pitch_predicted,
            attn_soft,
            attn_logprob,
            attn_hard,
            attn_hard_dur,
            pitch,
            energy_pred,
            energy_tgt,
        })
    }

    /// Serving pass driven entirely by the predictors.
    pub fn infer(&self, inputs: InferInputs<'_>) -> AcousticResult<InferOutputs> {
        let (batch, tokens) = inputs.text.dim();
        let speaker = self.lookup_speaker(inputs.speaker)?;
        let speaker = speaker.as_ref().map(|emb| emb.view());

        let encoded = self.encode(inputs.text, speaker)?;
        let token_lens = encoded.lengths();
        let Encoded { mut hidden, mask } = encoded;
        let (log_durs_predicted, durs_predicted) = self.predict_durations(&hidden, &mask, speaker)?;

        let mut pitch_predicted =
            self.predict_prosody(&*self.pitch_predictor, &hidden, &mask, speaker)?;
        if let Some(shift) = inputs.pitch_shift {
            check_token_track(shift, batch, tokens, "pitch_shift")?;
            pitch_predicted += &shift;
        }
        let pitch_emb = self.pitch_embedding.embed(pitch_predicted.view())?;
        add_embedding(&mut hidden, pitch_emb, "pitch embedding")?;

        if let Some((predictor, embedding)) = &self.energy {
            let energy_emb = match inputs.energy {
                Some(energy) => {
                    check_token_track(energy, batch, tokens, "energy")?;
                    embedding.embed(energy)?
                }
                None => {
                    let predicted = predictor.predict(hidden.view(), mask.view(), None)?;
                    embedding.embed(predicted.view())?
                }
            };
            add_embedding(&mut hidden, energy_emb, "energy embedding")?;
        }

        let (spect, frame_counts) = self.synthesize(
            durs_predicted.view(),
            &hidden,
            &inputs.pace,
            &token_lens,
            speaker,
        )?;

        let volume = match inputs.volume {
            Some(volume) => {
                check_token_track(volume, batch, tokens, "volume")?;
                let regulated = self.config.regulator.regulate_with_lengths(
                    durs_predicted.view(),
                    volume.insert_axis(Axis(2)),
                    &inputs.pace,
                    Some(&token_lens),
                )?;
                Some(regulated.frames.index_axis_move(Axis(2), 0))
            }
            None => None,
        };

        Ok(InferOutputs {
            spect,
            frame_counts,
            durs_predicted,
            log_durs_predicted,
            pitch_predicted,
            volume,
        })
    }

    fn lookup_speaker(&self, speaker: Option<&[usize]>) -> AcousticResult<Option<Array3<f32>>> {
        match (&self.speaker_table, speaker) {
            (Some(table), Some(ids)) => table.lookup(ids).map(Some),
            _ => Ok(None),
        }
    }

    fn encode(
        &self,
        text: ArrayView2<'_, u32>,
        speaker: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<Encoded> {
        let encoded = self.encoder.encode(text, speaker)?;
        let (batch, tokens) = text.dim();
        let (hidden_batch, hidden_tokens, dim) = encoded.hidden.dim();
        if (hidden_batch, hidden_tokens, dim) != (batch, tokens, self.config.symbols_embedding_dim)
        {
            return Err(AcousticError::shape(
                "encoder output",
                &[batch, tokens, self.config.symbols_embedding_dim],
                encoded.hidden.shape(),
            ));
        }
        if encoded.mask.dim() != (batch, tokens) {
            return Err(AcousticError::shape(
                "encoder mask",
                &[batch, tokens],
                encoded.mask.shape(),
            ));
        }
        Ok(encoded)
    }

    fn predict_prosody(
        &self,
        predictor: &dyn TemporalPredictor,
        hidden: &Array3<f32>,
        mask: &Array2<f32>,
        speaker: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<Array2<f32>> {
        let conditioning = speaker.filter(|_| self.config.speaker_emb_condition_prosody);
        let predicted = predictor.predict(hidden.view(), mask.view(), conditioning)?;
        if predicted.dim() != mask.dim() {
            return Err(AcousticError::shape(
                "temporal predictor output",
                mask.shape(),
                predicted.shape(),
            ));
        }
        Ok(predicted)
    }

    fn predict_durations(
        &self,
        hidden: &Array3<f32>,
        mask: &Array2<f32>,
        speaker: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<(Array2<f32>, Array2<f32>)> {
        let log_durs = self.predict_prosody(&*self.duration_predictor, hidden, mask, speaker)?;
        let durs = self.config.durations.durations_from_log(log_durs.view());
        Ok((log_durs, durs))
    }

    /// Durations used to collapse frame-level pitch or energy onto tokens,
    /// with the number of valid frames of every row: the hard alignment and
    /// its mel lengths when one was extracted, otherwise the given durations.
    /// Explicit `mel_lens` take precedence over the lengths the given
    /// durations imply.
    fn averaging_durations<'a>(
        &self,
        attn_hard_dur: Option<(&'a Array2<usize>, &[usize])>,
        durs: Option<ArrayView2<'a, usize>>,
        mel_lens: Option<&[usize]>,
    ) -> AcousticResult<(ArrayView2<'a, usize>, Vec<usize>)> {
        match (attn_hard_dur, durs) {
            (Some((hard, lens)), _) => Ok((hard.view(), lens.to_vec())),
            (_, Some(durs)) => {
                let lens = mel_lens.map_or_else(
                    || durs.rows().into_iter().map(|row| row.sum()).collect(),
                    <[usize]>::to_vec,
                );
                Ok((durs, lens))
            }
            _ => Err(AcousticError::MissingInput("durs")),
        }
    }

    fn synthesize(
        &self,
        durations: ArrayView2<'_, f32>,
        hidden: &Array3<f32>,
        pace: &Pace,
        token_lens: &[usize],
        speaker: Option<ArrayView3<'_, f32>>,
    ) -> AcousticResult<(Array3<f32>, Vec<usize>)> {
        let regulated = self.config.regulator.regulate_with_lengths(
            durations,
            hidden.view(),
            pace,
            Some(token_lens),
        )?;

        let conditioning = speaker.filter(|_| self.config.speaker_emb_condition_decoder);
        let decoded = self.decoder.decode(
            regulated.frames.view(),
            &regulated.frame_counts,
            conditioning,
        )?;
        let spect = self.projection.project(decoded.view())?;

        let (batch, frames, _) = regulated.frames.dim();
        let expected = [batch, self.config.n_mel_channels, frames];
        if spect.shape() != &expected[..] {
            return Err(AcousticError::shape("spectrogram", &expected, spect.shape()));
        }
        Ok((spect, regulated.frame_counts))
    }
}

fn add_embedding(
    hidden: &mut Array3<f32>,
    embedding: Array3<f32>,
    what: &'static str,
) -> AcousticResult<()> {
    if embedding.dim() != hidden.dim() {
        return Err(AcousticError::shape(what, hidden.shape(), embedding.shape()));
    }
    *hidden += &embedding;
    Ok(())
}

fn check_token_track(
    track: ArrayView2<'_, f32>,
    batch: usize,
    tokens: usize,
    what: &'static str,
) -> AcousticResult<()> {
    if track.dim() != (batch, tokens) {
        return Err(AcousticError::shape(what, &[batch, tokens], track.shape()));
    }
    Ok(())
}
