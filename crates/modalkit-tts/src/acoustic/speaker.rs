use crate::error::{AcousticError, AcousticResult};
use ndarray::{Array2, Array3, Axis};

/// Learned speaker embedding table, one `D`-wide row per speaker.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakerTable {
    weights: Array2<f32>,
}

impl SpeakerTable {
    pub fn new(weights: Array2<f32>) -> Self {
        Self { weights }
    }

    pub fn n_speakers(&self) -> usize {
        self.weights.nrows()
    }

    pub fn dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Look up `(B, 1, D)` embeddings for a batch of speaker ids.
    pub fn lookup(&self, speakers: &[usize]) -> AcousticResult<Array3<f32>> {
        if let Some(&bad) = speakers.iter().find(|&&id| id >= self.n_speakers()) {
            return Err(AcousticError::InvalidConfig(format!(
                "speaker id {bad} out of range for {} speakers",
                self.n_speakers()
            )));
        }
        let rows = self.weights.select(Axis(0), speakers);
        Ok(rows.insert_axis(Axis(1)))
    }
}
