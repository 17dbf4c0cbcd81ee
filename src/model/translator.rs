use std::collections::BTreeMap;

use crate::data::batch::{Batch, EncoderInput};
use crate::error::Result;
use crate::generate::hypothesis::Hypothesis;
use crate::generate::options::DecodeParams;

/// A flat logging record: metric name to value.
pub type LogRecord = BTreeMap<String, f64>;

/// Whether a loss computation should produce gradients.
///
/// Passed explicitly to every call that cares instead of living as mutable
/// state on the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelMode {
    Train,
    Eval,
}

impl ModelMode {
    pub fn tracks_gradients(self) -> bool {
        self == ModelMode::Train
    }

    pub fn name(self) -> &'static str {
        match self {
            ModelMode::Train => "train",
            ModelMode::Eval => "eval",
        }
    }
}

/// A translation model that can decode and be trained.
///
/// `generate` takes `&self`: decoding never touches parameters and never
/// yields gradients. Training goes through a `WeightedCriterion`, which hands
/// back `Gradients` for an `Optimizer` to consume.
pub trait TrainableTranslator {
    type Gradients;

    /// Decodes every row of `input`; returns one best-first hypothesis list
    /// per row, in row order.
    fn generate(&self, input: &EncoderInput, params: &DecodeParams) -> Result<Vec<Vec<Hypothesis>>>;
}

/// Result of a weighted loss computation.
#[derive(Debug, Clone)]
pub struct CriterionOutput<G> {
    /// Summed weighted loss.
    pub loss: f64,
    /// Normalizer reported to the trainer (tokens, here).
    pub sample_size: usize,
    pub logging: LogRecord,
    /// Per-example weighted losses in batch order, when `reduce` was false.
    pub unreduced: Option<Vec<f64>>,
    /// Present only in `ModelMode::Train`.
    pub grads: Option<G>,
}

/// Per-example weighted loss bound to a model type.
pub trait WeightedCriterion<M: TrainableTranslator + ?Sized> {
    fn compute(
        &self,
        model: &M,
        batch: &Batch,
        mode: ModelMode,
        reduce: bool,
    ) -> Result<CriterionOutput<M::Gradients>>;
}

/// Receives the gradients of one loss. The parameter update itself happens
/// later, outside the criterion.
pub trait Optimizer<M: TrainableTranslator + ?Sized> {
    fn backward(&mut self, model: &M, grads: M::Gradients) -> Result<()>;
}
