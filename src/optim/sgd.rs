use crate::error::Result;
use crate::model::lexical::{LexicalGradients, LexicalTranslator};
use crate::model::translator::Optimizer;

/// Plain SGD for `LexicalTranslator`.
///
/// `backward` only accumulates; `step` applies the accumulated gradient and
/// clears it, so several losses can feed one update.
pub struct Sgd {
    pub learning_rate: f64,
    pending: Option<LexicalGradients>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate, pending: None }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Applies one SGD update with the accumulated gradients.
    /// Returns `false` when nothing was accumulated.
    pub fn step(&mut self, model: &mut LexicalTranslator) -> Result<bool> {
        match self.pending.take() {
            Some(grads) => {
                model.apply_gradients(&grads, self.learning_rate)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn zero_grad(&mut self) {
        self.pending = None;
    }
}

impl Optimizer<LexicalTranslator> for Sgd {
    fn backward(&mut self, _model: &LexicalTranslator, grads: LexicalGradients) -> Result<()> {
        match self.pending.as_mut() {
            Some(acc) => acc.weights.add_scaled(&grads.weights, 1.0)?,
            None => self.pending = Some(grads),
        }
        Ok(())
    }
}
