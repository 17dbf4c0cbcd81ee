use serde::{Deserialize, Serialize};

use crate::data::batch::{strip_pad, EncoderInput};
use crate::data::dictionary::{Dictionary, Token};
use crate::error::Result;
use crate::generate::beam::{BeamSearch, StepScorer};
use crate::generate::hypothesis::Hypothesis;
use crate::generate::options::DecodeParams;
use crate::math::matrix::Matrix;
use crate::math::softmax::log_softmax;
use crate::model::translator::TrainableTranslator;

/// A position-wise lexical translation model.
///
/// Output position `j` is predicted from a single context token: the source
/// token at position `j`, or source eos once `j` runs past the end of the
/// source. `weights` holds one row of target logits per source symbol, so
/// the model learns word-for-word translation plus where to stop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalTranslator {
    /// Shape: (source vocab, target vocab).
    pub weights: Matrix,
    src_pad: Token,
    src_eos: Token,
    src_unk: Token,
    tgt_pad: Token,
    tgt_eos: Token,
    tgt_unk: Token,
}

/// Gradient of a loss with respect to `LexicalTranslator::weights`.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalGradients {
    pub weights: Matrix,
}

impl LexicalTranslator {
    /// Xavier-initialized model.
    pub fn new(src_dict: &Dictionary, tgt_dict: &Dictionary, seed: u64) -> LexicalTranslator {
        LexicalTranslator::with_weights(
            src_dict,
            tgt_dict,
            Matrix::xavier(src_dict.len(), tgt_dict.len(), seed),
        )
    }

    /// Maps every source symbol to the target symbol with the same spelling
    /// (unk when the target dictionary lacks it) with logit `sharpness`.
    pub fn identity(src_dict: &Dictionary, tgt_dict: &Dictionary, sharpness: f64) -> LexicalTranslator {
        let mut weights = Matrix::zeros(src_dict.len(), tgt_dict.len());
        for s in 0..src_dict.len() {
            let t = if s == src_dict.eos() {
                tgt_dict.eos()
            } else {
                tgt_dict.index(src_dict.symbol(s))
            };
            weights.data[s][t] = sharpness;
        }
        LexicalTranslator::with_weights(src_dict, tgt_dict, weights)
    }

    fn with_weights(src_dict: &Dictionary, tgt_dict: &Dictionary, weights: Matrix) -> LexicalTranslator {
        LexicalTranslator {
            weights,
            src_pad: src_dict.pad(),
            src_eos: src_dict.eos(),
            src_unk: src_dict.unk(),
            tgt_pad: tgt_dict.pad(),
            tgt_eos: tgt_dict.eos(),
            tgt_unk: tgt_dict.unk(),
        }
    }

    pub fn src_pad(&self) -> Token {
        self.src_pad
    }

    pub fn tgt_pad(&self) -> Token {
        self.tgt_pad
    }

    /// Row of `weights` that predicts output position `position`.
    pub fn context(&self, source: &[Token], position: usize) -> Token {
        let ctx = source.get(position).copied().unwrap_or(self.src_eos);
        if ctx < self.weights.rows {
            ctx
        } else {
            self.src_unk
        }
    }

    pub fn log_probs(&self, source: &[Token], position: usize) -> Vec<f64> {
        log_softmax(self.weights.row(self.context(source, position)))
    }

    /// `weights -= lr * grads`.
    pub fn apply_gradients(&mut self, grads: &LexicalGradients, lr: f64) -> Result<()> {
        self.weights.add_scaled(&grads.weights, -lr)
    }

    pub fn zero_gradients(&self) -> LexicalGradients {
        LexicalGradients { weights: Matrix::zeros(self.weights.rows, self.weights.cols) }
    }

    /// Serializes the model to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a model written by `save_json`.
    pub fn load_json(path: &str) -> std::io::Result<LexicalTranslator> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

struct LexicalStep<'a> {
    model: &'a LexicalTranslator,
    source: &'a [Token],
}

impl StepScorer for LexicalStep<'_> {
    fn step_log_probs(&self, prefix: &[Token]) -> Vec<f64> {
        self.model.log_probs(self.source, prefix.len())
    }
}

impl TrainableTranslator for LexicalTranslator {
    type Gradients = LexicalGradients;

    fn generate(&self, input: &EncoderInput, params: &DecodeParams) -> Result<Vec<Vec<Hypothesis>>> {
        let search = BeamSearch::new(params, self.tgt_pad, self.tgt_eos, self.tgt_unk);
        Ok(input
            .src_tokens
            .iter()
            .map(|row| {
                let source = strip_pad(row, self.src_pad);
                search.search(&LexicalStep { model: self, source: &source })
            })
            .collect())
    }
}
