pub mod bleu;
pub mod lm;

pub use bleu::{BleuScorer, BleuStats};
pub use lm::{ConstantLmScorer, LmScorer, PLACEHOLDER_LM_SCORE};
