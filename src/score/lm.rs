use crate::data::dictionary::Token;

/// Forward reward used until a pretrained target-side LM is plugged in.
pub const PLACEHOLDER_LM_SCORE: f64 = 0.5;

/// Scores how fluent a pseudo-target looks, in [0, 1].
pub trait LmScorer {
    fn score(&self, tokens: &[Token]) -> f64;
}

/// Returns the same score for every sentence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantLmScorer {
    pub value: f64,
}

impl Default for ConstantLmScorer {
    fn default() -> Self {
        ConstantLmScorer { value: PLACEHOLDER_LM_SCORE }
    }
}

impl LmScorer for ConstantLmScorer {
    fn score(&self, _tokens: &[Token]) -> f64 {
        self.value
    }
}
