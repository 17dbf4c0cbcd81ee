use crate::data::dictionary::Token;

/// Cross-entropy against a single target token, computed from log-probabilities.
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    /// Negative log-likelihood of `target`: `-log_probs[target]`.
    pub fn loss(log_probs: &[f64], target: Token) -> f64 {
        -log_probs[target]
    }

    /// Gradient of the combined softmax + cross-entropy w.r.t. the logits:
    ///   ∂L/∂z_i = p_i - 1[i == target]
    pub fn derivative(log_probs: &[f64], target: Token) -> Vec<f64> {
        log_probs
            .iter()
            .enumerate()
            .map(|(i, lp)| lp.exp() - if i == target { 1.0 } else { 0.0 })
            .collect()
    }
}
