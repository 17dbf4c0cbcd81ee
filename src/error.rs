//! Error types for the dual-reward criterion.

use thiserror::Error;

use crate::data::dictionary::Token;

/// Everything that can abort a dual-learning step.
///
/// None of these are retried: the enclosing training loop decides whether to
/// skip the batch or stop.
#[derive(Debug, Error)]
pub enum CriterionError {
    /// The decoder handed back a hypothesis that does not end with eos.
    #[error(
        "Expected generated translation to have eos (id: {eos}) at end, \
         but instead found token id {found:?} at end."
    )]
    MissingEos { eos: Token, found: Option<Token> },

    #[error("decoder returned {got} hypothesis lists for a batch of {expected} examples")]
    HypothesisCount { expected: usize, got: usize },

    #[error("decoder returned no hypotheses for example {0}")]
    EmptyHypotheses(usize),

    #[error("aggregated sample_size is zero")]
    ZeroSampleSize,

    #[error("aggregated ntokens is zero")]
    ZeroTokens,

    #[error("criterion ran in {0} mode and produced no gradients")]
    MissingGradients(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for criterion operations
pub type Result<T> = std::result::Result<T, CriterionError>;
