use serde::{Deserialize, Serialize};

use crate::data::dictionary::Token;

/// One training example before collation.
///
/// Monolingual input has no target; the dual-reward criterion fills targets
/// in with pseudo labels and sets `weight` to the example's reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: usize,
    pub source: Vec<Token>,
    pub target: Option<Vec<Token>>,
    pub weight: f64,
}

impl Sample {
    /// A source-only example with weight 1.0.
    pub fn monolingual(id: usize, source: Vec<Token>) -> Sample {
        Sample { id, source, target: None, weight: 1.0 }
    }

    pub fn weighted_pair(id: usize, source: Vec<Token>, target: Vec<Token>, weight: f64) -> Sample {
        Sample { id, source, target: Some(target), weight }
    }
}
