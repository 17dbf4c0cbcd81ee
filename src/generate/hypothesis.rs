use serde::{Deserialize, Serialize};

use crate::data::dictionary::Token;

/// One decoded sequence. Decoders return a list of these per input example,
/// best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub tokens: Vec<Token>,
    /// Length-normalized log-probability.
    pub score: f64,
}

impl Hypothesis {
    pub fn new(tokens: Vec<Token>, score: f64) -> Hypothesis {
        Hypothesis { tokens, score }
    }

    pub fn ends_with(&self, token: Token) -> bool {
        self.tokens.last() == Some(&token)
    }

    /// Tokens with the final (eos) position dropped.
    pub fn without_last(&self) -> &[Token] {
        match self.tokens.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }
}
