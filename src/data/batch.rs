use serde::{Deserialize, Serialize};

use crate::data::dictionary::Token;
use crate::data::sample::Sample;

/// Model inputs of a collated batch. Rows are padded to a common width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetInput {
    pub src_tokens: Vec<Vec<Token>>,
    pub src_lengths: Vec<usize>,
    /// Target shifted right with eos in front (decoder input).
    pub prev_output_tokens: Option<Vec<Vec<Token>>>,
    /// Character indices per source word, for character-level encoders.
    pub char_inds: Option<Vec<Vec<Vec<Token>>>>,
    pub word_lengths: Option<Vec<Vec<usize>>>,
}

/// The subset of `NetInput` an encoder is allowed to see.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncoderInput {
    pub src_tokens: Vec<Vec<Token>>,
    pub src_lengths: Vec<usize>,
    pub char_inds: Option<Vec<Vec<Vec<Token>>>>,
    pub word_lengths: Option<Vec<Vec<usize>>>,
}

impl EncoderInput {
    pub fn len(&self) -> usize {
        self.src_tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src_tokens.is_empty()
    }
}

impl NetInput {
    /// Filters the inputs down to what the encoder consumes.
    ///
    /// Character-level encoders get {tokens, lengths, char indices, word
    /// lengths}; token-level encoders only {tokens, lengths}.
    pub fn encoder_input(&self, use_char_source: bool) -> EncoderInput {
        let (char_inds, word_lengths) = if use_char_source {
            (self.char_inds.clone(), self.word_lengths.clone())
        } else {
            (None, None)
        };
        EncoderInput {
            src_tokens: self.src_tokens.clone(),
            src_lengths: self.src_lengths.clone(),
            char_inds,
            word_lengths,
        }
    }

    /// Padded width of the source rows.
    pub fn src_width(&self) -> usize {
        self.src_tokens.first().map_or(0, Vec::len)
    }
}

/// A weighted mini-batch: every example carries its own loss weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub ids: Vec<usize>,
    pub net_input: NetInput,
    pub target: Option<Vec<Vec<Token>>>,
    pub weights: Vec<f64>,
    pub ntokens: usize,
    pub nsentences: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Removes every `pad` token.
pub fn strip_pad(tokens: &[Token], pad: Token) -> Vec<Token> {
    tokens.iter().copied().filter(|&t| t != pad).collect()
}

/// Collates samples into a weighted batch.
///
/// Examples are ordered by descending source length (ties keep their input
/// order) and each weight follows its example through the reordering.
/// Targets are right-padded; sources are left-padded when `left_pad_source`
/// is set.
pub fn collate(samples: &[Sample], pad: Token, eos: Token, left_pad_source: bool) -> Batch {
    if samples.is_empty() {
        return Batch::default();
    }

    let mut order: Vec<usize> = (0..samples.len()).collect();
    order.sort_by(|&a, &b| samples[b].source.len().cmp(&samples[a].source.len()));
    let sorted: Vec<&Sample> = order.iter().map(|&i| &samples[i]).collect();

    let sources: Vec<&[Token]> = sorted.iter().map(|s| s.source.as_slice()).collect();
    let src_tokens = pad_rows(&sources, pad, left_pad_source);
    let src_lengths: Vec<usize> = sources.iter().map(|s| s.len()).collect();

    let has_target = sorted.iter().all(|s| s.target.is_some());
    let (target, prev_output_tokens, ntokens) = if has_target {
        let targets: Vec<&[Token]> = sorted
            .iter()
            .map(|s| s.target.as_deref().unwrap_or(&[]))
            .collect();
        let shifted: Vec<Vec<Token>> = targets.iter().map(|t| move_eos_to_beginning(t, eos)).collect();
        let shifted_refs: Vec<&[Token]> = shifted.iter().map(Vec::as_slice).collect();
        let ntokens = targets.iter().map(|t| t.len()).sum();
        (
            Some(pad_rows(&targets, pad, false)),
            Some(pad_rows(&shifted_refs, pad, false)),
            ntokens,
        )
    } else {
        (None, None, src_lengths.iter().sum())
    };

    Batch {
        ids: sorted.iter().map(|s| s.id).collect(),
        net_input: NetInput {
            src_tokens,
            src_lengths,
            prev_output_tokens,
            char_inds: None,
            word_lengths: None,
        },
        target,
        weights: sorted.iter().map(|s| s.weight).collect(),
        ntokens,
        nsentences: samples.len(),
    }
}

fn pad_rows(rows: &[&[Token]], pad: Token, left_pad: bool) -> Vec<Vec<Token>> {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    rows.iter()
        .map(|row| {
            let padding = std::iter::repeat(pad).take(width - row.len());
            if left_pad {
                padding.chain(row.iter().copied()).collect()
            } else {
                row.iter().copied().chain(padding).collect()
            }
        })
        .collect()
}

/// `[a, b, eos]` becomes `[eos, a, b]`.
fn move_eos_to_beginning(tokens: &[Token], eos: Token) -> Vec<Token> {
    let mut shifted = Vec::with_capacity(tokens.len());
    if !tokens.is_empty() {
        shifted.push(eos);
        shifted.extend_from_slice(&tokens[..tokens.len() - 1]);
    }
    shifted
}
