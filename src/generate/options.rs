use serde::{Deserialize, Serialize};

/// Decoder knobs forwarded untouched from the caller of the criterion.
///
/// - `min_len`     — eos is forbidden before this many tokens
/// - `len_penalty` — finished scores are divided by `len ^ len_penalty`
/// - `unk_penalty` — subtracted from the unk log-probability at every step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    pub min_len: usize,
    pub len_penalty: f64,
    pub unk_penalty: f64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions { min_len: 1, len_penalty: 1.0, unk_penalty: 0.0 }
    }
}

/// Everything a decoder needs for one `generate` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeParams {
    pub beam: usize,
    pub max_len: usize,
    pub options: GenerateOptions,
}
