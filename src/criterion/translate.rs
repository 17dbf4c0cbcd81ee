use crate::config::DualConfig;
use crate::data::batch::{strip_pad, Batch};
use crate::data::dictionary::{Dictionary, Token};
use crate::error::{CriterionError, Result};
use crate::generate::hypothesis::Hypothesis;
use crate::generate::options::{DecodeParams, GenerateOptions};
use crate::model::translator::TrainableTranslator;

/// One decoded input example.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub id: usize,
    /// Source row with padding removed.
    pub source: Vec<Token>,
    /// Best first.
    pub hypos: Vec<Hypothesis>,
}

impl Translation {
    pub fn best(&self) -> Result<&Hypothesis> {
        self.hypos.first().ok_or(CriterionError::EmptyHypotheses(self.id))
    }
}

/// Decodes every example of `batch` with `model`.
///
/// The length limit comes from the padded source width of the batch. Padding
/// is stripped from the returned sources using `dict`.
pub fn translate<M>(
    model: &M,
    dict: &Dictionary,
    batch: &Batch,
    config: &DualConfig,
    options: &GenerateOptions,
) -> Result<Vec<Translation>>
where
    M: TrainableTranslator + ?Sized,
{
    let net_input = &batch.net_input;
    let params = DecodeParams {
        beam: config.beam,
        max_len: config.max_len(net_input.src_width()),
        options: *options,
    };
    let encoder_input = net_input.encoder_input(config.use_char_source);
    let hypos = model.generate(&encoder_input, &params)?;

    if hypos.len() != batch.len() {
        return Err(CriterionError::HypothesisCount { expected: batch.len(), got: hypos.len() });
    }

    Ok(batch
        .ids
        .iter()
        .zip(net_input.src_tokens.iter())
        .zip(hypos)
        .map(|((&id, row), hypos)| Translation {
            id,
            source: strip_pad(row, dict.pad()),
            hypos,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batch::{collate, EncoderInput};
    use crate::data::sample::Sample;
    use std::cell::RefCell;

    /// Echoes every source row back and records what it was asked to do.
    struct Echo {
        seen: RefCell<Vec<(EncoderInput, DecodeParams)>>,
        drop_last_row: bool,
    }

    impl TrainableTranslator for Echo {
        type Gradients = ();

        fn generate(&self, input: &EncoderInput, params: &DecodeParams) -> Result<Vec<Vec<Hypothesis>>> {
            self.seen.borrow_mut().push((input.clone(), *params));
            let mut out: Vec<Vec<Hypothesis>> = input
                .src_tokens
                .iter()
                .map(|row| vec![Hypothesis::new(row.clone(), 0.0)])
                .collect();
            if self.drop_last_row {
                out.pop();
            }
            Ok(out)
        }
    }

    fn batch(dict: &Dictionary) -> Batch {
        let samples = vec![
            Sample::monolingual(10, vec![4, 5]),
            Sample::monolingual(11, vec![4, 5, 6, 7]),
        ];
        let mut batch = collate(&samples, dict.pad(), dict.eos(), false);
        batch.net_input.char_inds = Some(vec![vec![vec![1]]; 2]);
        batch
    }

    #[test]
    fn test_translate_strips_padding_and_keeps_ids() {
        let dict = Dictionary::new();
        let echo = Echo { seen: RefCell::new(Vec::new()), drop_last_row: false };
        let config = DualConfig { max_len_a: 1.5, max_len_b: 1.0, beam: 3, ..DualConfig::default() };

        let out = translate(&echo, &dict, &batch(&dict), &config, &GenerateOptions::default()).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, 11);
        assert_eq!(out[1].id, 10);
        assert_eq!(out[1].source, vec![4, 5]);

        let seen = echo.seen.borrow();
        let (input, params) = &seen[0];
        assert_eq!(params.beam, 3);
        assert_eq!(params.max_len, 7);
        assert!(input.char_inds.is_none());
    }

    #[test]
    fn test_char_source_keeps_char_inputs() {
        let dict = Dictionary::new();
        let echo = Echo { seen: RefCell::new(Vec::new()), drop_last_row: false };
        let config = DualConfig { use_char_source: true, ..DualConfig::default() };

        translate(&echo, &dict, &batch(&dict), &config, &GenerateOptions::default()).unwrap();
        assert!(echo.seen.borrow()[0].0.char_inds.is_some());
    }

    #[test]
    fn test_short_hypothesis_list_is_an_error() {
        let dict = Dictionary::new();
        let echo = Echo { seen: RefCell::new(Vec::new()), drop_last_row: true };
        let err = translate(&echo, &dict, &batch(&dict), &DualConfig::default(), &GenerateOptions::default())
            .unwrap_err();
        assert!(matches!(err, CriterionError::HypothesisCount { expected: 2, got: 1 }));
    }
}
