use crate::data::batch::{strip_pad, Batch};
use crate::error::{CriterionError, Result};
use crate::loss::cross_entropy::CrossEntropyLoss;
use crate::model::lexical::{LexicalGradients, LexicalTranslator};
use crate::model::translator::{CriterionOutput, LogRecord, ModelMode, WeightedCriterion};

/// Token-level cross-entropy where every example's loss is scaled by its
/// batch weight.
///
/// `loss` is the weighted sum, `nll_loss` the unweighted one; `sample_size`
/// is the number of target tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedCrossEntropy;

impl WeightedCriterion<LexicalTranslator> for WeightedCrossEntropy {
    fn compute(
        &self,
        model: &LexicalTranslator,
        batch: &Batch,
        mode: ModelMode,
        reduce: bool,
    ) -> Result<CriterionOutput<LexicalGradients>> {
        let mut grads = mode.tracks_gradients().then(|| model.zero_gradients());
        let mut per_example = Vec::with_capacity(batch.len());
        let mut nll_total = 0.0;
        let mut ntokens = 0usize;

        if !batch.is_empty() {
            let targets = batch
                .target
                .as_ref()
                .ok_or_else(|| CriterionError::Shape("batch has no target".to_string()))?;
            let vocab = model.weights.cols;

            for (i, (src_row, tgt_row)) in batch.net_input.src_tokens.iter().zip(targets).enumerate() {
                let weight = batch.weights.get(i).copied().unwrap_or(1.0);
                let source = strip_pad(src_row, model.src_pad());
                let target = strip_pad(tgt_row, model.tgt_pad());

                let mut nll = 0.0;
                for (j, &tok) in target.iter().enumerate() {
                    if tok >= vocab {
                        return Err(CriterionError::Shape(format!(
                            "target token {tok} outside vocabulary of {vocab}"
                        )));
                    }
                    let log_probs = model.log_probs(&source, j);
                    nll += CrossEntropyLoss::loss(&log_probs, tok);

                    if let Some(g) = grads.as_mut() {
                        let ctx = model.context(&source, j);
                        let delta = CrossEntropyLoss::derivative(&log_probs, tok);
                        for (w, d) in g.weights.row_mut(ctx).iter_mut().zip(delta) {
                            *w += weight * d;
                        }
                    }
                }

                ntokens += target.len();
                nll_total += nll;
                per_example.push(weight * nll);
            }
        }

        let loss: f64 = per_example.iter().sum();
        let mut logging = LogRecord::new();
        logging.insert("loss".to_string(), loss);
        logging.insert("nll_loss".to_string(), nll_total);
        logging.insert("ntokens".to_string(), ntokens as f64);
        logging.insert("nsentences".to_string(), batch.nsentences as f64);
        logging.insert("sample_size".to_string(), ntokens as f64);

        Ok(CriterionOutput {
            loss,
            sample_size: ntokens,
            logging,
            unreduced: (!reduce).then_some(per_example),
            grads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batch::collate;
    use crate::data::dictionary::Dictionary;
    use crate::data::sample::Sample;
    use approx::assert_abs_diff_eq;

    fn setup() -> (Dictionary, LexicalTranslator) {
        let dict = Dictionary::from_lines(["x y z"]);
        let model = LexicalTranslator::new(&dict, &dict, 11);
        (dict, model)
    }

    fn pair(dict: &Dictionary, id: usize, src: &str, tgt: &str, weight: f64) -> Sample {
        Sample::weighted_pair(id, dict.encode_line(src, false), dict.encode_line(tgt, true), weight)
    }

    #[test]
    fn test_weight_scales_loss_but_not_nll() {
        let (dict, model) = setup();
        let full = collate(&[pair(&dict, 0, "x y", "y x", 1.0)], dict.pad(), dict.eos(), false);
        let half = collate(&[pair(&dict, 0, "x y", "y x", 0.5)], dict.pad(), dict.eos(), false);

        let a = WeightedCrossEntropy.compute(&model, &full, ModelMode::Eval, true).unwrap();
        let b = WeightedCrossEntropy.compute(&model, &half, ModelMode::Eval, true).unwrap();

        assert_abs_diff_eq!(b.loss, 0.5 * a.loss, epsilon = 1e-12);
        assert_abs_diff_eq!(a.logging["nll_loss"], b.logging["nll_loss"], epsilon = 1e-12);
        assert_eq!(a.sample_size, 3);
        assert_eq!(a.logging["ntokens"], 3.0);
        assert_eq!(a.logging["nsentences"], 1.0);
    }

    #[test]
    fn test_gradients_only_in_train_mode() {
        let (dict, model) = setup();
        let batch = collate(&[pair(&dict, 0, "x", "z", 1.0)], dict.pad(), dict.eos(), false);
        let eval = WeightedCrossEntropy.compute(&model, &batch, ModelMode::Eval, true).unwrap();
        let train = WeightedCrossEntropy.compute(&model, &batch, ModelMode::Train, true).unwrap();
        assert!(eval.grads.is_none());
        assert!(train.grads.is_some());
    }

    #[test]
    fn test_gradient_step_lowers_loss() {
        let (dict, mut model) = setup();
        let batch = collate(
            &[pair(&dict, 0, "x y", "z z", 1.0), pair(&dict, 1, "y", "x", 0.3)],
            dict.pad(),
            dict.eos(),
            false,
        );
        let before = WeightedCrossEntropy.compute(&model, &batch, ModelMode::Train, true).unwrap();
        let grads = before.grads.clone().unwrap();
        model.apply_gradients(&grads, 0.1).unwrap();
        let after = WeightedCrossEntropy.compute(&model, &batch, ModelMode::Eval, true).unwrap();
        assert!(after.loss < before.loss);
    }

    #[test]
    fn test_unreduced_returns_per_example_losses() {
        let (dict, model) = setup();
        let batch = collate(
            &[pair(&dict, 0, "x", "y", 1.0), pair(&dict, 1, "y z", "x", 0.25)],
            dict.pad(),
            dict.eos(),
            false,
        );
        let out = WeightedCrossEntropy.compute(&model, &batch, ModelMode::Eval, false).unwrap();
        let per_example = out.unreduced.unwrap();
        assert_eq!(per_example.len(), 2);
        assert_abs_diff_eq!(per_example.iter().sum::<f64>(), out.loss, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_batch_has_zero_sample_size() {
        let (dict, model) = setup();
        let batch = collate(&[], dict.pad(), dict.eos(), false);
        let out = WeightedCrossEntropy.compute(&model, &batch, ModelMode::Train, true).unwrap();
        assert_eq!(out.sample_size, 0);
        assert_eq!(out.loss, 0.0);
    }
}
