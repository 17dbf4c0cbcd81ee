use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::DualConfig;
use crate::criterion::aggregate::{aggregate_logging_outputs, AggregatedLog, LoggingOutput};
use crate::criterion::translate::{translate, Translation};
use crate::data::batch::{collate, Batch};
use crate::data::dictionary::{Dictionary, Token};
use crate::data::sample::Sample;
use crate::error::{CriterionError, Result};
use crate::generate::options::GenerateOptions;
use crate::model::translator::{ModelMode, Optimizer, TrainableTranslator, WeightedCriterion};
use crate::score::bleu::BleuScorer;
use crate::score::lm::{LmScorer, PLACEHOLDER_LM_SCORE};

/// BLEU order used for the round-trip reward.
pub const RECONSTRUCTION_BLEU_ORDER: usize = 4;

/// One side of the dual game: a model, the optimizer that receives its
/// gradients, and the dictionary of the language it produces.
pub struct Direction<'a, M: ?Sized, O: ?Sized> {
    pub model: &'a M,
    pub optimizer: &'a mut O,
    pub dict: &'a Dictionary,
}

/// What one dual-learning step reports back to the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualLoss {
    /// Primal plus dual loss, for reporting only.
    pub loss: f64,
    pub sample_size: usize,
    /// `{"primal": .., "dual": ..}`.
    pub logging: LoggingOutput,
}

/// `alpha * forward + (1 - alpha) * backward`.
pub fn total_reward(alpha: f64, forward_reward: f64, backward_reward: f64) -> f64 {
    alpha * forward_reward + (1.0 - alpha) * backward_reward
}

/// Turns monolingual batches into reward-weighted pseudo-parallel batches
/// for a primal (source -> target) and a dual (target -> source) model.
///
/// Holds no state across steps besides its config and the weighted loss it
/// delegates to.
pub struct DualRewardCriterion<C> {
    config: DualConfig,
    criterion: C,
}

impl<C> DualRewardCriterion<C> {
    pub fn new(config: DualConfig, criterion: C) -> Result<DualRewardCriterion<C>> {
        config.validate()?;
        Ok(DualRewardCriterion { config, criterion })
    }

    pub fn config(&self) -> &DualConfig {
        &self.config
    }

    /// The per-example weighted loss both directions delegate to.
    pub fn weighted_criterion(&self) -> &C {
        &self.criterion
    }

    pub fn alpha(&self) -> f64 {
        self.config.reward_alpha
    }

    /// Merges per-worker logging records; see `aggregate_logging_outputs`.
    pub fn aggregate_logging_outputs(logging_outputs: &[LoggingOutput]) -> Result<AggregatedLog> {
        aggregate_logging_outputs(logging_outputs)
    }

    /// Runs one dual-learning step on a monolingual `sample` batch.
    ///
    /// For every example the primal model's best translation becomes a
    /// pseudo-target. The dual model reconstructs the source from it, and
    /// the reconstruction's BLEU against the real source, blended with the
    /// LM score of the pseudo-target, becomes the weight of the primal
    /// example. Dual examples always weigh `1 - alpha`.
    ///
    /// Both weighted losses are computed in train mode and their gradients
    /// handed to the matching optimizer; no parameter is updated here.
    ///
    /// # Errors
    /// `MissingEos` when a best primal hypothesis does not end with the
    /// target eos. Decoder and criterion errors pass through unchanged.
    pub fn forward<F, B, OF, OB>(
        &self,
        sample: &Batch,
        primal: Direction<'_, F, OF>,
        dual: Direction<'_, B, OB>,
        lm_scorer: Option<&dyn LmScorer>,
        reduce: bool,
        options: &GenerateOptions,
    ) -> Result<DualLoss>
    where
        F: TrainableTranslator + ?Sized,
        B: TrainableTranslator + ?Sized,
        OF: Optimizer<F> + ?Sized,
        OB: Optimizer<B> + ?Sized,
        C: WeightedCriterion<F> + WeightedCriterion<B>,
    {
        let (forward_samples, backward_samples) =
            self.build_samples(sample, primal.model, primal.dict, dual.model, dual.dict, lm_scorer, options)?;

        let forward_batch = collate(&forward_samples, primal.dict.pad(), primal.dict.eos(), false);
        let forward_out = <C as WeightedCriterion<F>>::compute(
            &self.criterion,
            primal.model,
            &forward_batch,
            ModelMode::Train,
            reduce,
        )?;
        let forward_grads = forward_out
            .grads
            .ok_or(CriterionError::MissingGradients(ModelMode::Train.name()))?;
        primal.optimizer.backward(primal.model, forward_grads)?;

        let backward_batch = collate(&backward_samples, dual.dict.pad(), dual.dict.eos(), false);
        let backward_out = <C as WeightedCriterion<B>>::compute(
            &self.criterion,
            dual.model,
            &backward_batch,
            ModelMode::Train,
            reduce,
        )?;
        let backward_grads = backward_out
            .grads
            .ok_or(CriterionError::MissingGradients(ModelMode::Train.name()))?;
        dual.optimizer.backward(dual.model, backward_grads)?;

        let loss = forward_out.loss + backward_out.loss;
        let sample_size = forward_out.sample_size + backward_out.sample_size;
        info!(
            "dual step: {} sentences, primal loss {:.4}, dual loss {:.4}, sample_size {}",
            sample.len(),
            forward_out.loss,
            backward_out.loss,
            sample_size
        );

        Ok(DualLoss {
            loss,
            sample_size,
            logging: LoggingOutput::dual(forward_out.logging, backward_out.logging),
        })
    }

    /// Builds the reward-weighted primal samples and the dual samples, in
    /// input order.
    #[allow(clippy::too_many_arguments)]
    pub fn build_samples<F, B>(
        &self,
        sample: &Batch,
        forward_model: &F,
        tgt_dict: &Dictionary,
        backward_model: &B,
        src_dict: &Dictionary,
        lm_scorer: Option<&dyn LmScorer>,
        options: &GenerateOptions,
    ) -> Result<(Vec<Sample>, Vec<Sample>)>
    where
        F: TrainableTranslator + ?Sized,
        B: TrainableTranslator + ?Sized,
    {
        let alpha = self.config.reward_alpha;
        let eos = tgt_dict.eos();
        let translations = translate(forward_model, tgt_dict, sample, &self.config, options)?;

        let mut forward_samples = Vec::with_capacity(translations.len());
        let mut backward_samples = Vec::with_capacity(translations.len());

        for Translation { id, source, hypos } in translations {
            let best = hypos.first().ok_or(CriterionError::EmptyHypotheses(id))?;
            if !best.ends_with(eos) {
                return Err(CriterionError::MissingEos { eos, found: best.tokens.last().copied() });
            }

            let mut original_src = source.clone();
            if original_src.last() != Some(&eos) {
                original_src.push(eos);
            }
            let bt_src = if self.config.remove_eos_at_src() {
                best.without_last().to_vec()
            } else {
                best.tokens.clone()
            };

            let backward_sample = Sample::weighted_pair(id, bt_src, original_src.clone(), 1.0 - alpha);
            let backward_reward = self.reconstruction_reward(&backward_sample, &original_src, backward_model, src_dict, options)?;
            backward_samples.push(backward_sample);

            let forward_reward = lm_scorer.map_or(PLACEHOLDER_LM_SCORE, |lm| lm.score(&best.tokens));
            let reward = total_reward(alpha, forward_reward, backward_reward);
            debug!(
                "example {}: lm {:.3}, reconstruction {:.3}, reward {:.3}",
                id, forward_reward, backward_reward, reward
            );

            forward_samples.push(Sample::weighted_pair(id, source, best.tokens.clone(), reward));
        }

        Ok((forward_samples, backward_samples))
    }

    /// BLEU-4 of the dual model's reconstruction of `original_src`, in [0, 1].
    fn reconstruction_reward<B>(
        &self,
        backward_sample: &Sample,
        original_src: &[Token],
        backward_model: &B,
        src_dict: &Dictionary,
        options: &GenerateOptions,
    ) -> Result<f64>
    where
        B: TrainableTranslator + ?Sized,
    {
        let input = collate(std::slice::from_ref(backward_sample), src_dict.pad(), src_dict.eos(), false);
        let reconstructions = translate(backward_model, src_dict, &input, &self.config, options)?;

        let mut scorer = BleuScorer::new(src_dict.pad(), src_dict.eos(), src_dict.unk());
        for reconstruction in &reconstructions {
            let x_hat = reconstruction.best()?.without_last();
            scorer.add(original_src, x_hat);
        }
        Ok(scorer.score(RECONSTRUCTION_BLEU_ORDER) / 100.0)
    }
}
