use crate::data::dictionary::Token;
use crate::generate::hypothesis::Hypothesis;
use crate::generate::options::{DecodeParams, GenerateOptions};

/// Supplies next-token log-probabilities for a partial output.
pub trait StepScorer {
    /// Log-probabilities over the whole target vocabulary for the token that
    /// follows `prefix`.
    fn step_log_probs(&self, prefix: &[Token]) -> Vec<f64>;
}

/// Beam search over any `StepScorer`.
///
/// Every returned hypothesis ends with `eos`: eos is forced once a prefix
/// reaches `max_len` tokens.
#[derive(Debug, Clone, Copy)]
pub struct BeamSearch {
    pub beam: usize,
    pub max_len: usize,
    pub pad: Token,
    pub eos: Token,
    pub unk: Token,
    pub options: GenerateOptions,
}

impl BeamSearch {
    pub fn new(params: &DecodeParams, pad: Token, eos: Token, unk: Token) -> BeamSearch {
        BeamSearch {
            beam: params.beam.max(1),
            max_len: params.max_len,
            pad,
            eos,
            unk,
            options: params.options,
        }
    }

    /// Runs the search and returns up to `beam` finished hypotheses, best first.
    ///
    /// Stops once `beam` hypotheses are finished and no active prefix can
    /// still outscore the worst of them.
    pub fn search<S: StepScorer + ?Sized>(&self, scorer: &S) -> Vec<Hypothesis> {
        let mut active: Vec<(Vec<Token>, f64)> = vec![(Vec::new(), 0.0)];
        let mut finished: Vec<Hypothesis> = Vec::new();

        for step in 0..=self.max_len {
            let mut candidates: Vec<(&[Token], Token, f64)> = Vec::new();
            for (prefix, score) in &active {
                let lprobs = self.adjust(scorer.step_log_probs(prefix), step);
                for (tok, lp) in lprobs.into_iter().enumerate() {
                    if lp.is_finite() {
                        candidates.push((prefix.as_slice(), tok, score + lp));
                    }
                }
            }
            candidates.sort_by(|a, b| b.2.total_cmp(&a.2));

            // Finished candidates do not take active slots, hence 2 * beam.
            let mut next = Vec::with_capacity(self.beam.min(candidates.len()));
            for (prefix, tok, score) in candidates.into_iter().take(self.beam.saturating_mul(2)) {
                let mut tokens = prefix.to_vec();
                tokens.push(tok);
                if tok == self.eos {
                    let normalized = self.normalize(score, tokens.len());
                    self.finalize(&mut finished, Hypothesis::new(tokens, normalized));
                } else if next.len() < self.beam {
                    next.push((tokens, score));
                }
            }
            active = next;

            if active.is_empty() || self.is_done(&finished, &active) {
                break;
            }
        }

        finished
    }

    /// Inserts `hypo` keeping `finished` sorted best first and at most `beam` long.
    fn finalize(&self, finished: &mut Vec<Hypothesis>, hypo: Hypothesis) {
        let pos = finished.partition_point(|h| h.score >= hypo.score);
        if pos < self.beam {
            finished.insert(pos, hypo);
            finished.truncate(self.beam);
        }
    }

    fn is_done(&self, finished: &[Hypothesis], active: &[(Vec<Token>, f64)]) -> bool {
        let Some(worst) = finished.last() else {
            return false;
        };
        if finished.len() < self.beam {
            return false;
        }
        active.iter().all(|(prefix, score)| self.best_reachable(*score, prefix.len()) <= worst.score)
    }

    /// Upper bound on the normalized score of any completion of an active
    /// prefix. Step log-probabilities are never positive, so the raw score can
    /// only fall; normalization is monotonic in length for a fixed raw score.
    fn best_reachable(&self, score: f64, prefix_len: usize) -> f64 {
        let shortest = self.normalize(score, prefix_len + 1);
        let longest = self.normalize(score, self.max_len.max(prefix_len) + 1);
        shortest.max(longest)
    }

    fn adjust(&self, mut lprobs: Vec<f64>, step: usize) -> Vec<f64> {
        if let Some(lp) = lprobs.get_mut(self.pad) {
            *lp = f64::NEG_INFINITY;
        }
        if let Some(lp) = lprobs.get_mut(self.unk) {
            *lp -= self.options.unk_penalty;
        }
        if step >= self.max_len {
            for (tok, lp) in lprobs.iter_mut().enumerate() {
                if tok == self.eos {
                    if !lp.is_finite() {
                        *lp = 0.0;
                    }
                } else {
                    *lp = f64::NEG_INFINITY;
                }
            }
        } else if step < self.options.min_len {
            if let Some(lp) = lprobs.get_mut(self.eos) {
                *lp = f64::NEG_INFINITY;
            }
        }
        lprobs
    }

    fn normalize(&self, score: f64, len: usize) -> f64 {
        score / (len as f64).powf(self.options.len_penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAD: Token = 1;
    const EOS: Token = 2;
    const UNK: Token = 3;

    /// Emits `script[i]` with probability `confidence` at step i, then eos.
    /// The remaining mass is spread evenly, so every other token (eos
    /// included) is a tied runner-up.
    struct Scripted {
        script: Vec<Token>,
        vocab: usize,
        confidence: f64,
    }

    impl Scripted {
        fn new(script: Vec<Token>, vocab: usize) -> Scripted {
            Scripted { script, vocab, confidence: 0.9 }
        }
    }

    impl StepScorer for Scripted {
        fn step_log_probs(&self, prefix: &[Token]) -> Vec<f64> {
            let want = self.script.get(prefix.len()).copied().unwrap_or(EOS);
            let rest = ((1.0 - self.confidence) / (self.vocab - 1) as f64).ln();
            (0..self.vocab)
                .map(|t| if t == want { self.confidence.ln() } else { rest })
                .collect()
        }
    }

    fn search(beam: usize, max_len: usize, options: GenerateOptions) -> BeamSearch {
        BeamSearch::new(&DecodeParams { beam, max_len, options }, PAD, EOS, UNK)
    }

    #[test]
    fn test_best_hypothesis_follows_script() {
        let scorer = Scripted::new(vec![5, 6, 4], 8);
        let hypos = search(3, 10, GenerateOptions::default()).search(&scorer);
        assert!(!hypos.is_empty());
        assert!(hypos.len() <= 3);
        assert_eq!(hypos[0].tokens, vec![5, 6, 4, EOS]);
        assert!(hypos.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_every_hypothesis_ends_with_eos() {
        let scorer = Scripted::new(vec![5; 20], 8);
        let hypos = search(2, 4, GenerateOptions::default()).search(&scorer);
        assert!(hypos.iter().all(|h| h.ends_with(EOS)));
        assert!(hypos.iter().all(|h| h.tokens.len() <= 5));
    }

    #[test]
    fn test_pad_is_never_generated() {
        let scorer = Scripted::new(vec![PAD, PAD], 6);
        let hypos = search(2, 5, GenerateOptions::default()).search(&scorer);
        assert!(hypos.iter().all(|h| !h.tokens.contains(&PAD)));
    }

    #[test]
    fn test_min_len_blocks_early_eos() {
        let scorer = Scripted::new(vec![], 6);
        let options = GenerateOptions { min_len: 2, ..GenerateOptions::default() };
        let hypos = search(1, 5, options).search(&scorer);
        assert!(hypos[0].tokens.len() >= 3);
    }

    #[test]
    fn test_zero_max_len_yields_bare_eos() {
        let scorer = Scripted::new(vec![5], 6);
        let hypos = search(1, 0, GenerateOptions::default()).search(&scorer);
        assert_eq!(hypos[0].tokens, vec![EOS]);
    }

    #[test]
    fn test_tied_early_eos_does_not_truncate_best() {
        for beam in 1..=4 {
            let scorer = Scripted { script: vec![5, 6, 4], vocab: 8, confidence: 0.9999 };
            let hypos = search(beam, 20, GenerateOptions::default()).search(&scorer);
            assert_eq!(hypos[0].tokens, vec![5, 6, 4, EOS], "beam {beam}");
            assert!(hypos.len() <= beam);
            assert!(hypos.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[test]
    fn test_huge_beam_does_not_overflow() {
        let scorer = Scripted::new(vec![5], 6);
        let hypos = search(usize::MAX, 2, GenerateOptions::default()).search(&scorer);
        assert_eq!(hypos[0].tokens, vec![5, EOS]);
    }
}
