//! Corpus-level BLEU over token ids.
//!
//! Statistics accumulate across `add` calls; `score` turns them into a BLEU
//! value in [0, 100] using modified n-gram precision and a brevity penalty
//! (Papineni et al., 2002).

use std::collections::HashMap;

use crate::data::dictionary::Token;

/// Highest n-gram order tracked.
pub const MAX_ORDER: usize = 4;

/// Stands in for unk in predictions so it can never match a reference.
const UNK_SENTINEL: Token = Token::MAX;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BleuStats {
    pub reflen: usize,
    pub predlen: usize,
    pub matches: [usize; MAX_ORDER],
    pub counts: [usize; MAX_ORDER],
}

#[derive(Debug, Clone)]
pub struct BleuScorer {
    pad: Token,
    eos: Token,
    unk: Token,
    stats: BleuStats,
}

impl BleuScorer {
    pub fn new(pad: Token, eos: Token, unk: Token) -> BleuScorer {
        BleuScorer { pad, eos, unk, stats: BleuStats::default() }
    }

    pub fn reset(&mut self) {
        self.stats = BleuStats::default();
    }

    pub fn stats(&self) -> &BleuStats {
        &self.stats
    }

    /// Adds one reference/prediction pair to the corpus statistics.
    ///
    /// Leading pad and trailing pad/eos are trimmed from both sides.
    pub fn add(&mut self, reference: &[Token], prediction: &[Token]) {
        let reference = self.trim(reference);
        let prediction: Vec<Token> = self
            .trim(prediction)
            .iter()
            .map(|&t| if t == self.unk { UNK_SENTINEL } else { t })
            .collect();

        self.stats.reflen += reference.len();
        self.stats.predlen += prediction.len();

        for n in 1..=MAX_ORDER {
            let ref_ngrams = count_ngrams(reference, n);
            let pred_ngrams = count_ngrams(&prediction, n);
            self.stats.counts[n - 1] += pred_ngrams.values().sum::<usize>();
            self.stats.matches[n - 1] += pred_ngrams
                .iter()
                .map(|(gram, &c)| c.min(ref_ngrams.get(gram).copied().unwrap_or(0)))
                .sum::<usize>();
        }
    }

    /// Modified precision per order; 0 where no n-grams were predicted.
    pub fn precision(&self) -> [f64; MAX_ORDER] {
        let mut p = [0.0; MAX_ORDER];
        for (i, slot) in p.iter_mut().enumerate() {
            if self.stats.counts[i] > 0 {
                *slot = self.stats.matches[i] as f64 / self.stats.counts[i] as f64;
            }
        }
        p
    }

    /// `min(1, exp(1 - reflen / predlen))`; 0 for an empty prediction.
    pub fn brevity(&self) -> f64 {
        if self.stats.predlen == 0 {
            return 0.0;
        }
        let r = self.stats.reflen as f64 / self.stats.predlen as f64;
        (1.0 - r).exp().min(1.0)
    }

    /// BLEU over the first `order` n-gram orders, in [0, 100].
    pub fn score(&self, order: usize) -> f64 {
        let order = order.clamp(1, MAX_ORDER);
        let precision = self.precision();
        if precision[..order].iter().any(|&p| p <= 0.0) {
            return 0.0;
        }
        let psum: f64 = precision[..order].iter().map(|p| p.ln()).sum();
        self.brevity() * (psum / order as f64).exp() * 100.0
    }

    fn trim<'a>(&self, tokens: &'a [Token]) -> &'a [Token] {
        let start = tokens.iter().position(|&t| t != self.pad).unwrap_or(tokens.len());
        let mut end = tokens.len();
        while end > start && (tokens[end - 1] == self.eos || tokens[end - 1] == self.pad) {
            end -= 1;
        }
        &tokens[start..end]
    }
}

fn count_ngrams(tokens: &[Token], n: usize) -> HashMap<&[Token], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for window in tokens.windows(n) {
            *counts.entry(window).or_insert(0) += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    const PAD: Token = 1;
    const EOS: Token = 2;
    const UNK: Token = 3;

    fn scorer() -> BleuScorer {
        BleuScorer::new(PAD, EOS, UNK)
    }

    #[test]
    fn test_identical_sentence_scores_100() {
        let mut s = scorer();
        s.add(&[4, 5, 6, 7, 8, EOS], &[4, 5, 6, 7, 8]);
        assert_abs_diff_eq!(s.score(4), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_overlap_scores_zero() {
        let mut s = scorer();
        s.add(&[4, 5, 6, 7], &[8, 9, 10, 11]);
        assert_eq!(s.score(4), 0.0);
    }

    #[test]
    fn test_short_sentence_has_no_4grams() {
        let mut s = scorer();
        s.add(&[4, 5, 6], &[4, 5, 6]);
        assert_eq!(s.score(4), 0.0);
        assert_abs_diff_eq!(s.score(3), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unk_never_matches() {
        let mut s = scorer();
        s.add(&[UNK, 5], &[UNK, 5]);
        assert_eq!(s.stats().matches[0], 1);
        assert_eq!(s.stats().counts[0], 2);
    }

    #[test]
    fn test_trim_strips_leading_pad_and_trailing_eos() {
        let mut s = scorer();
        s.add(&[PAD, 4, 5, EOS, PAD], &[4, 5, EOS]);
        assert_eq!(s.stats().reflen, 2);
        assert_eq!(s.stats().predlen, 2);
    }

    #[test]
    fn test_brevity_penalizes_short_prediction() {
        let mut s = scorer();
        s.add(&[4, 5, 6, 7, 8, 9, 10, 11], &[4, 5, 6, 7]);
        assert_abs_diff_eq!(s.brevity(), (1.0f64 - 2.0).exp(), epsilon = 1e-12);
        assert!(s.score(4) < 100.0);
        assert!(s.score(4) > 0.0);
    }

    #[test]
    fn test_clipped_counts() {
        let mut s = scorer();
        s.add(&[4, 5], &[4, 4, 4]);
        assert_eq!(s.stats().matches[0], 1);
        assert_eq!(s.stats().counts[0], 3);
    }

    #[test]
    fn test_empty_prediction_scores_zero() {
        let mut s = scorer();
        s.add(&[4, 5, 6, 7], &[EOS]);
        assert_eq!(s.score(4), 0.0);
        assert_eq!(s.brevity(), 0.0);
    }

    #[test]
    fn test_reset_clears_stats() {
        let mut s = scorer();
        s.add(&[4, 5], &[4, 5]);
        s.reset();
        assert_eq!(*s.stats(), BleuStats::default());
    }

    proptest! {
        #[test]
        fn prop_score_within_bounds(
            reference in prop::collection::vec(4usize..12, 0..20),
            prediction in prop::collection::vec(3usize..12, 0..20),
        ) {
            let mut s = scorer();
            s.add(&reference, &prediction);
            let score = s.score(4);
            prop_assert!((0.0..=100.0 + 1e-9).contains(&score));
        }

        #[test]
        fn prop_self_match_is_perfect(sentence in prop::collection::vec(4usize..12, 4..20)) {
            let mut s = scorer();
            s.add(&sentence, &sentence);
            prop_assert!((s.score(4) - 100.0).abs() < 1e-9);
        }
    }
}
