use evidence_protocol::CrossEncoderScore;

use crate::lexicon::Lexicon;
use crate::profile::{AdjustmentConfig, BlendWeights, ContradictionConfig, RerankProfile};
use crate::signals::{self, Analysis};

/// Joint (claim, evidence) scorer. Implementations must be total: any input text
/// yields a score in [0, 1].
pub trait PairScorer: Send + Sync {
    fn score(&self, claim: &str, evidence: &str) -> CrossEncoderScore;
}

/// Heuristic stand-in for a neural cross-encoder: token overlap, syntactic pattern
/// agreement, entity overlap and role alignment, blended and then penalised on
/// contradiction.
#[derive(Debug, Clone)]
pub struct HeuristicCrossEncoder {
    lexicon: Lexicon,
    weights: BlendWeights,
    contradiction: ContradictionConfig,
}

impl HeuristicCrossEncoder {
    pub fn new(profile: &RerankProfile) -> Self {
        Self::with_lexicon(profile, Lexicon::new())
    }

    pub fn with_lexicon(profile: &RerankProfile, lexicon: Lexicon) -> Self {
        Self {
            lexicon,
            weights: *profile.weights(),
            contradiction: *profile.contradiction(),
        }
    }
}

impl Default for HeuristicCrossEncoder {
    fn default() -> Self {
        Self::new(&RerankProfile::default())
    }
}

impl PairScorer for HeuristicCrossEncoder {
    fn score(&self, claim: &str, evidence: &str) -> CrossEncoderScore {
        let claim = Analysis::new(claim, &self.lexicon);
        let evidence = Analysis::new(evidence, &self.lexicon);

        let token_overlap = signals::token_overlap(&claim, &evidence);
        let syntactic = signals::syntactic_compatibility(&claim, &evidence);
        let entity_overlap = signals::entity_overlap(&claim, &evidence);
        let role_alignment = signals::role_alignment(&claim, &evidence);
        let blended = self
            .weights
            .blend(token_overlap, syntactic, entity_overlap, role_alignment);

        let has_contradiction = signals::has_contradiction(&claim, &evidence, &self.lexicon);
        let score = if has_contradiction {
            self.contradiction.apply(blended)
        } else {
            blended
        };

        CrossEncoderScore {
            score: score.clamp(0.0, 1.0),
            blended,
            token_overlap,
            syntactic,
            entity_overlap,
            role_alignment,
            has_contradiction,
        }
    }
}

/// Rescales a cosine similarity by the pair score: a confident match boosts it, a
/// weak one shrinks it, and the middle range nudges it around `midpoint`.
#[must_use]
pub fn adjust_similarity(cosine: f32, score: f32, cfg: &AdjustmentConfig) -> f32 {
    let adjusted = if score > cfg.boost_above {
        cosine * cfg.boost
    } else if score < cfg.penalize_below {
        cosine * cfg.penalty
    } else {
        cosine * (1.0 + (score - cfg.midpoint) * cfg.slope)
    };
    adjusted.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn contradiction_keeps_thirty_percent_of_blend() {
        let scorer = HeuristicCrossEncoder::default();
        let result = scorer.score("X is red", "X is not red");
        assert!(result.has_contradiction);
        assert!(result.blended > 0.0);
        assert!(result.score <= 0.3 * result.blended + 1e-6, "{result:?}");
        assert!(result.score < result.blended);
    }

    #[test]
    fn agreeing_paraphrase_scores_high() {
        let scorer = HeuristicCrossEncoder::default();
        let result = scorer.score(
            "Acme revenue increased in 2023",
            "In 2023, revenue at Acme increased",
        );
        assert!(!result.has_contradiction);
        assert!(result.score > 0.6, "{result:?}");
    }

    #[test]
    fn degenerate_input_is_total() {
        let scorer = HeuristicCrossEncoder::default();
        for (claim, evidence) in [
            ("", ""),
            ("", "some evidence"),
            ("claim", ""),
            ("!!! ???", "..."),
            ("東京は大きい", "Zürich wächst schnell"),
        ] {
            let result = scorer.score(claim, evidence);
            assert!((0.0..=1.0).contains(&result.score), "{claim:?} {evidence:?}");
            assert!(!result.score.is_nan());
        }
    }

    #[test]
    fn adjustment_regions() {
        let cfg = AdjustmentConfig::default();
        assert!((adjust_similarity(0.8, 0.9, &cfg) - 0.92).abs() < 1e-6);
        assert_eq!(adjust_similarity(0.95, 0.9, &cfg), 1.0);
        assert!((adjust_similarity(0.8, 0.1, &cfg) - 0.68).abs() < 1e-6);
        assert!((adjust_similarity(0.8, 0.55, &cfg) - 0.8).abs() < 1e-6);
        assert!(adjust_similarity(0.8, 0.6, &cfg) > 0.8);
        assert!(adjust_similarity(0.8, 0.5, &cfg) < 0.8);
    }

    #[test]
    fn thresholds_are_exclusive() {
        let cfg = AdjustmentConfig::default();
        // Exactly 0.7 and 0.4 fall into the linear region.
        let at_boost = adjust_similarity(0.8, 0.7, &cfg);
        assert!((at_boost - 0.8 * (1.0 + 0.15 * 0.2)).abs() < 1e-6);
        let at_penalty = adjust_similarity(0.8, 0.4, &cfg);
        assert!((at_penalty - 0.8 * (1.0 - 0.15 * 0.2)).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn proptest_penalty_is_thirty_percent(blended in 0.0f32..=1.0) {
            let cfg = ContradictionConfig::default();
            let penalised = cfg.apply(blended);
            prop_assert!((penalised - 0.3 * blended).abs() < 1e-6);
            if blended > 0.0 {
                prop_assert!(penalised < blended);
            }
        }

        #[test]
        fn proptest_adjusted_stays_in_unit_range(
            cosine in 0.0f32..=1.0,
            score in 0.0f32..=1.0,
        ) {
            let adjusted = adjust_similarity(cosine, score, &AdjustmentConfig::default());
            prop_assert!((0.0..=1.0).contains(&adjusted));
        }
    }
}
