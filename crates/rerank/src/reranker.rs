use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use evidence_protocol::{CrossEncoderScore, Evidence, RankedEvidence, RerankStats};

use crate::cache::{CacheStats, ScoreCache};
use crate::profile::{AdjustmentConfig, RerankProfile, SimilarityBand};
use crate::scorer::{adjust_similarity, HeuristicCrossEncoder, PairScorer};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredPair {
    pub score: CrossEncoderScore,
    pub adjusted_score: f32,
    /// Served from the score cache rather than computed.
    pub cached: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RerankOutcome {
    pub results: Vec<RankedEvidence>,
    pub stats: RerankStats,
}

/// Scorer, cache and adjustment shared by every in-flight scoring task.
#[derive(Clone)]
struct PairScoring {
    scorer: Arc<dyn PairScorer>,
    cache: Arc<Mutex<ScoreCache>>,
    adjustment: AdjustmentConfig,
}

impl PairScoring {
    fn lock_cache(&self) -> MutexGuard<'_, ScoreCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // The lock is not held while scoring, so two tasks racing on the same pair may
    // both compute it; the second insert overwrites the first with an equal value.
    fn score(&self, claim: &str, evidence: &str, cosine_similarity: f32) -> ScoredPair {
        let (key, hit) = {
            let mut cache = self.lock_cache();
            let key = cache.key(claim, evidence);
            let hit = cache.get(&key);
            (key, hit)
        };

        let (score, cached) = match hit {
            Some(score) => (score, true),
            None => {
                let score = self.scorer.score(claim, evidence);
                self.lock_cache().insert(key, score);
                (score, false)
            }
        };

        ScoredPair {
            score,
            adjusted_score: adjust_similarity(cosine_similarity, score.score, &self.adjustment),
            cached,
        }
    }
}

/// Re-scores evidence whose embedding similarity to a claim is borderline and
/// reorders the full list by adjusted score.
pub struct EvidenceReranker {
    scoring: PairScoring,
    band: SimilarityBand,
    batch_size: usize,
}

impl EvidenceReranker {
    pub fn new(profile: &RerankProfile) -> Self {
        Self::with_scorer(profile, Arc::new(HeuristicCrossEncoder::new(profile)))
    }

    /// Uses a caller-supplied pair scorer, e.g. a model-backed cross-encoder.
    pub fn with_scorer(profile: &RerankProfile, scorer: Arc<dyn PairScorer>) -> Self {
        Self {
            scoring: PairScoring {
                scorer,
                cache: Arc::new(Mutex::new(ScoreCache::from_config(profile.cache()))),
                adjustment: *profile.adjustment(),
            },
            band: *profile.band(),
            batch_size: profile.batch().size.max(1),
        }
    }

    #[must_use]
    pub fn is_borderline(&self, similarity: f32) -> bool {
        self.band.contains(similarity)
    }

    /// Scores one pair through the cache, regardless of whether it is borderline.
    pub fn cross_encode_score(&self, claim: &str, evidence: &Evidence) -> ScoredPair {
        self.scoring.score(claim, &evidence.content, evidence.cosine_similarity)
    }

    /// Rescores the borderline items, passes the rest through, and returns everything
    /// sorted by adjusted score (descending, ties in input order). Never fails: a
    /// scoring task that dies leaves its item unreranked.
    pub async fn rerank(&self, claim: &str, evidence: Vec<Evidence>) -> RerankOutcome {
        let total = evidence.len();
        let mut ranked: Vec<(usize, RankedEvidence)> = Vec::with_capacity(total);
        let mut borderline: Vec<(usize, Evidence)> = Vec::new();
        for (position, item) in evidence.into_iter().enumerate() {
            if self.is_borderline(item.cosine_similarity) {
                borderline.push((position, item));
            } else {
                ranked.push((position, RankedEvidence::passthrough(item)));
            }
        }

        let mut stats = RerankStats {
            total,
            borderline: borderline.len(),
            ..RerankStats::default()
        };
        log::debug!(
            "Rerank: {} candidates, {} borderline in [{}, {}], batch size {}",
            total,
            stats.borderline,
            self.band.lower,
            self.band.upper,
            self.batch_size
        );

        let claim: Arc<str> = Arc::from(claim);
        let mut pending = borderline.into_iter().peekable();
        while pending.peek().is_some() {
            let batch: Vec<(usize, Evidence)> = pending.by_ref().take(self.batch_size).collect();
            let handles: Vec<_> = batch
                .iter()
                .map(|(_, item)| {
                    let scoring = self.scoring.clone();
                    let claim = Arc::clone(&claim);
                    let content = item.content.clone();
                    let cosine = item.cosine_similarity;
                    tokio::task::spawn_blocking(move || scoring.score(&claim, &content, cosine))
                })
                .collect();

            for ((position, item), handle) in batch.into_iter().zip(handles) {
                match handle.await {
                    Ok(scored) => {
                        if scored.cached {
                            stats.cache_hits += 1;
                        } else {
                            stats.computed += 1;
                        }
                        ranked.push((
                            position,
                            RankedEvidence::rescored(item, scored.adjusted_score, scored.score),
                        ));
                    }
                    Err(err) => {
                        log::warn!(
                            "Scoring evidence '{}' failed ({err}); keeping its cosine similarity",
                            item.id
                        );
                        ranked.push((position, RankedEvidence::passthrough(item)));
                    }
                }
            }
        }

        ranked.sort_by(|(pos_a, a), (pos_b, b)| {
            sort_key(b.adjusted_score)
                .total_cmp(&sort_key(a.adjusted_score))
                .then(pos_a.cmp(pos_b))
        });

        log::info!(
            "Rerank completed: {} results, {} rescored ({} cached)",
            total,
            stats.cache_hits + stats.computed,
            stats.cache_hits
        );

        RerankOutcome {
            results: ranked.into_iter().map(|(_, item)| item).collect(),
            stats,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.scoring.lock_cache().stats()
    }

    pub fn cache_len(&self) -> usize {
        self.scoring.lock_cache().len()
    }

    pub fn clear_cache(&self) {
        self.scoring.lock_cache().clear();
    }
}

fn sort_key(score: f32) -> f32 {
    if score.is_finite() {
        score
    } else {
        f32::NEG_INFINITY
    }
}
