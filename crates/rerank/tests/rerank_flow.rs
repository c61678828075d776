use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use evidence_protocol::{CrossEncoderScore, Evidence};
use evidence_rerank::{
    EvictionPolicy, EvidenceReranker, HeuristicCrossEncoder, PairScorer, RerankProfile,
};
use pretty_assertions::assert_eq;

struct CountingScorer {
    inner: HeuristicCrossEncoder,
    calls: AtomicUsize,
}

impl CountingScorer {
    fn new() -> Self {
        Self {
            inner: HeuristicCrossEncoder::default(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PairScorer for CountingScorer {
    fn score(&self, claim: &str, evidence: &str) -> CrossEncoderScore {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.score(claim, evidence)
    }
}

fn default_reranker() -> EvidenceReranker {
    let profile = RerankProfile::builtin("default").expect("builtin default profile");
    EvidenceReranker::new(&profile)
}

#[tokio::test]
async fn contradicting_borderline_evidence_drops_below_its_cosine() {
    let reranker = default_reranker();
    let outcome = reranker
        .rerank(
            "The company is profitable",
            vec![Evidence::new("q3", "The company is not profitable this quarter", 0.75)],
        )
        .await;

    let item = &outcome.results[0];
    assert!(item.reranked);
    let score = item.cross_encoder_score.expect("cross-encoder score");
    assert!(score.has_contradiction);
    assert!(score.score < 0.4, "{score:?}");
    assert!((item.adjusted_score - 0.75 * 0.85).abs() < 1e-5);
    assert!(item.adjusted_score < 0.7);
}

#[tokio::test]
async fn confident_evidence_passes_through_untouched() {
    let reranker = default_reranker();
    let outcome = reranker
        .rerank(
            "Water boils at 100 degrees Celsius",
            vec![Evidence::new("e", "Water boils at 100 °C at sea level", 0.95)],
        )
        .await;

    let item = &outcome.results[0];
    assert!(!item.reranked);
    assert_eq!(item.adjusted_score, 0.95);
    assert!(item.cross_encoder_score.is_none());
    assert_eq!(outcome.stats.borderline, 0);
    assert_eq!(outcome.stats.computed, 0);
}

#[tokio::test]
async fn band_bounds_are_inclusive() {
    let reranker = default_reranker();
    let outcome = reranker
        .rerank(
            "The bridge opened in 1998",
            vec![
                Evidence::new("below", "The bridge opened in 1998", 0.6999),
                Evidence::new("lower", "The bridge opened in 1998", 0.70),
                Evidence::new("upper", "The bridge opened in 1998", 0.82),
                Evidence::new("above", "The bridge opened in 1998", 0.8201),
            ],
        )
        .await;

    let reranked: Vec<(&str, bool)> = {
        let mut pairs: Vec<(&str, bool)> = outcome
            .results
            .iter()
            .map(|item| (item.evidence.id.as_str(), item.reranked))
            .collect();
        pairs.sort();
        pairs
    };
    assert_eq!(
        reranked,
        vec![
            ("above", false),
            ("below", false),
            ("lower", true),
            ("upper", true),
        ]
    );
    assert_eq!(outcome.stats.borderline, 2);
}

#[tokio::test]
async fn repeated_pairs_are_scored_once() {
    let scorer = Arc::new(CountingScorer::new());
    let reranker = EvidenceReranker::with_scorer(&RerankProfile::default(), scorer.clone());
    let evidence = vec![Evidence::new("e1", "Inflation slowed in May", 0.78)];

    let first = reranker.rerank("Inflation slowed in May", evidence.clone()).await;
    let second = reranker.rerank("Inflation slowed in May", evidence).await;

    assert_eq!(scorer.calls(), 1);
    assert_eq!(first.stats.computed, 1);
    assert_eq!(second.stats.cache_hits, 1);
    assert_eq!(second.stats.computed, 0);
    assert_eq!(first.results[0].adjusted_score, second.results[0].adjusted_score);
    assert_eq!(reranker.cache_len(), 1);
}

#[tokio::test]
async fn fresh_rerankers_agree() {
    let evidence = vec![
        Evidence::new("a", "The treaty was signed in Paris in 1951", 0.74),
        Evidence::new("b", "The treaty was never signed", 0.80),
        Evidence::new("c", "Paris hosted the signing ceremony", 0.91),
        Evidence::new("d", "Unrelated weather report", 0.30),
    ];
    let claim = "The treaty was signed in Paris";

    let first = default_reranker().rerank(claim, evidence.clone()).await;
    let second = default_reranker().rerank(claim, evidence).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn results_are_sorted_and_complete() {
    let reranker = default_reranker();
    let evidence: Vec<Evidence> = [0.2, 0.71, 0.99, 0.8, 0.75, 0.5, 0.82, 0.7]
        .iter()
        .enumerate()
        .map(|(idx, sim)| {
            Evidence::new(
                format!("e{idx}"),
                format!("Solar output rose {idx} percent in Spain"),
                *sim,
            )
        })
        .collect();

    let outcome = reranker.rerank("Solar output rose in Spain", evidence).await;

    assert_eq!(outcome.results.len(), 8);
    assert_eq!(outcome.stats.total, 8);
    assert_eq!(outcome.stats.borderline, 5);
    for pair in outcome.results.windows(2) {
        assert!(pair[0].adjusted_score >= pair[1].adjusted_score);
    }
    let mut ids: Vec<&str> = outcome
        .results
        .iter()
        .map(|item| item.evidence.id.as_str())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["e0", "e1", "e2", "e3", "e4", "e5", "e6", "e7"]);
}

#[tokio::test]
async fn empty_input_yields_empty_output() {
    let outcome = default_reranker().rerank("anything", Vec::new()).await;
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.stats.total, 0);
    assert_eq!(outcome.stats.borderline, 0);
}

#[tokio::test]
async fn more_than_one_batch_is_fully_scored() {
    let scorer = Arc::new(CountingScorer::new());
    let profile = RerankProfile::default().with_batch_size(4);
    let reranker = EvidenceReranker::with_scorer(&profile, scorer.clone());
    let evidence: Vec<Evidence> = (0..23)
        .map(|idx| Evidence::new(format!("e{idx}"), format!("distinct passage {idx}"), 0.76))
        .collect();

    let outcome = reranker.rerank("a claim", evidence).await;

    assert_eq!(scorer.calls(), 23);
    assert_eq!(outcome.stats.computed, 23);
    assert!(outcome.results.iter().all(|item| item.reranked));
}

#[tokio::test]
async fn extra_fields_survive_reranking() {
    let evidence: Evidence = serde_json::from_value(serde_json::json!({
        "id": "doc-7",
        "content": "The museum reopened in 2021",
        "cosineSimilarity": 0.77,
        "source": "archive",
        "page": 12
    }))
    .expect("evidence");

    let outcome = default_reranker()
        .rerank("The museum reopened in 2021", vec![evidence])
        .await;
    let item = &outcome.results[0];
    assert_eq!(item.evidence.extra["source"], "archive");
    assert_eq!(item.evidence.extra["page"], 12);

    let wire = serde_json::to_value(item).expect("serialize");
    assert_eq!(wire["source"], "archive");
    assert_eq!(wire["reranked"], true);
}

#[tokio::test]
async fn lru_profile_is_selectable() {
    let profile = RerankProfile::resolve("lru").expect("lru profile");
    assert_eq!(profile.cache().eviction, EvictionPolicy::Lru);
    let reranker = EvidenceReranker::new(&profile);
    let outcome = reranker
        .rerank("Rain fell", vec![Evidence::new("r", "Rain fell overnight", 0.72)])
        .await;
    assert!(outcome.results[0].reranked);
    assert_eq!(reranker.cache_stats().misses, 1);
}

#[tokio::test]
async fn caller_copies_of_ranking_fields_are_overwritten() {
    let evidence: Vec<Evidence> = serde_json::from_value(serde_json::json!([
        {
            "id": "border",
            "content": "The museum reopened in 2021",
            "cosineSimilarity": 0.77,
            "adjustedScore": 0.01,
            "reranked": "yes"
        },
        {
            "id": "sure",
            "content": "The museum reopened",
            "cosineSimilarity": 0.9,
            "crossEncoderScore": {"score": 1.0}
        }
    ]))
    .expect("evidence");

    let outcome = default_reranker()
        .rerank("The museum reopened in 2021", evidence)
        .await;

    for item in &outcome.results {
        assert!(item.evidence.extra.is_empty(), "{:?}", item.evidence.extra);
        let wire = serde_json::to_string(item).expect("serialize");
        assert_eq!(wire.matches("\"adjustedScore\"").count(), 1, "{wire}");
        assert_eq!(wire.matches("\"reranked\"").count(), 1, "{wire}");
        let parsed: evidence_protocol::RankedEvidence =
            serde_json::from_str(&wire).expect("output parses back");
        assert_eq!(&parsed, item);
    }
}
