mod cache;
mod error;
mod lexicon;
mod patterns;
mod profile;
mod reranker;
mod scorer;
mod signals;
mod text;

pub use cache::{CacheStats, ScoreCache};
pub use error::{RerankError, Result};
pub use lexicon::Lexicon;
pub use profile::{
    AdjustmentConfig, BatchConfig, BlendWeights, CacheConfig, ContradictionConfig,
    EvictionPolicy, RerankProfile, SimilarityBand,
};
pub use reranker::{EvidenceReranker, RerankOutcome, ScoredPair};
pub use scorer::{adjust_similarity, HeuristicCrossEncoder, PairScorer};
