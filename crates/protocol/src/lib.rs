use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const WIRE_SCHEMA_VERSION: u32 = 1;

/// A candidate passage retrieved for a claim, with its precomputed embedding similarity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub id: String,
    pub content: String,
    pub cosine_similarity: f32,
    /// Caller-owned fields, carried through reranking untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Evidence {
    pub fn new(id: impl Into<String>, content: impl Into<String>, cosine_similarity: f32) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            cosine_similarity,
            extra: Map::new(),
        }
    }
}

/// Breakdown of a pairwise (claim, evidence) score.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrossEncoderScore {
    /// Final pair score in [0, 1], after the contradiction penalty.
    pub score: f32,
    /// Weighted blend of the component signals before any penalty.
    pub blended: f32,
    pub token_overlap: f32,
    pub syntactic: f32,
    pub entity_overlap: f32,
    pub role_alignment: f32,
    pub has_contradiction: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankedEvidence {
    #[serde(flatten)]
    pub evidence: Evidence,
    pub adjusted_score: f32,
    pub reranked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_encoder_score: Option<CrossEncoderScore>,
}

/// Wire names owned by `RankedEvidence`; a caller copy in `Evidence::extra` is dropped.
const RANKING_FIELDS: &[&str] = &["adjustedScore", "reranked", "crossEncoderScore"];

impl RankedEvidence {
    /// Wraps an item that was not rescored: its adjusted score is its cosine similarity.
    pub fn passthrough(evidence: Evidence) -> Self {
        let adjusted_score = evidence.cosine_similarity;
        Self::from_parts(evidence, adjusted_score, None)
    }

    pub fn rescored(evidence: Evidence, adjusted_score: f32, score: CrossEncoderScore) -> Self {
        Self::from_parts(evidence, adjusted_score, Some(score))
    }

    fn from_parts(
        mut evidence: Evidence,
        adjusted_score: f32,
        cross_encoder_score: Option<CrossEncoderScore>,
    ) -> Self {
        for field in RANKING_FIELDS {
            evidence.extra.remove(*field);
        }
        Self {
            evidence,
            adjusted_score,
            reranked: cross_encoder_score.is_some(),
            cross_encoder_score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RerankRequest {
    pub claim: String,
    #[serde(default, alias = "evidenceList")]
    pub evidence: Vec<Evidence>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RerankStats {
    pub total: usize,
    pub borderline: usize,
    pub cache_hits: usize,
    pub computed: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RerankResponse {
    pub schema_version: u32,
    pub results: Vec<RankedEvidence>,
    pub stats: RerankStats,
}

impl RerankResponse {
    pub fn new(results: Vec<RankedEvidence>, stats: RerankStats) -> Self {
        Self {
            schema_version: WIRE_SCHEMA_VERSION,
            results,
            stats,
        }
    }
}

pub fn serialize_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let raw = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(raw)
}
