use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RerankError, Result};

const BUILTIN_DEFAULT: &str = include_str!("../../../profiles/default.json");
const BUILTIN_LRU: &str = include_str!("../../../profiles/lru.json");

const SUPPORTED_SCHEMA_VERSION: u32 = 1;

/// Every tunable of the reranker: the borderline band, blend weights, contradiction
/// penalty, similarity adjustment, score cache and batch size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RerankProfile {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    band: SimilarityBand,
    weights: BlendWeights,
    contradiction: ContradictionConfig,
    adjustment: AdjustmentConfig,
    cache: CacheConfig,
    batch: BatchConfig,
}

/// Inclusive cosine-similarity range in which embedding similarity is not trusted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SimilarityBand {
    pub lower: f32,
    pub upper: f32,
}

impl SimilarityBand {
    #[must_use]
    pub fn contains(&self, similarity: f32) -> bool {
        similarity >= self.lower && similarity <= self.upper
    }
}

impl Default for SimilarityBand {
    fn default() -> Self {
        Self {
            lower: 0.70,
            upper: 0.82,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BlendWeights {
    pub token_overlap: f32,
    pub syntactic: f32,
    pub entity_overlap: f32,
    pub role_alignment: f32,
}

impl BlendWeights {
    #[must_use]
    pub fn total(&self) -> f32 {
        self.token_overlap + self.syntactic + self.entity_overlap + self.role_alignment
    }

    /// Weighted mean of the four component signals, normalised by the weight total.
    #[must_use]
    pub fn blend(
        &self,
        token_overlap: f32,
        syntactic: f32,
        entity_overlap: f32,
        role_alignment: f32,
    ) -> f32 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let sum = self.token_overlap * token_overlap
            + self.syntactic * syntactic
            + self.entity_overlap * entity_overlap
            + self.role_alignment * role_alignment;
        (sum / total).clamp(0.0, 1.0)
    }
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            token_overlap: 0.35,
            syntactic: 0.15,
            entity_overlap: 0.25,
            role_alignment: 0.25,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ContradictionConfig {
    /// Fraction of the blended score removed when a contradiction is detected.
    pub penalty: f32,
}

impl ContradictionConfig {
    #[must_use]
    pub fn apply(&self, blended: f32) -> f32 {
        blended * (1.0 - self.penalty)
    }
}

impl Default for ContradictionConfig {
    fn default() -> Self {
        Self { penalty: 0.7 }
    }
}

/// Maps a pair score onto a multiplier for the original cosine similarity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AdjustmentConfig {
    pub boost_above: f32,
    pub penalize_below: f32,
    pub boost: f32,
    pub penalty: f32,
    pub midpoint: f32,
    pub slope: f32,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            boost_above: 0.7,
            penalize_below: 0.4,
            boost: 1.15,
            penalty: 0.85,
            midpoint: 0.55,
            slope: 0.2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    /// Evict the oldest-inserted key; lookups do not refresh recency.
    #[default]
    Fifo,
    /// Evict the least-recently-used key.
    Lru,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Zero disables caching.
    pub capacity: usize,
    pub eviction: EvictionPolicy,
    pub key_prefix_chars: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            eviction: EvictionPolicy::Fifo,
            key_prefix_chars: 100,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BatchConfig {
    pub size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { size: 10 }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProfile {
    #[serde(default)]
    schema_version: Option<u32>,
    name: Option<String>,
    description: Option<String>,
    band: Option<RawBand>,
    weights: Option<RawWeights>,
    contradiction: Option<RawContradiction>,
    adjustment: Option<RawAdjustment>,
    cache: Option<RawCache>,
    batch: Option<RawBatch>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBand {
    lower: Option<f32>,
    upper: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWeights {
    token_overlap: Option<f32>,
    syntactic: Option<f32>,
    entity_overlap: Option<f32>,
    role_alignment: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawContradiction {
    penalty: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAdjustment {
    boost_above: Option<f32>,
    penalize_below: Option<f32>,
    boost: Option<f32>,
    penalty: Option<f32>,
    midpoint: Option<f32>,
    slope: Option<f32>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCache {
    capacity: Option<usize>,
    eviction: Option<EvictionPolicy>,
    key_prefix_chars: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBatch {
    size: Option<usize>,
}

impl Default for RerankProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: None,
            band: SimilarityBand::default(),
            weights: BlendWeights::default(),
            contradiction: ContradictionConfig::default(),
            adjustment: AdjustmentConfig::default(),
            cache: CacheConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

impl RerankProfile {
    pub const BUILTIN_NAMES: &'static [&'static str] = &["default", "lru"];

    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        let parsed = match name {
            "default" => Self::from_bytes("default", BUILTIN_DEFAULT.as_bytes(), None),
            "lru" => Self::from_bytes("lru", BUILTIN_LRU.as_bytes(), Some("default")),
            _ => return None,
        };
        match parsed {
            Ok(profile) => Some(profile),
            Err(err) => {
                log::error!("Bundled profile '{name}' is broken: {err}");
                None
            }
        }
    }

    /// A builtin profile name, else a path to a JSON/TOML profile file.
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        if let Some(profile) = Self::builtin(name_or_path) {
            return Ok(profile);
        }
        let path = Path::new(name_or_path);
        if path.is_file() {
            return Self::from_file(path);
        }
        Err(RerankError::UnknownProfile(name_or_path.to_string()))
    }

    /// Loads a profile file layered over the builtin `default` profile.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| RerankError::ProfileIo {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(&name, &bytes, Some("default"))
    }

    pub fn from_bytes(profile_name: &str, bytes: &[u8], base: Option<&str>) -> Result<Self> {
        let raw = parse_raw(profile_name, bytes)?;
        let merged = match base {
            Some(base_name) => merge_raw_profiles(builtin_raw(base_name)?, raw),
            None => raw,
        };
        Self::from_raw(profile_name, merged)
    }

    fn from_raw(profile_name: &str, raw: RawProfile) -> Result<Self> {
        let invalid = |message: String| RerankError::InvalidProfile {
            name: profile_name.to_string(),
            message,
        };

        if let Some(version) = raw.schema_version {
            if version != SUPPORTED_SCHEMA_VERSION {
                return Err(invalid(format!(
                    "schema_version {version} is not supported (expected {SUPPORTED_SCHEMA_VERSION})"
                )));
            }
        }

        let band = merge_band(raw.band);
        let weights = merge_weights(raw.weights);
        let contradiction = merge_contradiction(raw.contradiction);
        let adjustment = merge_adjustment(raw.adjustment);
        let cache = merge_cache(raw.cache);
        let batch = merge_batch(raw.batch);

        let profile = Self {
            name: raw.name.unwrap_or_else(|| profile_name.to_string()),
            description: raw.description,
            band,
            weights,
            contradiction,
            adjustment,
            cache,
            batch,
        };
        profile.validate().map_err(invalid)?;
        Ok(profile)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let unit = |value: f32| (0.0..=1.0).contains(&value);

        if !unit(self.band.lower) || !unit(self.band.upper) {
            return Err(format!(
                "band bounds must lie in [0, 1] (lower={}, upper={})",
                self.band.lower, self.band.upper
            ));
        }
        if self.band.lower > self.band.upper {
            return Err(format!(
                "band.lower {} exceeds band.upper {}",
                self.band.lower, self.band.upper
            ));
        }

        let weights = [
            ("weights.token_overlap", self.weights.token_overlap),
            ("weights.syntactic", self.weights.syntactic),
            ("weights.entity_overlap", self.weights.entity_overlap),
            ("weights.role_alignment", self.weights.role_alignment),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{field} must be a non-negative number (got {value})"));
            }
        }
        if self.weights.total() <= 0.0 {
            return Err("weights must not all be zero".to_string());
        }

        if !unit(self.contradiction.penalty) {
            return Err(format!(
                "contradiction.penalty must lie in [0, 1] (got {})",
                self.contradiction.penalty
            ));
        }

        let adjustment = &self.adjustment;
        if !unit(adjustment.boost_above)
            || !unit(adjustment.penalize_below)
            || !unit(adjustment.midpoint)
        {
            return Err("adjustment thresholds and midpoint must lie in [0, 1]".to_string());
        }
        if adjustment.penalize_below > adjustment.boost_above {
            return Err(format!(
                "adjustment.penalize_below {} exceeds adjustment.boost_above {}",
                adjustment.penalize_below, adjustment.boost_above
            ));
        }
        for (field, value) in [
            ("adjustment.boost", adjustment.boost),
            ("adjustment.penalty", adjustment.penalty),
            ("adjustment.slope", adjustment.slope),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{field} must be a non-negative number (got {value})"));
            }
        }

        if self.batch.size == 0 {
            return Err("batch.size must be at least 1".to_string());
        }
        if self.cache.key_prefix_chars == 0 {
            return Err("cache.key_prefix_chars must be at least 1".to_string());
        }
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub const fn band(&self) -> &SimilarityBand {
        &self.band
    }

    #[must_use]
    pub const fn weights(&self) -> &BlendWeights {
        &self.weights
    }

    #[must_use]
    pub const fn contradiction(&self) -> &ContradictionConfig {
        &self.contradiction
    }

    #[must_use]
    pub const fn adjustment(&self) -> &AdjustmentConfig {
        &self.adjustment
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheConfig {
        &self.cache
    }

    #[must_use]
    pub const fn batch(&self) -> &BatchConfig {
        &self.batch
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Zero is raised to one; a batch always holds at least one candidate.
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch.size = size.max(1);
        self
    }
}

fn builtin_raw(name: &str) -> Result<RawProfile> {
    match name {
        "default" => parse_raw(name, BUILTIN_DEFAULT.as_bytes()),
        "lru" => Ok(merge_raw_profiles(
            parse_raw("default", BUILTIN_DEFAULT.as_bytes())?,
            parse_raw(name, BUILTIN_LRU.as_bytes())?,
        )),
        _ => Err(RerankError::UnknownProfile(name.to_string())),
    }
}

fn parse_raw(profile_name: &str, bytes: &[u8]) -> Result<RawProfile> {
    let parse_error = |message: String| RerankError::ProfileParse {
        name: profile_name.to_string(),
        message,
    };

    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes)
                .map_err(|err| parse_error(format!("{json_err}; {err}")))?;
            let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                parse_error(format!("not valid JSON ({json_err}); TOML parse error: {toml_err}"))
            })?;
            serde_json::to_value(toml_value)
                .map_err(|err| parse_error(format!("failed to convert TOML profile: {err}")))?
        }
    };

    serde_json::from_value(value).map_err(|err| RerankError::InvalidProfile {
        name: profile_name.to_string(),
        message: err.to_string(),
    })
}

fn merge_raw_profiles(base: RawProfile, overlay: RawProfile) -> RawProfile {
    RawProfile {
        schema_version: overlay.schema_version.or(base.schema_version),
        name: overlay.name.or(base.name),
        description: overlay.description.or(base.description),
        band: merge_band_raw(base.band, overlay.band),
        weights: merge_weights_raw(base.weights, overlay.weights),
        contradiction: overlay
            .contradiction
            .and_then(|raw| raw.penalty)
            .or(base.contradiction.and_then(|raw| raw.penalty))
            .map(|penalty| RawContradiction {
                penalty: Some(penalty),
            }),
        adjustment: merge_adjustment_raw(base.adjustment, overlay.adjustment),
        cache: merge_cache_raw(base.cache, overlay.cache),
        batch: overlay
            .batch
            .and_then(|raw| raw.size)
            .or(base.batch.and_then(|raw| raw.size))
            .map(|size| RawBatch { size: Some(size) }),
    }
}

fn merge_band_raw(base: Option<RawBand>, overlay: Option<RawBand>) -> Option<RawBand> {
    let base = base.unwrap_or_default();
    let overlay = overlay.unwrap_or_default();
    Some(RawBand {
        lower: overlay.lower.or(base.lower),
        upper: overlay.upper.or(base.upper),
    })
}

fn merge_weights_raw(base: Option<RawWeights>, overlay: Option<RawWeights>) -> Option<RawWeights> {
    let base = base.unwrap_or_default();
    let overlay = overlay.unwrap_or_default();
    Some(RawWeights {
        token_overlap: overlay.token_overlap.or(base.token_overlap),
        syntactic: overlay.syntactic.or(base.syntactic),
        entity_overlap: overlay.entity_overlap.or(base.entity_overlap),
        role_alignment: overlay.role_alignment.or(base.role_alignment),
    })
}

fn merge_adjustment_raw(
    base: Option<RawAdjustment>,
    overlay: Option<RawAdjustment>,
) -> Option<RawAdjustment> {
    let base = base.unwrap_or_default();
    let overlay = overlay.unwrap_or_default();
    Some(RawAdjustment {
        boost_above: overlay.boost_above.or(base.boost_above),
        penalize_below: overlay.penalize_below.or(base.penalize_below),
        boost: overlay.boost.or(base.boost),
        penalty: overlay.penalty.or(base.penalty),
        midpoint: overlay.midpoint.or(base.midpoint),
        slope: overlay.slope.or(base.slope),
    })
}

fn merge_cache_raw(base: Option<RawCache>, overlay: Option<RawCache>) -> Option<RawCache> {
    let base = base.unwrap_or_default();
    let overlay = overlay.unwrap_or_default();
    Some(RawCache {
        capacity: overlay.capacity.or(base.capacity),
        eviction: overlay.eviction.or(base.eviction),
        key_prefix_chars: overlay.key_prefix_chars.or(base.key_prefix_chars),
    })
}

fn merge_band(raw: Option<RawBand>) -> SimilarityBand {
    let raw = raw.unwrap_or_default();
    let defaults = SimilarityBand::default();
    SimilarityBand {
        lower: raw.lower.unwrap_or(defaults.lower),
        upper: raw.upper.unwrap_or(defaults.upper),
    }
}

fn merge_weights(raw: Option<RawWeights>) -> BlendWeights {
    let raw = raw.unwrap_or_default();
    let defaults = BlendWeights::default();
    BlendWeights {
        token_overlap: raw.token_overlap.unwrap_or(defaults.token_overlap),
        syntactic: raw.syntactic.unwrap_or(defaults.syntactic),
        entity_overlap: raw.entity_overlap.unwrap_or(defaults.entity_overlap),
        role_alignment: raw.role_alignment.unwrap_or(defaults.role_alignment),
    }
}

fn merge_contradiction(raw: Option<RawContradiction>) -> ContradictionConfig {
    let defaults = ContradictionConfig::default();
    ContradictionConfig {
        penalty: raw.and_then(|raw| raw.penalty).unwrap_or(defaults.penalty),
    }
}

fn merge_adjustment(raw: Option<RawAdjustment>) -> AdjustmentConfig {
    let raw = raw.unwrap_or_default();
    let defaults = AdjustmentConfig::default();
    AdjustmentConfig {
        boost_above: raw.boost_above.unwrap_or(defaults.boost_above),
        penalize_below: raw.penalize_below.unwrap_or(defaults.penalize_below),
        boost: raw.boost.unwrap_or(defaults.boost),
        penalty: raw.penalty.unwrap_or(defaults.penalty),
        midpoint: raw.midpoint.unwrap_or(defaults.midpoint),
        slope: raw.slope.unwrap_or(defaults.slope),
    }
}

fn merge_cache(raw: Option<RawCache>) -> CacheConfig {
    let raw = raw.unwrap_or_default();
    let defaults = CacheConfig::default();
    CacheConfig {
        capacity: raw.capacity.unwrap_or(defaults.capacity),
        eviction: raw.eviction.unwrap_or(defaults.eviction),
        key_prefix_chars: raw.key_prefix_chars.unwrap_or(defaults.key_prefix_chars),
    }
}

fn merge_batch(raw: Option<RawBatch>) -> BatchConfig {
    let defaults = BatchConfig::default();
    BatchConfig {
        size: raw.and_then(|raw| raw.size).unwrap_or(defaults.size),
    }
}
