use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;

use evidence_protocol::CrossEncoderScore;
use lru::LruCache;
use serde::Serialize;

use crate::profile::{CacheConfig, EvictionPolicy};

const KEY_SEPARATOR: char = '\u{1f}';

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded memo of pair scores keyed by truncated (claim, evidence) prefixes.
///
/// Texts that share both prefixes share an entry. The cache never holds more than
/// `capacity` entries; a capacity of zero disables it.
pub struct ScoreCache {
    policy: EvictionPolicy,
    capacity: usize,
    key_prefix_chars: usize,
    entries: Entries,
    stats: CacheStats,
}

enum Entries {
    Disabled,
    Fifo {
        map: HashMap<String, CrossEncoderScore>,
        order: VecDeque<String>,
    },
    Lru(LruCache<String, CrossEncoderScore>),
}

impl ScoreCache {
    pub fn new(capacity: usize, policy: EvictionPolicy, key_prefix_chars: usize) -> Self {
        let entries = match (NonZeroUsize::new(capacity), policy) {
            (None, _) => Entries::Disabled,
            (Some(_), EvictionPolicy::Fifo) => Entries::Fifo {
                map: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            },
            (Some(cap), EvictionPolicy::Lru) => Entries::Lru(LruCache::new(cap)),
        };
        Self {
            policy,
            capacity,
            key_prefix_chars: key_prefix_chars.max(1),
            entries,
            stats: CacheStats::default(),
        }
    }

    pub fn from_config(cfg: &CacheConfig) -> Self {
        Self::new(cfg.capacity, cfg.eviction, cfg.key_prefix_chars)
    }

    pub fn key(&self, claim: &str, evidence: &str) -> String {
        let mut key = String::with_capacity(self.key_prefix_chars * 2 + 1);
        key.extend(claim.chars().take(self.key_prefix_chars));
        key.push(KEY_SEPARATOR);
        key.extend(evidence.chars().take(self.key_prefix_chars));
        key
    }

    /// Looks up a score. Under LRU a hit refreshes the entry; under FIFO it does not.
    pub fn get(&mut self, key: &str) -> Option<CrossEncoderScore> {
        let found = match &mut self.entries {
            Entries::Disabled => None,
            Entries::Fifo { map, .. } => map.get(key).copied(),
            Entries::Lru(cache) => cache.get(key).copied(),
        };
        if found.is_some() {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
        found
    }

    /// Stores a score and returns the key evicted to make room, if any.
    pub fn insert(&mut self, key: String, score: CrossEncoderScore) -> Option<String> {
        let evicted = match &mut self.entries {
            Entries::Disabled => None,
            Entries::Fifo { map, order } => {
                if let Some(existing) = map.get_mut(&key) {
                    *existing = score;
                    return None;
                }
                let mut evicted = None;
                if map.len() >= self.capacity {
                    evicted = order.pop_front();
                    if let Some(oldest) = &evicted {
                        map.remove(oldest);
                    }
                }
                order.push_back(key.clone());
                map.insert(key, score);
                evicted
            }
            Entries::Lru(cache) => match cache.push(key.clone(), score) {
                Some((old_key, _)) if old_key != key => Some(old_key),
                _ => None,
            },
        };
        if let Some(old) = &evicted {
            self.stats.evictions += 1;
            log::debug!("Score cache full ({}), evicted {:?}", self.capacity, old);
        }
        evicted
    }

    pub fn contains(&self, key: &str) -> bool {
        match &self.entries {
            Entries::Disabled => false,
            Entries::Fifo { map, .. } => map.contains_key(key),
            Entries::Lru(cache) => cache.contains(key),
        }
    }

    pub fn len(&self) -> usize {
        match &self.entries {
            Entries::Disabled => 0,
            Entries::Fifo { map, .. } => map.len(),
            Entries::Lru(cache) => cache.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub const fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        match &mut self.entries {
            Entries::Disabled => {}
            Entries::Fifo { map, order } => {
                map.clear();
                order.clear();
            }
            Entries::Lru(cache) => cache.clear(),
        }
        self.stats = CacheStats::default();
    }
}
