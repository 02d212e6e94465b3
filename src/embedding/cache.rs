//! Content-addressed embedding cache.
//!
//! Maps a fingerprint of (normalized text, model id) to a previously
//! computed vector so identical text is never re-embedded while the entry
//! is live. Entries are immutable once written; a race between two
//! concurrent misses only risks a duplicate provider call, never data
//! corruption. Single-flight deduplication is deliberately not provided.

use crate::embedding::provider::EmbeddingProvider;
use crate::error::{EngineError, EngineResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// A cached embedding with its lifetime bounds.
#[derive(Debug, Clone)]
struct CacheEntry {
    vector: Arc<Vec<f32>>,
    created_at: Instant,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now < deadline,
            None => true,
        }
    }
}

/// Fingerprint-keyed embedding cache in front of a provider.
///
/// Thread-safe: lookups never hold a map guard across the provider call,
/// and entries are write-once per fingerprint.
pub struct EmbeddingCache {
    entries: DashMap<String, CacheEntry>,
    provider: Arc<dyn EmbeddingProvider>,
    ttl: Option<Duration>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl EmbeddingCache {
    /// Create a cache in front of `provider`.
    ///
    /// # Arguments
    /// * `ttl` - entry lifetime; `None` disables expiry
    /// * `capacity` - soft bound on entry count; exceeding it triggers an
    ///   eviction sweep before the next insert
    pub fn new(provider: Arc<dyn EmbeddingProvider>, ttl: Option<Duration>, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            provider,
            ttl,
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached vector for this text, embedding it on a miss.
    ///
    /// Empty or whitespace-only text fails with `InvalidInput` before any
    /// provider call. On a provider failure no entry is written, so the
    /// next call retries cleanly.
    pub async fn get_or_compute(&self, text: &str, model_id: &str) -> EngineResult<Arc<Vec<f32>>> {
        if text.trim().is_empty() {
            return Err(EngineError::invalid_input(
                "cannot embed empty or whitespace-only text",
            ));
        }

        let key = fingerprint(text, model_id);
        let now = Instant::now();

        if let Some(vector) = self.lookup(&key, now) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(vector);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(fingerprint = %key, "embedding cache miss");

        let vector = Arc::new(self.provider.embed(text).await?);

        if self.entries.len() >= self.capacity {
            self.evict(now);
        }

        let fresh = CacheEntry {
            vector: Arc::clone(&vector),
            created_at: now,
            expires_at: self.ttl.map(|ttl| now + ttl),
        };
        match self.entries.entry(key) {
            // Keep the first writer's entry on a concurrent double-compute;
            // both vectors are identical for a given fingerprint anyway.
            Entry::Occupied(occupied) if occupied.get().is_live(now) => {
                Ok(Arc::clone(&occupied.get().vector))
            }
            // An expired entry is dead weight: overwrite it so the
            // recomputed vector serves later lookups again.
            Entry::Occupied(mut occupied) => {
                occupied.insert(fresh);
                Ok(vector)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(vector)
            }
        }
    }

    /// Scoped lookup so the map guard drops before any await point.
    fn lookup(&self, key: &str, now: Instant) -> Option<Arc<Vec<f32>>> {
        let entry = self.entries.get(key)?;
        if entry.is_live(now) {
            Some(Arc::clone(&entry.vector))
        } else {
            None
        }
    }

    /// Drop expired entries; if still over capacity, drop the oldest.
    fn evict(&self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_live(now));

        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.created_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Number of live-or-expired entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fraction of lookups served from cache, 0.0 when never used.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }
}

/// Lowercase and collapse whitespace so cosmetically different but
/// semantically identical inputs hit the same cache entry.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic hex SHA-256 over the normalized text and model id.
///
/// The model id is part of the key because different models yield
/// different vector spaces.
pub fn fingerprint(text: &str, model_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(text).as_bytes());
    hasher.update([0u8]);
    hasher.update(model_id.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
