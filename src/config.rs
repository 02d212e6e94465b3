//! Configuration module for the matching engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `RM_` and use double underscores
//! to separate nested levels:
//! - `RM_CACHE__TTL_SECS=3600` sets `cache.ttl_secs`
//! - `RM_BATCH__CONCURRENCY=4` sets `batch.concurrency`
//! - `RM_MATCHING__VECTOR_WEIGHT=0.7` sets `matching.vector_weight`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Embedding cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Vector index settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Matching engine settings
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Batch pipeline settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Retry policy for transient external-call failures
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Model identifier, part of the cache fingerprint
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Deadline for a single embedding call in milliseconds
    #[serde(default = "default_embed_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// Entry time-to-live in seconds (0 disables expiry)
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of cached embeddings before eviction kicks in
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    /// Soft capacity per index, used for the fullness ratio in stats
    #[serde(default = "default_index_soft_capacity")]
    pub soft_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MatchingConfig {
    /// Weight of the raw vector similarity signal
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,

    /// Weight of the secondary semantic-analysis signal
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Minimum combined score for a match to be returned
    #[serde(default = "default_min_combined_score")]
    pub min_combined_score: f32,

    /// Maximum number of matches returned per request
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Whether to invoke the semantic analyzer at all
    #[serde(default = "default_true")]
    pub enable_semantic_analysis: bool,

    /// Combined-score threshold for the "Excellent" band
    #[serde(default = "default_band_excellent")]
    pub band_excellent: f32,

    /// Combined-score threshold for the "Very Good" band
    #[serde(default = "default_band_very_good")]
    pub band_very_good: f32,

    /// Combined-score threshold for the "Good" band
    #[serde(default = "default_band_good")]
    pub band_good: f32,

    /// Deadline for a single analyzer call in milliseconds
    #[serde(default = "default_analyzer_timeout_ms")]
    pub analyzer_timeout_ms: u64,

    /// Concurrent analyzer calls per match request
    #[serde(default = "default_analyzer_concurrency")]
    pub analyzer_concurrency: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BatchConfig {
    /// Concurrent embedding calls per batch request
    #[serde(default = "default_batch_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetryConfig {
    /// Total attempts for a transient failure (first call included)
    #[serde(default = "default_retry_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds, doubled per attempt
    #[serde(default = "default_retry_base_delay_ms")]
    pub base_delay_ms: u64,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_embed_timeout_ms() -> u64 {
    10_000
}
fn default_cache_ttl_secs() -> u64 {
    86_400
}
fn default_cache_capacity() -> usize {
    10_000
}
fn default_index_soft_capacity() -> usize {
    100_000
}
fn default_vector_weight() -> f32 {
    0.6
}
fn default_semantic_weight() -> f32 {
    0.4
}
fn default_min_combined_score() -> f32 {
    0.7
}
fn default_max_results() -> usize {
    20
}
fn default_true() -> bool {
    true
}
fn default_band_excellent() -> f32 {
    0.9
}
fn default_band_very_good() -> f32 {
    0.8
}
fn default_band_good() -> f32 {
    0.7
}
fn default_analyzer_timeout_ms() -> u64 {
    5_000
}
fn default_analyzer_concurrency() -> usize {
    8
}
fn default_batch_concurrency() -> usize {
    10
}
fn default_retry_max_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    100
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            embedding: EmbeddingConfig::default(),
            cache: CacheConfig::default(),
            index: IndexConfig::default(),
            matching: MatchingConfig::default(),
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            timeout_ms: default_embed_timeout_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl_secs(),
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            soft_capacity: default_index_soft_capacity(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            vector_weight: default_vector_weight(),
            semantic_weight: default_semantic_weight(),
            min_combined_score: default_min_combined_score(),
            max_results: default_max_results(),
            enable_semantic_analysis: default_true(),
            band_excellent: default_band_excellent(),
            band_very_good: default_band_very_good(),
            band_good: default_band_good(),
            analyzer_timeout_ms: default_analyzer_timeout_ms(),
            analyzer_concurrency: default_analyzer_concurrency(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_batch_concurrency(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_max_attempts(),
            base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Settings {
    /// Load settings with the full layering: defaults, then an optional
    /// TOML file, then `RM_`-prefixed environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed("RM_").split("__")).extract()
    }
}
