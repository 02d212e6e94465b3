//! Top-level service facade wiring the engine's components together.
//!
//! `MatchingService` owns the embedding cache, index registry, search
//! service, matching engine, and batch pipeline, configured from one
//! `Settings` value. Callers bring the capability implementations
//! (embedding provider, semantic analyzer, content store) and get the
//! whole matching surface behind one type.

use crate::analyze::SemanticAnalyzer;
use crate::batch::{BatchOutcome, BatchPipeline, BatchRecord};
use crate::config::Settings;
use crate::embedding::{EmbeddingCache, EmbeddingProvider};
use crate::error::EngineResult;
use crate::index::{IndexRegistry, MetadataFilter};
use crate::matching::{MatchConfig, MatchDirection, MatchOutcome, MatchingEngine};
use crate::retry::{RetryPolicy, with_timeout};
use crate::search::{DEFAULT_TOP_K, SimilaritySearch};
use crate::store::ContentStore;
use crate::types::{ContentType, IndexStats, MetadataMap, SearchResult};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Deadline for the health probe's canary embedding.
const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Overall service health, from the canary embedding probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unavailable,
}

/// Health probe outcome with operational details.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub cache_entries: usize,
    pub cache_hit_rate: f64,
    pub index_counts: HashMap<ContentType, usize>,
    pub detail: Option<String>,
}

/// The full matching surface behind one handle.
pub struct MatchingService {
    settings: Settings,
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<EmbeddingCache>,
    registry: Arc<IndexRegistry>,
    store: Arc<dyn ContentStore>,
    search: Arc<SimilaritySearch>,
    engine: MatchingEngine,
    batch: BatchPipeline,
}

impl MatchingService {
    pub fn new(
        settings: Settings,
        provider: Arc<dyn EmbeddingProvider>,
        analyzer: Arc<dyn SemanticAnalyzer>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        let ttl = if settings.cache.ttl_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(settings.cache.ttl_secs))
        };
        let cache = Arc::new(EmbeddingCache::new(
            Arc::clone(&provider),
            ttl,
            settings.cache.capacity,
        ));
        let registry = Arc::new(IndexRegistry::in_memory(settings.index.soft_capacity));
        let retry = RetryPolicy::from(&settings.retry);
        let embed_timeout = Duration::from_millis(settings.embedding.timeout_ms);
        let model_id = provider.model_id().to_string();

        let search = Arc::new(SimilaritySearch::new(
            Arc::clone(&cache),
            Arc::clone(&registry),
            Arc::clone(&store),
            model_id.clone(),
            retry,
            embed_timeout,
        ));
        let engine = MatchingEngine::new(
            Arc::clone(&search),
            analyzer,
            Arc::clone(&store),
            retry,
            Duration::from_millis(settings.matching.analyzer_timeout_ms),
            settings.matching.analyzer_concurrency,
        );
        let batch = BatchPipeline::new(
            Arc::clone(&cache),
            Arc::clone(&registry),
            Arc::clone(&store),
            model_id,
            retry,
            embed_timeout,
            settings.batch.concurrency,
        );

        info!(
            model = %settings.embedding.model,
            cache_capacity = settings.cache.capacity,
            "matching service initialized"
        );
        Self {
            settings,
            provider,
            cache,
            registry,
            store,
            search,
            engine,
            batch,
        }
    }

    /// Similarity search over one content type's index.
    ///
    /// `top_k` defaults to 10 and `min_similarity` to 0.0 when omitted.
    pub async fn search(
        &self,
        query_text: &str,
        content_type: ContentType,
        top_k: Option<usize>,
        min_similarity: Option<f32>,
        filter: Option<&MetadataFilter>,
    ) -> EngineResult<Vec<SearchResult>> {
        self.search
            .search(
                query_text,
                content_type,
                top_k.unwrap_or(DEFAULT_TOP_K),
                min_similarity.unwrap_or(0.0),
                filter,
            )
            .await
    }

    /// Embed and index one text, replacing any record with the same id.
    pub async fn upsert(
        &self,
        content_type: ContentType,
        content_id: &str,
        text: &str,
        metadata: MetadataMap,
        owner_id: Option<String>,
    ) -> EngineResult<()> {
        self.batch
            .ingest_single(BatchRecord {
                content_id: content_id.to_string(),
                content_type,
                text: text.to_string(),
                metadata,
                owner_id,
            })
            .await
    }

    /// Batch ingestion with partial-failure reporting.
    pub async fn batch_upsert(&self, records: Vec<BatchRecord>) -> EngineResult<BatchOutcome> {
        self.batch.ingest(records).await
    }

    /// Remove one record from the index and content store. Idempotent.
    pub async fn delete(&self, content_type: ContentType, content_id: &str) -> EngineResult<bool> {
        let existed = self.registry.index_for(content_type).delete(content_id).await?;
        self.store.remove(content_type, content_id).await?;
        Ok(existed)
    }

    /// Batch deletion; absent ids count as successes.
    pub async fn batch_delete(
        &self,
        content_type: ContentType,
        content_ids: Vec<String>,
    ) -> EngineResult<BatchOutcome> {
        self.batch.delete(content_type, content_ids).await
    }

    /// Match a resume against the job index.
    pub async fn match_resume_to_jobs(
        &self,
        resume_text: &str,
        job_pool: Option<&[String]>,
        config: Option<MatchConfig>,
    ) -> EngineResult<MatchOutcome> {
        let config = config.unwrap_or_else(|| MatchConfig::from_settings(&self.settings.matching));
        self.engine
            .run(resume_text, MatchDirection::ResumeToJobs, job_pool, &config)
            .await
    }

    /// Match a job description against the resume index.
    pub async fn match_jobs_to_resume(
        &self,
        job_text: &str,
        resume_pool: Option<&[String]>,
        config: Option<MatchConfig>,
    ) -> EngineResult<MatchOutcome> {
        let config = config.unwrap_or_else(|| MatchConfig::from_settings(&self.settings.matching));
        self.engine
            .run(job_text, MatchDirection::JobsToResume, resume_pool, &config)
            .await
    }

    /// Statistics for one content type's index.
    pub async fn stats(&self, content_type: ContentType) -> EngineResult<IndexStats> {
        self.registry.index_for(content_type).stats().await
    }

    /// Probe the embedding provider with a canary text and report
    /// operational numbers alongside the verdict.
    ///
    /// The probe bypasses the cache so a warm cache cannot mask a dead
    /// provider. Transient provider failures report `Degraded`, anything
    /// else `Unavailable`.
    pub async fn health(&self) -> HealthReport {
        let probe = with_timeout(
            HEALTH_PROBE_TIMEOUT,
            "health_probe",
            self.provider.embed("health probe"),
        )
        .await;

        let (status, detail) = match probe {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) if e.is_transient() => (HealthStatus::Degraded, Some(e.to_string())),
            Err(e) => (HealthStatus::Unavailable, Some(e.to_string())),
        };

        let mut index_counts = HashMap::new();
        for content_type in self.registry.active_types() {
            if let Ok(stats) = self.registry.index_for(content_type).stats().await {
                index_counts.insert(content_type, stats.record_count);
            }
        }

        HealthReport {
            status,
            cache_entries: self.cache.len(),
            cache_hit_rate: self.cache.hit_rate(),
            index_counts,
            detail,
        }
    }

    /// Effective deployment settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
