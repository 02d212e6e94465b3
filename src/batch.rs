//! Batch ingestion pipeline with partial-failure semantics.
//!
//! One bad record never sinks a batch: every item is attempted, failures
//! are collected alongside successes, and the outcome reports both in the
//! caller's input order.

use crate::embedding::EmbeddingCache;
use crate::error::{EngineError, EngineResult};
use crate::index::IndexRegistry;
use crate::retry::{RetryPolicy, retry_transient, with_timeout};
use crate::store::ContentStore;
use crate::types::{ContentRecord, ContentType, MetadataMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// One record submitted for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRecord {
    pub content_id: String,
    pub content_type: ContentType,
    pub text: String,
    #[serde(default)]
    pub metadata: MetadataMap,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Why a single record failed, without failing the batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub content_id: String,

    /// Stable error code, e.g. `INVALID_INPUT` or `PROVIDER_UNAVAILABLE`
    pub error_kind: String,
    pub message: String,
}

/// Aggregate result of a batch operation, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<BatchFailure>,
}

impl BatchOutcome {
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Embeds, stores, and indexes records with bounded concurrency.
pub struct BatchPipeline {
    cache: Arc<EmbeddingCache>,
    registry: Arc<IndexRegistry>,
    store: Arc<dyn ContentStore>,
    model_id: String,
    retry: RetryPolicy,
    embed_timeout: Duration,
    concurrency: usize,
}

impl BatchPipeline {
    pub fn new(
        cache: Arc<EmbeddingCache>,
        registry: Arc<IndexRegistry>,
        store: Arc<dyn ContentStore>,
        model_id: String,
        retry: RetryPolicy,
        embed_timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            cache,
            registry,
            store,
            model_id,
            retry,
            embed_timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Ingest a batch: embed, store text, upsert into the index per item.
    ///
    /// Item failures are collected, not propagated; only an empty batch is
    /// an error. Outcome vectors preserve the input order of `records`.
    pub async fn ingest(&self, records: Vec<BatchRecord>) -> EngineResult<BatchOutcome> {
        if records.is_empty() {
            return Err(EngineError::invalid_input("batch cannot be empty"));
        }
        let total = records.len();

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set: JoinSet<(usize, Result<String, BatchFailure>)> = JoinSet::new();

        for (i, record) in records.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let cache = Arc::clone(&self.cache);
            let registry = Arc::clone(&self.registry);
            let store = Arc::clone(&self.store);
            let model_id = self.model_id.clone();
            let retry = self.retry;
            let embed_timeout = self.embed_timeout;

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let content_id = record.content_id.clone();
                let outcome = ingest_one(
                    record,
                    &cache,
                    &registry,
                    &store,
                    &model_id,
                    &retry,
                    embed_timeout,
                )
                .await;

                match outcome {
                    Ok(()) => (i, Ok(content_id)),
                    Err(e) => {
                        warn!(content_id = %content_id, error = %e, "batch item failed");
                        (
                            i,
                            Err(BatchFailure {
                                content_id,
                                error_kind: e.status_code(),
                                message: e.to_string(),
                            }),
                        )
                    }
                }
            });
        }

        let outcome = collect_in_order(join_set, total).await;
        info!(
            total,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "batch ingest completed"
        );
        Ok(outcome)
    }

    /// Ingest a single record, propagating its failure directly instead
    /// of wrapping it in a batch outcome.
    pub async fn ingest_single(&self, record: BatchRecord) -> EngineResult<()> {
        ingest_one(
            record,
            &self.cache,
            &self.registry,
            &self.store,
            &self.model_id,
            &self.retry,
            self.embed_timeout,
        )
        .await
    }

    /// Delete a batch of ids from the index and content store.
    ///
    /// Deleting an absent id succeeds; it is already in the desired state.
    pub async fn delete(
        &self,
        content_type: ContentType,
        content_ids: Vec<String>,
    ) -> EngineResult<BatchOutcome> {
        if content_ids.is_empty() {
            return Err(EngineError::invalid_input("batch cannot be empty"));
        }
        let total = content_ids.len();
        let index = self.registry.index_for(content_type);

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set: JoinSet<(usize, Result<String, BatchFailure>)> = JoinSet::new();

        for (i, content_id) in content_ids.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let index = Arc::clone(&index);
            let store = Arc::clone(&self.store);

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();

                let outcome = async {
                    index.delete(&content_id).await?;
                    store.remove(content_type, &content_id).await
                }
                .await;

                match outcome {
                    Ok(()) => (i, Ok(content_id)),
                    Err(e) => (
                        i,
                        Err(BatchFailure {
                            content_id,
                            error_kind: e.status_code(),
                            message: e.to_string(),
                        }),
                    ),
                }
            });
        }

        let outcome = collect_in_order(join_set, total).await;
        info!(
            total,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "batch delete completed"
        );
        Ok(outcome)
    }
}

async fn ingest_one(
    record: BatchRecord,
    cache: &EmbeddingCache,
    registry: &IndexRegistry,
    store: &Arc<dyn ContentStore>,
    model_id: &str,
    retry: &RetryPolicy,
    embed_timeout: Duration,
) -> EngineResult<()> {
    if record.content_id.trim().is_empty() {
        return Err(EngineError::invalid_input("content_id cannot be empty"));
    }

    let vector = retry_transient(retry, "embed_batch_item", || {
        with_timeout(
            embed_timeout,
            "embed_batch_item",
            cache.get_or_compute(&record.text, model_id),
        )
    })
    .await?;

    store
        .put_text(record.content_type, &record.content_id, &record.text)
        .await?;

    let index = registry.index_for(record.content_type);
    index
        .upsert(ContentRecord {
            content_id: record.content_id,
            content_type: record.content_type,
            vector: vector.as_ref().clone(),
            metadata: record.metadata,
            owner_id: record.owner_id,
        })
        .await
}

/// Drain the join set and rebuild input order from the tagged indices.
async fn collect_in_order(
    mut join_set: JoinSet<(usize, Result<String, BatchFailure>)>,
    total: usize,
) -> BatchOutcome {
    let mut slots: Vec<Option<Result<String, BatchFailure>>> = (0..total).map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((i, result)) => slots[i] = Some(result),
            Err(e) => warn!(error = %e, "batch task failed"),
        }
    }

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for slot in slots.into_iter().flatten() {
        match slot {
            Ok(id) => succeeded.push(id),
            Err(failure) => failed.push(failure),
        }
    }
    BatchOutcome { succeeded, failed }
}
