//! Similarity search service.
//!
//! Pipeline: query text -> embedding (cache + provider, with retry and
//! timeout) -> index query -> deterministic ordering -> previews from the
//! content store.

use crate::embedding::EmbeddingCache;
use crate::error::{EngineError, EngineResult};
use crate::index::{IndexRegistry, MetadataFilter};
use crate::retry::{RetryPolicy, retry_transient, with_timeout};
use crate::store::ContentStore;
use crate::types::{ContentType, SearchResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

/// Hard ceiling on `top_k`, regardless of what the caller asks for.
pub const MAX_TOP_K: usize = 100;

/// Default `top_k` when the caller passes none.
pub const DEFAULT_TOP_K: usize = 10;

/// Maximum characters in a content preview before truncation.
pub const PREVIEW_MAX_CHARS: usize = 200;

/// Concurrent content-store fetches while attaching previews.
const PREVIEW_CONCURRENCY: usize = 8;

/// Text-in, ranked-results-out search over one content type's index.
pub struct SimilaritySearch {
    cache: Arc<EmbeddingCache>,
    registry: Arc<IndexRegistry>,
    store: Arc<dyn ContentStore>,
    model_id: String,
    retry: RetryPolicy,
    embed_timeout: Duration,
}

impl SimilaritySearch {
    pub fn new(
        cache: Arc<EmbeddingCache>,
        registry: Arc<IndexRegistry>,
        store: Arc<dyn ContentStore>,
        model_id: String,
        retry: RetryPolicy,
        embed_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            registry,
            store,
            model_id,
            retry,
            embed_timeout,
        }
    }

    /// Search the content type's index for text similar to `query_text`.
    ///
    /// `top_k` is clamped to [1, 100]; `min_similarity` is a floor on the
    /// cosine score. Empty query text fails with `InvalidInput` before
    /// any provider call.
    pub async fn search(
        &self,
        query_text: &str,
        content_type: ContentType,
        top_k: usize,
        min_similarity: f32,
        filter: Option<&MetadataFilter>,
    ) -> EngineResult<Vec<SearchResult>> {
        let mut results = self
            .search_without_previews(query_text, content_type, top_k, min_similarity, filter)
            .await?;
        self.attach_previews(content_type, &mut results).await;
        Ok(results)
    }

    /// Search without the preview fetch. The matching engine uses this
    /// path since it re-fetches candidate texts for analysis anyway.
    pub(crate) async fn search_without_previews(
        &self,
        query_text: &str,
        content_type: ContentType,
        top_k: usize,
        min_similarity: f32,
        filter: Option<&MetadataFilter>,
    ) -> EngineResult<Vec<SearchResult>> {
        if query_text.trim().is_empty() {
            return Err(EngineError::invalid_input("query text cannot be empty"));
        }
        let top_k = top_k.clamp(1, MAX_TOP_K);

        let vector = self.query_vector(query_text).await?;
        let index = self.registry.index_for(content_type);
        let results = index.query(&vector, top_k, min_similarity, filter).await?;

        debug!(
            index = %content_type,
            hits = results.len(),
            top_k,
            min_similarity,
            "similarity search completed"
        );
        Ok(results)
    }

    /// Embed `text` through the cache, retrying transient provider
    /// failures with backoff and bounding each attempt by the timeout.
    pub(crate) async fn query_vector(&self, text: &str) -> EngineResult<Arc<Vec<f32>>> {
        retry_transient(&self.retry, "embed_query", || {
            with_timeout(
                self.embed_timeout,
                "embed_query",
                self.cache.get_or_compute(text, &self.model_id),
            )
        })
        .await
    }

    /// Best-effort preview fetch with bounded concurrency; missing
    /// backing text leaves the preview empty, never fails the search.
    async fn attach_previews(&self, content_type: ContentType, results: &mut [SearchResult]) {
        let semaphore = Arc::new(Semaphore::new(PREVIEW_CONCURRENCY));
        let mut join_set: JoinSet<(usize, Option<String>)> = JoinSet::new();

        for (i, result) in results.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let store = Arc::clone(&self.store);
            let content_id = result.content_id.clone();

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let preview = store
                    .get_text(content_type, &content_id)
                    .await
                    .ok()
                    .map(|text| make_preview(&text, PREVIEW_MAX_CHARS));
                (i, preview)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            if let Ok((i, preview)) = joined {
                results[i].content_preview = preview;
            }
        }
    }
}

/// Truncate `text` to `max_chars` characters, appending an ellipsis when
/// anything was cut.
pub fn make_preview(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        preview.push_str("...");
    }
    preview
}
