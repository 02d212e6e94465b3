//! In-memory vector index with read-after-write consistency.

use crate::error::{EngineError, EngineResult};
use crate::index::{MetadataFilter, VectorIndex, dot, l2_normalize};
use crate::types::{ContentRecord, ContentType, IndexStats, MetadataMap, SearchResult, sort_search_results};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// A record as stored: vector pre-normalized, text left to the content store.
#[derive(Debug, Clone)]
struct StoredRecord {
    normalized: Vec<f32>,
    metadata: MetadataMap,
    #[allow(dead_code)]
    owner_id: Option<String>,
}

#[derive(Debug, Default)]
struct IndexInner {
    /// Fixed by the first inserted vector
    dimension: Option<usize>,
    records: HashMap<String, StoredRecord>,
}

/// Thread-safe in-memory index for one content type.
///
/// Upserts replace vector and metadata atomically under a single write
/// lock, so readers always observe a consistent record. No lock is ever
/// held across an await point.
pub struct InMemoryVectorIndex {
    content_type: ContentType,
    soft_capacity: usize,
    inner: RwLock<IndexInner>,
}

impl InMemoryVectorIndex {
    pub fn new(content_type: ContentType, soft_capacity: usize) -> Self {
        Self {
            content_type,
            soft_capacity: soft_capacity.max(1),
            inner: RwLock::new(IndexInner::default()),
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, record: ContentRecord) -> EngineResult<()> {
        if record.content_id.trim().is_empty() {
            return Err(EngineError::invalid_input("content_id cannot be empty"));
        }
        if record.vector.is_empty() {
            return Err(EngineError::invalid_input("vector cannot be empty"));
        }

        let mut inner = self.inner.write();
        match inner.dimension {
            None => inner.dimension = Some(record.vector.len()),
            Some(expected) if expected != record.vector.len() => {
                return Err(EngineError::DimensionMismatch {
                    expected,
                    actual: record.vector.len(),
                });
            }
            Some(_) => {}
        }

        debug!(
            index = %self.content_type,
            content_id = %record.content_id,
            "upserting record"
        );
        inner.records.insert(
            record.content_id,
            StoredRecord {
                normalized: l2_normalize(&record.vector),
                metadata: record.metadata,
                owner_id: record.owner_id,
            },
        );
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        min_similarity: f32,
        filter: Option<&MetadataFilter>,
    ) -> EngineResult<Vec<SearchResult>> {
        let inner = self.inner.read();

        let Some(expected) = inner.dimension else {
            // Lazily created index with no records yet
            return Ok(Vec::new());
        };
        if vector.len() != expected {
            return Err(EngineError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let query = l2_normalize(vector);
        let mut results: Vec<SearchResult> = inner
            .records
            .iter()
            .filter(|(_, record)| {
                filter.is_none_or(|f| f.matches(&record.metadata))
            })
            .filter_map(|(id, record)| {
                let score = dot(&query, &record.normalized);
                (score >= min_similarity).then(|| SearchResult {
                    content_id: id.clone(),
                    content_type: self.content_type,
                    similarity_score: score,
                    metadata: record.metadata.clone(),
                    content_preview: None,
                })
            })
            .collect();

        sort_search_results(&mut results);
        results.truncate(top_k);
        Ok(results)
    }

    async fn delete(&self, content_id: &str) -> EngineResult<bool> {
        let existed = self.inner.write().records.remove(content_id).is_some();
        if existed {
            debug!(index = %self.content_type, content_id, "deleted record");
        }
        Ok(existed)
    }

    async fn stats(&self) -> EngineResult<IndexStats> {
        let inner = self.inner.read();
        Ok(IndexStats {
            record_count: inner.records.len(),
            dimension: inner.dimension,
            fullness_ratio: inner.records.len() as f32 / self.soft_capacity as f32,
        })
    }

    async fn clear(&self) -> EngineResult<()> {
        let mut inner = self.inner.write();
        inner.records.clear();
        inner.dimension = None;
        Ok(())
    }
}
