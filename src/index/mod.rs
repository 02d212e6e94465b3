//! Vector index abstraction and the bundled in-memory implementation.
//!
//! One logical index exists per content type. The trait keeps the backing
//! store pluggable (an external vector database would implement the same
//! contract); the in-memory implementation precomputes L2-normalized
//! vectors at insert time so queries reduce to dot products.

mod filter;
mod memory;
mod registry;

pub use filter::{FilterPredicate, MetadataFilter};
pub use memory::InMemoryVectorIndex;
pub use registry::IndexRegistry;

use crate::error::EngineResult;
use crate::types::{ContentRecord, IndexStats, SearchResult};
use async_trait::async_trait;

/// Contract for a named vector index holding one content type.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or atomically replace the record for its content id.
    ///
    /// The first inserted vector fixes the index dimension; later upserts
    /// with a different dimension fail with `DimensionMismatch`.
    async fn upsert(&self, record: ContentRecord) -> EngineResult<()>;

    /// Query by vector, returning at most `top_k` results with
    /// `similarity_score >= min_similarity`, restricted to records whose
    /// metadata satisfies `filter`. An empty index yields an empty vec.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        min_similarity: f32,
        filter: Option<&MetadataFilter>,
    ) -> EngineResult<Vec<SearchResult>>;

    /// Remove the record if present. Deleting a non-existent id is a
    /// no-op success; the returned bool reports whether a record existed.
    async fn delete(&self, content_id: &str) -> EngineResult<bool>;

    /// Point-in-time statistics.
    async fn stats(&self) -> EngineResult<IndexStats>;

    /// Drop all records and the fixed dimension.
    async fn clear(&self) -> EngineResult<()>;
}

/// Scales a vector to unit length; zero vectors are returned unchanged.
pub(crate) fn l2_normalize(vector: &[f32]) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter().map(|x| x / norm).collect()
    } else {
        vector.to_vec()
    }
}

/// Dot product; equals cosine similarity when both sides are unit length.
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
