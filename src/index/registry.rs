//! Lazy per-content-type index registry.

use crate::index::{InMemoryVectorIndex, VectorIndex};
use crate::types::ContentType;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Factory producing an index for a content type on first use.
pub type IndexFactory = Box<dyn Fn(ContentType) -> Arc<dyn VectorIndex> + Send + Sync>;

/// Hands out one index handle per content type, creating indexes lazily.
///
/// The backing implementation is pluggable through the factory; the
/// default builds in-memory indexes with a shared soft capacity.
pub struct IndexRegistry {
    factory: IndexFactory,
    indexes: RwLock<HashMap<ContentType, Arc<dyn VectorIndex>>>,
}

impl IndexRegistry {
    /// Registry backed by in-memory indexes.
    pub fn in_memory(soft_capacity: usize) -> Self {
        Self::with_factory(Box::new(move |content_type| {
            Arc::new(InMemoryVectorIndex::new(content_type, soft_capacity))
        }))
    }

    /// Registry with a custom index backend.
    pub fn with_factory(factory: IndexFactory) -> Self {
        Self {
            factory,
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// Get the index for a content type, creating it on first use.
    pub fn index_for(&self, content_type: ContentType) -> Arc<dyn VectorIndex> {
        if let Some(index) = self.indexes.read().get(&content_type) {
            return Arc::clone(index);
        }

        let mut indexes = self.indexes.write();
        // Double-checked: another writer may have won the race
        Arc::clone(indexes.entry(content_type).or_insert_with(|| {
            info!(index = %content_type, "creating index on first use");
            (self.factory)(content_type)
        }))
    }

    /// Content types with an instantiated index.
    pub fn active_types(&self) -> Vec<ContentType> {
        self.indexes.read().keys().copied().collect()
    }
}
