//! Content store capability interface.
//!
//! The core does not own full text: previews and analyzer inputs are
//! fetched by content id from this collaborator. The bundled in-memory
//! store backs tests and single-process deployments.

use crate::error::{EngineError, EngineResult};
use crate::types::ContentType;
use async_trait::async_trait;
use dashmap::DashMap;

/// Text storage keyed by (content type, content id).
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetch the full text for a content id.
    ///
    /// # Errors
    /// `NotFound` if no text was stored for the id.
    async fn get_text(&self, content_type: ContentType, content_id: &str) -> EngineResult<String>;

    /// Store or replace the text for a content id.
    async fn put_text(
        &self,
        content_type: ContentType,
        content_id: &str,
        text: &str,
    ) -> EngineResult<()>;

    /// Remove the text for a content id; removing a missing id is a no-op.
    async fn remove(&self, content_type: ContentType, content_id: &str) -> EngineResult<()>;
}

/// Concurrent in-memory content store.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    texts: DashMap<(ContentType, String), String>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn get_text(&self, content_type: ContentType, content_id: &str) -> EngineResult<String> {
        self.texts
            .get(&(content_type, content_id.to_string()))
            .map(|text| text.clone())
            .ok_or_else(|| EngineError::NotFound {
                content_id: content_id.to_string(),
            })
    }

    async fn put_text(
        &self,
        content_type: ContentType,
        content_id: &str,
        text: &str,
    ) -> EngineResult<()> {
        self.texts
            .insert((content_type, content_id.to_string()), text.to_string());
        Ok(())
    }

    async fn remove(&self, content_type: ContentType, content_id: &str) -> EngineResult<()> {
        self.texts.remove(&(content_type, content_id.to_string()));
        Ok(())
    }
}
