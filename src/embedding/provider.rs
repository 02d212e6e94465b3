//! Embedding provider trait and the bundled fastembed implementation.
//!
//! The provider is a capability interface: the engine only assumes
//! `embed` and a fixed dimension. The fastembed implementation runs the
//! model on the blocking thread pool so provider calls stay valid
//! suspension points for the async core.

use crate::error::{EngineError, EngineResult};
use crate::types::VectorDimension;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Trait for generating embeddings from text.
///
/// Implementations must be thread-safe; calls are treated as network I/O
/// boundaries and carry caller-supplied timeouts at the call site.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    ///
    /// # Errors
    /// `RateLimited` and `ProviderUnavailable` are transient and retried
    /// at the calling boundary; `InvalidInput` is permanent.
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;

    /// Dimension of embeddings produced by this provider.
    fn dimension(&self) -> VectorDimension;

    /// Identifier of the underlying model, part of the cache fingerprint.
    fn model_id(&self) -> &str;
}

/// FastEmbed implementation using the AllMiniLML6V2 model.
///
/// Produces 384-dimensional embeddings. The model is not `Sync`, so it
/// lives behind a `Mutex` and embedding runs on the blocking pool.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_id: String,
    dimension: VectorDimension,
}

impl FastEmbedProvider {
    /// Create a provider with the AllMiniLML6V2 model, caching model
    /// files under `cache_dir`.
    ///
    /// # Errors
    /// Returns an error if the model fails to initialize or download.
    pub fn new(cache_dir: impl Into<PathBuf>) -> EngineResult<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::AllMiniLML6V2)
                .with_cache_dir(cache_dir.into())
                .with_show_download_progress(false),
        )
        .map_err(|e| {
            EngineError::ProviderUnavailable(format!(
                "failed to initialize embedding model: {e}. Ensure you have internet connection for first-time model download"
            ))
        })?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_id: "AllMiniLML6V2".to_string(),
            dimension: VectorDimension::dimension_384(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EngineError::invalid_input("cannot embed empty text"));
        }

        let model = Arc::clone(&self.model);
        let owned = text.to_string();

        // fastembed is synchronous; keep the async executor free
        let mut embeddings = tokio::task::spawn_blocking(move || {
            let mut guard = model.lock().map_err(|_| {
                EngineError::Internal("embedding model lock poisoned".to_string())
            })?;
            guard
                .embed(vec![owned], None)
                .map_err(|e| EngineError::ProviderUnavailable(format!("embedding failed: {e}")))
        })
        .await
        .map_err(|e| EngineError::Internal(format!("embedding task panicked: {e}")))??;

        let vector = embeddings
            .pop()
            .ok_or_else(|| EngineError::ProviderUnavailable("provider returned no embedding".to_string()))?;

        self.dimension.validate_vector(&vector)?;
        Ok(vector)
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic providers for unit tests.

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock provider producing deterministic keyword-feature embeddings.
    ///
    /// Counts calls so cache tests can attribute provider traffic.
    pub struct MockEmbeddingProvider {
        dimension: VectorDimension,
        calls: AtomicUsize,
        fail_with: Option<fn() -> EngineError>,
    }

    impl MockEmbeddingProvider {
        pub fn new() -> Self {
            Self {
                dimension: VectorDimension::new(16).unwrap(),
                calls: AtomicUsize::new(0),
                fail_with: None,
            }
        }

        /// A provider that fails every call with the given error.
        pub fn failing(factory: fn() -> EngineError) -> Self {
            Self {
                dimension: VectorDimension::new(16).unwrap(),
                calls: AtomicUsize::new(0),
                fail_with: Some(factory),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Keyword-feature embedding, normalized to unit length.
        pub fn embed_text(text: &str, dim: usize) -> Vec<f32> {
            let lower = text.to_lowercase();
            let mut vector = vec![0.0; dim];
            vector[0] = 0.2;

            let features = [
                "python",
                "aws",
                "senior",
                "engineer",
                "developer",
                "junior",
                "graphic",
                "design",
                "years",
                "rust",
                "java",
                "manager",
            ];
            for (i, feature) in features.iter().enumerate() {
                if lower.contains(feature) && i + 1 < dim {
                    vector[i + 1] = 1.0;
                }
            }

            let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut vector {
                    *v /= norm;
                }
            }
            vector
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(factory) = self.fail_with {
                return Err(factory());
            }
            if text.trim().is_empty() {
                return Err(EngineError::invalid_input("cannot embed empty text"));
            }
            Ok(Self::embed_text(text, self.dimension.get()))
        }

        fn dimension(&self) -> VectorDimension {
            self.dimension
        }

        fn model_id(&self) -> &str {
            "mock-model"
        }
    }
}
