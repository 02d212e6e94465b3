//! Shared test support: a deterministic embedding provider so the
//! integration tests run without model downloads.

use async_trait::async_trait;
use resumatch::{EngineError, EngineResult, EmbeddingProvider, VectorDimension};
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

static TRACING: Once = Once::new();

/// Route tracing output through the test harness so it shows up with
/// `--nocapture` on failing tests.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    });
}

pub const DIMENSION: usize = 16;

/// Keyword-feature embeddings: deterministic, unit length, and close for
/// texts sharing recruiting vocabulary.
pub struct KeywordProvider {
    dimension: VectorDimension,
    calls: AtomicUsize,
}

impl KeywordProvider {
    pub fn new() -> Self {
        Self {
            dimension: VectorDimension::new(DIMENSION).unwrap(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embed_text(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector = vec![0.0; DIMENSION];
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
            if lower.contains(feature) && i + 1 < DIMENSION {
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
impl EmbeddingProvider for KeywordProvider {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(EngineError::invalid_input("cannot embed empty text"));
        }
        Ok(Self::embed_text(text))
    }

    fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "keyword-test-model"
    }
}
