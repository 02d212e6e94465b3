//! Semantic analyzer capability interface.
//!
//! The analyzer contributes the secondary compatibility signal blended
//! into the combined match score. It is independent of the vector space:
//! any implementation returning a score in [0, 1] plugs in here. The
//! bundled keyword-overlap analyzer keeps the crate runnable without an
//! external NLU service.

use crate::error::EngineResult;
use async_trait::async_trait;
use std::collections::HashSet;

/// Scores the compatibility of two texts, independent of embeddings.
#[async_trait]
pub trait SemanticAnalyzer: Send + Sync {
    /// Returns a score in [0.0, 1.0].
    ///
    /// # Errors
    /// `AnalyzerUnavailable` is transient; the matching engine falls back
    /// to vector-only scoring instead of failing the request.
    async fn analyze(&self, text_a: &str, text_b: &str) -> EngineResult<f32>;
}

/// Token-overlap analyzer: Jaccard similarity over normalized word sets.
///
/// Cheap, deterministic, and good enough to re-rank candidates whose
/// vector scores are close. Tokens shorter than two characters are
/// dropped to keep punctuation noise out.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordOverlapAnalyzer;

impl KeywordOverlapAnalyzer {
    fn tokens(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| token.len() > 1)
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl SemanticAnalyzer for KeywordOverlapAnalyzer {
    async fn analyze(&self, text_a: &str, text_b: &str) -> EngineResult<f32> {
        let a = Self::tokens(text_a);
        let b = Self::tokens(text_b);

        if a.is_empty() || b.is_empty() {
            return Ok(0.0);
        }

        let intersection = a.intersection(&b).count() as f32;
        let union = a.union(&b).count() as f32;
        Ok((intersection / union).clamp(0.0, 1.0))
    }
}
