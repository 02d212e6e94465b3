//! Matching engine: blends vector similarity with semantic analysis into
//! a ranked, quality-banded match list.
//!
//! The engine over-fetches candidates from the similarity index (so
//! semantic re-scoring cannot starve the final ranking), fans the
//! analyzer out with bounded concurrency, and applies the combined-score
//! cutoff, deterministic sort, and banding as a final pass.

use crate::analyze::SemanticAnalyzer;
use crate::config::MatchingConfig;
use crate::error::{EngineError, EngineResult};
use crate::retry::{RetryPolicy, retry_transient, with_timeout};
use crate::search::{MAX_TOP_K, SimilaritySearch};
use crate::store::ContentStore;
use crate::types::{ContentType, MetadataMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Tolerance for the weight-sum check.
const WEIGHT_SUM_EPSILON: f32 = 1e-6;

/// Over-fetch factor applied to `max_results` when querying the index.
const CANDIDATE_FETCH_FACTOR: usize = 3;

/// Which index is queried and which text plays which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchDirection {
    ResumeToJobs,
    JobsToResume,
}

impl MatchDirection {
    /// Content type of the candidate pool for this direction.
    #[must_use]
    pub fn candidate_type(&self) -> ContentType {
        match self {
            Self::ResumeToJobs => ContentType::Job,
            Self::JobsToResume => ContentType::Resume,
        }
    }
}

/// Quality band derived from the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchQuality {
    Excellent,
    VeryGood,
    Good,
}

impl MatchQuality {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::VeryGood => "Very Good",
            Self::Good => "Good",
        }
    }

    /// Short templated recommendation keyed by band.
    #[must_use]
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Excellent => "Strongly recommend",
            Self::VeryGood => "Recommend",
            Self::Good => "Consider",
        }
    }
}

/// Band thresholds; must be non-increasing from excellent to good.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityBands {
    pub excellent: f32,
    pub very_good: f32,
    pub good: f32,
}

impl Default for QualityBands {
    fn default() -> Self {
        Self {
            excellent: 0.9,
            very_good: 0.8,
            good: 0.7,
        }
    }
}

impl QualityBands {
    /// Monotonic step function from combined score to band.
    ///
    /// Returns `None` below the lowest band; such candidates are dropped
    /// even when `min_combined_score` is configured lower.
    #[must_use]
    pub fn classify(&self, combined_score: f32) -> Option<MatchQuality> {
        if combined_score >= self.excellent {
            Some(MatchQuality::Excellent)
        } else if combined_score >= self.very_good {
            Some(MatchQuality::VeryGood)
        } else if combined_score >= self.good {
            Some(MatchQuality::Good)
        } else {
            None
        }
    }
}

/// Per-request matching configuration. All fields have defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    pub vector_weight: f32,
    pub semantic_weight: f32,
    pub min_combined_score: f32,
    pub max_results: usize,
    pub enable_semantic_analysis: bool,
    pub bands: QualityBands,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            vector_weight: 0.6,
            semantic_weight: 0.4,
            min_combined_score: 0.7,
            max_results: 20,
            enable_semantic_analysis: true,
            bands: QualityBands::default(),
        }
    }
}

impl MatchConfig {
    /// Build a request config from the deployment settings.
    pub fn from_settings(config: &MatchingConfig) -> Self {
        Self {
            vector_weight: config.vector_weight,
            semantic_weight: config.semantic_weight,
            min_combined_score: config.min_combined_score,
            max_results: config.max_results,
            enable_semantic_analysis: config.enable_semantic_analysis,
            bands: QualityBands {
                excellent: config.band_excellent,
                very_good: config.band_very_good,
                good: config.band_good,
            },
        }
    }

    /// Validate weights and bounds; rejected before any external call.
    pub fn validate(&self) -> EngineResult<()> {
        for (name, weight) in [
            ("vector_weight", self.vector_weight),
            ("semantic_weight", self.semantic_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) || weight.is_nan() {
                return Err(EngineError::invalid_config(format!(
                    "{name} must be in [0.0, 1.0], got {weight}"
                )));
            }
        }
        if (self.vector_weight + self.semantic_weight - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(EngineError::invalid_config(format!(
                "vector_weight + semantic_weight must equal 1.0, got {}",
                self.vector_weight + self.semantic_weight
            )));
        }
        if self.max_results == 0 {
            return Err(EngineError::invalid_config("max_results must be at least 1"));
        }
        Ok(())
    }
}

/// One ranked match between the source text and a candidate.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    /// Candidate content id (job id or resume id depending on direction)
    pub content_id: String,
    pub vector_score: f32,
    pub semantic_score: f32,

    /// `vector_weight * vector_score + semantic_weight * semantic_score`
    pub combined_score: f32,
    pub match_quality: MatchQuality,
    pub recommendation: &'static str,
    pub metadata: MetadataMap,
}

/// The ranked match list plus a degraded-mode indicator.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub results: Vec<MatchResult>,

    /// True when the semantic analyzer was unavailable for at least one
    /// candidate and vector-only scoring was used instead
    pub degraded: bool,
}

/// Combines vector similarity and semantic analysis into ranked matches.
pub struct MatchingEngine {
    search: Arc<SimilaritySearch>,
    analyzer: Arc<dyn SemanticAnalyzer>,
    store: Arc<dyn ContentStore>,
    retry: RetryPolicy,
    analyzer_timeout: Duration,
    analyzer_concurrency: usize,
}

impl MatchingEngine {
    pub fn new(
        search: Arc<SimilaritySearch>,
        analyzer: Arc<dyn SemanticAnalyzer>,
        store: Arc<dyn ContentStore>,
        retry: RetryPolicy,
        analyzer_timeout: Duration,
        analyzer_concurrency: usize,
    ) -> Self {
        Self {
            search,
            analyzer,
            store,
            retry,
            analyzer_timeout,
            analyzer_concurrency: analyzer_concurrency.max(1),
        }
    }

    /// Match `source_text` against the candidate index for `direction`.
    ///
    /// When `pool` is given, candidates outside it are dropped after the
    /// similarity query. The same algorithm serves both directions; only
    /// the queried index differs.
    pub async fn run(
        &self,
        source_text: &str,
        direction: MatchDirection,
        pool: Option<&[String]>,
        config: &MatchConfig,
    ) -> EngineResult<MatchOutcome> {
        config.validate()?;
        if source_text.trim().is_empty() {
            return Err(EngineError::invalid_input("source text cannot be empty"));
        }

        let candidate_type = direction.candidate_type();

        // Over-fetch so semantic re-scoring cannot starve the ranking
        let top_k = (config.max_results * CANDIDATE_FETCH_FACTOR).clamp(1, MAX_TOP_K);
        // Previews are skipped here; candidate texts are fetched in full
        // for semantic analysis anyway.
        let mut hits = self
            .search
            .search_without_previews(source_text, candidate_type, top_k, -1.0, None)
            .await?;

        if let Some(pool) = pool {
            hits.retain(|hit| pool.iter().any(|id| id == &hit.content_id));
        }
        if hits.is_empty() {
            return Ok(MatchOutcome {
                results: Vec::new(),
                degraded: false,
            });
        }

        let (semantic_scores, degraded) = if config.enable_semantic_analysis {
            self.score_semantics(source_text, candidate_type, &hits).await
        } else {
            (vec![None; hits.len()], false)
        };

        let mut results: Vec<MatchResult> = hits
            .into_iter()
            .zip(semantic_scores)
            .filter_map(|(hit, semantic)| {
                let vector_score = hit.similarity_score;
                // Disabled or failed analysis degenerates to vector-only
                let semantic_score = semantic.unwrap_or(vector_score);
                let combined_score = config.vector_weight * vector_score
                    + config.semantic_weight * semantic_score;

                if combined_score < config.min_combined_score {
                    return None;
                }
                let match_quality = config.bands.classify(combined_score)?;

                Some(MatchResult {
                    content_id: hit.content_id,
                    vector_score,
                    semantic_score,
                    combined_score,
                    match_quality,
                    recommendation: match_quality.recommendation(),
                    metadata: hit.metadata,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.content_id.cmp(&b.content_id))
        });
        results.truncate(config.max_results);

        debug!(
            direction = ?direction,
            matches = results.len(),
            degraded,
            "matching completed"
        );
        Ok(MatchOutcome { results, degraded })
    }

    /// Fan the analyzer out over candidates with bounded concurrency.
    ///
    /// Returns per-candidate scores aligned with `hits` (None where the
    /// analyzer failed or the candidate text is missing) and whether any
    /// analyzer failure occurred.
    async fn score_semantics(
        &self,
        source_text: &str,
        candidate_type: ContentType,
        hits: &[crate::types::SearchResult],
    ) -> (Vec<Option<f32>>, bool) {
        let semaphore = Arc::new(Semaphore::new(self.analyzer_concurrency));
        let mut join_set: JoinSet<(usize, Option<f32>, bool)> = JoinSet::new();

        for (i, hit) in hits.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let analyzer = Arc::clone(&self.analyzer);
            let store = Arc::clone(&self.store);
            let source = source_text.to_string();
            let content_id = hit.content_id.clone();
            let retry = self.retry;
            let timeout = self.analyzer_timeout;

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();

                let candidate_text = match store.get_text(candidate_type, &content_id).await {
                    Ok(text) => text,
                    Err(_) => {
                        // Missing backing text: vector-only for this item,
                        // but the analyzer itself is fine
                        return (i, None, false);
                    }
                };

                let analysis = retry_transient(&retry, "analyze", || {
                    with_timeout(timeout, "analyze", analyzer.analyze(&source, &candidate_text))
                })
                .await;

                match analysis {
                    Ok(score) => (i, Some(score.clamp(0.0, 1.0)), false),
                    Err(e) => {
                        warn!(
                            content_id = %content_id,
                            error = %e,
                            "semantic analysis failed, falling back to vector score"
                        );
                        (i, None, true)
                    }
                }
            });
        }

        let mut scores = vec![None; hits.len()];
        let mut degraded = false;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((i, score, item_degraded)) => {
                    scores[i] = score;
                    degraded |= item_degraded;
                }
                Err(e) => {
                    warn!(error = %e, "analyzer task failed");
                    degraded = true;
                }
            }
        }
        (scores, degraded)
    }
}
