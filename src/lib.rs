//! Semantic matching engine for resumes and job descriptions.
//!
//! Text goes in, ranked matches come out: content is embedded through a
//! fingerprint-keyed cache, indexed per content type in a pluggable
//! vector index, and scored by blending cosine similarity with a
//! secondary semantic-analysis signal. [`MatchingService`] is the main
//! entry point; the capability traits ([`EmbeddingProvider`],
//! [`SemanticAnalyzer`], [`ContentStore`]) are the seams for swapping
//! in real infrastructure.

pub mod analyze;
pub mod batch;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod matching;
pub mod retry;
pub mod search;
pub mod service;
pub mod store;
pub mod types;

// Explicit exports for better API clarity
pub use analyze::{KeywordOverlapAnalyzer, SemanticAnalyzer};
pub use batch::{BatchFailure, BatchOutcome, BatchPipeline, BatchRecord};
pub use config::Settings;
pub use embedding::{EmbeddingCache, EmbeddingProvider, FastEmbedProvider};
pub use error::{EngineError, EngineResult, ErrorContext};
pub use index::{
    FilterPredicate, InMemoryVectorIndex, IndexRegistry, MetadataFilter, VectorIndex,
};
pub use matching::{
    MatchConfig, MatchDirection, MatchOutcome, MatchQuality, MatchResult, MatchingEngine,
    QualityBands,
};
pub use retry::RetryPolicy;
pub use search::SimilaritySearch;
pub use service::{HealthReport, HealthStatus, MatchingService};
pub use store::{ContentStore, InMemoryContentStore};
pub use types::{
    ContentRecord, ContentType, IndexStats, MetadataMap, MetadataValue, SearchResult,
    VectorDimension,
};
