//! Core types shared across the matching engine.
//!
//! This module provides the content model (content types, metadata values,
//! records) plus type-safe wrappers following the project's strict type
//! safety guidelines.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard vector dimension for the bundled fastembed model (AllMiniLML6V2).
pub const VECTOR_DIMENSION_384: usize = 384;

/// The kind of content stored in a similarity index.
///
/// Each content type is backed by exactly one logical index, so a
/// `content_id` only needs to be unique within its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Resume,
    Job,
    Skill,
    Company,
}

impl ContentType {
    /// All known content types, in index-registry creation order.
    pub const ALL: [ContentType; 4] = [Self::Resume, Self::Job, Self::Skill, Self::Company];

    /// Stable lowercase name, used as the index namespace.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::Job => "job",
            Self::Skill => "skill",
            Self::Company => "company",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metadata value attached to a content record.
///
/// Metadata is a closed set of variants rather than an open `any` map so
/// that filter evaluation stays statically checkable. Values are used for
/// filtering only, never for similarity computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Metadata attached to a content record, keyed by field name.
pub type MetadataMap = HashMap<String, MetadataValue>;

/// The unit stored in a vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Unique within the content type's index
    pub content_id: String,

    pub content_type: ContentType,

    /// Fixed-length embedding; dimension must match the index
    pub vector: Vec<f32>,

    /// Filter fields, never used for similarity
    #[serde(default)]
    pub metadata: MetadataMap,

    /// Optional user association for access scoping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
}

/// Type-safe wrapper for vector dimensions.
///
/// Ensures runtime validation of vector dimensions to prevent
/// dimension mismatches during index and provider operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> EngineResult<Self> {
        if dim == 0 {
            return Err(EngineError::invalid_input(
                "vector dimension cannot be zero",
            ));
        }
        Ok(Self(dim))
    }

    /// Creates a standard 384-dimensional vector dimension.
    #[must_use]
    pub const fn dimension_384() -> Self {
        Self(VECTOR_DIMENSION_384)
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> EngineResult<()> {
        if vector.len() != self.0 {
            return Err(EngineError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// A single hit returned by a similarity query.
///
/// Ordering invariant: sequences of search results are always strictly
/// descending by `similarity_score`, with ties broken by `content_id`
/// ascending for determinism.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub content_id: String,
    pub content_type: ContentType,

    /// Cosine similarity in [-1.0, 1.0]
    pub similarity_score: f32,

    pub metadata: MetadataMap,

    /// Bounded-length excerpt of the backing text, when available
    pub content_preview: Option<String>,
}

/// Sorts search results descending by score, ties broken by id ascending.
///
/// Applied as a final sort after any parallel fan-out joins, so ordering
/// never depends on completion order.
pub fn sort_search_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.content_id.cmp(&b.content_id))
    });
}

/// Point-in-time statistics for one index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub record_count: usize,

    /// None until the first vector fixes the dimension
    pub dimension: Option<usize>,

    /// Record count relative to the configured soft capacity
    pub fullness_ratio: f32,
}
