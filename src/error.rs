//! Error types for the matching engine core
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use thiserror::Error;

/// Main error type for matching engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input rejected before any external call was made
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Matching configuration rejected before any external call was made
    #[error("Invalid matching configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all content in one index is embedded with the same model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    /// Transient embedding provider failure
    #[error(
        "Embedding provider unavailable: {0}\nSuggestion: Check provider connectivity; transient failures are retried with backoff"
    )]
    ProviderUnavailable(String),

    /// The embedding provider rejected the call due to rate limiting
    #[error(
        "Embedding provider rate limited: {0}\nSuggestion: Lower batch concurrency or wait before retrying"
    )]
    RateLimited(String),

    /// Transient semantic analyzer failure
    #[error(
        "Semantic analyzer unavailable: {0}\nSuggestion: Matching falls back to vector-only scoring while the analyzer is down"
    )]
    AnalyzerUnavailable(String),

    #[error("Content '{content_id}' not found. Was it upserted into the index?")]
    NotFound { content_id: String },

    #[error("Operation '{operation}' timed out after {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    /// General errors for cases where no structured variant applies
    #[error("{0}")]
    Internal(String),
}

impl EngineError {
    /// Convenience constructor for input validation failures.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration validation failures.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in batch failure
    /// reports and JSON responses for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
            Self::RateLimited(_) => "RATE_LIMITED",
            Self::AnalyzerUnavailable(_) => "ANALYZER_UNAVAILABLE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
        .to_string()
    }

    /// Whether this error is transient and worth retrying with backoff.
    ///
    /// Validation and dimension errors are permanent and must never be
    /// retried; provider, analyzer, and timeout errors may succeed on a
    /// later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_)
                | Self::RateLimited(_)
                | Self::AnalyzerUnavailable(_)
                | Self::Timeout { .. }
        )
    }
}

/// Result type alias for matching engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> EngineResult<T>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> EngineResult<T> {
        self.map_err(|e| EngineError::Internal(format!("{msg}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        let err = EngineError::invalid_input("empty text");
        assert_eq!(err.status_code(), "INVALID_INPUT");

        let err = EngineError::DimensionMismatch {
            expected: 384,
            actual: 128,
        };
        assert_eq!(err.status_code(), "DIMENSION_MISMATCH");

        let err = EngineError::RateLimited("429".to_string());
        assert_eq!(err.status_code(), "RATE_LIMITED");
    }

    #[test]
    fn test_transient_classification() {
        assert!(EngineError::ProviderUnavailable("down".into()).is_transient());
        assert!(EngineError::RateLimited("slow down".into()).is_transient());
        assert!(EngineError::AnalyzerUnavailable("down".into()).is_transient());
        assert!(
            EngineError::Timeout {
                operation: "embed".into(),
                elapsed_ms: 1000,
            }
            .is_transient()
        );

        assert!(!EngineError::invalid_input("empty").is_transient());
        assert!(
            !EngineError::DimensionMismatch {
                expected: 384,
                actual: 3,
            }
            .is_transient()
        );
        assert!(
            !EngineError::NotFound {
                content_id: "job_1".into(),
            }
            .is_transient()
        );
    }

    #[test]
    fn test_error_context() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("connection reset"));
        let err = result.context("probing provider").unwrap_err();
        assert!(err.to_string().contains("probing provider"));
        assert!(err.to_string().contains("connection reset"));
    }
}
