//! Bounded retry and timeout helpers for external-call boundaries.
//!
//! Retries live at the calling boundary, never inside the cache or index
//! abstractions. Only errors classified transient by
//! `EngineError::is_transient` are retried; permanent errors surface
//! immediately.

use crate::config::RetryConfig;
use crate::error::{EngineError, EngineResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy: bounded attempts with exponential backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

/// Run `call` until it succeeds, fails permanently, or exhausts attempts.
///
/// The delay doubles after each failed attempt.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = EngineResult<T>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Bound `future` by `duration`, mapping expiry to `EngineError::Timeout`.
pub async fn with_timeout<T, Fut>(
    duration: Duration,
    operation: &str,
    future: Fut,
) -> EngineResult<T>
where
    Fut: Future<Output = EngineResult<T>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            operation: operation.to_string(),
            elapsed_ms: duration.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&fast_policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, EngineError>(42) }
        })
        .await
        .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_error_retried_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(&fast_policy(), "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(EngineError::ProviderUnavailable("flaky".into()))
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let err = retry_transient(&fast_policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(EngineError::invalid_input("empty")) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), "INVALID_INPUT");
        assert_eq!(calls.load(Ordering::SeqCst), 1, "permanent errors fail fast");
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let err = retry_transient(&fast_policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(EngineError::RateLimited("429".into())) }
        })
        .await
        .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_engine_error() {
        let err = with_timeout(Duration::from_millis(5), "slow_op", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, EngineError>(())
        })
        .await
        .unwrap_err();

        match err {
            EngineError::Timeout { operation, .. } => assert_eq!(operation, "slow_op"),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
