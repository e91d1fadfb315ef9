// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 MARES contributors

//! Retry logic for backend API calls with exponential backoff
//!
//! Wraps a fallible async operation and retries it until it succeeds, the
//! attempt count is exhausted, or a wall-clock budget elapses.

use crate::config::ResilienceConfig;
use crate::error::{ApiError, MaresError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Retry configuration with smart defaults
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_retries: u32,
    /// Wall-clock budget for all attempts combined
    pub max_duration: Duration,
    /// Base delay in milliseconds (exponentially increased)
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        // Use ResilienceConfig defaults for consistency
        let resilience = ResilienceConfig::default();
        Self::from(&resilience)
    }
}

impl From<&ResilienceConfig> for RetryConfig {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            max_duration: Duration::from_secs(config.max_duration_secs),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

impl RetryConfig {
    /// Delay to sleep after a failed attempt (0-indexed): base * 2^attempt, capped
    fn delay_after(&self, attempt: u32) -> Duration {
        let exponential_ms = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(exponential_ms.min(self.max_delay_ms))
    }
}

/// Retry a function with exponential backoff
///
/// The first attempt is immediate. The elapsed-time budget is checked before
/// each attempt; once exceeded, the call fails with `ApiError::RetryTimeout`
/// without invoking the operation again. When attempts run out, the most
/// recent underlying error is surfaced.
///
/// The wrapped operation must be safe to invoke multiple times.
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut last_error = None;

    for attempt in 0..config.max_retries {
        if started.elapsed() > config.max_duration {
            tracing::warn!(
                "{} exceeded retry budget after {} attempts",
                operation_name,
                attempt
            );
            return Err(MaresError::Api(ApiError::RetryTimeout(
                config.max_duration.as_millis() as u64,
            )));
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::debug!(
                        "{} succeeded after {} attempts",
                        operation_name,
                        attempt + 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                let delay = config.delay_after(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:.1}s...",
                    operation_name,
                    attempt + 1,
                    config.max_retries,
                    error,
                    delay.as_secs_f64()
                );
                last_error = Some(error);
                sleep(delay).await;
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        MaresError::Api(ApiError::RetryTimeout(config.max_duration.as_millis() as u64))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            max_duration: Duration::from_secs(5),
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.max_duration, Duration::from_secs(120));
        assert_eq!(config.base_delay_ms, 1000);
        assert_eq!(config.max_delay_ms, 5000);
    }

    #[test]
    fn test_delay_after_ladder() {
        let config = RetryConfig::default();

        // 1000 * 2^n, capped at 5000
        assert_eq!(config.delay_after(0).as_millis(), 1000);
        assert_eq!(config.delay_after(1).as_millis(), 2000);
        assert_eq!(config.delay_after(2).as_millis(), 4000);
        assert_eq!(config.delay_after(3).as_millis(), 5000);
        assert_eq!(config.delay_after(9).as_millis(), 5000);
    }

    #[test]
    fn test_delay_after_large_attempt_is_capped() {
        let config = RetryConfig::default();
        // 2^attempt overflows u64 well before 100; saturating math must hold the cap
        assert_eq!(config.delay_after(100).as_millis(), 5000);
    }

    #[tokio::test]
    async fn test_with_retry_success_first_try() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(
            || async {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                Ok::<_, MaresError>(42)
            },
            &fast_config(10),
            "test_operation",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_success_after_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(
            || async {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(MaresError::Api(ApiError::Network("timeout".to_string())))
                } else {
                    Ok(42)
                }
            },
            &fast_config(10),
            "test_operation",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3); // Failed 2 times, succeeded on 3rd
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_attempts_and_surfaces_last_error() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(
            || async {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(MaresError::Api(ApiError::Network(format!(
                    "failure {count}"
                ))))
            },
            &fast_config(3),
            "test_operation",
        )
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        // The last underlying error is surfaced, not a timeout
        match result {
            Err(MaresError::Api(ApiError::Network(msg))) => assert_eq!(msg, "failure 2"),
            other => panic!("Expected Network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_with_retry_times_out_within_budget() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let config = RetryConfig {
            max_retries: 100,
            max_duration: Duration::from_millis(40),
            base_delay_ms: 30,
            max_delay_ms: 30,
        };

        let started = std::time::Instant::now();
        let result = with_retry(
            || async {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(MaresError::Api(ApiError::Network("down".to_string())))
            },
            &config,
            "test_operation",
        )
        .await;

        match result {
            Err(MaresError::Api(ApiError::RetryTimeout(ms))) => assert_eq!(ms, 40),
            other => panic!("Expected RetryTimeout, got {other:?}"),
        }
        // Budget plus at most one in-flight attempt's delay
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(counter.load(Ordering::SeqCst) < 100);
    }

    #[tokio::test]
    async fn test_with_retry_zero_attempts() {
        let result = with_retry(
            || async { Ok::<_, MaresError>(1) },
            &fast_config(0),
            "test_operation",
        )
        .await;

        // No attempts permitted: the budget error is all that is left
        assert!(matches!(
            result,
            Err(MaresError::Api(ApiError::RetryTimeout(_)))
        ));
    }
}
