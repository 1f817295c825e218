//! Retry configuration, delay calculation, and the retrying provider
//! decorator.
//!
//! [`RetryConfig`] controls the bounded exponential backoff used for every
//! upstream request. [`RetryingProvider`] wraps any [`DataProvider`] and
//! delegates to the shared `with_retry()` helper.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::traits::DataProvider;
use crate::telemetry;
use crate::{Result, SolverError};

/// Configuration for retry behaviour on transient errors.
///
/// ```rust
/// # use rfd_solver::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting provider `retry_after` hints.
    ///
    /// A `retry_after` hint (from a `RateLimited` error) takes precedence
    /// over the calculated backoff but is still capped at `max_delay`.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after
            .map(|hint| hint.min(self.max_delay))
            .unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

/// First path segment of an endpoint, used as a low-cardinality metric label.
pub(crate) fn endpoint_family(endpoint: &str) -> String {
    endpoint
        .trim_start_matches('/')
        .split(['/', '?'])
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by [`SolverError::is_transient()`])
/// up to `config.max_attempts`, using exponential backoff and respecting
/// `retry_after` hints from `RateLimited` errors.
///
/// Permanent errors are returned immediately without retry.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    endpoint: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts.max(1) {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL,
                        "endpoint" => endpoint_family(endpoint),
                    )
                    .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider = provider_name,
                        endpoint,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
    Err(last_err.unwrap_or_else(|| {
        SolverError::Configuration("retry loop made no attempts".into())
    }))
}

/// Decorator that wraps a [`DataProvider`] with retry logic.
///
/// On transient errors, retries with exponential backoff up to
/// `config.max_attempts`. Non-transient errors are returned immediately.
pub struct RetryingProvider {
    inner: Arc<dyn DataProvider>,
    config: RetryConfig,
}

impl RetryingProvider {
    /// Wrap a provider with retry logic.
    pub fn new(inner: Arc<dyn DataProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

#[async_trait]
impl DataProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, endpoint: &str) -> Result<Value> {
        with_retry(&self.config, self.inner.name(), endpoint, || {
            self.inner.fetch(endpoint)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(config.delay_for_attempt(40), Duration::from_millis(350));
    }

    #[test]
    fn retry_after_hint_wins_but_is_capped() {
        let config = RetryConfig::new().max_delay(Duration::from_secs(5));
        assert_eq!(
            config.effective_delay(0, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(
            config.effective_delay(0, Some(Duration::from_secs(60))),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn endpoint_family_is_first_segment() {
        assert_eq!(endpoint_family("pokemon/25"), "pokemon");
        assert_eq!(endpoint_family("/type/fire"), "type");
        assert_eq!(endpoint_family("move?limit=10"), "move");
    }
}
