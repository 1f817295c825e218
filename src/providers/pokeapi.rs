//! PokéAPI client.
//!
//! Read-only REST access to <https://pokeapi.co/api/v2>. Successful
//! responses are memoized in memory; the upstream data changes rarely and
//! generation fans out into many small requests that overlap across RFDs
//! (type member lists, popular species).

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::traits::DataProvider;
use crate::{Result, SolverError};

/// Default base URL for PokéAPI
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// Configuration for the response memo.
///
/// ```rust
/// # use rfd_solver::providers::MemoConfig;
/// # use std::time::Duration;
/// let config = MemoConfig::new()
///     .max_entries(1_000)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct MemoConfig {
    /// Maximum number of memoized responses. Default: 10,000.
    pub max_entries: u64,
    /// Time-to-live for memoized responses. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl MemoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Client for PokéAPI.
#[derive(Clone)]
pub struct PokeApiClient {
    http: Client,
    base_url: String,
    memo: Cache<String, Value>,
}

impl PokeApiClient {
    /// Create a client against the public API.
    pub fn new(timeout: Duration, memo: &MemoConfig) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout, memo)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(
        base_url: impl Into<String>,
        timeout: Duration,
        memo: &MemoConfig,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SolverError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            memo: Cache::builder()
                .max_capacity(memo.max_entries)
                .time_to_live(memo.ttl)
                .build(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, endpoint: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        let response = self.http.get(&url).send().await?;
        self.handle_response_errors(&response, endpoint)?;
        Ok(response.json().await?)
    }

    /// Map HTTP status codes to errors.
    fn handle_response_errors(&self, response: &reqwest::Response, endpoint: &str) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 | 403 => Err(SolverError::AuthenticationFailed),
            404 => Err(SolverError::NotFound(endpoint.to_string())),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(SolverError::RateLimited { retry_after })
            }
            code => Err(SolverError::Api {
                status: code,
                message: format!("PokéAPI error: {status}"),
            }),
        }
    }
}

#[async_trait]
impl DataProvider for PokeApiClient {
    fn name(&self) -> &str {
        "pokeapi"
    }

    async fn fetch(&self, endpoint: &str) -> Result<Value> {
        if let Some(value) = self.memo.get(endpoint).await {
            debug!(endpoint, "upstream memo hit");
            return Ok(value);
        }
        let value = self.get(endpoint).await?;
        self.memo.insert(endpoint.to_string(), value.clone()).await;
        Ok(value)
    }
}
