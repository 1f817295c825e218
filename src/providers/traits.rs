//! Upstream data provider trait.
//!
//! A provider is a read-only view of the domain dataset addressed by
//! endpoint paths relative to the provider root (e.g. `pokemon/25`,
//! `type/fire`, `evolution-chain/1`). Providers return the raw JSON
//! document; shaping it into records is the generator's job.
//!
//! # Error Semantics
//!
//! Providers report failures through [`SolverError`](crate::SolverError):
//! - transport failures, timeouts, 429 and 5xx are transient and retried
//!   by [`RetryingProvider`](super::RetryingProvider)
//! - `NotFound` and other 4xx are permanent and returned immediately

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// Read-only upstream source of domain data.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Fetch the JSON document at `endpoint`.
    async fn fetch(&self, endpoint: &str) -> Result<Value>;
}

