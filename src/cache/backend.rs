//! Remote storage backend abstraction for the cache store.
//!
//! Backends store [`CachePayload`]s addressed by content id and keep a
//! searchable metadata record per pin (fingerprint + creation time), which
//! is what lets a fresh process rediscover entries written by another.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::fingerprint::Fingerprint;
use crate::types::Dataset;

/// URI scheme for content stored on the backend.
pub const STORAGE_SCHEME: &str = "ipfs";

/// Address returned by the backend for an uploaded payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(cid: impl Into<String>) -> Self {
        Self(cid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `ipfs://<cid>`
    pub fn storage_uri(&self) -> String {
        format!("{STORAGE_SCHEME}://{}", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The document uploaded for one cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePayload {
    /// Creation time, unix seconds.
    pub timestamp: i64,
    pub cache_key: Fingerprint,
    pub data: Dataset,
}

/// Metadata describing one pinned cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRecord {
    pub key: Fingerprint,
    pub cid: ContentId,
    pub created_at: DateTime<Utc>,
}

/// Remote storage used by [`CacheStore`](super::CacheStore).
///
/// Implementations report failures as errors; the cache store is the layer
/// that folds them into misses.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Backend name for logging/debugging.
    fn name(&self) -> &str;

    /// Upload a payload, returning its content id.
    async fn pin(&self, payload: &CachePayload) -> Result<ContentId>;

    /// Download a payload by content id.
    async fn fetch(&self, cid: &ContentId) -> Result<CachePayload>;

    /// All cache entries owned by this system.
    async fn list(&self) -> Result<Vec<PinRecord>>;

    /// Remove a pinned payload.
    async fn unpin(&self, cid: &ContentId) -> Result<()>;

    /// Connectivity and credential check.
    async fn check(&self) -> Result<()>;

    /// Newest entry for `key`, if any.
    ///
    /// Default implementation scans [`list`](Self::list).
    async fn lookup(&self, key: &Fingerprint) -> Result<Option<PinRecord>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|record| record.key == *key)
            .max_by_key(|record| record.created_at))
    }
}
