//! Cache store for assembled datasets.
//!
//! [`CacheStore`] sits in front of a remote [`CacheBackend`] (Pinata in
//! production) and keeps a local-only index of fingerprint → content id +
//! creation time, plus hit/miss/write-failure counters.
//!
//! # Degradation
//!
//! The backend is an external, occasionally unavailable service. Every
//! store method degrades to "act as if the cache does not exist": lookups
//! fold transport failures, auth failures, not-found, timeouts and stale
//! entries into a miss, and writes swallow failures after logging and
//! counting them. Correctness of a dataset never depends on the cache, only
//! latency does.
//!
//! # Validity
//!
//! An entry is valid iff `now - created_at < ttl`. Validity is evaluated at
//! read time; nothing is actively evicted except by [`CacheStore::sweep_expired`]
//! and the best-effort remote unpins spawned when a stale entry is read or
//! an indexed entry is superseded by a new write. The spawn requires a Tokio
//! runtime, which every async caller has.
//!
//! # Concurrency
//!
//! There is no per-fingerprint lock. Two concurrent misses on the same key
//! both generate and both write; content is idempotent per fingerprint and
//! the last write wins. A pin superseded without passing through the index
//! is left to [`CacheStore::sweep_expired`], which works from the backend
//! listing.

pub mod backend;
pub mod memory;
pub mod pinata;

pub use backend::{CacheBackend, CachePayload, ContentId, PinRecord};
pub use memory::MemoryBackend;
pub use pinata::{PinataAuth, PinataClient};

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::fingerprint::Fingerprint;
use crate::telemetry;
use crate::types::Dataset;
use crate::{Result, SolverError};

/// Configuration for the cache store.
///
/// ```rust
/// # use rfd_solver::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .ttl(Duration::from_secs(600))
///     .timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Time-to-live for entries. Default: 30 minutes.
    pub ttl: Duration,
    /// Maximum number of entries in the local index. Default: 10,000.
    pub max_entries: u64,
    /// Bound on each backend call. Default: 10s.
    pub timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30 * 60),
            max_entries: 10_000,
            timeout: Duration::from_secs(10),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A valid cache hit.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub content_id: ContentId,
    pub created_at: DateTime<Utc>,
    pub dataset: Dataset,
}

impl CacheEntry {
    /// Whether this entry is still valid at `now` under `ttl`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        is_fresh(self.created_at, now, ttl)
    }
}

/// Read-only cache introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub valid_entries: u64,
    pub expired_entries: u64,
    pub ttl_seconds: u64,
    /// Outcome of the most recent backend interaction; `false` until the
    /// first call. Not a guarantee for the next call.
    pub backend_available: bool,
    pub hits: u64,
    pub misses: u64,
    pub write_failures: u64,
}

/// Outcome of [`CacheStore::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub removed: Vec<Fingerprint>,
    /// Keys that could not be removed, with the cause.
    pub failed: Vec<(Fingerprint, String)>,
}

impl ClearReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    cid: ContentId,
    created_at: DateTime<Utc>,
}

/// Cache-first store over a remote pinning backend.
///
/// Constructed once and shared (via `Arc`) by every pipeline run.
pub struct CacheStore {
    backend: Option<Arc<dyn CacheBackend>>,
    index: moka::sync::Cache<Fingerprint, IndexEntry>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    write_failures: AtomicU64,
}

impl CacheStore {
    /// Create a store over `backend`.
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self::build(Some(backend), config)
    }

    /// Create a store with no backend (e.g. missing credentials).
    ///
    /// Every lookup misses and every write is skipped.
    pub fn disabled(config: CacheConfig) -> Self {
        Self::build(None, config)
    }

    fn build(backend: Option<Arc<dyn CacheBackend>>, config: CacheConfig) -> Self {
        let index = moka::sync::Cache::builder()
            .max_capacity(config.max_entries)
            .build();
        Self {
            available: AtomicBool::new(false),
            backend,
            index,
            config,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Look up a valid entry for `key`.
    ///
    /// Returns `None` on any miss: absent, stale, or backend failure.
    pub async fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let Some(backend) = &self.backend else {
            self.record_miss("unavailable");
            return None;
        };

        let entry = match self.index.get(key) {
            Some(entry) => entry,
            None => match self.call(backend.lookup(key)).await {
                Ok(Some(record)) => {
                    let entry = IndexEntry {
                        cid: record.cid,
                        created_at: record.created_at,
                    };
                    self.index.insert(*key, entry.clone());
                    entry
                }
                Ok(None) => {
                    debug!(key = %key, "cache miss");
                    self.record_miss("absent");
                    return None;
                }
                Err(e) => {
                    debug!(key = %key, error = %e, "cache lookup failed, treating as miss");
                    self.record_miss("unavailable");
                    return None;
                }
            },
        };

        if !is_fresh(entry.created_at, self.clock.now(), self.config.ttl) {
            debug!(key = %key, cid = %entry.cid, "cache entry expired");
            self.index.invalidate(key);
            self.unpin_in_background(entry.cid, "stale");
            self.record_miss("stale");
            return None;
        }

        match self.call(backend.fetch(&entry.cid)).await {
            Ok(payload) if payload.cache_key == *key => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                info!(key = %key, cid = %entry.cid, "cache hit");
                Some(CacheEntry {
                    fingerprint: *key,
                    content_id: entry.cid,
                    created_at: entry.created_at,
                    dataset: payload.data,
                })
            }
            Ok(payload) => {
                warn!(
                    key = %key,
                    cid = %entry.cid,
                    found = %payload.cache_key,
                    "cached payload belongs to a different key"
                );
                self.index.invalidate(key);
                self.record_miss("absent");
                None
            }
            Err(e) => {
                debug!(key = %key, cid = %entry.cid, error = %e, "cache fetch failed, treating as miss");
                self.index.invalidate(key);
                self.record_miss("unavailable");
                None
            }
        }
    }

    /// Upload `dataset` under `key`, stamped with the current time.
    ///
    /// Returns the content id on success. Failures are logged and counted,
    /// never propagated. A different content id previously indexed under
    /// `key` is unpinned in the background.
    pub async fn put(&self, key: &Fingerprint, dataset: &Dataset) -> Option<ContentId> {
        let Some(backend) = &self.backend else {
            metrics::counter!(telemetry::CACHE_WRITES_TOTAL, "status" => "skipped").increment(1);
            return None;
        };

        let created_at = self.clock.now();
        let payload = CachePayload {
            timestamp: created_at.timestamp(),
            cache_key: *key,
            data: dataset.clone(),
        };

        match self.call(backend.pin(&payload)).await {
            Ok(cid) => {
                let superseded = self
                    .index
                    .get(key)
                    .map(|previous| previous.cid)
                    .filter(|previous| *previous != cid);
                self.index.insert(
                    *key,
                    IndexEntry {
                        cid: cid.clone(),
                        created_at,
                    },
                );
                metrics::counter!(telemetry::CACHE_WRITES_TOTAL, "status" => "ok").increment(1);
                info!(key = %key, cid = %cid, "cache store");
                if let Some(previous) = superseded {
                    debug!(key = %key, cid = %previous, "unpinning superseded cache entry");
                    self.unpin_in_background(previous, "superseded");
                }
                Some(cid)
            }
            Err(e) => {
                self.write_failures.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_WRITES_TOTAL, "status" => "error").increment(1);
                warn!(key = %key, backend = backend.name(), error = %e, "cache write failed");
                None
            }
        }
    }

    /// Snapshot of the local index and counters.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let mut total = 0u64;
        let mut valid = 0u64;
        for (_, entry) in self.index.iter() {
            total += 1;
            if is_fresh(entry.created_at, now, self.config.ttl) {
                valid += 1;
            }
        }
        CacheStats {
            total_entries: total,
            valid_entries: valid,
            expired_entries: total - valid,
            ttl_seconds: self.config.ttl.as_secs(),
            backend_available: self.available.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }

    /// Check the backend and update `backend_available`.
    pub async fn check_connectivity(&self) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        match self.call(backend.check()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "cache backend unreachable");
                false
            }
        }
    }

    /// Load entries listed by the backend into the local index.
    ///
    /// Keeps the newest entry per key. Returns the number of entries loaded;
    /// a listing failure loads nothing.
    pub async fn refresh_index(&self) -> usize {
        let Some(backend) = &self.backend else {
            return 0;
        };
        let records = match self.call(backend.list()).await {
            Ok(records) => records,
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "failed to list cache entries");
                return 0;
            }
        };

        let mut newest: HashMap<Fingerprint, PinRecord> = HashMap::new();
        for record in records {
            match newest.get(&record.key) {
                Some(existing) if existing.created_at >= record.created_at => {}
                _ => {
                    newest.insert(record.key, record);
                }
            }
        }

        let loaded = newest.len();
        for (key, record) in newest {
            self.index.insert(
                key,
                IndexEntry {
                    cid: record.cid,
                    created_at: record.created_at,
                },
            );
        }
        debug!(loaded, "refreshed cache index");
        loaded
    }

    /// Unpin every expired pin and drop expired entries from the index.
    ///
    /// Targets the union of expired index entries and expired pins in the
    /// backend listing, so older pins for a key that has since been rewritten
    /// are reached too. If the listing fails only indexed entries are swept.
    /// Unpin failures are logged and ignored. Returns the number of pins
    /// targeted.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let mut expired: HashMap<ContentId, Fingerprint> = self
            .index
            .iter()
            .filter(|(_, entry)| !is_fresh(entry.created_at, now, ttl))
            .map(|(key, entry)| (entry.cid, *key))
            .collect();
        for key in expired.values() {
            self.index.invalidate(key);
        }

        let Some(backend) = &self.backend else {
            return expired.len();
        };
        match self.call(backend.list()).await {
            Ok(records) => {
                for record in records {
                    if !is_fresh(record.created_at, now, ttl) {
                        expired.entry(record.cid).or_insert(record.key);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to list cache entries, sweeping indexed entries only");
            }
        }
        if expired.is_empty() {
            return 0;
        }

        metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "sweep")
            .increment(expired.len() as u64);
        join_all(expired.iter().map(|(cid, key)| async move {
            if let Err(e) = self.call(backend.unpin(cid)).await {
                debug!(key = %key, cid = %cid, error = %e, "failed to unpin expired entry");
            }
        }))
        .await;
        info!(count = expired.len(), "swept expired cache entries");
        expired.len()
    }

    /// Remove every entry owned by this system, locally and remotely.
    ///
    /// Targets the union of the local index and the backend listing. A pin
    /// that is already gone counts as removed.
    pub async fn clear(&self) -> ClearReport {
        let Some(backend) = &self.backend else {
            self.index.invalidate_all();
            return ClearReport::default();
        };

        let mut targets: HashMap<ContentId, Fingerprint> = self
            .index
            .iter()
            .map(|(key, entry)| (entry.cid, *key))
            .collect();
        match self.call(backend.list()).await {
            Ok(records) => {
                for record in records {
                    targets.entry(record.cid).or_insert(record.key);
                }
            }
            Err(e) => {
                warn!(error = %e, "failed to list cache entries, clearing indexed entries only");
            }
        }

        let outcomes = join_all(targets.into_iter().map(|(cid, key)| async move {
            let outcome = self.call(backend.unpin(&cid)).await;
            (key, outcome)
        }))
        .await;

        let mut report = ClearReport::default();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(()) | Err(SolverError::NotFound(_)) => report.removed.push(key),
                Err(e) => report.failed.push((key, e.to_string())),
            }
        }
        report.removed.sort();
        report.removed.dedup();
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));

        for key in &report.removed {
            if !report.failed.iter().any(|(failed, _)| failed == key) {
                self.index.invalidate(key);
            }
        }
        metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "clear")
            .increment(report.removed.len() as u64);
        info!(
            removed = report.removed.len(),
            failed = report.failed.len(),
            "cleared cache"
        );
        report
    }

    /// Run a backend call under the configured timeout, tracking availability.
    async fn call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let outcome = match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SolverError::Timeout(self.config.timeout)),
        };
        let reachable = match &outcome {
            Ok(_) => true,
            Err(e) => backend_responded(e),
        };
        self.available.store(reachable, Ordering::Relaxed);
        outcome
    }

    /// Unpin a stale or superseded entry in the background; failure is
    /// ignored.
    fn unpin_in_background(&self, cid: ContentId, reason: &'static str) {
        metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => reason).increment(1);
        let Some(backend) = self.backend.clone() else {
            return;
        };
        let timeout = self.config.timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, backend.unpin(&cid)).await {
                Ok(Ok(())) => debug!(cid = %cid, reason, "unpinned cache entry"),
                Ok(Err(e)) => debug!(cid = %cid, reason, error = %e, "failed to unpin cache entry"),
                Err(_) => debug!(cid = %cid, reason, "timed out unpinning cache entry"),
            }
        });
    }

    fn record_miss(&self, reason: &'static str) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "reason" => reason).increment(1);
    }
}

/// `now - created_at < ttl`. Entries dated in the future count as fresh.
fn is_fresh(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    let age = now.signed_duration_since(created_at);
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => age < ttl,
        Err(_) => true,
    }
}

/// Whether an error shows the backend answered (as opposed to being
/// unreachable or rejecting our credentials).
fn backend_responded(err: &SolverError) -> bool {
    match err {
        SolverError::Http(_)
        | SolverError::Timeout(_)
        | SolverError::AuthenticationFailed
        | SolverError::RateLimited { .. } => false,
        SolverError::Api { status, .. } => *status < 500,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn fresh_before_ttl_stale_at_and_after() {
        let ttl = Duration::from_secs(60);
        assert!(is_fresh(ts(1000), ts(1059), ttl));
        assert!(!is_fresh(ts(1000), ts(1060), ttl));
        assert!(!is_fresh(ts(1000), ts(1061), ttl));
    }

    #[test]
    fn future_entries_are_fresh() {
        assert!(is_fresh(ts(2000), ts(1000), Duration::from_secs(1)));
    }

    #[test]
    fn availability_classification() {
        assert!(!backend_responded(&SolverError::Http("reset".into())));
        assert!(!backend_responded(&SolverError::AuthenticationFailed));
        assert!(!backend_responded(&SolverError::Api {
            status: 502,
            message: "bad gateway".into()
        }));
        assert!(backend_responded(&SolverError::NotFound("cid".into())));
        assert!(backend_responded(&SolverError::Api {
            status: 400,
            message: "bad request".into()
        }));
    }

    #[test]
    fn config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(1800));
        assert_eq!(config.max_entries, 10_000);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
