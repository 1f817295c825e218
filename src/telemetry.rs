//! Telemetry metric name constants.
//!
//! Centralised metric names for rfd-solver operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `rfd_solver_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `data_type`: RFD variant (e.g. "entity", "moves")
//! - `status`: outcome: "ok" or "error"
//! - `source`: where a dataset came from: "cache" or "live"
//! - `endpoint`: upstream resource family (e.g. "pokemon", "type")

/// Total RFDs processed by the pipeline.
///
/// Labels: `data_type`, `status` ("ok" | "error"), `source` ("cache" | "live" | "none").
pub const RFDS_TOTAL: &str = "rfd_solver_rfds_total";

/// End-to-end pipeline duration in seconds.
///
/// Labels: `data_type`.
pub const RFD_DURATION_SECONDS: &str = "rfd_solver_rfd_duration_seconds";

/// Total cache hits.
pub const CACHE_HITS_TOTAL: &str = "rfd_solver_cache_hits_total";

/// Total cache misses, including stale entries and backend failures.
///
/// Labels: `reason` ("absent" | "stale" | "unavailable").
pub const CACHE_MISSES_TOTAL: &str = "rfd_solver_cache_misses_total";

/// Total cache writes.
///
/// Labels: `status` ("ok" | "error" | "skipped").
pub const CACHE_WRITES_TOTAL: &str = "rfd_solver_cache_writes_total";

/// Total cache entries removed: stale on read, superseded by a write, swept
/// or cleared.
///
/// Labels: `reason` ("stale" | "superseded" | "sweep" | "clear").
pub const CACHE_EVICTIONS_TOTAL: &str = "rfd_solver_cache_evictions_total";

/// Total upstream provider requests.
///
/// Labels: `endpoint`, `status` ("ok" | "error").
pub const UPSTREAM_REQUESTS_TOTAL: &str = "rfd_solver_upstream_requests_total";

/// Total retry attempts against the upstream provider (not counting the
/// initial request).
///
/// Labels: `endpoint`.
pub const RETRIES_TOTAL: &str = "rfd_solver_retries_total";
