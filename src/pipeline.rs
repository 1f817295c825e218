//! Cache-first RFD pipeline.
//!
//! ```text
//! Fingerprinting → CacheLookup ─┬─ hit ──→ CacheHit ──────────────────────────→ Done
//!                               └─ miss ─→ Generating → Assembling → CacheWrite → Done
//! ```
//!
//! `Generating` and `Assembling` move to `Failed` on error. `CacheWrite`
//! never fails the run: a failed write only leaves `Artifact::content_id`
//! empty. A cache hit whose payload does not satisfy the requesting RFD's
//! schema is treated as a miss (the schema is not part of the fingerprint).

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::SolverError;
use crate::assemble::{Provenance, assemble};
use crate::cache::{CacheStore, ContentId};
use crate::clock::{Clock, SystemClock};
use crate::fingerprint::{Fingerprint, fingerprint};
use crate::generator::DataGenerator;
use crate::telemetry;
use crate::types::{Dataset, Rfd, Source};

/// Pipeline position, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fingerprinting,
    CacheLookup,
    CacheHit,
    Generating,
    Assembling,
    CacheWrite,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fingerprinting => "fingerprinting",
            Stage::CacheLookup => "cache_lookup",
            Stage::CacheHit => "cache_hit",
            Stage::Generating => "generating",
            Stage::Assembling => "assembling",
            Stage::CacheWrite => "cache_write",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed pipeline run: which RFD, where, and why.
#[derive(Debug, thiserror::Error)]
#[error("RFD {rfd_id} failed during {stage}: {error}")]
pub struct PipelineError {
    pub rfd_id: String,
    /// The stage that failed (never `Failed` itself).
    pub stage: Stage,
    #[source]
    pub error: SolverError,
}

impl PipelineError {
    /// Short stable name of the underlying error kind.
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

/// Successful pipeline output.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub dataset: Dataset,
    pub fingerprint: Fingerprint,
    /// Content id of the cache entry backing this dataset; `None` when the
    /// cache write was skipped or failed.
    pub content_id: Option<ContentId>,
}

impl Artifact {
    /// `ipfs://<cid>` of the cached payload, if any.
    pub fn storage_uri(&self) -> Option<String> {
        self.content_id.as_ref().map(ContentId::storage_uri)
    }

    pub fn is_cached(&self) -> bool {
        self.dataset.metadata.cached
    }
}

/// Orchestrates fingerprint → cache lookup → generate → assemble → cache
/// write for one RFD at a time.
///
/// `Send + Sync`; share it behind an `Arc` to solve RFDs concurrently.
/// There is no per-fingerprint lock: two concurrent misses on the same key
/// both generate and both write.
pub struct Pipeline {
    cache: Arc<CacheStore>,
    generator: DataGenerator,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(cache: Arc<CacheStore>, generator: DataGenerator) -> Self {
        Self {
            cache,
            generator,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for `generated_at`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn generator(&self) -> &DataGenerator {
        &self.generator
    }

    /// Solve one RFD.
    pub async fn solve(&self, rfd: &Rfd) -> Result<Artifact, PipelineError> {
        let started = Instant::now();
        let data_type = rfd.request.data_type().as_str();

        let outcome = self.run(rfd).await;

        let (status, source) = match &outcome {
            Ok(artifact) => ("ok", artifact.dataset.metadata.source.as_str()),
            Err(_) => ("error", "none"),
        };
        metrics::counter!(telemetry::RFDS_TOTAL,
            "data_type" => data_type,
            "status" => status,
            "source" => source,
        )
        .increment(1);
        metrics::histogram!(telemetry::RFD_DURATION_SECONDS, "data_type" => data_type)
            .record(started.elapsed().as_secs_f64());

        outcome
    }

    async fn run(&self, rfd: &Rfd) -> Result<Artifact, PipelineError> {
        enter(rfd, Stage::Fingerprinting);
        rfd.validate()
            .map_err(|e| fail(rfd, Stage::Fingerprinting, e))?;
        let key = fingerprint(rfd);

        enter(rfd, Stage::CacheLookup);
        if let Some(entry) = self.cache.get(&key).await {
            match entry.dataset.validate(&rfd.schema) {
                Ok(()) => {
                    enter(rfd, Stage::CacheHit);
                    let dataset = entry.dataset.into_cached(&rfd.rfd_id);
                    info!(
                        rfd_id = %rfd.rfd_id,
                        key = %key,
                        count = dataset.metadata.count,
                        "served from cache"
                    );
                    enter(rfd, Stage::Done);
                    return Ok(Artifact {
                        dataset,
                        fingerprint: key,
                        content_id: Some(entry.content_id),
                    });
                }
                Err(e) => {
                    warn!(
                        rfd_id = %rfd.rfd_id,
                        key = %key,
                        error = %e,
                        "cached dataset does not satisfy schema, regenerating"
                    );
                }
            }
        }

        enter(rfd, Stage::Generating);
        let started = Instant::now();
        let raw = self
            .generator
            .generate(rfd)
            .await
            .map_err(|e| fail(rfd, Stage::Generating, e))?;
        let provenance = Provenance {
            fingerprint: key,
            provider: self.generator.provider_name().to_string(),
            generated_at: self.clock.now(),
            generation_time: started.elapsed(),
        };

        enter(rfd, Stage::Assembling);
        let dataset = assemble(raw, rfd, provenance).map_err(|e| fail(rfd, Stage::Assembling, e))?;

        enter(rfd, Stage::CacheWrite);
        let content_id = self.cache.put(&key, &dataset).await;

        enter(rfd, Stage::Done);
        info!(
            rfd_id = %rfd.rfd_id,
            key = %key,
            count = dataset.metadata.count,
            source = Source::Live.as_str(),
            cached = content_id.is_some(),
            "generated dataset"
        );
        Ok(Artifact {
            dataset,
            fingerprint: key,
            content_id,
        })
    }
}

fn enter(rfd: &Rfd, stage: Stage) {
    debug!(rfd_id = %rfd.rfd_id, stage = %stage, "pipeline stage");
}

fn fail(rfd: &Rfd, stage: Stage, error: SolverError) -> PipelineError {
    error!(
        rfd_id = %rfd.rfd_id,
        stage = %stage,
        kind = error.kind(),
        error = %error,
        "pipeline failed"
    );
    debug!(rfd_id = %rfd.rfd_id, stage = %Stage::Failed, "pipeline stage");
    PipelineError {
        rfd_id: rfd.rfd_id.clone(),
        stage,
        error,
    }
}
