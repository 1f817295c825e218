//! Dataset assembly and schema validation.
//!
//! [`assemble`] wraps generated records in the metadata envelope and checks
//! them against the RFD's `schema.required` list. A field counts as present
//! when its key exists on the record, whatever the value (including `null`).
//! An empty generation result is not a schema failure: it assembles into an
//! empty dataset whose shortfall records the deficit.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::fingerprint::Fingerprint;
use crate::generator::RawRecords;
use crate::types::{
    Dataset, DatasetMetadata, Enforcement, Record, Rfd, Schema, Shortfall, Source,
};
use crate::{Result, SolverError};

/// Where and when a batch of records was produced.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub fingerprint: Fingerprint,
    pub provider: String,
    pub generated_at: DateTime<Utc>,
    pub generation_time: Duration,
}

/// Build a live [`Dataset`] from generated records and validate it.
///
/// Returns [`SolverError::SchemaViolation`] if `rfd.schema` is not satisfied
/// by the generated records; no dataset is produced in that case. Zero
/// records skip the check.
pub fn assemble(raw: RawRecords, rfd: &Rfd, provenance: Provenance) -> Result<Dataset> {
    if !raw.records.is_empty() {
        validate(&raw.records, &rfd.schema)?;
    }

    let count = raw.records.len();
    let shortfall = Shortfall::between(raw.requested, count);
    if let Some(shortfall) = &shortfall {
        debug!(
            rfd_id = %rfd.rfd_id,
            requested = shortfall.requested,
            available = shortfall.available,
            "provider supplied fewer records than requested"
        );
    }

    Ok(Dataset {
        rfd_id: rfd.rfd_id.clone(),
        data_type: raw.data_type,
        data: raw.records,
        metadata: DatasetMetadata {
            source: Source::Live,
            cached: false,
            count,
            requested: raw.requested,
            shortfall,
            generation_ms: u64::try_from(provenance.generation_time.as_millis())
                .unwrap_or(u64::MAX),
            generated_at: provenance.generated_at,
            provider: provenance.provider,
            fingerprint: provenance.fingerprint,
        },
    })
}

/// Check `records` against `schema`.
///
/// With [`Enforcement::Representative`] each required field must appear in
/// at least one record; a violation reports record 0. With
/// [`Enforcement::EveryRecord`] the first record missing a field is
/// reported. An empty record set violates any non-empty `required` list;
/// this is what rejects an empty cached dataset for a schema-bearing RFD.
pub fn validate(records: &[Record], schema: &Schema) -> Result<()> {
    let Some(first_required) = schema.required.first() else {
        return Ok(());
    };
    if records.is_empty() {
        return Err(SolverError::SchemaViolation {
            field: first_required.clone(),
            record_index: None,
        });
    }

    for field in &schema.required {
        match schema.enforcement {
            Enforcement::Representative => {
                if !records.iter().any(|r| r.contains_key(field)) {
                    return Err(SolverError::SchemaViolation {
                        field: field.clone(),
                        record_index: Some(0),
                    });
                }
            }
            Enforcement::EveryRecord => {
                if let Some(index) = records.iter().position(|r| !r.contains_key(field)) {
                    return Err(SolverError::SchemaViolation {
                        field: field.clone(),
                        record_index: Some(index),
                    });
                }
            }
        }
    }
    Ok(())
}
