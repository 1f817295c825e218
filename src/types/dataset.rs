//! Assembled dataset returned by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::rfd::DataType;
use super::schema::Schema;
use crate::Result;
use crate::fingerprint::Fingerprint;

/// One output record: a JSON object.
pub type Record = Map<String, Value>;

/// Pipeline output: ordered records plus a metadata envelope.
///
/// Serializes directly to the `<rfd_id>_solution.json` artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub rfd_id: String,
    pub data_type: DataType,
    pub data: Vec<Record>,
    pub metadata: DatasetMetadata,
}

/// Provenance and bookkeeping for a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub source: Source,
    /// True when this dataset was served from the cache.
    pub cached: bool,
    pub count: usize,
    pub requested: u32,
    /// Present iff the provider supplied fewer records than requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Shortfall>,
    /// Wall-clock time spent generating, in milliseconds.
    pub generation_ms: u64,
    pub generated_at: DateTime<Utc>,
    pub provider: String,
    pub fingerprint: Fingerprint,
}

/// Where a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Live,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Live => "live",
        }
    }
}

/// Explicit record deficit: the provider could not supply `requested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub requested: u32,
    pub available: usize,
}

impl Shortfall {
    /// Shortfall for `available` records against `requested`, if any.
    pub fn between(requested: u32, available: usize) -> Option<Self> {
        (available < requested as usize).then_some(Self {
            requested,
            available,
        })
    }

    pub fn missing(&self) -> usize {
        (self.requested as usize).saturating_sub(self.available)
    }
}

impl Dataset {
    /// Check the records against `schema`.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        crate::assemble::validate(&self.data, schema)
    }

    /// Relabel a cached copy for the RFD it is served to.
    pub fn into_cached(mut self, rfd_id: &str) -> Self {
        self.rfd_id = rfd_id.to_string();
        self.metadata.source = Source::Cache;
        self.metadata.cached = true;
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortfall_only_when_short() {
        assert_eq!(Shortfall::between(10, 10), None);
        let shortfall = Shortfall::between(15, 3).unwrap();
        assert_eq!(shortfall.available, 3);
        assert_eq!(shortfall.missing(), 12);
    }

    #[test]
    fn missing_saturates_on_inconsistent_shortfall() {
        let shortfall: Shortfall =
            serde_json::from_str(r#"{"requested": 2, "available": 5}"#).unwrap();
        assert_eq!(shortfall.missing(), 0);
    }

    #[test]
    fn source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Source::Cache).unwrap(), "\"cache\"");
        assert_eq!(serde_json::to_string(&Source::Live).unwrap(), "\"live\"");
    }
}
