//! Deterministic cache keys for RFDs.
//!
//! A [`Fingerprint`] is a pure function of an RFD's filtering fields. Display
//! text (`rfd_id`, `name`, `description`) and the output `schema` never take
//! part, so two RFDs that differ only in prose share a cache entry.
//!
//! Canonicalization rules:
//!
//! - name lists are trimmed, lowercased, sorted and deduplicated; id lists
//!   are sorted and deduplicated; empty lists are omitted
//! - type filters are trimmed and lowercased; blank filters are omitted
//! - inclusion flags are resolved to their defaults, so an unset flag and an
//!   explicit default hash identically
//!
//! The canonical form is a sorted `key=json` sequence hashed with SHA-256 and
//! truncated to 128 bits.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::types::{Rfd, RfdRequest};
use crate::{Result, SolverError};

/// Width of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 16;

/// Opaque fixed-width cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex encoding (32 chars).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| SolverError::InvalidRfd(format!("invalid fingerprint '{s}': {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute the cache key for an RFD.
pub fn fingerprint(rfd: &Rfd) -> Fingerprint {
    let mut hasher = Sha256::new();
    for (key, value) in canonical_form(rfd) {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_string().as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();

    let mut bytes = [0u8; FINGERPRINT_LEN];
    bytes.copy_from_slice(&digest[..FINGERPRINT_LEN]);
    Fingerprint(bytes)
}

/// The canonicalized filtering fields of an RFD, keyed in sorted order.
pub fn canonical_form(rfd: &Rfd) -> BTreeMap<&'static str, Value> {
    let mut fields = BTreeMap::new();
    fields.insert("data_type", json!(rfd.request.data_type().as_str()));
    fields.insert("num_records", json!(rfd.num_records));

    match &rfd.request {
        RfdRequest::Entity(filter) => {
            if let Some(generation) = filter.generation {
                fields.insert("generation", json!(generation));
            }
            if let Some(type_filter) = normalize_filter(filter.type_filter.as_deref()) {
                fields.insert("type_filter", json!(type_filter));
            }
            let names = canonical_names(&filter.pokemon_names);
            if !names.is_empty() {
                fields.insert("pokemon_names", json!(names));
            }
            let ids = canonical_ids(&filter.pokemon_ids);
            if !ids.is_empty() {
                fields.insert("pokemon_ids", json!(ids));
            }
            fields.insert("include_stats", json!(filter.include_stats()));
            fields.insert("include_abilities", json!(filter.include_abilities()));
            fields.insert("include_moves", json!(filter.include_moves()));
        }
        RfdRequest::Moves(filter) => {
            if let Some(type_filter) = normalize_filter(filter.type_filter.as_deref()) {
                fields.insert("type_filter", json!(type_filter));
            }
            if let Some(min_power) = filter.min_power {
                fields.insert("min_power", json!(min_power));
            }
        }
        RfdRequest::Abilities | RfdRequest::Types | RfdRequest::Evolution => {}
    }
    fields
}

/// Trimmed, lowercased filter value; `None` when absent or blank.
pub(crate) fn normalize_filter(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Names in canonical order: trimmed, lowercased, sorted, deduplicated.
pub(crate) fn canonical_names(names: &[String]) -> Vec<String> {
    let mut names: Vec<String> = names
        .iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Ids in canonical order: sorted, deduplicated.
pub(crate) fn canonical_ids(ids: &[u32]) -> Vec<u32> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}
