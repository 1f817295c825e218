//! Request-for-Data input types.
//!
//! An [`Rfd`] is parsed once at ingestion. The `data_type` field is resolved
//! into the [`RfdRequest`] tagged union there and never re-inferred
//! downstream.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::Schema;
use crate::{Result, SolverError};

/// Largest `num_records` an RFD may ask for.
pub const MAX_RECORDS: u32 = 1000;

/// Default `num_records` when the field is absent.
pub const DEFAULT_NUM_RECORDS: u32 = 10;

/// Highest known generation (era) number.
pub const MAX_GENERATION: u8 = 9;

/// A structured Request for Data.
///
/// ```rust
/// # use rfd_solver::{Rfd, DataType};
/// let rfd = Rfd::from_json(r#"{"rfd_id": "42", "data_type": "entity", "num_records": 5, "era": 1}"#)?;
/// assert_eq!(rfd.request.data_type(), DataType::Entity);
/// assert_eq!(rfd.num_records, 5);
/// # Ok::<(), rfd_solver::SolverError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfd {
    pub rfd_id: String,
    /// Display name. Never part of the fingerprint.
    #[serde(default)]
    pub name: String,
    /// Free text. Never part of the fingerprint.
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_num_records")]
    pub num_records: u32,
    #[serde(default)]
    pub schema: Schema,
    /// Variant selected by `data_type`, with its filters.
    #[serde(flatten)]
    pub request: RfdRequest,
}

fn default_num_records() -> u32 {
    DEFAULT_NUM_RECORDS
}

/// Generation variant of an RFD, tagged by `data_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "data_type", rename_all = "snake_case")]
pub enum RfdRequest {
    /// Individual Pokémon records.
    #[serde(alias = "pokemon")]
    Entity(EntityFilter),
    /// Move catalog.
    Moves(MoveFilter),
    /// Ability catalog.
    Abilities,
    /// Type effectiveness table.
    Types,
    /// Evolution chain trees.
    Evolution,
}

impl RfdRequest {
    pub fn data_type(&self) -> DataType {
        match self {
            RfdRequest::Entity(_) => DataType::Entity,
            RfdRequest::Moves(_) => DataType::Moves,
            RfdRequest::Abilities => DataType::Abilities,
            RfdRequest::Types => DataType::Types,
            RfdRequest::Evolution => DataType::Evolution,
        }
    }
}

/// Filter-free discriminant of [`RfdRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Entity,
    Moves,
    Abilities,
    Types,
    Evolution,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Entity => "entity",
            DataType::Moves => "moves",
            DataType::Abilities => "abilities",
            DataType::Types => "types",
            DataType::Evolution => "evolution",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DataType {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "entity" | "pokemon" => Ok(DataType::Entity),
            "moves" => Ok(DataType::Moves),
            "abilities" => Ok(DataType::Abilities),
            "types" => Ok(DataType::Types),
            "evolution" => Ok(DataType::Evolution),
            other => Err(SolverError::InvalidRfd(format!(
                "unsupported data_type '{other}'"
            ))),
        }
    }
}

/// Filters for [`RfdRequest::Entity`].
///
/// Explicit names take precedence over explicit ids, which take precedence
/// over the generation range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityFilter {
    #[serde(default, alias = "era", skip_serializing_if = "Option::is_none")]
    pub generation: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pokemon_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pokemon_ids: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_stats: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_abilities: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_moves: Option<bool>,
}

impl EntityFilter {
    /// Base stats are included unless explicitly disabled.
    pub fn include_stats(&self) -> bool {
        self.include_stats.unwrap_or(true)
    }

    /// Abilities are included unless explicitly disabled.
    pub fn include_abilities(&self) -> bool {
        self.include_abilities.unwrap_or(true)
    }

    /// Moves are excluded unless explicitly enabled.
    pub fn include_moves(&self) -> bool {
        self.include_moves.unwrap_or(false)
    }
}

/// Filters for [`RfdRequest::Moves`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_filter: Option<String>,
    /// Minimum base power; moves without power count as 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_power: Option<u32>,
}

impl Rfd {
    /// Parse an RFD from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse an RFD from a JSON value.
    ///
    /// A missing `data_type` defaults to `entity`. The result is validated
    /// before it is returned.
    pub fn from_value(mut value: Value) -> Result<Self> {
        let Some(object) = value.as_object_mut() else {
            return Err(SolverError::InvalidRfd("RFD must be a JSON object".into()));
        };
        object
            .entry("data_type")
            .or_insert_with(|| Value::String(DataType::Entity.as_str().into()));

        let rfd: Rfd = serde_json::from_value(value)
            .map_err(|e| SolverError::InvalidRfd(e.to_string()))?;
        rfd.validate()?;
        Ok(rfd)
    }

    /// Read and parse an RFD file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SolverError::InvalidRfd(format!("failed to read RFD file {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Check ingestion constraints.
    pub fn validate(&self) -> Result<()> {
        if self.rfd_id.trim().is_empty() {
            return Err(SolverError::InvalidRfd("rfd_id must not be empty".into()));
        }
        if self.num_records > MAX_RECORDS {
            return Err(SolverError::InvalidRfd(format!(
                "num_records {} exceeds maximum {MAX_RECORDS}",
                self.num_records
            )));
        }
        if let RfdRequest::Entity(filter) = &self.request {
            if let Some(generation) = filter.generation {
                if !(1..=MAX_GENERATION).contains(&generation) {
                    return Err(SolverError::InvalidRfd(format!(
                        "generation {generation} outside 1..={MAX_GENERATION}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_type_defaults_to_entity() {
        let rfd = Rfd::from_json(r#"{"rfd_id": "1"}"#).unwrap();
        assert_eq!(rfd.request, RfdRequest::Entity(EntityFilter::default()));
        assert_eq!(rfd.num_records, DEFAULT_NUM_RECORDS);
    }

    #[test]
    fn pokemon_is_alias_for_entity() {
        let rfd = Rfd::from_json(r#"{"rfd_id": "1", "data_type": "pokemon"}"#).unwrap();
        assert_eq!(rfd.request.data_type(), DataType::Entity);
    }

    #[test]
    fn era_is_alias_for_generation() {
        let rfd = Rfd::from_json(r#"{"rfd_id": "1", "data_type": "entity", "era": 3}"#).unwrap();
        let RfdRequest::Entity(filter) = rfd.request else {
            panic!("expected entity request");
        };
        assert_eq!(filter.generation, Some(3));
    }

    #[test]
    fn inclusion_flag_defaults() {
        let filter = EntityFilter::default();
        assert!(filter.include_stats());
        assert!(filter.include_abilities());
        assert!(!filter.include_moves());
    }

    #[test]
    fn data_type_from_str() {
        assert_eq!("Pokemon".parse::<DataType>().unwrap(), DataType::Entity);
        assert_eq!("moves".parse::<DataType>().unwrap(), DataType::Moves);
        assert!("berries".parse::<DataType>().is_err());
    }

    #[test]
    fn non_object_rejected() {
        let err = Rfd::from_json("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, SolverError::InvalidRfd(_)));
    }
}
