//! Output schema declared by an RFD.

use serde::{Deserialize, Serialize};

/// Fields an RFD requires in its output records.
///
/// Other keys present in the RFD's `schema` object (e.g. `properties`) are
/// accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub enforcement: Enforcement,
}

impl Schema {
    /// Schema requiring the given fields in at least one record.
    pub fn requiring<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: fields.into_iter().map(Into::into).collect(),
            enforcement: Enforcement::default(),
        }
    }

    /// Switch to per-record enforcement.
    pub fn every_record(mut self) -> Self {
        self.enforcement = Enforcement::EveryRecord;
        self
    }
}

/// How strictly `required` is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    /// Each required field must appear in at least one record.
    #[default]
    Representative,
    /// Each required field must appear in every record.
    EveryRecord,
}
