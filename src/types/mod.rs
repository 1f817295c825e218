//! Public types for the rfd-solver API.

mod dataset;
mod rfd;
mod schema;

pub use dataset::{Dataset, DatasetMetadata, Record, Shortfall, Source};
pub use rfd::{
    DEFAULT_NUM_RECORDS, DataType, EntityFilter, MAX_GENERATION, MAX_RECORDS, MoveFilter, Rfd,
    RfdRequest,
};
pub use schema::{Enforcement, Schema};
