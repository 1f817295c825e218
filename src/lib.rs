//! rfd-solver - cache-first solver for structured Requests for Data
//!
//! An RFD names a slice of the Pokémon dataset (a generation, a type, a
//! list of species, the move catalog, ...). The solver fingerprints the
//! request, serves it from a content-addressed cache on IPFS when a fresh
//! entry exists, and otherwise generates it from PokéAPI, validates it
//! against the RFD's schema and writes it back to the cache.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rfd_solver::{CacheConfig, CacheStore, DataGenerator, Pipeline, Rfd, RetryConfig};
//! use rfd_solver::cache::{PinataAuth, PinataClient};
//! use rfd_solver::providers::{MemoConfig, PokeApiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pinata = PinataClient::new(PinataAuth::Jwt("jwt".into()), Duration::from_secs(10))?;
//!     let cache = CacheStore::new(Arc::new(pinata), CacheConfig::default());
//!     let pokeapi = PokeApiClient::new(Duration::from_secs(10), &MemoConfig::default())?;
//!     let pipeline = Pipeline::new(
//!         Arc::new(cache),
//!         DataGenerator::new(Arc::new(pokeapi), RetryConfig::default()),
//!     );
//!
//!     let rfd = Rfd::from_json(r#"{"rfd_id": "1", "data_type": "entity", "num_records": 10, "era": 1}"#)?;
//!     let artifact = pipeline.solve(&rfd).await?;
//!     println!(
//!         "{} records from {}",
//!         artifact.dataset.metadata.count,
//!         artifact.dataset.metadata.source.as_str()
//!     );
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod assemble;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod generator;
pub mod pipeline;
pub mod providers;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use cache::{CacheBackend, CacheConfig, CacheEntry, CacheStats, CacheStore, ClearReport};
pub use error::{Result, SolverError};
pub use fingerprint::{Fingerprint, fingerprint};
pub use generator::{DataGenerator, RawRecords};
pub use pipeline::{Artifact, Pipeline, PipelineError, Stage};
pub use providers::{DataProvider, RetryConfig};

pub use types::{
    DataType, Dataset, DatasetMetadata, Enforcement, EntityFilter, MoveFilter, Record, Rfd,
    RfdRequest, Schema, Shortfall, Source,
};

/// Crate version.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
