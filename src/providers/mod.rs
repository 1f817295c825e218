//! Upstream data providers.
//!
//! [`DataProvider`] is the read-only seam between the generator and the
//! upstream dataset. [`PokeApiClient`] is the production implementation;
//! [`RetryingProvider`] adds bounded retry on transient failures.

pub mod pokeapi;
pub mod retry;
pub mod traits;

pub use pokeapi::{MemoConfig, PokeApiClient};
pub use retry::{RetryConfig, RetryingProvider};
pub use traits::DataProvider;
