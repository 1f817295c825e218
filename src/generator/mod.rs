//! Data generation from the upstream provider.
//!
//! [`DataGenerator`] dispatches on the RFD variant, resolves a candidate
//! pool, fetches records in canonical order and stops once `num_records`
//! matches are collected.
//!
//! # Selection
//!
//! Selection is deterministic truncation: candidates are visited in
//! canonical order (sorted names, sorted ids, ascending ranges) and the
//! first `num_records` matches win. The same RFD therefore always yields
//! the same records, which is what makes cached and live results
//! interchangeable.
//!
//! # Failures
//!
//! Every upstream call goes through [`RetryingProvider`]. A call that still
//! fails (or a non-transient failure on the first attempt) aborts the whole
//! RFD with [`SolverError::Generation`] naming the endpoint. Partial results
//! are never returned.

pub mod records;
pub mod upstream;

use std::collections::BTreeSet;
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::fingerprint::{canonical_ids, canonical_names, normalize_filter};
use crate::providers::retry::endpoint_family;
use crate::providers::{DataProvider, RetryConfig, RetryingProvider};
use crate::telemetry;
use crate::types::{DataType, EntityFilter, MoveFilter, Record, Rfd, RfdRequest};
use crate::{Result, SolverError};

use records::{
    AbilityRecord, EvolutionRecord, Inclusions, MoveRecord, PokemonRecord, TypeRecord, to_record,
};

/// Species id ranges per generation.
const GENERATION_RANGES: [(u8, RangeInclusive<u32>); 9] = [
    (1, 1..=151),
    (2, 152..=251),
    (3, 252..=386),
    (4, 387..=493),
    (5, 494..=649),
    (6, 650..=721),
    (7, 722..=809),
    (8, 810..=905),
    (9, 906..=1010),
];

/// Move ids considered when no type filter narrows the pool.
const MOVE_POOL: RangeInclusive<u32> = 1..=100;

/// Ability ids considered.
const ABILITY_POOL: RangeInclusive<u32> = 1..=100;

/// Evolution chain ids considered.
const EVOLUTION_POOL: RangeInclusive<u32> = 1..=50;

/// The canonical elemental types, in PokéAPI id order.
pub const TYPE_NAMES: [&str; 18] = [
    "normal", "fire", "water", "electric", "grass", "ice", "fighting", "poison", "ground",
    "flying", "psychic", "bug", "rock", "ghost", "dragon", "dark", "steel", "fairy",
];

/// Default number of upstream requests in flight per RFD.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Species id range for a generation; generation 1 when absent or unknown.
pub fn generation_range(generation: Option<u8>) -> RangeInclusive<u32> {
    let generation = generation.unwrap_or(1);
    GENERATION_RANGES
        .iter()
        .find(|(g, _)| *g == generation)
        .map(|(_, range)| range.clone())
        .unwrap_or(1..=151)
}

/// Records produced for one RFD, before assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecords {
    pub data_type: DataType,
    pub records: Vec<Record>,
    /// The RFD's `num_records`; `records.len()` may be smaller.
    pub requested: u32,
}

/// Pokémon addressed by name or id.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Name(String),
    Id(u32),
}

impl Target {
    fn endpoint(&self) -> String {
        match self {
            Target::Name(name) => format!("pokemon/{name}"),
            Target::Id(id) => format!("pokemon/{id}"),
        }
    }
}

/// Generates raw records for an RFD from the upstream provider.
pub struct DataGenerator {
    provider: RetryingProvider,
    concurrency: usize,
}

impl DataGenerator {
    /// Wrap `provider` with `retry` and build a generator over it.
    pub fn new(provider: Arc<dyn DataProvider>, retry: RetryConfig) -> Self {
        Self {
            provider: RetryingProvider::new(provider, retry),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set the number of upstream requests in flight (minimum 1).
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Produce up to `rfd.num_records` records for `rfd`.
    pub async fn generate(&self, rfd: &Rfd) -> Result<RawRecords> {
        let limit = rfd.num_records as usize;
        let records = match &rfd.request {
            RfdRequest::Entity(filter) => self.entities(filter, limit).await?,
            RfdRequest::Moves(filter) => self.moves(filter, limit).await?,
            RfdRequest::Abilities => {
                let ids: Vec<u32> = ABILITY_POOL.collect();
                self.collect(&ids, limit, |id| async move {
                    let ability: upstream::Ability = self.fetch(&format!("ability/{id}")).await?;
                    Ok(Some(to_record(&AbilityRecord::from(ability))?))
                })
                .await?
            }
            RfdRequest::Types => {
                self.collect(&TYPE_NAMES[..], limit, |name| async move {
                    let kind: upstream::Type = self.fetch(&format!("type/{name}")).await?;
                    Ok(Some(to_record(&TypeRecord::from(kind))?))
                })
                .await?
            }
            RfdRequest::Evolution => {
                let ids: Vec<u32> = EVOLUTION_POOL.collect();
                self.collect(&ids, limit, |id| async move {
                    let chain: upstream::EvolutionChain =
                        self.fetch(&format!("evolution-chain/{id}")).await?;
                    Ok(Some(to_record(&EvolutionRecord::from(chain))?))
                })
                .await?
            }
        };

        info!(
            rfd_id = %rfd.rfd_id,
            data_type = %rfd.request.data_type(),
            requested = rfd.num_records,
            generated = records.len(),
            "generated records"
        );
        Ok(RawRecords {
            data_type: rfd.request.data_type(),
            records,
            requested: rfd.num_records,
        })
    }

    async fn entities(&self, filter: &EntityFilter, limit: usize) -> Result<Vec<Record>> {
        let type_filter = normalize_filter(filter.type_filter.as_deref());
        let mut targets = entity_targets(filter);

        if let Some(type_name) = &type_filter {
            let kind: upstream::Type = self.fetch(&format!("type/{type_name}")).await?;
            let member_names: BTreeSet<&str> =
                kind.pokemon.iter().map(|m| m.pokemon.name.as_str()).collect();
            let member_ids: BTreeSet<u32> =
                kind.pokemon.iter().filter_map(|m| m.pokemon.id()).collect();
            targets.retain(|target| match target {
                Target::Name(name) => member_names.contains(name.as_str()),
                Target::Id(id) => member_ids.contains(id),
            });
            debug!(type_filter = %type_name, candidates = targets.len(), "narrowed by type");
        }

        let include = Inclusions {
            stats: filter.include_stats(),
            abilities: filter.include_abilities(),
            moves: filter.include_moves(),
        };
        let type_filter = type_filter.as_deref();
        self.collect(&targets, limit, |target| async move {
            let pokemon: upstream::Pokemon = self.fetch(&target.endpoint()).await?;
            if let Some(type_name) = type_filter {
                if !pokemon.has_type(type_name) {
                    return Ok(None);
                }
            }
            Ok(Some(to_record(&PokemonRecord::new(pokemon, include))?))
        })
        .await
    }

    async fn moves(&self, filter: &MoveFilter, limit: usize) -> Result<Vec<Record>> {
        let type_filter = normalize_filter(filter.type_filter.as_deref());
        let ids: Vec<u32> = match &type_filter {
            Some(type_name) => {
                let kind: upstream::Type = self.fetch(&format!("type/{type_name}")).await?;
                canonical_ids(&kind.moves.iter().filter_map(|m| m.id()).collect::<Vec<_>>())
            }
            None => MOVE_POOL.collect(),
        };

        let min_power = filter.min_power;
        let type_filter = type_filter.as_deref();
        self.collect(&ids, limit, |id| async move {
            let m: upstream::Move = self.fetch(&format!("move/{id}")).await?;
            if let Some(type_name) = type_filter {
                if m.kind.as_ref().map(|k| k.name.as_str()) != Some(type_name) {
                    return Ok(None);
                }
            }
            if let Some(min_power) = min_power {
                if m.power.unwrap_or(0) < min_power {
                    return Ok(None);
                }
            }
            Ok(Some(to_record(&MoveRecord::from(m))?))
        })
        .await
    }

    /// Visit `candidates` in order, keeping the first `limit` matches.
    ///
    /// Candidates are fetched in batches of at most `concurrency`, never more
    /// than the number of matches still needed, so an unfiltered pool issues
    /// exactly `limit` requests.
    async fn collect<'a, C, F, Fut>(
        &'a self,
        candidates: &'a [C],
        limit: usize,
        fetch: F,
    ) -> Result<Vec<Record>>
    where
        C: Clone + 'a,
        F: Fn(C) -> Fut,
        Fut: Future<Output = Result<Option<Record>>> + 'a,
    {
        let mut records = Vec::with_capacity(limit.min(candidates.len()));
        let mut remaining = candidates;
        while records.len() < limit && !remaining.is_empty() {
            let batch = (limit - records.len()).min(self.concurrency).min(remaining.len());
            let (head, tail) = remaining.split_at(batch);
            remaining = tail;
            let fetched = try_join_all(head.iter().cloned().map(&fetch)).await?;
            records.extend(fetched.into_iter().flatten());
        }
        records.truncate(limit);
        Ok(records)
    }

    /// Fetch and decode one endpoint, mapping failures to `Generation`.
    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let outcome = match self.provider.fetch(endpoint).await {
            Ok(value) => serde_json::from_value(value).map_err(SolverError::from),
            Err(e) => Err(e),
        };
        let status = if outcome.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::UPSTREAM_REQUESTS_TOTAL,
            "endpoint" => endpoint_family(endpoint),
            "status" => status,
        )
        .increment(1);
        outcome.map_err(|e| SolverError::Generation {
            target: endpoint.to_string(),
            source: Box::new(e),
        })
    }
}

/// Candidate Pokémon for an entity RFD: explicit names, else explicit ids,
/// else the generation range.
fn entity_targets(filter: &EntityFilter) -> Vec<Target> {
    let names = canonical_names(&filter.pokemon_names);
    if !names.is_empty() {
        return names.into_iter().map(Target::Name).collect();
    }
    let ids = canonical_ids(&filter.pokemon_ids);
    if !ids.is_empty() {
        return ids.into_iter().map(Target::Id).collect();
    }
    generation_range(filter.generation).map(Target::Id).collect()
}
