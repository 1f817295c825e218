//! Shared fixtures: an in-memory PokéAPI and RFD helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use rfd_solver::providers::DataProvider;
use rfd_solver::{Result, Rfd, SolverError};

pub const TYPE_NAMES: [&str; 18] = [
    "normal", "fire", "water", "electric", "grass", "ice", "fighting", "poison", "ground",
    "flying", "psychic", "bug", "rock", "ghost", "dragon", "dark", "steel", "fairy",
];

const NAMED: &[(u32, &str)] = &[
    (1, "bulbasaur"),
    (4, "charmander"),
    (7, "squirtle"),
    (25, "pikachu"),
    (147, "dratini"),
    (148, "dragonair"),
    (149, "dragonite"),
    (371, "bagon"),
];

/// Highest species id served.
pub const MAX_SPECIES: u32 = 1010;

pub fn species_name(id: u32) -> String {
    NAMED
        .iter()
        .find(|(i, _)| *i == id)
        .map(|(_, n)| n.to_string())
        .unwrap_or_else(|| format!("species-{id}"))
}

fn species_id(name: &str) -> Option<u32> {
    NAMED
        .iter()
        .find(|(_, n)| *n == name)
        .map(|(i, _)| *i)
        .or_else(|| name.strip_prefix("species-")?.parse().ok())
        .or_else(|| name.parse().ok())
        .filter(|id| (1..=MAX_SPECIES).contains(id))
}

/// Fixture typing: only 147-149 in generation 1 are dragons.
pub fn species_types(id: u32) -> Vec<&'static str> {
    match id {
        147..=149 | 371 => vec!["dragon"],
        25 => vec!["electric"],
        4 => vec!["fire"],
        7 => vec!["water"],
        _ if id % 2 == 0 => vec!["water"],
        _ => vec!["grass", "poison"],
    }
}

fn resource(kind: &str, name: &str, id: u32) -> Value {
    json!({ "name": name, "url": format!("https://pokeapi.co/api/v2/{kind}/{id}/") })
}

fn pokemon(id: u32) -> Value {
    let name = species_name(id);
    let types: Vec<Value> = species_types(id)
        .iter()
        .enumerate()
        .map(|(slot, t)| json!({ "slot": slot + 1, "type": resource("type", t, type_id(t)) }))
        .collect();
    json!({
        "id": id,
        "name": name,
        "height": 3 + id % 20,
        "weight": 40 + id,
        "base_experience": 50 + id % 200,
        "types": types,
        "stats": [
            { "base_stat": 40 + id % 60, "stat": { "name": "hp" } },
            { "base_stat": 50 + id % 50, "stat": { "name": "attack" } },
            { "base_stat": 45 + id % 40, "stat": { "name": "speed" } }
        ],
        "abilities": [
            { "ability": { "name": "overgrow" }, "is_hidden": false, "slot": 1 },
            { "ability": { "name": "chlorophyll" }, "is_hidden": true, "slot": 3 }
        ],
        "moves": (1..=12).map(|m| json!({
            "move": { "name": format!("move-{m}") },
            "version_group_details": [{ "move_learn_method": { "name": "level-up" } }]
        })).collect::<Vec<_>>()
    })
}

fn type_id(name: &str) -> u32 {
    TYPE_NAMES
        .iter()
        .position(|t| *t == name)
        .map(|p| p as u32 + 1)
        .unwrap_or(0)
}

/// Type of fixture move `id`: cycles through the 18 types.
pub fn move_type(id: u32) -> &'static str {
    TYPE_NAMES[((id - 1) % 18) as usize]
}

/// Power of fixture move `id`: every fifth move has none.
pub fn move_power(id: u32) -> Option<u32> {
    (id % 5 != 0).then_some(id * 2)
}

fn move_doc(id: u32) -> Value {
    json!({
        "id": id,
        "name": format!("move-{id}"),
        "power": move_power(id),
        "pp": 10 + id % 25,
        "accuracy": 100,
        "priority": 0,
        "type": resource("type", move_type(id), type_id(move_type(id))),
        "damage_class": { "name": if move_power(id).is_some() { "physical" } else { "status" } },
        "effect_chance": null
    })
}

fn type_doc(name: &str) -> Value {
    let id = type_id(name);
    let members: Vec<Value> = (1..=MAX_SPECIES)
        .filter(|i| species_types(*i).contains(&name))
        .map(|i| json!({ "slot": 1, "pokemon": resource("pokemon", &species_name(i), i) }))
        .collect();
    let moves: Vec<Value> = (1..=200)
        .filter(|m| move_type(*m) == name)
        .map(|m| resource("move", &format!("move-{m}"), m))
        .collect();
    let next = TYPE_NAMES[(id as usize) % 18];
    json!({
        "id": id,
        "name": name,
        "damage_relations": {
            "double_damage_to": [{ "name": next }],
            "half_damage_to": [{ "name": name }],
            "no_damage_to": [],
            "double_damage_from": [],
            "half_damage_from": [{ "name": name }],
            "no_damage_from": []
        },
        "pokemon": members,
        "moves": moves
    })
}

fn ability_doc(id: u32) -> Value {
    json!({
        "id": id,
        "name": format!("ability-{id}"),
        "is_main_series": true,
        "generation": { "name": "generation-iii" },
        "effect_entries": [
            { "short_effect": format!("Effet {id}"), "language": { "name": "fr" } },
            { "short_effect": format!("Effect {id}"), "language": { "name": "en" } }
        ]
    })
}

fn evolution_doc(id: u32) -> Value {
    let base = id * 3;
    json!({
        "id": id,
        "baby_trigger_item": null,
        "chain": {
            "species": { "name": species_name(base) },
            "evolution_details": [],
            "evolves_to": [{
                "species": { "name": species_name(base + 1) },
                "evolution_details": [{ "min_level": 16, "trigger": { "name": "level-up" } }],
                "evolves_to": [{
                    "species": { "name": species_name(base + 2) },
                    "evolution_details": [{ "min_level": 36, "trigger": { "name": "level-up" } }],
                    "evolves_to": []
                }]
            }]
        }
    })
}

/// Serve a fixture document for `endpoint`.
pub fn fixture(endpoint: &str) -> Option<Value> {
    let (kind, key) = endpoint.trim_matches('/').split_once('/')?;
    match kind {
        "pokemon" => species_id(key).map(pokemon),
        "type" => TYPE_NAMES.contains(&key).then(|| type_doc(key)),
        "move" => key.parse().ok().filter(|id| (1..=200).contains(id)).map(move_doc),
        "ability" => key.parse().ok().filter(|id| (1..=300).contains(id)).map(ability_doc),
        "evolution-chain" => key.parse().ok().filter(|id| (1..=300).contains(id)).map(evolution_doc),
        _ => None,
    }
}

type ErrorFactory = Box<dyn Fn() -> SolverError + Send + Sync>;

/// In-memory PokéAPI with call counting and scripted failures.
pub struct FakePokeApi {
    calls: AtomicU32,
    per_endpoint: Mutex<HashMap<String, u32>>,
    fail_remaining: AtomicU32,
    fail_with: Option<ErrorFactory>,
}

impl Default for FakePokeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePokeApi {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            per_endpoint: Mutex::new(HashMap::new()),
            fail_remaining: AtomicU32::new(0),
            fail_with: None,
        }
    }

    /// Fail the first `n` calls (across all endpoints) with `error`.
    pub fn failing_first(
        mut self,
        n: u32,
        error: impl Fn() -> SolverError + Send + Sync + 'static,
    ) -> Self {
        self.fail_remaining = AtomicU32::new(n);
        self.fail_with = Some(Box::new(error));
        self
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, endpoint: &str) -> u32 {
        self.per_endpoint
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl DataProvider for FakePokeApi {
    fn name(&self) -> &str {
        "fake-pokeapi"
    }

    async fn fetch(&self, endpoint: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .per_endpoint
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default() += 1;

        if let Some(fail_with) = &self.fail_with {
            let failed = self
                .fail_remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(fail_with());
            }
        }

        fixture(endpoint).ok_or_else(|| SolverError::NotFound(endpoint.to_string()))
    }
}

/// Parse an RFD from a JSON literal.
pub fn rfd(value: Value) -> Rfd {
    Rfd::from_value(value).expect("valid RFD")
}

/// Ids of the records in a dataset, in order.
pub fn ids(records: &[rfd_solver::Record]) -> Vec<u64> {
    records
        .iter()
        .filter_map(|r| r.get("id").and_then(Value::as_u64))
        .collect()
}

/// Small live dataset for cache tests.
pub fn sample_dataset(rfd_id: &str, key: rfd_solver::Fingerprint, count: usize) -> rfd_solver::Dataset {
    let data: Vec<rfd_solver::Record> = (1..=count as u64)
        .map(|id| {
            json!({ "id": id, "name": species_name(id as u32) })
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect();
    rfd_solver::Dataset {
        rfd_id: rfd_id.to_string(),
        data_type: rfd_solver::DataType::Entity,
        metadata: rfd_solver::DatasetMetadata {
            source: rfd_solver::Source::Live,
            cached: false,
            count: data.len(),
            requested: count as u32,
            shortfall: None,
            generation_ms: 12,
            generated_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            provider: "fake-pokeapi".into(),
            fingerprint: key,
        },
        data,
    }
}
