//! Output record shapes, one per RFD variant.

use std::collections::BTreeMap;

use serde::Serialize;

use super::upstream;
use crate::types::Record;
use crate::{Result, SolverError};

/// Moves listed per Pokémon when `include_moves` is set.
pub const MOVES_PER_POKEMON: usize = 10;

/// Which optional sub-fields a [`PokemonRecord`] carries.
#[derive(Debug, Clone, Copy)]
pub struct Inclusions {
    pub stats: bool,
    pub abilities: bool,
    pub moves: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PokemonRecord {
    pub id: u32,
    pub name: String,
    pub height: u32,
    pub weight: u32,
    pub types: Vec<String>,
    pub base_experience: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<BTreeMap<String, u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abilities: Option<Vec<AbilitySlot>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moves: Option<Vec<LearnedMove>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AbilitySlot {
    pub name: String,
    pub is_hidden: bool,
    pub slot: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearnedMove {
    pub name: String,
    pub learn_method: String,
}

impl PokemonRecord {
    pub fn new(pokemon: upstream::Pokemon, include: Inclusions) -> Self {
        let stats = include.stats.then(|| {
            pokemon
                .stats
                .iter()
                .map(|s| (s.stat.name.clone(), s.base_stat))
                .collect()
        });
        let abilities = include.abilities.then(|| {
            pokemon
                .abilities
                .iter()
                .map(|a| AbilitySlot {
                    name: a.ability.name.clone(),
                    is_hidden: a.is_hidden,
                    slot: a.slot,
                })
                .collect()
        });
        let moves = include.moves.then(|| {
            pokemon
                .moves
                .iter()
                .take(MOVES_PER_POKEMON)
                .map(|m| LearnedMove {
                    name: m.kind.name.clone(),
                    learn_method: m
                        .version_group_details
                        .first()
                        .map(|d| d.move_learn_method.name.clone())
                        .unwrap_or_else(|| "unknown".to_string()),
                })
                .collect()
        });

        Self {
            types: pokemon.type_names(),
            id: pokemon.id,
            name: pokemon.name,
            height: pokemon.height,
            weight: pokemon.weight,
            base_experience: pokemon.base_experience,
            stats,
            abilities,
            moves,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveRecord {
    pub id: u32,
    pub name: String,
    pub power: Option<u32>,
    pub pp: Option<u32>,
    pub accuracy: Option<u32>,
    pub priority: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub damage_class: Option<String>,
    pub effect_chance: Option<u32>,
}

impl From<upstream::Move> for MoveRecord {
    fn from(m: upstream::Move) -> Self {
        Self {
            id: m.id,
            name: m.name,
            power: m.power,
            pp: m.pp,
            accuracy: m.accuracy,
            priority: m.priority,
            kind: m.kind.map(|t| t.name),
            damage_class: m.damage_class.map(|c| c.name),
            effect_chance: m.effect_chance,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AbilityRecord {
    pub id: u32,
    pub name: String,
    pub is_main_series: Option<bool>,
    pub generation: Option<String>,
    pub effect: Option<String>,
}

impl From<upstream::Ability> for AbilityRecord {
    fn from(a: upstream::Ability) -> Self {
        Self {
            effect: a.short_effect(),
            id: a.id,
            name: a.name,
            is_main_series: a.is_main_series,
            generation: a.generation.map(|g| g.name),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeRecord {
    pub id: u32,
    pub name: String,
    pub damage_relations: DamageRelations,
}

#[derive(Debug, Clone, Serialize)]
pub struct DamageRelations {
    pub double_damage_to: Vec<String>,
    pub half_damage_to: Vec<String>,
    pub no_damage_to: Vec<String>,
    pub double_damage_from: Vec<String>,
    pub half_damage_from: Vec<String>,
    pub no_damage_from: Vec<String>,
}

fn names(resources: Vec<upstream::NamedResource>) -> Vec<String> {
    resources.into_iter().map(|r| r.name).collect()
}

impl From<upstream::Type> for TypeRecord {
    fn from(t: upstream::Type) -> Self {
        let r = t.damage_relations;
        Self {
            id: t.id,
            name: t.name,
            damage_relations: DamageRelations {
                double_damage_to: names(r.double_damage_to),
                half_damage_to: names(r.half_damage_to),
                no_damage_to: names(r.no_damage_to),
                double_damage_from: names(r.double_damage_from),
                half_damage_from: names(r.half_damage_from),
                no_damage_from: names(r.no_damage_from),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvolutionRecord {
    pub id: u32,
    pub baby_trigger_item: Option<String>,
    pub chain: EvolutionNode,
}

/// One species in an evolution tree. The root carries no trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionNode {
    pub species: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    pub evolves_to: Vec<EvolutionNode>,
}

impl EvolutionNode {
    fn from_link(link: upstream::ChainLink) -> Self {
        let detail = link.evolution_details.into_iter().next();
        Self {
            species: link.species.name,
            min_level: detail.as_ref().and_then(|d| d.min_level),
            trigger: detail.map(|d| d.trigger.name),
            evolves_to: link
                .evolves_to
                .into_iter()
                .map(EvolutionNode::from_link)
                .collect(),
        }
    }

    /// Number of species in this subtree.
    pub fn size(&self) -> usize {
        1 + self.evolves_to.iter().map(EvolutionNode::size).sum::<usize>()
    }
}

impl From<upstream::EvolutionChain> for EvolutionRecord {
    fn from(c: upstream::EvolutionChain) -> Self {
        Self {
            id: c.id,
            baby_trigger_item: c.baby_trigger_item.map(|i| i.name),
            chain: EvolutionNode::from_link(c.chain),
        }
    }
}

/// Serialize a record struct into a JSON object.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(SolverError::Configuration(format!(
            "record serialized to non-object: {other}"
        ))),
    }
}
