//! PokéAPI response shapes.
//!
//! Only the fields the generator reads are modelled; everything else in the
//! upstream documents is ignored.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

impl NamedResource {
    /// Trailing numeric id of the resource URL
    /// (`https://pokeapi.co/api/v2/pokemon/25/` → 25).
    pub fn id(&self) -> Option<u32> {
        self.url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(|segment| segment.parse().ok())
    }
}

// ============================================================================
// pokemon/{id}
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub base_experience: Option<u32>,
    #[serde(default)]
    pub types: Vec<PokemonTypeSlot>,
    #[serde(default)]
    pub stats: Vec<PokemonStat>,
    #[serde(default)]
    pub abilities: Vec<PokemonAbility>,
    #[serde(default)]
    pub moves: Vec<PokemonMove>,
}

impl Pokemon {
    pub fn type_names(&self) -> Vec<String> {
        self.types.iter().map(|t| t.kind.name.clone()).collect()
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.iter().any(|t| t.kind.name == type_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokemonTypeSlot {
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokemonStat {
    pub base_stat: u32,
    pub stat: NamedResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokemonAbility {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub slot: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PokemonMove {
    #[serde(rename = "move")]
    pub kind: NamedResource,
    #[serde(default)]
    pub version_group_details: Vec<VersionGroupDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionGroupDetail {
    pub move_learn_method: NamedResource,
}

// ============================================================================
// type/{name}
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Type {
    pub id: u32,
    pub name: String,
    pub damage_relations: DamageRelations,
    #[serde(default)]
    pub pokemon: Vec<TypeMember>,
    #[serde(default)]
    pub moves: Vec<NamedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DamageRelations {
    #[serde(default)]
    pub double_damage_to: Vec<NamedResource>,
    #[serde(default)]
    pub half_damage_to: Vec<NamedResource>,
    #[serde(default)]
    pub no_damage_to: Vec<NamedResource>,
    #[serde(default)]
    pub double_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub half_damage_from: Vec<NamedResource>,
    #[serde(default)]
    pub no_damage_from: Vec<NamedResource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeMember {
    pub pokemon: NamedResource,
}

// ============================================================================
// move/{id}
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Move {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub power: Option<u32>,
    #[serde(default)]
    pub pp: Option<u32>,
    #[serde(default)]
    pub accuracy: Option<u32>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default, rename = "type")]
    pub kind: Option<NamedResource>,
    #[serde(default)]
    pub damage_class: Option<NamedResource>,
    #[serde(default)]
    pub effect_chance: Option<u32>,
}

// ============================================================================
// ability/{id}
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Ability {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub is_main_series: Option<bool>,
    #[serde(default)]
    pub generation: Option<NamedResource>,
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectEntry {
    #[serde(default)]
    pub short_effect: Option<String>,
    pub language: NamedResource,
}

impl Ability {
    /// English short effect, falling back to the first entry.
    pub fn short_effect(&self) -> Option<String> {
        self.effect_entries
            .iter()
            .find(|e| e.language.name == "en")
            .or_else(|| self.effect_entries.first())
            .and_then(|e| e.short_effect.clone())
    }
}

// ============================================================================
// evolution-chain/{id}
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EvolutionChain {
    pub id: u32,
    #[serde(default)]
    pub baby_trigger_item: Option<NamedResource>,
    pub chain: ChainLink,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolution_details: Vec<EvolutionDetail>,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvolutionDetail {
    #[serde(default)]
    pub min_level: Option<u32>,
    pub trigger: NamedResource,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_id_from_url() {
        let resource = NamedResource {
            name: "pikachu".into(),
            url: "https://pokeapi.co/api/v2/pokemon/25/".into(),
        };
        assert_eq!(resource.id(), Some(25));

        let no_url = NamedResource {
            name: "x".into(),
            url: String::new(),
        };
        assert_eq!(no_url.id(), None);
    }

    #[test]
    fn english_effect_preferred() {
        let ability: Ability = serde_json::from_value(json!({
            "id": 1,
            "name": "stench",
            "effect_entries": [
                { "short_effect": "Kann Gegner zurückschrecken lassen.", "language": { "name": "de" } },
                { "short_effect": "Has a 10% chance of making target flinch.", "language": { "name": "en" } }
            ]
        }))
        .unwrap();
        assert_eq!(
            ability.short_effect().as_deref(),
            Some("Has a 10% chance of making target flinch.")
        );
    }
}
