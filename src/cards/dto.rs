use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    cards::repo_types::{CardPatch, CardType, NewCard, Rarity, KNOWN_ABILITIES},
    error::FieldError,
};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_IMAGE_URL_LEN: usize = 2048;
pub const MAX_ABILITIES: usize = 16;
pub const MAX_ABILITY_LEN: usize = 64;

/// Card attributes as submitted by the client, for both creation and
/// partial update. Server-owned fields (`id`, `ownerId`, timestamps) are
/// not part of it and are ignored if present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub rarity: Option<String>,
    pub attack: Option<i64>,
    pub defense: Option<i64>,
    pub health: Option<i64>,
    pub mana: Option<i64>,
    #[serde(default, deserialize_with = "explicit")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit")]
    pub image_url: Option<Option<String>>,
    pub abilities: Option<Vec<String>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`).
fn explicit<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    fn name(&mut self, raw: &str) -> Option<String> {
        let name = raw.trim();
        if name.is_empty() {
            self.fail("name", "name must not be empty");
            return None;
        }
        if name.chars().count() > MAX_NAME_LEN {
            self.fail("name", format!("name must be at most {MAX_NAME_LEN} characters"));
            return None;
        }
        Some(name.to_owned())
    }

    fn card_type(&mut self, raw: &str) -> Option<CardType> {
        let parsed = raw.parse().ok();
        if parsed.is_none() {
            self.fail("type", "type must be one of character, spell, artifact, summon");
        }
        parsed
    }

    fn rarity(&mut self, raw: &str) -> Option<Rarity> {
        let parsed = raw.parse().ok();
        if parsed.is_none() {
            self.fail("rarity", "rarity must be one of common, rare, legendary");
        }
        parsed
    }

    fn stat(&mut self, field: &str, raw: i64) -> Option<i32> {
        match i32::try_from(raw) {
            Ok(v) if v >= 0 => Some(v),
            Ok(_) => {
                self.fail(field, format!("{field} must not be negative"));
                None
            }
            Err(_) => {
                self.fail(field, format!("{field} is out of range"));
                None
            }
        }
    }

    /// Empty strings collapse to `None`.
    fn text(&mut self, field: &str, raw: Option<String>, max: usize) -> Option<String> {
        let value = raw.filter(|s| !s.trim().is_empty())?;
        if value.chars().count() > max {
            self.fail(field, format!("{field} must be at most {max} characters"));
        }
        Some(value)
    }

    fn abilities(&mut self, raw: Vec<String>) -> Vec<String> {
        if raw.len() > MAX_ABILITIES {
            self.fail(
                "abilities",
                format!("at most {MAX_ABILITIES} abilities are allowed"),
            );
        }
        for (i, a) in raw.iter().enumerate() {
            if a.trim().is_empty() {
                self.fail(&format!("abilities[{i}]"), "ability must not be empty");
            } else if a.chars().count() > MAX_ABILITY_LEN {
                self.fail(
                    &format!("abilities[{i}]"),
                    format!("ability must be at most {MAX_ABILITY_LEN} characters"),
                );
            }
        }
        raw
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

impl CardDraft {
    /// Validates a full creation payload; stats default to 0.
    pub fn into_new_card(self) -> Result<NewCard, Vec<FieldError>> {
        let mut c = Checker::default();

        let name = match self.name.as_deref() {
            Some(raw) => c.name(raw),
            None => {
                c.fail("name", "name is required");
                None
            }
        };
        let card_type = match self.card_type.as_deref() {
            Some(raw) => c.card_type(raw),
            None => {
                c.fail("type", "type is required");
                None
            }
        };
        let rarity = match self.rarity.as_deref() {
            Some(raw) => c.rarity(raw),
            None => {
                c.fail("rarity", "rarity is required");
                None
            }
        };
        let attack = self.attack.map_or(Some(0), |v| c.stat("attack", v));
        let defense = self.defense.map_or(Some(0), |v| c.stat("defense", v));
        let health = self.health.map_or(Some(0), |v| c.stat("health", v));
        let mana = self.mana.map_or(Some(0), |v| c.stat("mana", v));
        let description = c.text("description", self.description.flatten(), MAX_DESCRIPTION_LEN);
        let image_url = c.text("imageUrl", self.image_url.flatten(), MAX_IMAGE_URL_LEN);
        let abilities = c.abilities(self.abilities.unwrap_or_default());

        match (name, card_type, rarity, attack, defense, health, mana) {
            (
                Some(name),
                Some(card_type),
                Some(rarity),
                Some(attack),
                Some(defense),
                Some(health),
                Some(mana),
            ) => c.finish(NewCard {
                name,
                card_type,
                rarity,
                attack,
                defense,
                health,
                mana,
                description,
                image_url,
                abilities,
            }),
            _ => Err(c.errors),
        }
    }

    /// Validates only the fields that were supplied.
    pub fn into_patch(self) -> Result<CardPatch, Vec<FieldError>> {
        let mut c = Checker::default();
        let mut patch = CardPatch::default();

        if let Some(raw) = self.name.as_deref() {
            patch.name = c.name(raw);
        }
        if let Some(raw) = self.card_type.as_deref() {
            patch.card_type = c.card_type(raw);
        }
        if let Some(raw) = self.rarity.as_deref() {
            patch.rarity = c.rarity(raw);
        }
        patch.attack = self.attack.and_then(|v| c.stat("attack", v));
        patch.defense = self.defense.and_then(|v| c.stat("defense", v));
        patch.health = self.health.and_then(|v| c.stat("health", v));
        patch.mana = self.mana.and_then(|v| c.stat("mana", v));
        if let Some(d) = self.description {
            patch.description = Some(c.text("description", d, MAX_DESCRIPTION_LEN));
        }
        if let Some(u) = self.image_url {
            patch.image_url = Some(c.text("imageUrl", u, MAX_IMAGE_URL_LEN));
        }
        if let Some(a) = self.abilities {
            patch.abilities = Some(c.abilities(a));
        }

        c.finish(patch)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "type")]
    pub card_type: Option<String>,
}

impl ListQuery {
    /// `None` and `"all"` mean no filter.
    pub fn type_filter(&self) -> Result<Option<CardType>, Vec<FieldError>> {
        match self.card_type.as_deref() {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => {
                let mut c = Checker::default();
                let parsed = c.card_type(raw);
                c.finish(parsed)
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub value: &'static str,
    pub label: &'static str,
}

/// Closed vocabularies used by the card form.
#[derive(Debug, Serialize)]
pub struct Catalog {
    pub types: Vec<CatalogEntry>,
    pub rarities: Vec<CatalogEntry>,
    pub abilities: Vec<CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            types: CardType::ALL
                .into_iter()
                .map(|t| CatalogEntry {
                    value: t.as_str(),
                    label: t.label(),
                })
                .collect(),
            rarities: Rarity::ALL
                .into_iter()
                .map(|r| CatalogEntry {
                    value: r.as_str(),
                    label: r.label(),
                })
                .collect(),
            abilities: KNOWN_ABILITIES
                .iter()
                .map(|&(value, label)| CatalogEntry { value, label })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(v: serde_json::Value) -> CardDraft {
        serde_json::from_value(v).expect("draft deserializes")
    }

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn full_card_validates() {
        let card = draft(json!({
            "name": "Flame Drake",
            "type": "character",
            "rarity": "legendary",
            "attack": 50, "defense": 30, "health": 80, "mana": 10,
            "abilities": ["fire_immunity"]
        }))
        .into_new_card()
        .unwrap();
        assert_eq!(card.name, "Flame Drake");
        assert_eq!(card.card_type, CardType::Character);
        assert_eq!(card.rarity, Rarity::Legendary);
        assert_eq!((card.attack, card.defense, card.health, card.mana), (50, 30, 80, 10));
        assert_eq!(card.abilities, vec!["fire_immunity".to_string()]);
    }

    #[test]
    fn stats_default_to_zero_and_empty_strings_are_absent() {
        let card = draft(json!({
            "name": "  Pebble  ", "type": "artifact", "rarity": "common",
            "imageUrl": "", "description": "", "mana": null
        }))
        .into_new_card()
        .unwrap();
        assert_eq!(card.name, "Pebble");
        assert_eq!((card.attack, card.defense, card.health, card.mana), (0, 0, 0, 0));
        assert_eq!(card.image_url, None);
        assert_eq!(card.description, None);
        assert!(card.abilities.is_empty());
    }

    #[test]
    fn missing_and_bad_fields_are_all_reported() {
        let errors = draft(json!({
            "type": "trap", "rarity": "mythic", "attack": -1, "health": 3_000_000_000i64
        }))
        .into_new_card()
        .unwrap_err();
        assert_eq!(fields(&errors), ["name", "type", "rarity", "attack", "health"]);
    }

    #[test]
    fn blank_name_is_rejected() {
        let errors = draft(json!({"name": "   ", "type": "spell", "rarity": "rare"}))
            .into_new_card()
            .unwrap_err();
        assert_eq!(fields(&errors), ["name"]);
    }

    #[test]
    fn unknown_abilities_are_accepted_blank_ones_are_not() {
        let card = draft(json!({
            "name": "Odd", "type": "spell", "rarity": "rare", "abilities": ["time_stop"]
        }))
        .into_new_card()
        .unwrap();
        assert_eq!(card.abilities, vec!["time_stop".to_string()]);

        let errors = draft(json!({
            "name": "Odd", "type": "spell", "rarity": "rare", "abilities": ["stealth", " "]
        }))
        .into_new_card()
        .unwrap_err();
        assert_eq!(fields(&errors), ["abilities[1]"]);
    }

    #[test]
    fn server_fields_in_payload_are_ignored() {
        let card = draft(json!({
            "name": "Spoof", "type": "summon", "rarity": "common",
            "id": 999, "ownerId": 12345, "userId": 12345, "createdAt": "2000-01-01T00:00:00Z"
        }))
        .into_new_card();
        assert!(card.is_ok());
    }

    #[test]
    fn empty_patch_is_empty() {
        let patch = draft(json!({})).into_patch().unwrap();
        assert_eq!(patch, CardPatch::default());
    }

    #[test]
    fn patch_validates_supplied_fields_only() {
        let patch = draft(json!({"attack": 7, "rarity": "rare"})).into_patch().unwrap();
        assert_eq!(patch.attack, Some(7));
        assert_eq!(patch.rarity, Some(Rarity::Rare));
        assert_eq!(patch.name, None);

        let errors = draft(json!({"type": "Character", "defense": -5}))
            .into_patch()
            .unwrap_err();
        assert_eq!(fields(&errors), ["type", "defense"]);
    }

    #[test]
    fn patch_null_clears_nullable_text() {
        let patch = draft(json!({"description": null, "imageUrl": "https://img/x.png"}))
            .into_patch()
            .unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.image_url, Some(Some("https://img/x.png".into())));
    }

    #[test]
    fn list_query_filter() {
        let q = |t: Option<&str>| ListQuery {
            card_type: t.map(str::to_owned),
        };
        assert_eq!(q(None).type_filter().unwrap(), None);
        assert_eq!(q(Some("all")).type_filter().unwrap(), None);
        assert_eq!(q(Some("summon")).type_filter().unwrap(), Some(CardType::Summon));
        assert!(q(Some("dragon")).type_filter().is_err());
    }

    #[test]
    fn catalog_lists_vocabularies() {
        let json = serde_json::to_value(Catalog::default()).unwrap();
        assert_eq!(json["types"].as_array().unwrap().len(), 4);
        assert_eq!(json["rarities"][2]["value"], "legendary");
        assert_eq!(json["abilities"][2]["label"], "Magic Shield");
    }
}
