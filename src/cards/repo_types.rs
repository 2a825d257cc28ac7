use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::auth::repo_types::UserId;

pub type CardId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Character,
    Spell,
    Artifact,
    Summon,
}

impl CardType {
    pub const ALL: [CardType; 4] = [
        CardType::Character,
        CardType::Spell,
        CardType::Artifact,
        CardType::Summon,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CardType::Character => "character",
            CardType::Spell => "spell",
            CardType::Artifact => "artifact",
            CardType::Summon => "summon",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CardType::Character => "Character",
            CardType::Spell => "Spell",
            CardType::Artifact => "Artifact",
            CardType::Summon => "Summon",
        }
    }
}

impl FromStr for CardType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CardType::ALL.into_iter().find(|t| t.as_str() == s).ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 3] = [Rarity::Common, Rarity::Rare, Rarity::Legendary];

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Rare => "rare",
            Rarity::Legendary => "legendary",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
        }
    }
}

impl FromStr for Rarity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rarity::ALL.into_iter().find(|r| r.as_str() == s).ok_or(())
    }
}

/// Abilities the client knows how to present. Cards may carry others; those
/// render with a generic style.
pub const KNOWN_ABILITIES: [(&str, &str); 6] = [
    ("regeneration", "Regeneration"),
    ("berserker", "Berserker"),
    ("magic_shield", "Magic Shield"),
    ("spell_boost", "Spell Boost"),
    ("stealth", "Stealth"),
    ("fire_immunity", "Fire Immunity"),
];

/// Raw `cards` row; enum columns are stored as text.
#[derive(Debug, FromRow)]
pub struct CardRow {
    pub id: CardId,
    pub user_id: UserId,
    pub name: String,
    #[sqlx(rename = "type")]
    pub card_type: String,
    pub rarity: String,
    pub attack: i32,
    pub defense: i32,
    pub health: i32,
    pub mana: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub abilities: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub rarity: Rarity,
    pub attack: i32,
    pub defense: i32,
    pub health: i32,
    pub mana: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub abilities: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<CardRow> for Card {
    type Error = anyhow::Error;

    fn try_from(r: CardRow) -> Result<Self, Self::Error> {
        let card_type = r
            .card_type
            .parse()
            .map_err(|_| anyhow!("card {} has unknown type {:?}", r.id, r.card_type))?;
        let rarity = r
            .rarity
            .parse()
            .map_err(|_| anyhow!("card {} has unknown rarity {:?}", r.id, r.rarity))?;
        Ok(Self {
            id: r.id,
            owner_id: r.user_id,
            name: r.name,
            card_type,
            rarity,
            attack: r.attack,
            defense: r.defense,
            health: r.health,
            mana: r.mana,
            description: r.description,
            image_url: r.image_url,
            abilities: r.abilities,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

/// Validated attributes of a card about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub name: String,
    pub card_type: CardType,
    pub rarity: Rarity,
    pub attack: i32,
    pub defense: i32,
    pub health: i32,
    pub mana: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub abilities: Vec<String>,
}

/// Validated partial update. `None` leaves a field untouched; for the
/// nullable text fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub name: Option<String>,
    pub card_type: Option<CardType>,
    pub rarity: Option<Rarity>,
    pub attack: Option<i32>,
    pub defense: Option<i32>,
    pub health: Option<i32>,
    pub mana: Option<i32>,
    pub description: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub abilities: Option<Vec<String>>,
}

impl Card {
    /// Applies `patch` in place and stamps `updated_at`. Identity fields
    /// (`id`, `owner_id`, `created_at`) are not reachable from a patch.
    pub fn apply(&mut self, patch: &CardPatch, now: OffsetDateTime) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(t) = patch.card_type {
            self.card_type = t;
        }
        if let Some(r) = patch.rarity {
            self.rarity = r;
        }
        if let Some(v) = patch.attack {
            self.attack = v;
        }
        if let Some(v) = patch.defense {
            self.defense = v;
        }
        if let Some(v) = patch.health {
            self.health = v;
        }
        if let Some(v) = patch.mana {
            self.mana = v;
        }
        if let Some(d) = &patch.description {
            self.description = d.clone();
        }
        if let Some(u) = &patch.image_url {
            self.image_url = u.clone();
        }
        if let Some(a) = &patch.abilities {
            self.abilities = a.clone();
        }
        self.updated_at = now;
    }
}
