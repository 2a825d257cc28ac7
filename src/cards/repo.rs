use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::repo_types::UserId;
use crate::cards::repo_types::{Card, CardId, CardPatch, CardRow, CardType, NewCard};

/// Persistence for cards. Nothing here filters by owner except listing;
/// callers must authorize before reaching for a card by id.
#[async_trait]
pub trait CardStore: Send + Sync {
    async fn create(&self, owner_id: UserId, card: &NewCard) -> anyhow::Result<Card>;
    async fn get(&self, id: CardId) -> anyhow::Result<Option<Card>>;
    /// Newest first.
    async fn list_by_owner(
        &self,
        owner_id: UserId,
        card_type: Option<CardType>,
    ) -> anyhow::Result<Vec<Card>>;
    async fn update(&self, id: CardId, patch: &CardPatch) -> anyhow::Result<Option<Card>>;
    /// `true` when a row was removed.
    async fn delete(&self, id: CardId) -> anyhow::Result<bool>;
}

macro_rules! card_columns {
    () => {
        "id, user_id, name, type, rarity, attack, defense, health, mana, \
         description, image_url, abilities, created_at, updated_at"
    };
}

#[derive(Clone)]
pub struct PgCardStore {
    db: PgPool,
}

impl PgCardStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CardStore for PgCardStore {
    async fn create(&self, owner_id: UserId, card: &NewCard) -> anyhow::Result<Card> {
        let row = sqlx::query_as::<_, CardRow>(concat!(
            r#"
            INSERT INTO cards (user_id, name, type, rarity, attack, defense, health, mana,
                               description, image_url, abilities)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING "#,
            card_columns!()
        ))
        .bind(owner_id)
        .bind(&card.name)
        .bind(card.card_type.as_str())
        .bind(card.rarity.as_str())
        .bind(card.attack)
        .bind(card.defense)
        .bind(card.health)
        .bind(card.mana)
        .bind(&card.description)
        .bind(&card.image_url)
        .bind(&card.abilities)
        .fetch_one(&self.db)
        .await
        .context("insert card")?;
        row.try_into()
    }

    async fn get(&self, id: CardId) -> anyhow::Result<Option<Card>> {
        let row = sqlx::query_as::<_, CardRow>(concat!(
            "SELECT ",
            card_columns!(),
            " FROM cards WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get card")?;
        row.map(Card::try_from).transpose()
    }

    async fn list_by_owner(
        &self,
        owner_id: UserId,
        card_type: Option<CardType>,
    ) -> anyhow::Result<Vec<Card>> {
        let rows = sqlx::query_as::<_, CardRow>(concat!(
            "SELECT ",
            card_columns!(),
            r#"
              FROM cards
             WHERE user_id = $1
               AND ($2::text IS NULL OR type = $2)
             ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(owner_id)
        .bind(card_type.map(CardType::as_str))
        .fetch_all(&self.db)
        .await
        .context("list cards by owner")?;
        rows.into_iter().map(Card::try_from).collect()
    }

    async fn update(&self, id: CardId, patch: &CardPatch) -> anyhow::Result<Option<Card>> {
        let row = sqlx::query_as::<_, CardRow>(concat!(
            r#"
            UPDATE cards SET
                name        = COALESCE($2, name),
                type        = COALESCE($3, type),
                rarity      = COALESCE($4, rarity),
                attack      = COALESCE($5, attack),
                defense     = COALESCE($6, defense),
                health      = COALESCE($7, health),
                mana        = COALESCE($8, mana),
                description = CASE WHEN $9 THEN $10 ELSE description END,
                image_url   = CASE WHEN $11 THEN $12 ELSE image_url END,
                abilities   = COALESCE($13, abilities),
                updated_at  = GREATEST(now(), updated_at + interval '1 microsecond')
            WHERE id = $1
            RETURNING "#,
            card_columns!()
        ))
        .bind(id)
        .bind(&patch.name)
        .bind(patch.card_type.map(CardType::as_str))
        .bind(patch.rarity.map(|r| r.as_str()))
        .bind(patch.attack)
        .bind(patch.defense)
        .bind(patch.health)
        .bind(patch.mana)
        .bind(patch.description.is_some())
        .bind(patch.description.clone().flatten())
        .bind(patch.image_url.is_some())
        .bind(patch.image_url.clone().flatten())
        .bind(&patch.abilities)
        .fetch_optional(&self.db)
        .await
        .context("update card")?;
        row.map(Card::try_from).transpose()
    }

    async fn delete(&self, id: CardId) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM cards WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete card")?;
        Ok(res.rows_affected() > 0)
    }
}
