use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, instrument, warn};

use crate::{
    auth::repo_types::UserId,
    cards::{
        dto::CardDraft,
        repo::CardStore,
        repo_types::{Card, CardId, CardType},
    },
    error::{AppError, AppResult},
    state::AppState,
};

/// Ownership-checked access to cards. Every method takes the id of an
/// already authenticated caller; the store underneath is never consulted
/// for another user's card without this check.
#[derive(Clone)]
pub struct CardService {
    store: Arc<dyn CardStore>,
}

impl FromRef<AppState> for CardService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.cards.clone())
    }
}

impl CardService {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn list_for(
        &self,
        caller: UserId,
        card_type: Option<CardType>,
    ) -> AppResult<Vec<Card>> {
        Ok(self.store.list_by_owner(caller, card_type).await?)
    }

    /// The owner is always the caller, whatever the payload claimed.
    #[instrument(skip(self, draft))]
    pub async fn create_for(&self, caller: UserId, draft: CardDraft) -> AppResult<Card> {
        let new_card = draft.into_new_card().map_err(AppError::Validation)?;
        let card = self.store.create(caller, &new_card).await?;
        info!(card_id = card.id, "card created");
        Ok(card)
    }

    async fn load_owned(&self, caller: UserId, id: CardId) -> AppResult<Card> {
        let card = self
            .store
            .get(id)
            .await?
            .ok_or(AppError::NotFound("Card"))?;
        if card.owner_id != caller {
            warn!(card_id = id, owner_id = card.owner_id, "card access denied");
            return Err(AppError::Forbidden);
        }
        Ok(card)
    }

    #[instrument(skip(self))]
    pub async fn get_for(&self, caller: UserId, id: CardId) -> AppResult<Card> {
        self.load_owned(caller, id).await
    }

    /// Ownership is settled before the payload is validated.
    #[instrument(skip(self, draft))]
    pub async fn update_for(&self, caller: UserId, id: CardId, draft: CardDraft) -> AppResult<Card> {
        self.load_owned(caller, id).await?;
        let patch = draft.into_patch().map_err(AppError::Validation)?;
        let card = self
            .store
            .update(id, &patch)
            .await?
            .ok_or(AppError::NotFound("Card"))?;
        info!(card_id = id, "card updated");
        Ok(card)
    }

    #[instrument(skip(self))]
    pub async fn delete_for(&self, caller: UserId, id: CardId) -> AppResult<()> {
        self.load_owned(caller, id).await?;
        if !self.store.delete(id).await? {
            // removed by a concurrent request after the ownership check
            warn!(card_id = id, "card vanished before delete");
            return Err(AppError::NotFound("Card"));
        }
        info!(card_id = id, "card deleted");
        Ok(())
    }
}
