use axum::{
    extract::{FromRef, Path, Query, State},
    http::{header, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    cards::{
        dto::{CardDraft, Catalog, ListQuery},
        repo_types::{Card, CardId},
        services::CardService,
    },
    error::{ApiJson, AppError, AppResult},
    state::AppState,
};

pub fn card_routes() -> Router<AppState> {
    Router::new()
        .route("/cards", get(list_cards).post(create_card))
        .route(
            "/cards/:id",
            get(get_card)
                .put(update_card)
                .patch(update_card)
                .delete(delete_card),
        )
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new().route("/catalog", get(catalog))
}

/// A non-numeric id cannot name an existing card.
fn card_id(raw: &str) -> AppResult<CardId> {
    raw.parse().map_err(|_| AppError::NotFound("Card"))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn list_cards(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Vec<Card>>> {
    let filter = q.type_filter().map_err(AppError::Validation)?;
    let cards = CardService::from_ref(&state).list_for(user.id, filter).await?;
    Ok(Json(cards))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn create_card(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(draft): ApiJson<CardDraft>,
) -> AppResult<(StatusCode, [(header::HeaderName, String); 1], Json<Card>)> {
    let card = CardService::from_ref(&state).create_for(user.id, draft).await?;
    let location = format!("/api/cards/{}", card.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(card)))
}

#[instrument(skip_all, fields(user_id = user.id, card_id = %id))]
pub async fn get_card(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Card>> {
    let card = CardService::from_ref(&state)
        .get_for(user.id, card_id(&id)?)
        .await?;
    Ok(Json(card))
}

#[instrument(skip_all, fields(user_id = user.id, card_id = %id))]
pub async fn update_card(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<CardDraft>,
) -> AppResult<Json<Card>> {
    let card = CardService::from_ref(&state)
        .update_for(user.id, card_id(&id)?, draft)
        .await?;
    Ok(Json(card))
}

#[instrument(skip_all, fields(user_id = user.id, card_id = %id))]
pub async fn delete_card(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    CardService::from_ref(&state)
        .delete_for(user.id, card_id(&id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn catalog() -> Json<Catalog> {
    Json(Catalog::default())
}
