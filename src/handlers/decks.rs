use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::{
    data::models::{
        Deck, DeckError, DeckStatus, DeckStatusResponse, Flashcard, GenerateError,
        GenerateRequest, GeneratedDeck, MessageResponse,
    },
    data::repositories::DeckRepository,
    features::rag::RagService,
    DbPool,
};

#[derive(Deserialize)]
pub struct ListParams {
    pub user_id: i32,
}

#[axum::debug_handler]
pub async fn generate_deck(
    State((pool, rag)): State<(DbPool, Arc<RagService>)>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GeneratedDeck>, GenerateError> {
    request
        .validate()
        .map_err(|e| GenerateError::Validation(e.to_string()))?;

    let mut conn = pool.get().map_err(|e| {
        log::error!("Failed to get DB connection: {e}");
        GenerateError::Pool(e.to_string())
    })?;

    let generated = rag
        .generate_deck(&mut conn, &request.url, request.user_id)
        .await?;

    Ok(Json(generated))
}

pub async fn save_deck(
    State((pool, _rag)): State<(DbPool, Arc<RagService>)>,
    Path(deck_id): Path<i32>,
) -> Result<Json<DeckStatusResponse>, DeckError> {
    set_deck_status(&pool, deck_id, DeckStatus::Active)
}

pub async fn discard_deck(
    State((pool, _rag)): State<(DbPool, Arc<RagService>)>,
    Path(deck_id): Path<i32>,
) -> Result<Json<DeckStatusResponse>, DeckError> {
    set_deck_status(&pool, deck_id, DeckStatus::Archived)
}

// save and discard apply unconditionally, whatever the current status
fn set_deck_status(
    pool: &DbPool,
    deck_id: i32,
    status: DeckStatus,
) -> Result<Json<DeckStatusResponse>, DeckError> {
    let mut conn = pool.get().map_err(|e| {
        log::error!("Failed to get DB connection: {e}");
        DeckError::Pool(e.to_string())
    })?;

    if !DeckRepository::set_status(&mut conn, deck_id, status)? {
        return Err(DeckError::NotFound);
    }

    Ok(Json(DeckStatusResponse {
        status: "success".to_string(),
        deck_status: status.as_str().to_string(),
    }))
}

pub async fn list_decks(
    State((pool, _rag)): State<(DbPool, Arc<RagService>)>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Deck>>, DeckError> {
    let mut conn = pool.get().map_err(|e| {
        log::error!("Failed to get DB connection: {e}");
        DeckError::Pool(e.to_string())
    })?;

    let decks = DeckRepository::list_active(&mut conn, params.user_id)?;
    Ok(Json(decks))
}

pub async fn get_deck_cards(
    State((pool, _rag)): State<(DbPool, Arc<RagService>)>,
    Path(deck_id): Path<i32>,
) -> Result<Json<Vec<Flashcard>>, DeckError> {
    let mut conn = pool.get().map_err(|e| {
        log::error!("Failed to get DB connection: {e}");
        DeckError::Pool(e.to_string())
    })?;

    DeckRepository::find(&mut conn, deck_id)?.ok_or(DeckError::NotFound)?;

    let cards = DeckRepository::cards(&mut conn, deck_id)?;
    Ok(Json(cards))
}

pub async fn delete_deck(
    State((pool, _rag)): State<(DbPool, Arc<RagService>)>,
    Path(deck_id): Path<i32>,
) -> Result<Json<MessageResponse>, DeckError> {
    let mut conn = pool.get().map_err(|e| {
        log::error!("Failed to get DB connection: {e}");
        DeckError::Pool(e.to_string())
    })?;

    DeckRepository::find(&mut conn, deck_id)?.ok_or(DeckError::NotFound)?;
    DeckRepository::delete_cascade(&mut conn, deck_id)?;

    log::info!("Deleted deck {deck_id} and all related data");
    Ok(Json(MessageResponse {
        message: format!("Deck {deck_id} and all related data deleted successfully"),
    }))
}

pub fn deck_router(pool: DbPool, rag: Arc<RagService>) -> Router {
    Router::new()
        .route("/", get(list_decks))
        .route("/generate", post(generate_deck))
        .route("/{deck_id}", delete(delete_deck))
        .route("/{deck_id}/save", post(save_deck))
        .route("/{deck_id}/discard", post(discard_deck))
        .route("/{deck_id}/cards", get(get_deck_cards))
        .with_state((pool, rag))
}
