use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::{
    data::models::{Flashcard, ReviewError, ReviewOutcome, ReviewSubmission},
    data::repositories::ReviewRepository,
    features::srs::SpacedRepetitionAlgo,
    DbPool,
};

pub type SharedScheduler = Arc<dyn SpacedRepetitionAlgo + Send + Sync>;

#[derive(Deserialize)]
pub struct DueParams {
    pub user_id: i32,
}

/// All cards due for review across the user's active decks.
pub async fn get_due_cards(
    State((pool, _scheduler)): State<(DbPool, SharedScheduler)>,
    Query(params): Query<DueParams>,
) -> Result<Json<Vec<Flashcard>>, ReviewError> {
    let mut conn = pool.get().map_err(|e| {
        log::error!("Failed to get DB connection: {e}");
        ReviewError::Pool(e.to_string())
    })?;

    let due = ReviewRepository::due_cards(&mut conn, params.user_id, Utc::now().naive_utc())?;
    Ok(Json(due))
}

/// Applies a review grade: recomputes the schedule and commits the card
/// update together with its audit log row.
#[axum::debug_handler]
pub async fn review_card(
    State((pool, scheduler)): State<(DbPool, SharedScheduler)>,
    Json(submission): Json<ReviewSubmission>,
) -> Result<Json<ReviewOutcome>, ReviewError> {
    submission.validate().map_err(|_| ReviewError::InvalidGrade)?;

    let mut conn = pool.get().map_err(|e| {
        log::error!("Failed to get DB connection: {e}");
        ReviewError::Pool(e.to_string())
    })?;

    let card = ReviewRepository::find_card(&mut conn, submission.flashcard_id)?
        .ok_or(ReviewError::NotFound)?;

    let (new_interval, new_repetitions, new_ef) = scheduler.calculate(
        submission.grade,
        card.repetitions,
        card.interval,
        card.easiness_factor,
    );

    let next_review = ReviewRepository::apply_review(
        &mut conn,
        card.flashcard_id,
        submission.grade,
        new_interval,
        new_repetitions,
        new_ef,
        Utc::now().naive_utc(),
    )?;

    Ok(Json(ReviewOutcome {
        status: "success".to_string(),
        next_review,
    }))
}

pub fn study_router(pool: DbPool, scheduler: SharedScheduler) -> Router {
    Router::new()
        .route("/due", get(get_due_cards))
        .route("/review", post(review_card))
        .with_state((pool, scheduler))
}
