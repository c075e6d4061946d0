use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::review_logs;

/// One row of the append-only review audit trail. The resulting_* columns
/// snapshot the card's scheduling state after the review was applied.
#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = review_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReviewLog {
    pub log_id: i32,
    pub flashcard_id: i32,
    pub review_date: NaiveDateTime,
    pub grade: i32,
    pub resulting_interval: i32,
    pub resulting_easiness_factor: f64,
}

#[derive(Insertable)]
#[diesel(table_name = review_logs)]
pub struct NewReviewLog {
    pub flashcard_id: i32,
    pub review_date: NaiveDateTime,
    pub grade: i32,
    pub resulting_interval: i32,
    pub resulting_easiness_factor: f64,
}

/// Request payload for submitting a review grade
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewSubmission {
    pub flashcard_id: i32,
    #[validate(range(min = 0, max = 5, message = "Grade must be between 0 and 5"))]
    pub grade: i32,
}

/// Response after a review was applied
#[derive(Serialize)]
pub struct ReviewOutcome {
    pub status: String,
    pub next_review: NaiveDateTime,
}
