use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::schema::{decks, flashcards};

/// Lifecycle status of a deck. Stored as lowercase text.
///
/// A deck starts as a draft while generation runs, becomes active when the
/// user saves it, and is archived (kept but excluded from study) when
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckStatus {
    Draft,
    Active,
    Archived,
}

impl DeckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeckStatus::Draft => "draft",
            DeckStatus::Active => "active",
            DeckStatus::Archived => "archived",
        }
    }
}

#[derive(Debug, Queryable, Selectable, Serialize)]
#[diesel(table_name = decks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Deck {
    pub deck_id: i32,
    pub user_id: i32,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = decks)]
pub struct NewDeck<'a> {
    pub user_id: i32,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize)]
#[diesel(table_name = flashcards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Flashcard {
    pub flashcard_id: i32,
    pub deck_id: i32,
    pub front: String,
    pub back: String,
    pub easiness_factor: f64,
    pub interval: i32,
    pub repetitions: i32,
    pub next_review_date: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = flashcards)]
pub struct NewFlashcard<'a> {
    pub deck_id: i32,
    pub front: &'a str,
    pub back: &'a str,
    pub easiness_factor: f64,
    pub interval: i32,
    pub repetitions: i32,
    pub next_review_date: NaiveDateTime,
}

/// A generated front/back pair before persistence
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CardContent {
    pub front: String,
    pub back: String,
}

/// Request payload for deck generation
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(url(message = "Not a valid URL"))]
    pub url: String,
    pub user_id: i32,
}

/// Card subset returned right after generation
#[derive(Debug, Serialize)]
pub struct GeneratedCard {
    pub id: i32,
    pub front: String,
    pub back: String,
}

/// Response for a completed generation run
#[derive(Debug, Serialize)]
pub struct GeneratedDeck {
    pub id: i32,
    pub title: String,
    pub status: String,
    pub flashcards: Vec<GeneratedCard>,
}

/// Response for save/discard lifecycle transitions
#[derive(Serialize)]
pub struct DeckStatusResponse {
    pub status: String,
    pub deck_status: String,
}

/// Plain confirmation message
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}
