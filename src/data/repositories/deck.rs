use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::Integer;

use crate::data::models::{CardContent, Deck, DeckStatus, Flashcard, NewDeck, NewFlashcard};
use crate::schema::{decks, flashcards, review_logs};

/// Default scheduler state assigned to freshly generated cards.
pub const INITIAL_EASINESS_FACTOR: f64 = 2.5;

pub struct DeckRepository;

impl DeckRepository {
    /// Creates a deck in draft status and returns the stored row. The id is
    /// needed before any content work starts, it keys the job's retrieval
    /// namespace.
    pub fn create_draft(
        conn: &mut SqliteConnection,
        user_id: i32,
        title: &str,
        description: &str,
    ) -> Result<Deck, diesel::result::Error> {
        diesel::insert_into(decks::table)
            .values(&NewDeck {
                user_id,
                title,
                description: Some(description),
                status: DeckStatus::Draft.as_str(),
                created_at: Utc::now().naive_utc(),
            })
            .execute(conn)?;

        let deck_id = diesel::select(diesel::dsl::sql::<Integer>("last_insert_rowid()"))
            .get_result::<i32>(conn)?;

        decks::table
            .find(deck_id)
            .select(Deck::as_select())
            .first(conn)
    }

    pub fn find(
        conn: &mut SqliteConnection,
        deck_id: i32,
    ) -> Result<Option<Deck>, diesel::result::Error> {
        decks::table
            .find(deck_id)
            .select(Deck::as_select())
            .first(conn)
            .optional()
    }

    /// Overwrites the deck status unconditionally. Returns false when no
    /// such deck exists.
    pub fn set_status(
        conn: &mut SqliteConnection,
        deck_id: i32,
        status: DeckStatus,
    ) -> Result<bool, diesel::result::Error> {
        let updated = diesel::update(decks::table.find(deck_id))
            .set(decks::status.eq(status.as_str()))
            .execute(conn)?;

        Ok(updated > 0)
    }

    pub fn set_title(
        conn: &mut SqliteConnection,
        deck_id: i32,
        title: &str,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(decks::table.find(deck_id))
            .set(decks::title.eq(title))
            .execute(conn)?;

        Ok(())
    }

    /// Active decks owned by the user, oldest first. Draft and archived
    /// decks never show up here.
    pub fn list_active(
        conn: &mut SqliteConnection,
        user_id: i32,
    ) -> Result<Vec<Deck>, diesel::result::Error> {
        decks::table
            .filter(decks::user_id.eq(user_id))
            .filter(decks::status.eq(DeckStatus::Active.as_str()))
            .order((decks::created_at.asc(), decks::deck_id.asc()))
            .select(Deck::as_select())
            .load(conn)
    }

    /// Hard-deletes a deck together with its flashcards and their review
    /// logs in one transaction.
    pub fn delete_cascade(
        conn: &mut SqliteConnection,
        deck_id: i32,
    ) -> Result<(), diesel::result::Error> {
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let card_ids = flashcards::table
                .filter(flashcards::deck_id.eq(deck_id))
                .select(flashcards::flashcard_id);

            diesel::delete(review_logs::table.filter(review_logs::flashcard_id.eq_any(card_ids)))
                .execute(conn)?;
            diesel::delete(flashcards::table.filter(flashcards::deck_id.eq(deck_id)))
                .execute(conn)?;
            diesel::delete(decks::table.find(deck_id)).execute(conn)?;

            Ok(())
        })
    }

    /// Persists one flashcard per generated pair with the default scheduler
    /// state and returns the stored rows.
    pub fn insert_cards(
        conn: &mut SqliteConnection,
        deck_id: i32,
        cards: &[CardContent],
    ) -> Result<Vec<Flashcard>, diesel::result::Error> {
        let now = Utc::now().naive_utc();

        for card in cards {
            diesel::insert_into(flashcards::table)
                .values(&NewFlashcard {
                    deck_id,
                    front: &card.front,
                    back: &card.back,
                    easiness_factor: INITIAL_EASINESS_FACTOR,
                    interval: 0,
                    repetitions: 0,
                    next_review_date: now,
                })
                .execute(conn)?;
        }

        Self::cards(conn, deck_id)
    }

    pub fn cards(
        conn: &mut SqliteConnection,
        deck_id: i32,
    ) -> Result<Vec<Flashcard>, diesel::result::Error> {
        flashcards::table
            .filter(flashcards::deck_id.eq(deck_id))
            .order(flashcards::flashcard_id.asc())
            .select(Flashcard::as_select())
            .load(conn)
    }
}
