use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;

use crate::data::models::{DeckStatus, Flashcard, NewReviewLog, ReviewLog};
use crate::schema::{decks, flashcards, review_logs};

pub struct ReviewRepository;

impl ReviewRepository {
    pub fn find_card(
        conn: &mut SqliteConnection,
        flashcard_id: i32,
    ) -> Result<Option<Flashcard>, diesel::result::Error> {
        flashcards::table
            .find(flashcard_id)
            .select(Flashcard::as_select())
            .first(conn)
            .optional()
    }

    /// Cards due for review across all of the user's active decks, soonest
    /// first. Draft and archived decks never feed the queue.
    pub fn due_cards(
        conn: &mut SqliteConnection,
        user_id: i32,
        now: NaiveDateTime,
    ) -> Result<Vec<Flashcard>, diesel::result::Error> {
        flashcards::table
            .inner_join(decks::table)
            .filter(decks::user_id.eq(user_id))
            .filter(decks::status.eq(DeckStatus::Active.as_str()))
            .filter(flashcards::next_review_date.le(now))
            .order((
                flashcards::next_review_date.asc(),
                flashcards::flashcard_id.asc(),
            ))
            .select(Flashcard::as_select())
            .load(conn)
    }

    /// Writes the computed scheduler state onto the card and appends the
    /// audit log row in one transaction. A failure of either write rolls
    /// both back. Returns the new next review date.
    pub fn apply_review(
        conn: &mut SqliteConnection,
        flashcard_id: i32,
        grade: i32,
        new_interval: i32,
        new_repetitions: i32,
        new_easiness_factor: f64,
        now: NaiveDateTime,
    ) -> Result<NaiveDateTime, diesel::result::Error> {
        let next_review = now + Duration::days(new_interval as i64);

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::update(flashcards::table.find(flashcard_id))
                .set((
                    flashcards::repetitions.eq(new_repetitions),
                    flashcards::interval.eq(new_interval),
                    flashcards::easiness_factor.eq(new_easiness_factor),
                    flashcards::next_review_date.eq(next_review),
                ))
                .execute(conn)?;

            diesel::insert_into(review_logs::table)
                .values(&NewReviewLog {
                    flashcard_id,
                    review_date: now,
                    grade,
                    resulting_interval: new_interval,
                    resulting_easiness_factor: new_easiness_factor,
                })
                .execute(conn)?;

            Ok(())
        })?;

        Ok(next_review)
    }

    /// Review history for a card, oldest first.
    pub fn logs_for_card(
        conn: &mut SqliteConnection,
        flashcard_id: i32,
    ) -> Result<Vec<ReviewLog>, diesel::result::Error> {
        review_logs::table
            .filter(review_logs::flashcard_id.eq(flashcard_id))
            .order(review_logs::log_id.asc())
            .select(ReviewLog::as_select())
            .load(conn)
    }
}
