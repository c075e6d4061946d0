use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::Integer;

use crate::data::models::{NewUser, User};
use crate::schema::users;

const TEST_SCHEMA: &str = r#"
CREATE TABLE users (
    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    email TEXT NOT NULL
);

CREATE TABLE decks (
    deck_id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users (user_id),
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'draft',
    created_at TIMESTAMP NOT NULL
);

CREATE TABLE flashcards (
    flashcard_id INTEGER PRIMARY KEY AUTOINCREMENT,
    deck_id INTEGER NOT NULL REFERENCES decks (deck_id),
    front TEXT NOT NULL,
    back TEXT NOT NULL,
    easiness_factor DOUBLE NOT NULL DEFAULT 2.5,
    interval INTEGER NOT NULL DEFAULT 0,
    repetitions INTEGER NOT NULL DEFAULT 0,
    next_review_date TIMESTAMP NOT NULL
);

CREATE TABLE review_logs (
    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
    flashcard_id INTEGER NOT NULL REFERENCES flashcards (flashcard_id),
    review_date TIMESTAMP NOT NULL,
    grade INTEGER NOT NULL,
    resulting_interval INTEGER NOT NULL,
    resulting_easiness_factor DOUBLE NOT NULL
);
"#;

pub fn setup_conn() -> SqliteConnection {
    let mut conn =
        SqliteConnection::establish(":memory:").expect("Failed to open in-memory database");
    conn.batch_execute(TEST_SCHEMA).expect("Failed to create tables");
    conn
}

pub fn seed_user(conn: &mut SqliteConnection, username: &str) -> i32 {
    diesel::insert_into(users::table)
        .values(&NewUser {
            username,
            email: &format!("{username}@example.com"),
        })
        .execute(conn)
        .expect("Failed to insert user");

    let user_id = diesel::select(diesel::dsl::sql::<Integer>("last_insert_rowid()"))
        .get_result::<i32>(conn)
        .expect("Failed to read user id");

    let user: User = users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
        .expect("Failed to load user");
    user.user_id
}
