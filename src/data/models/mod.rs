pub mod deck_models;
pub mod error_models;
pub mod srs_models;
pub mod user_models;

pub use deck_models::{
    CardContent, Deck, DeckStatus, DeckStatusResponse, Flashcard,
    GenerateRequest, GeneratedCard, GeneratedDeck, MessageResponse, NewDeck,
    NewFlashcard,
};
pub use error_models::{DeckError, GenerateError, ReviewError};
pub use srs_models::{NewReviewLog, ReviewLog, ReviewOutcome, ReviewSubmission};
pub use user_models::{NewUser, User};
