use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use diesel::result::Error as DieselError;
use serde_json::json;
use thiserror::Error;

// Errors for the deck generation endpoint
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("{0}")]
    Validation(String),
    #[error("Deck generation failed")]
    Pipeline,
    #[error("Database error")]
    Database(#[from] DieselError),
    #[error("Connection pool error: {0}")]
    Pool(String),
}

// Errors for deck lifecycle endpoints
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Deck not found")]
    NotFound,
    #[error("Database error")]
    Database(#[from] DieselError),
    #[error("Connection pool error: {0}")]
    Pool(String),
}

// Errors for the study endpoints
#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Card not found")]
    NotFound,
    #[error("Grade must be between 0 and 5")]
    InvalidGrade,
    #[error("Database error")]
    Database(#[from] DieselError),
    #[error("Connection pool error: {0}")]
    Pool(String),
}

fn error_body(status: StatusCode, message: String) -> Response {
    let body = json!({
        "error": message,
        "status": status.as_u16()
    });

    (status, axum::Json(body)).into_response()
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        let status = match self {
            GenerateError::Validation(_) => StatusCode::BAD_REQUEST,
            GenerateError::Pipeline
            | GenerateError::Database(_)
            | GenerateError::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Pipeline detail stays in the log; the caller gets one generic line
        error_body(status, self.to_string())
    }
}

impl IntoResponse for DeckError {
    fn into_response(self) -> Response {
        let status = match self {
            DeckError::NotFound => StatusCode::NOT_FOUND,
            DeckError::Database(_) | DeckError::Pool(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        error_body(status, self.to_string())
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        let status = match self {
            ReviewError::NotFound => StatusCode::NOT_FOUND,
            ReviewError::InvalidGrade => StatusCode::BAD_REQUEST,
            ReviewError::Database(_) | ReviewError::Pool(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        error_body(status, self.to_string())
    }
}
