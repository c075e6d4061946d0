use axum::{routing::get, Json, Router};
use diesel::{
    r2d2::{ConnectionManager, Pool},
    SqliteConnection,
};
use std::sync::Arc;
use tokio::net::TcpListener;

mod data;
mod features;
mod handlers;
mod schema;

use features::rag::{RagConfig, RagService};
use features::srs::Sm2Algorithm;
use handlers::study::SharedScheduler;

type DbPool = Pool<ConnectionManager<SqliteConnection>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Database configuration
    dotenv::dotenv().ok();
    env_logger::init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "wikicard.db".into());

    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder().build(manager)?;

    // Generation pipeline, wired once at startup and shared across jobs
    let rag = Arc::new(RagService::from_config(RagConfig::from_env())?);
    let scheduler: SharedScheduler = Arc::new(Sm2Algorithm);

    // Main application router
    let app = Router::new()
        .route("/", get(root))
        .nest("/decks", handlers::decks::deck_router(pool.clone(), rag))
        .nest("/study", handlers::study::study_router(pool, scheduler));

    // Start server
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".into());
    let listener = TcpListener::bind(&bind_addr).await?;

    log::info!("Server running on http://{bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the WikiCard AI - RAG-Powered Flashcard Generation App API"
    }))
}
