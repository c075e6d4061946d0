pub mod chunker;
pub mod generator;
pub mod index;
pub mod loader;
pub mod service;

pub use generator::{CardGenerator, OllamaGenerator};
pub use index::{Embedder, InMemoryVectorIndex, OllamaEmbedder, VectorIndex};
pub use loader::{DocumentLoader, HttpPageLoader, LoadedDocument};
pub use service::{RagConfig, RagService};

use thiserror::Error;

/// Collaborator failure inside a generation job. Callers of the HTTP surface
/// never see these directly, the orchestrator folds them into one generic
/// failure after compensation.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Load error: {0}")]
    Load(String),
    #[error("Index error: {0}")]
    Index(String),
    #[error("Generation error: {0}")]
    Generation(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
