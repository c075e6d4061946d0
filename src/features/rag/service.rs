use std::time::Duration;

use diesel::SqliteConnection;
use thiserror::Error;

use super::generator::{CardGenerator, OllamaGenerator};
use super::index::{InMemoryVectorIndex, OllamaEmbedder, VectorIndex};
use super::loader::{self, DocumentLoader, HttpPageLoader};
use super::{chunker, RagError};
use crate::data::models::{Deck, GenerateError, GeneratedCard, GeneratedDeck};
use crate::data::repositories::DeckRepository;

/// Knobs for the generation pipeline, read from the environment once at
/// startup and carried by the injected service instance.
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub ollama_url: String,
    pub model: String,
    pub embedding_model: String,
    pub allowed_domains: Vec<String>,
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub request_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            embedding_model: "llama3.1".to_string(),
            allowed_domains: vec!["wikipedia.org".to_string()],
            top_k: 12,
            chunk_size: chunker::DEFAULT_CHUNK_SIZE,
            chunk_overlap: chunker::DEFAULT_CHUNK_OVERLAP,
            request_timeout_secs: 300,
        }
    }
}

impl RagConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            ollama_url: env_or("OLLAMA_URL", defaults.ollama_url),
            model: env_or("GENERATION_MODEL", defaults.model),
            embedding_model: env_or("EMBEDDING_MODEL", defaults.embedding_model),
            allowed_domains: std::env::var("ALLOWED_DOMAINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|domain| domain.trim().to_string())
                        .filter(|domain| !domain.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_domains),
            top_k: env_parse("RETRIEVAL_TOP_K", defaults.top_k),
            chunk_size: env_parse("CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_parse("CHUNK_OVERLAP", defaults.chunk_overlap),
            request_timeout_secs: env_parse("RAG_TIMEOUT_SECS", defaults.request_timeout_secs),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

// Pipeline-internal failure. Both arms trigger the compensating delete of
// the draft deck before the caller sees a generic failure.
#[derive(Error, Debug)]
enum PipelineError {
    #[error(transparent)]
    Rag(#[from] RagError),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Deck generation orchestrator. Owns the three collaborators and runs the
/// ingest -> index -> retrieve -> generate -> persist -> cleanup pipeline
/// for a single deck per call. Concurrent jobs are isolated purely by their
/// deck-keyed namespaces, no locking involved.
pub struct RagService {
    loader: Box<dyn DocumentLoader>,
    index: Box<dyn VectorIndex>,
    generator: Box<dyn CardGenerator>,
    config: RagConfig,
}

impl RagService {
    pub fn new(
        loader: Box<dyn DocumentLoader>,
        index: Box<dyn VectorIndex>,
        generator: Box<dyn CardGenerator>,
        config: RagConfig,
    ) -> Self {
        Self {
            loader,
            index,
            generator,
            config,
        }
    }

    /// Wires the Ollama-backed collaborators from configuration. All
    /// outbound calls share one client with a bounded timeout.
    pub fn from_config(config: RagConfig) -> Result<Self, RagError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let loader = HttpPageLoader::new(
            client.clone(),
            config.allowed_domains.clone(),
            config.chunk_size,
            config.chunk_overlap,
        );
        let embedder = OllamaEmbedder::new(
            client.clone(),
            config.ollama_url.clone(),
            config.embedding_model.clone(),
        );
        let generator =
            OllamaGenerator::new(client, config.ollama_url.clone(), config.model.clone());

        Ok(Self::new(
            Box::new(loader),
            Box::new(InMemoryVectorIndex::new(Box::new(embedder))),
            Box::new(generator),
            config,
        ))
    }

    /// Generates a draft deck of flashcards from the source URL.
    ///
    /// The draft row is created up front so its id can key the disposable
    /// retrieval namespace. Any pipeline failure afterwards deletes the
    /// draft again (cascading partially created cards), so no caller ever
    /// observes a partial deck. Each call allocates a fresh deck; retries
    /// create independent decks.
    pub async fn generate_deck(
        &self,
        conn: &mut SqliteConnection,
        url: &str,
        user_id: i32,
    ) -> Result<GeneratedDeck, GenerateError> {
        if !loader::url_is_allowed(url, &self.config.allowed_domains) {
            return Err(GenerateError::Validation(format!(
                "URL host is not allow-listed: {url}"
            )));
        }

        let deck = DeckRepository::create_draft(
            conn,
            user_id,
            &format!("Draft from {url}"),
            &format!("Generated from {url}"),
        )?;
        let namespace = format!("deck_{}", deck.deck_id);
        log::info!("Starting generation job for deck {} from {url}", deck.deck_id);

        match self.run_pipeline(conn, &deck, &namespace, url).await {
            Ok(generated) => {
                self.cleanup_namespace(&namespace).await;
                log::info!(
                    "Generated deck {} ('{}') with {} cards",
                    generated.id,
                    generated.title,
                    generated.flashcards.len()
                );
                Ok(generated)
            }
            Err(e) => {
                log::error!("Generation pipeline failed for deck {}: {e}", deck.deck_id);
                self.cleanup_namespace(&namespace).await;
                DeckRepository::delete_cascade(conn, deck.deck_id)?;
                Err(GenerateError::Pipeline)
            }
        }
    }

    async fn run_pipeline(
        &self,
        conn: &mut SqliteConnection,
        deck: &Deck,
        namespace: &str,
        url: &str,
    ) -> Result<GeneratedDeck, PipelineError> {
        let document = self.loader.fetch(url).await?;
        log::info!(
            "Loaded '{}' as {} chunks",
            document.title,
            document.chunks.len()
        );

        let indexed = self.index.index(namespace, &document.chunks).await?;
        log::info!("Indexed {indexed} chunks into namespace {namespace}");

        let query = format!("key facts, definitions, concepts about {}", document.title);
        let context = self
            .index
            .retrieve(namespace, &query, self.config.top_k)
            .await?
            .join("\n\n");

        let topic = format!("Create 5 flashcards about {}", document.title);
        let cards = self.generator.complete(&context, &topic).await?;
        if cards.is_empty() {
            // Empty or malformed model output is not a failure: the caller
            // gets a zero-card draft deck and can discard it
            log::warn!("Generator returned no cards for deck {}", deck.deck_id);
        }

        DeckRepository::set_title(conn, deck.deck_id, &document.title)?;
        let stored = DeckRepository::insert_cards(conn, deck.deck_id, &cards)?;

        Ok(GeneratedDeck {
            id: deck.deck_id,
            title: document.title,
            status: deck.status.clone(),
            flashcards: stored
                .into_iter()
                .map(|card| GeneratedCard {
                    id: card.flashcard_id,
                    front: card.front,
                    back: card.back,
                })
                .collect(),
        })
    }

    // Namespace deletion is best-effort on both pipeline outcomes; a leaked
    // namespace is logged, never surfaced.
    async fn cleanup_namespace(&self, namespace: &str) {
        if let Err(e) = self.index.delete(namespace).await {
            log::warn!("Failed to delete namespace {namespace}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::data::models::CardContent;
    use crate::data::repositories::deck::INITIAL_EASINESS_FACTOR;
    use crate::data::test_support::{seed_user, setup_conn};
    use crate::features::rag::LoadedDocument;
    use crate::schema::{decks, flashcards};
    use diesel::prelude::*;

    struct StubLoader;

    #[async_trait]
    impl DocumentLoader for StubLoader {
        async fn fetch(&self, _url: &str) -> Result<LoadedDocument, RagError> {
            Ok(LoadedDocument {
                title: "Battle of Verdun - Wikipedia".to_string(),
                chunks: vec!["chunk one".to_string(), "chunk two".to_string()],
            })
        }
    }

    struct FailingLoader;

    #[async_trait]
    impl DocumentLoader for FailingLoader {
        async fn fetch(&self, url: &str) -> Result<LoadedDocument, RagError> {
            Err(RagError::Load(format!("Could not load the URL: {url}")))
        }
    }

    /// Records namespace operations through shared handles so tests can
    /// inspect them after the service took ownership of the index.
    #[derive(Default, Clone)]
    struct RecordingIndex {
        indexed: Arc<Mutex<Vec<String>>>,
        deleted: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingIndex {
        fn with_handles() -> (Self, Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>) {
            let index = Self::default();
            let (indexed, deleted) = (index.indexed.clone(), index.deleted.clone());
            (index, indexed, deleted)
        }
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn index(&self, namespace: &str, chunks: &[String]) -> Result<usize, RagError> {
            self.indexed.lock().unwrap().push(namespace.to_string());
            Ok(chunks.len())
        }

        async fn retrieve(
            &self,
            _namespace: &str,
            _query: &str,
            k: usize,
        ) -> Result<Vec<String>, RagError> {
            Ok(vec!["retrieved context".to_string(); k.min(2)])
        }

        async fn delete(&self, namespace: &str) -> Result<(), RagError> {
            self.deleted.lock().unwrap().push(namespace.to_string());
            Ok(())
        }
    }

    struct StubGenerator {
        cards: Vec<CardContent>,
    }

    #[async_trait]
    impl CardGenerator for StubGenerator {
        async fn complete(
            &self,
            _context: &str,
            _topic: &str,
        ) -> Result<Vec<CardContent>, RagError> {
            Ok(self.cards.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl CardGenerator for FailingGenerator {
        async fn complete(
            &self,
            _context: &str,
            _topic: &str,
        ) -> Result<Vec<CardContent>, RagError> {
            Err(RagError::Generation("model unavailable".to_string()))
        }
    }

    fn test_config() -> RagConfig {
        RagConfig {
            allowed_domains: vec!["example.com".to_string()],
            ..RagConfig::default()
        }
    }

    fn two_cards() -> Vec<CardContent> {
        vec![
            CardContent {
                front: "When did the battle start?".to_string(),
                back: "21 February 1916".to_string(),
            },
            CardContent {
                front: "On which river lies Verdun?".to_string(),
                back: "The Meuse".to_string(),
            },
        ]
    }

    fn deck_count(conn: &mut SqliteConnection) -> i64 {
        decks::table.count().get_result(conn).unwrap()
    }

    fn card_count(conn: &mut SqliteConnection) -> i64 {
        flashcards::table.count().get_result(conn).unwrap()
    }

    #[tokio::test]
    async fn successful_run_persists_a_draft_deck_with_default_card_state() {
        let mut conn = setup_conn();
        let user_id = seed_user(&mut conn, "alice");
        let service = RagService::new(
            Box::new(StubLoader),
            Box::new(RecordingIndex::default()),
            Box::new(StubGenerator { cards: two_cards() }),
            test_config(),
        );

        let generated = service
            .generate_deck(&mut conn, "https://example.com/article", user_id)
            .await
            .unwrap();

        assert_eq!(generated.status, "draft");
        assert_eq!(generated.title, "Battle of Verdun - Wikipedia");
        assert_eq!(generated.flashcards.len(), 2);

        let deck = DeckRepository::find(&mut conn, generated.id).unwrap().unwrap();
        assert_eq!(deck.title, "Battle of Verdun - Wikipedia");
        assert_eq!(deck.status, "draft");

        let cards = DeckRepository::cards(&mut conn, generated.id).unwrap();
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| {
            c.easiness_factor == INITIAL_EASINESS_FACTOR && c.interval == 0 && c.repetitions == 0
        }));
    }

    #[tokio::test]
    async fn namespace_is_keyed_by_deck_id_and_deleted_after_success() {
        let mut conn = setup_conn();
        let user_id = seed_user(&mut conn, "alice");
        let (index, indexed, deleted) = RecordingIndex::with_handles();
        let service = RagService::new(
            Box::new(StubLoader),
            Box::new(index),
            Box::new(StubGenerator { cards: two_cards() }),
            test_config(),
        );

        let generated = service
            .generate_deck(&mut conn, "https://example.com/article", user_id)
            .await
            .unwrap();

        let expected = format!("deck_{}", generated.id);
        assert_eq!(*indexed.lock().unwrap(), vec![expected.clone()]);
        assert_eq!(*deleted.lock().unwrap(), vec![expected]);
    }

    #[tokio::test]
    async fn disallowed_url_is_rejected_before_any_state_exists() {
        let mut conn = setup_conn();
        let user_id = seed_user(&mut conn, "alice");
        let service = RagService::new(
            Box::new(StubLoader),
            Box::new(RecordingIndex::default()),
            Box::new(StubGenerator { cards: two_cards() }),
            test_config(),
        );

        let result = service
            .generate_deck(&mut conn, "https://evil.com/article", user_id)
            .await;

        assert!(matches!(result, Err(GenerateError::Validation(_))));
        assert_eq!(deck_count(&mut conn), 0);
    }

    #[tokio::test]
    async fn loader_failure_rolls_back_the_draft_deck() {
        let mut conn = setup_conn();
        let user_id = seed_user(&mut conn, "alice");
        let service = RagService::new(
            Box::new(FailingLoader),
            Box::new(RecordingIndex::default()),
            Box::new(StubGenerator { cards: two_cards() }),
            test_config(),
        );

        let result = service
            .generate_deck(&mut conn, "https://example.com/article", user_id)
            .await;

        assert!(matches!(result, Err(GenerateError::Pipeline)));
        assert_eq!(deck_count(&mut conn), 0);
        assert_eq!(card_count(&mut conn), 0);
    }

    #[tokio::test]
    async fn generator_failure_rolls_back_and_cleans_the_namespace() {
        let mut conn = setup_conn();
        let user_id = seed_user(&mut conn, "alice");
        let (index, _, deleted) = RecordingIndex::with_handles();
        let service = RagService::new(
            Box::new(StubLoader),
            Box::new(index),
            Box::new(FailingGenerator),
            test_config(),
        );

        let result = service
            .generate_deck(&mut conn, "https://example.com/article", user_id)
            .await;

        assert!(matches!(result, Err(GenerateError::Pipeline)));
        assert_eq!(deck_count(&mut conn), 0);
        assert_eq!(card_count(&mut conn), 0);
        assert_eq!(deleted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_generation_output_yields_a_zero_card_draft() {
        let mut conn = setup_conn();
        let user_id = seed_user(&mut conn, "alice");
        let service = RagService::new(
            Box::new(StubLoader),
            Box::new(RecordingIndex::default()),
            Box::new(StubGenerator { cards: Vec::new() }),
            test_config(),
        );

        let generated = service
            .generate_deck(&mut conn, "https://example.com/article", user_id)
            .await
            .unwrap();

        assert!(generated.flashcards.is_empty());
        assert_eq!(deck_count(&mut conn), 1);
        assert_eq!(card_count(&mut conn), 0);
    }

    #[tokio::test]
    async fn repeated_calls_allocate_independent_decks() {
        let mut conn = setup_conn();
        let user_id = seed_user(&mut conn, "alice");
        let service = RagService::new(
            Box::new(StubLoader),
            Box::new(RecordingIndex::default()),
            Box::new(StubGenerator { cards: two_cards() }),
            test_config(),
        );

        let first = service
            .generate_deck(&mut conn, "https://example.com/article", user_id)
            .await
            .unwrap();
        let second = service
            .generate_deck(&mut conn, "https://example.com/article", user_id)
            .await
            .unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(deck_count(&mut conn), 2);
        assert_eq!(card_count(&mut conn), 4);
    }
}
