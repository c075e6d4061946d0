use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::RagError;

/// Embedding provider seam, one vector per text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError>;
}

/// Embeddings from an Ollama-compatible `/api/embeddings` endpoint.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(client: reqwest::Client, base_url: String, model: String) -> Self {
        Self {
            client,
            base_url,
            model,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await?
            .error_for_status()?;

        let body: EmbeddingResponse = response.json().await?;
        if body.embedding.is_empty() {
            return Err(RagError::Index("Provider returned an empty embedding".to_string()));
        }

        Ok(body.embedding)
    }
}

/// Indexing collaborator: a disposable retrieval store keyed by namespace.
/// Every generation job owns exactly one namespace and deletes it when done,
/// so concurrent jobs never see each other's chunks.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embeds the chunks into the namespace. Returns how many were indexed.
    async fn index(&self, namespace: &str, chunks: &[String]) -> Result<usize, RagError>;

    /// The `k` chunks of the namespace most similar to the query.
    async fn retrieve(&self, namespace: &str, query: &str, k: usize)
        -> Result<Vec<String>, RagError>;

    /// Drops the namespace and everything in it.
    async fn delete(&self, namespace: &str) -> Result<(), RagError>;
}

struct IndexedChunk {
    content: String,
    embedding: Vec<f32>,
}

/// Brute-force cosine similarity store. Namespaces live only for the span of
/// one generation job, so they are held in process memory.
pub struct InMemoryVectorIndex {
    embedder: Box<dyn Embedder>,
    namespaces: Mutex<HashMap<String, Vec<IndexedChunk>>>,
}

impl InMemoryVectorIndex {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self {
            embedder,
            namespaces: Mutex::new(HashMap::new()),
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<IndexedChunk>>>, RagError> {
        self.namespaces
            .lock()
            .map_err(|_| RagError::Index("Namespace store lock poisoned".to_string()))
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn index(&self, namespace: &str, chunks: &[String]) -> Result<usize, RagError> {
        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let embedding = self.embedder.embed(chunk).await?;
            entries.push(IndexedChunk {
                content: chunk.clone(),
                embedding,
            });
        }

        let count = entries.len();
        self.store()?.insert(namespace.to_string(), entries);
        Ok(count)
    }

    async fn retrieve(
        &self,
        namespace: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<String>, RagError> {
        let query_embedding = self.embedder.embed(query).await?;

        let store = self.store()?;
        let entries = store
            .get(namespace)
            .ok_or_else(|| RagError::Index(format!("Unknown namespace: {namespace}")))?;

        let mut scored: Vec<(f32, &IndexedChunk)> = entries
            .iter()
            .map(|chunk| (cosine_similarity(&query_embedding, &chunk.embedding), chunk))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, chunk)| chunk.content.clone())
            .collect())
    }

    async fn delete(&self, namespace: &str) -> Result<(), RagError> {
        self.store()?.remove(namespace);
        Ok(())
    }
}

/// Cosine similarity between two vectors, 0.0 for mismatched or empty input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts a fixed vocabulary so similarity is driven by shared words.
    struct WordCountEmbedder;

    #[async_trait]
    impl Embedder for WordCountEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
            let vocabulary = ["verdun", "battle", "river", "treaty"];
            Ok(vocabulary
                .iter()
                .map(|word| {
                    text.to_lowercase().matches(word).count() as f32
                })
                .collect())
        }
    }

    fn chunks(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn cosine_similarity_basics() {
        let a = [1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &[1.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&a, &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert!((cosine_similarity(&a, &[-1.0, 0.0, 0.0]) + 1.0).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[tokio::test]
    async fn retrieve_ranks_by_similarity_and_honors_k() {
        let index = InMemoryVectorIndex::new(Box::new(WordCountEmbedder));
        index
            .index(
                "deck_1",
                &chunks(&[
                    "The treaty was signed at the river.",
                    "The battle of Verdun was a battle on the Western Front.",
                    "Verdun lies on the Meuse river.",
                ]),
            )
            .await
            .unwrap();

        let results = index
            .retrieve("deck_1", "battle verdun battle", 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0],
            "The battle of Verdun was a battle on the Western Front."
        );
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let index = InMemoryVectorIndex::new(Box::new(WordCountEmbedder));
        index
            .index("deck_1", &chunks(&["verdun battle"]))
            .await
            .unwrap();
        index
            .index("deck_2", &chunks(&["treaty river"]))
            .await
            .unwrap();

        let results = index.retrieve("deck_2", "verdun", 10).await.unwrap();

        assert_eq!(results, vec!["treaty river".to_string()]);
    }

    #[tokio::test]
    async fn delete_drops_the_namespace() {
        let index = InMemoryVectorIndex::new(Box::new(WordCountEmbedder));
        index
            .index("deck_1", &chunks(&["verdun battle"]))
            .await
            .unwrap();

        index.delete("deck_1").await.unwrap();

        assert!(index.retrieve("deck_1", "verdun", 1).await.is_err());
        // Deleting twice is harmless
        index.delete("deck_1").await.unwrap();
    }
}
