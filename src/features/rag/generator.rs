use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::RagError;
use crate::data::models::CardContent;

/// Fixed instruction sent with every generation call. The model must answer
/// with the JSON object shape and nothing else.
const SYSTEM_INSTRUCTIONS: &str = "You are an academic knowledge assistant that turns source text \
into flashcards for spaced repetition. Extract the most fundamental facts, definitions and \
concepts from the provided context. Each card carries one atomic piece of information: the front \
is a clear question, the back a concise answer in precise, objective language. Do not invent \
facts that are missing from the context and ignore page metadata such as edit dates, licensing \
or citations. Output strictly a JSON object of the form \
{\"cards\": [{\"front\": \"...\", \"back\": \"...\"}]} with no conversational filler.";

/// Generation collaborator: turns retrieved context into front/back pairs.
#[async_trait]
pub trait CardGenerator: Send + Sync {
    async fn complete(&self, context: &str, topic: &str) -> Result<Vec<CardContent>, RagError>;
}

/// Completion against an Ollama-compatible `/api/generate` endpoint with
/// JSON-constrained output.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(client: reqwest::Client, base_url: String, model: String) -> Self {
        Self {
            client,
            base_url,
            model,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct CardList {
    #[serde(default)]
    cards: Vec<CardContent>,
}

#[async_trait]
impl CardGenerator for OllamaGenerator {
    async fn complete(&self, context: &str, topic: &str) -> Result<Vec<CardContent>, RagError> {
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&json!({
                "model": self.model,
                "system": SYSTEM_INSTRUCTIONS,
                "prompt": build_prompt(context, topic),
                "format": "json",
                "stream": false,
                "options": { "temperature": 0.1 },
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = response.json().await.map_err(|e| {
            RagError::Generation(format!("Unreadable completion response: {e}"))
        })?;

        Ok(parse_cards(&body.response))
    }
}

fn build_prompt(context: &str, topic: &str) -> String {
    format!(
        "TASK:\n{topic}\n\nCONTEXT (SOURCE MATERIAL):\n{context}\n\n\
        Generate the flashcards from the context above."
    )
}

/// Malformed model output yields an empty card list rather than an error;
/// pairs with an empty side are dropped.
pub fn parse_cards(raw: &str) -> Vec<CardContent> {
    match serde_json::from_str::<CardList>(raw) {
        Ok(list) => list
            .cards
            .into_iter()
            .filter(|card| !card.front.trim().is_empty() && !card.back.trim().is_empty())
            .collect(),
        Err(e) => {
            log::warn!("Discarding malformed generation output: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_output() {
        let raw = r#"{"cards": [
            {"front": "When did the battle start?", "back": "21 February 1916"},
            {"front": "On which river lies Verdun?", "back": "The Meuse"}
        ]}"#;

        let cards = parse_cards(raw);

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].front, "When did the battle start?");
        assert_eq!(cards[1].back, "The Meuse");
    }

    #[test]
    fn malformed_output_yields_an_empty_list() {
        assert!(parse_cards("Here are your flashcards!").is_empty());
        assert!(parse_cards(r#"{"cards": "none"}"#).is_empty());
        assert!(parse_cards(r#"[{"front": "q", "back": "a"}]"#).is_empty());
        assert!(parse_cards("").is_empty());
    }

    #[test]
    fn missing_cards_key_yields_an_empty_list() {
        assert!(parse_cards(r#"{"flashcards": []}"#).is_empty());
    }

    #[test]
    fn blank_sides_are_dropped() {
        let raw = r#"{"cards": [
            {"front": "  ", "back": "answer"},
            {"front": "question", "back": "answer"}
        ]}"#;

        assert_eq!(parse_cards(raw).len(), 1);
    }

    #[test]
    fn prompt_carries_topic_and_context() {
        let prompt = build_prompt("some context", "Create 5 flashcards about Verdun");

        assert!(prompt.contains("some context"));
        assert!(prompt.contains("Create 5 flashcards about Verdun"));
    }
}
