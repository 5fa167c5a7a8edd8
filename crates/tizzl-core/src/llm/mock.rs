//! Offline text generator with deterministic canned output

use super::prompts::{ID_PREFIX, PRODUCTS_MARKER, QUERY_MARKER};
use super::{ChatMessage, TextGenerator};
use crate::error::Result;
use async_trait::async_trait;

pub const MOCK_MODEL: &str = "mock";

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "for", "the", "to", "of", "with", "in", "on", "my", "me", "i", "what",
    "some", "need", "want", "looking", "something",
];

/// Generator used when no provider key is configured.
///
/// Keyword prompts get the query's content words back as a list; ranking
/// prompts get the listed ids back in their given order.
#[derive(Debug, Default, Clone)]
pub struct MockGenerator;

impl MockGenerator {
    pub fn new() -> Self {
        Self
    }

    fn respond(prompt: &str) -> String {
        if prompt.contains(PRODUCTS_MARKER) {
            let ids: Vec<&str> = prompt
                .lines()
                .filter_map(|line| line.strip_prefix(ID_PREFIX))
                .filter_map(|rest| rest.split(" |").next())
                .map(str::trim)
                .collect();
            return serde_json::json!({ "ranking": ids }).to_string();
        }

        if let Some(query) = prompt
            .lines()
            .find_map(|line| line.trim().strip_prefix(QUERY_MARKER))
        {
            let terms: Vec<String> = query
                .split(|c: char| !c.is_alphanumeric() && c != '-')
                .map(|w| w.to_lowercase())
                .filter(|w| w.len() > 2 && !STOP_WORDS.contains(&w.as_str()))
                .collect();
            return terms
                .iter()
                .map(|t| format!("- {}", t))
                .collect::<Vec<_>>()
                .join("\n");
        }

        "Here's some general style advice based on your query.".to_string()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let prompt = messages
            .iter()
            .filter(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Self::respond(&prompt))
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_keywords() {
        let out = MockGenerator
            .generate(vec![ChatMessage::user("QUERY: I need a navy blazer for work")])
            .await
            .unwrap();
        assert_eq!(out, "- navy\n- blazer\n- work");
    }

    #[tokio::test]
    async fn test_mock_ranking_echoes_ids() {
        let prompt = "QUERY: x\n\nPRODUCTS:\n- ID: B | b | tops | $1.00\n- ID: A | a | tops | $2.00";
        let out = MockGenerator
            .generate(vec![ChatMessage::user(prompt)])
            .await
            .unwrap();
        assert_eq!(out, r#"{"ranking":["B","A"]}"#);
    }
}
