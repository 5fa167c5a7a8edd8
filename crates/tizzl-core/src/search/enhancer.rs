//! Query enhancement via the text generator

use crate::llm::prompts::{build_enhancement_prompt, ENHANCEMENT_SYSTEM_PROMPT};
use crate::llm::{generate_with_timeout, ChatMessage, TextGenerator};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Maximum keywords appended to the search string
pub const MAX_KEYWORDS: usize = 10;

/// Result of enhancing one raw query
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancedQuery {
    /// The untouched user query, used for reranking and display
    pub original: String,
    /// Original query plus extracted keywords, used only for retrieval
    pub search_text: String,
    pub keywords: Vec<String>,
    /// True when the generator was unavailable or unusable
    pub degraded: bool,
}

impl EnhancedQuery {
    /// Pass-through result used on fallback
    pub fn unchanged(raw_query: &str) -> Self {
        Self {
            original: raw_query.to_string(),
            search_text: raw_query.to_string(),
            keywords: Vec::new(),
            degraded: true,
        }
    }
}

/// Expands a free-text request into a keyword-enriched search string
pub struct QueryEnhancer {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
    attempts: u32,
}

impl QueryEnhancer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration, attempts: u32) -> Self {
        Self {
            generator,
            timeout,
            attempts,
        }
    }

    /// Enhance the query; never fails, falls back to the raw query
    pub async fn enhance(&self, raw_query: &str) -> EnhancedQuery {
        let Some(ref generator) = self.generator else {
            tracing::debug!("No text generator configured, skipping query enhancement");
            return EnhancedQuery::unchanged(raw_query);
        };

        let messages = vec![
            ChatMessage::system(ENHANCEMENT_SYSTEM_PROMPT),
            ChatMessage::user(build_enhancement_prompt(raw_query)),
        ];

        let response =
            match generate_with_timeout(generator.as_ref(), messages, self.timeout, self.attempts)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Query enhancement unavailable ({}), using raw query", e);
                    return EnhancedQuery::unchanged(raw_query);
                }
            };

        let keywords = parse_keywords(&response);
        if keywords.is_empty() {
            tracing::warn!("Query enhancement returned no usable keywords, using raw query");
            tracing::debug!("Raw LLM response: {}", response);
            return EnhancedQuery::unchanged(raw_query);
        }

        let search_text = format!("{} {}", raw_query.trim(), keywords.join(" "));
        tracing::debug!("Enhanced '{}' -> '{}'", raw_query, search_text);

        EnhancedQuery {
            original: raw_query.to_string(),
            search_text,
            keywords,
            degraded: false,
        }
    }
}

/// Extract search keywords from free-form generator output.
///
/// Accepts a JSON array, a JSON object with a `keywords`/`terms` array,
/// or a bulleted / numbered / comma-separated list. Returns an empty
/// list when nothing usable is found.
pub fn parse_keywords(response: &str) -> Vec<String> {
    let raw_terms = parse_json_keywords(response).unwrap_or_else(|| parse_list_keywords(response));

    let mut seen = HashSet::new();
    raw_terms
        .into_iter()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| t.chars().count() > 2)
        .filter(|t| seen.insert(t.to_lowercase()))
        .take(MAX_KEYWORDS)
        .collect()
}

fn parse_json_keywords(response: &str) -> Option<Vec<String>> {
    let trimmed = response.trim();
    let start = trimmed.find(['[', '{'])?;
    let end = trimmed.rfind([']', '}'])?;
    if end < start {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(&trimmed[start..=end]).ok()?;
    let array = match value {
        serde_json::Value::Array(arr) => arr,
        serde_json::Value::Object(mut obj) => match obj
            .remove("keywords")
            .or_else(|| obj.remove("terms"))
        {
            Some(serde_json::Value::Array(arr)) => arr,
            _ => return None,
        },
        _ => return None,
    };

    Some(
        array
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
    )
}

fn parse_list_keywords(response: &str) -> Vec<String> {
    let mut terms = Vec::new();

    for line in response.lines() {
        let line = strip_list_marker(line.trim());
        // Section headers like "Colors:" carry no keyword
        if line.is_empty() || line.ends_with(':') {
            continue;
        }
        let line = match line.split_once(':') {
            Some((_, rest)) if !rest.trim().is_empty() => rest,
            _ => line,
        };
        for piece in line.split(',') {
            let piece = piece
                .trim()
                .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '.');
            if !piece.is_empty() {
                terms.push(piece.to_string());
            }
        }
    }

    terms
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim_start_matches(['-', '•', '*', ' ']);
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    line.trim()
}
