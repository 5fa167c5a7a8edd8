//! LLM reranking of retrieved candidates

use super::Candidate;
use crate::llm::prompts::{build_reranking_prompt, RERANKING_SYSTEM_PROMPT};
use crate::llm::{generate_with_timeout, ChatMessage, TextGenerator};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

lazy_static! {
    static ref ID_TOKEN_RE: Regex = Regex::new(r#"[^\s,;:|"'`\[\]{}()<>]+"#).unwrap();
}

/// Interpretation of a generator's ranking response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankParse {
    /// Known candidate ids in the order the generator gave them
    Ranked(Vec<String>),
    /// No candidate id could be recognised
    Unparseable,
}

/// Result of one reranking pass
#[derive(Debug, Clone, PartialEq)]
pub struct RerankOutcome {
    /// Permutation of the input candidates
    pub candidates: Vec<Candidate>,
    /// Whether the generator was called
    pub invoked: bool,
    /// True when retrieval order was kept because the generator failed
    pub degraded: bool,
}

impl RerankOutcome {
    fn unchanged(candidates: Vec<Candidate>, invoked: bool, degraded: bool) -> Self {
        Self {
            candidates,
            invoked,
            degraded,
        }
    }
}

/// Reorders candidates by relevance to the original request.
///
/// The output is always a permutation of the input: ids the generator
/// invents are dropped and candidates it omits keep their relative
/// retrieval order after the ranked ones.
pub struct Reranker {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
    attempts: u32,
    max_candidates: usize,
}

impl Reranker {
    pub fn new(
        generator: Option<Arc<dyn TextGenerator>>,
        timeout: Duration,
        attempts: u32,
        max_candidates: usize,
    ) -> Self {
        Self {
            generator,
            timeout,
            attempts,
            max_candidates: max_candidates.max(1),
        }
    }

    pub async fn rerank(&self, original_query: &str, candidates: Vec<Candidate>) -> RerankOutcome {
        if candidates.len() < 2 {
            return RerankOutcome::unchanged(candidates, false, false);
        }

        let Some(ref generator) = self.generator else {
            tracing::debug!("No text generator configured, keeping retrieval order");
            return RerankOutcome::unchanged(candidates, false, true);
        };

        let mut head = candidates;
        let tail = if head.len() > self.max_candidates {
            head.split_off(self.max_candidates)
        } else {
            Vec::new()
        };

        let messages = vec![
            ChatMessage::system(RERANKING_SYSTEM_PROMPT),
            ChatMessage::user(build_reranking_prompt(original_query, &head)),
        ];

        let response =
            match generate_with_timeout(generator.as_ref(), messages, self.timeout, self.attempts)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Reranking unavailable ({}), keeping retrieval order", e);
                    head.extend(tail);
                    return RerankOutcome::unchanged(head, true, true);
                }
            };

        let known: Vec<&str> = head.iter().map(|c| c.product_id.as_str()).collect();
        let ranked_ids = match parse_ranked_ids(&response, &known) {
            RankParse::Ranked(ids) => ids,
            RankParse::Unparseable => {
                tracing::warn!("Could not parse reranking response, keeping retrieval order");
                tracing::debug!("Raw LLM response: {}", response);
                head.extend(tail);
                return RerankOutcome::unchanged(head, true, true);
            }
        };

        tracing::debug!(
            "Reranker ranked {} of {} candidates",
            ranked_ids.len(),
            head.len()
        );

        let mut reordered = merge_ranking(head, &ranked_ids);
        reordered.extend(tail);
        RerankOutcome::unchanged(reordered, true, false)
    }
}

/// Recognise candidate ids in a ranking response.
///
/// Prefers a JSON `{"ranking": [...]}` object or bare array; otherwise
/// scans the text for tokens that exactly equal a known id, in order of
/// first appearance. Unknown ids and repeats are discarded.
pub fn parse_ranked_ids(response: &str, known_ids: &[&str]) -> RankParse {
    let known: HashSet<&str> = known_ids.iter().copied().collect();

    let ids = match parse_json_ranking(response) {
        Some(raw) => filter_known(raw.iter().map(|s| s.as_str()), &known),
        None => Vec::new(),
    };
    if !ids.is_empty() {
        return RankParse::Ranked(ids);
    }

    let tokens = ID_TOKEN_RE
        .find_iter(response)
        .map(|m| m.as_str().trim_end_matches('.'));
    let ids = filter_known(tokens, &known);
    if ids.is_empty() {
        RankParse::Unparseable
    } else {
        RankParse::Ranked(ids)
    }
}

fn filter_known<'a>(tokens: impl Iterator<Item = &'a str>, known: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    tokens
        .map(|t| t.trim())
        .filter(|t| known.contains(t))
        .filter(|t| seen.insert(t.to_string()))
        .map(|t| t.to_string())
        .collect()
}

fn parse_json_ranking(response: &str) -> Option<Vec<String>> {
    let start = response.find(['{', '['])?;
    let end = response.rfind(['}', ']'])?;
    if end < start {
        return None;
    }

    let value: serde_json::Value = serde_json::from_str(&response[start..=end]).ok()?;
    let array = match value {
        serde_json::Value::Array(arr) => arr,
        serde_json::Value::Object(mut obj) => match obj
            .remove("ranking")
            .or_else(|| obj.remove("ids"))
        {
            Some(serde_json::Value::Array(arr)) => arr,
            _ => return None,
        },
        _ => return None,
    };

    Some(
        array
            .into_iter()
            .filter_map(|v| match v {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Object(obj) => obj
                    .get("id")
                    .and_then(|id| id.as_str())
                    .map(|s| s.to_string()),
                _ => None,
            })
            .collect(),
    )
}

/// Reorder `candidates` so `ranked_ids` come first, followed by every
/// unmentioned candidate in its original relative order
pub fn merge_ranking(candidates: Vec<Candidate>, ranked_ids: &[String]) -> Vec<Candidate> {
    let mut position: HashMap<String, usize> = HashMap::new();
    for (i, candidate) in candidates.iter().enumerate() {
        position.entry(candidate.product_id.clone()).or_insert(i);
    }

    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    let mut merged = Vec::with_capacity(slots.len());

    for id in ranked_ids {
        if let Some(&i) = position.get(id) {
            if let Some(candidate) = slots[i].take() {
                merged.push(candidate);
            }
        }
    }
    merged.extend(slots.into_iter().flatten());
    merged
}
