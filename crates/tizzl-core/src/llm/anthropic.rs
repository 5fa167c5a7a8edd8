//! Anthropic messages API client

use super::client::{status_error, transport_error, APIMetrics, MetricsSnapshot};
use super::{ChatMessage, TextGenerator};
use crate::cache::{chat_cache_key, TtlCache};
use crate::config::LLMServiceConfig;
use crate::error::{Result, TizzlError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-sonnet-20240229";

/// Text generator backed by the Anthropic messages API
pub struct AnthropicClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    model: String,
    cache: TtlCache<String>,
    metrics: APIMetrics,
}

impl AnthropicClient {
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        if config.anthropic_api_key.is_none() {
            return Err(TizzlError::Config(
                "Anthropic provider selected but ANTHROPIC_API_KEY is not set".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // OpenAI-style default model names make no sense here
        let model = if config.model.starts_with("claude") {
            config.model.clone()
        } else {
            DEFAULT_ANTHROPIC_MODEL.to_string()
        };

        Ok(Self {
            http_client,
            config,
            model,
            cache: TtlCache::new(),
            metrics: APIMetrics::default(),
        })
    }
}

/// Split system messages out; the messages API takes them separately
fn split_system(messages: Vec<ChatMessage>) -> (Option<String>, Vec<ChatMessage>) {
    let mut system = Vec::new();
    let mut rest = Vec::new();
    for message in messages {
        if message.role == "system" {
            system.push(message.content);
        } else {
            rest.push(message);
        }
    }
    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, rest)
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let messages_json = serde_json::to_string(&messages)?;
        let cache_key = chat_cache_key(&self.model, &messages_json);
        if let Some(cached) = self.cache.get(&cache_key) {
            self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }
        self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);

        #[derive(Serialize)]
        struct MessagesRequest {
            model: String,
            max_tokens: u32,
            temperature: f32,
            #[serde(skip_serializing_if = "Option::is_none")]
            system: Option<String>,
            messages: Vec<ChatMessage>,
        }

        #[derive(Deserialize)]
        struct MessagesResponse {
            content: Vec<ContentBlock>,
        }

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(default)]
            text: Option<String>,
        }

        let (system, messages) = split_system(messages);
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            system,
            messages,
        };

        let url = format!("{}/v1/messages", self.config.anthropic_url);
        let mut req = self
            .http_client
            .post(&url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request);
        if let Some(ref key) = self.config.anthropic_api_key {
            req = req.header("x-api-key", key);
        }

        let response = req.send().await.map_err(|e| {
            self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
            transport_error("Anthropic", e)
        })?;

        if !response.status().is_success() {
            self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("Anthropic", status, &body));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
            transport_error("Anthropic", e)
        })?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
            return Err(TizzlError::ProviderUnavailable(
                "Anthropic returned no text content".to_string(),
            ));
        }

        self.cache.set(cache_key, text.clone());
        self.metrics
            .total_latency_ms
            .fetch_add(start.elapsed().as_millis() as u64, Ordering::Relaxed);

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(self.metrics.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_system() {
        let (system, rest) = split_system(vec![
            ChatMessage::system("be terse"),
            ChatMessage::user("hello"),
        ]);
        assert_eq!(system.as_deref(), Some("be terse"));
        assert_eq!(rest, vec![ChatMessage::user("hello")]);
    }

    #[test]
    fn test_requires_api_key() {
        let config = LLMServiceConfig {
            anthropic_api_key: None,
            ..Default::default()
        };
        assert!(matches!(
            AnthropicClient::new(config),
            Err(TizzlError::Config(_))
        ));
    }
}
