//! HTTP client for OpenAI-compatible services (OpenAI, vLLM, ...)

use super::TextGenerator;
use crate::cache::{chat_cache_key, embedding_cache_key, TtlCache};
use crate::config::LLMServiceConfig;
use crate::error::{Result, TizzlError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct APIMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

impl APIMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let hits = self.cache_hits.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: total,
            total_errors: self.total_errors.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_hit_rate: if total > 0 {
                hits as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            avg_latency_ms: if total > 0 {
                self.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub avg_latency_ms: f64,
}

/// Map a non-success HTTP status into the provider error taxonomy
pub(crate) fn status_error(service: &str, status: reqwest::StatusCode, body: &str) -> TizzlError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        TizzlError::RateLimited(format!("{} (HTTP {})", service, status))
    } else {
        TizzlError::ProviderUnavailable(format!("{} error (HTTP {}): {}", service, status, body))
    }
}

/// Map a transport error into the provider error taxonomy
pub(crate) fn transport_error(service: &str, err: reqwest::Error) -> TizzlError {
    TizzlError::ProviderUnavailable(format!("{} request failed: {}", service, err))
}

/// OpenAI-compatible chat and embeddings client
pub struct OpenAIClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    chat_cache: TtlCache<String>,
    embedding_cache: TtlCache<Vec<f32>>,
    metrics: APIMetrics,
}

impl OpenAIClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            config,
            chat_cache: TtlCache::new(),
            embedding_cache: TtlCache::new(),
            metrics: APIMetrics::default(),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LLMServiceConfig::default())
    }

    pub fn embedding_dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    pub fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    /// Generate embeddings for multiple texts, serving repeats from cache
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut uncached_texts = Vec::new();
        let mut uncached_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let cache_key = embedding_cache_key(&self.config.embedding_model, text);
            if let Some(cached) = self.embedding_cache.get(&cache_key) {
                results.push(Some(cached));
                self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);
            results.push(None);
            uncached_texts.push(text.clone());
            uncached_indices.push(i);
        }

        if !uncached_texts.is_empty() {
            tracing::debug!(
                "Embedding batch: {} cached, {} to fetch",
                texts.len() - uncached_texts.len(),
                uncached_texts.len()
            );

            let fetched = self.fetch_embeddings(&uncached_texts).await?;
            if fetched.len() != uncached_texts.len() {
                self.metrics.error();
                return Err(TizzlError::ProviderUnavailable(format!(
                    "embedding service returned {} vectors for {} inputs",
                    fetched.len(),
                    uncached_texts.len()
                )));
            }

            for ((idx, text), embedding) in uncached_indices
                .into_iter()
                .zip(uncached_texts.iter())
                .zip(fetched)
            {
                let cache_key = embedding_cache_key(&self.config.embedding_model, text);
                self.embedding_cache.set(cache_key, embedding.clone());
                results[idx] = Some(embedding);
            }
        }

        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);

        results
            .into_iter()
            .map(|r| {
                r.ok_or_else(|| TizzlError::ProviderUnavailable("missing embedding".to_string()))
            })
            .collect()
    }

    async fn fetch_embeddings(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            embedding: Vec<f32>,
        }

        let request = EmbedRequest {
            model: &self.config.embedding_model,
            input,
        };

        let url = format!("{}/v1/embeddings", self.config.embeddings_url());
        let req = self.authorize(self.http_client.post(&url).json(&request));

        let response = req.send().await.map_err(|e| {
            self.metrics.error();
            transport_error("Embedding service", e)
        })?;

        if !response.status().is_success() {
            self.metrics.error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("Embedding service", status, &body));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            self.metrics.error();
            transport_error("Embedding service", e)
        })?;

        Ok(embed_response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl TextGenerator for OpenAIClient {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        let messages_json = serde_json::to_string(&messages)?;
        let cache_key = chat_cache_key(&self.config.model, &messages_json);

        if let Some(cached) = self.chat_cache.get(&cache_key) {
            tracing::debug!("Cache hit for chat completion");
            self.metrics.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }

        self.metrics.cache_misses.fetch_add(1, Ordering::Relaxed);

        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.config.url);
        let req = self.authorize(self.http_client.post(&url).json(&request));

        let response = req.send().await.map_err(|e| {
            self.metrics.error();
            transport_error("LLM service", e)
        })?;

        if !response.status().is_success() {
            self.metrics.error();
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("LLM service", status, &body));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            self.metrics.error();
            transport_error("LLM service", e)
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                self.metrics.error();
                TizzlError::ProviderUnavailable("No response from LLM".to_string())
            })?
            .message
            .content;

        self.chat_cache.set(cache_key, content.clone());

        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);

        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn metrics(&self) -> Option<MetricsSnapshot> {
        Some(self.metrics.snapshot())
    }
}
