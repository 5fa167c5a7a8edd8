//! LLM integration
//!
//! Provides traits and implementations for:
//! - Embedding generation via external services (OpenAI-compatible) or a
//!   deterministic hash fallback
//! - Text generation via OpenAI-compatible, Anthropic or mock backends
//! - Prompt templates for query enhancement and reranking

mod anthropic;
mod client;
mod hash_embedder;
mod http_embedder;
mod mock;
pub mod prompts;
mod traits;

pub use anthropic::AnthropicClient;
pub use client::{APIMetrics, ChatMessage, MetricsSnapshot, OpenAIClient};
pub use hash_embedder::{pseudo_embedding, HashEmbedder, HASH_EMBEDDER_MODEL};
pub use http_embedder::HttpEmbedder;
pub use mock::{MockGenerator, MOCK_MODEL};
pub use traits::*;

use crate::config::{LLMServiceConfig, ProviderKind};
use crate::error::{Result, TizzlError};
use std::sync::Arc;
use std::time::Duration;

/// Construct the configured text generator.
///
/// Selection happens once here; pipeline stages only see the trait.
pub fn build_generator(config: &LLMServiceConfig) -> Result<Arc<dyn TextGenerator>> {
    let generator: Arc<dyn TextGenerator> = match config.provider {
        ProviderKind::OpenAi => Arc::new(OpenAIClient::new(config.clone())?),
        ProviderKind::Anthropic => Arc::new(AnthropicClient::new(config.clone())?),
        ProviderKind::Mock => Arc::new(MockGenerator::new()),
    };
    tracing::debug!("Text generator: {}", generator.model_name());
    Ok(generator)
}

/// Construct the configured embedder, falling back to hash embeddings
/// when no embedding service is configured
pub fn build_embedder(config: &LLMServiceConfig) -> Result<Arc<dyn Embedder>> {
    if config.provider != ProviderKind::Mock && config.has_embedding_service() {
        let embedder = HttpEmbedder::from_config(config.clone())?;
        tracing::debug!("Embedder: {}", embedder.model_name());
        Ok(Arc::new(embedder))
    } else {
        tracing::info!(
            "No embedding service configured, using {} embeddings",
            HASH_EMBEDDER_MODEL
        );
        Ok(Arc::new(HashEmbedder::new(config.embedding_dimensions)))
    }
}

/// Call the generator under a per-call timeout, retrying provider
/// failures up to `attempts` total calls
pub async fn generate_with_timeout(
    generator: &dyn TextGenerator,
    messages: Vec<ChatMessage>,
    timeout: Duration,
    attempts: u32,
) -> Result<String> {
    let attempts = attempts.max(1);
    let mut last_err = TizzlError::ProviderUnavailable("no attempt made".to_string());

    for attempt in 1..=attempts {
        let call = generator.generate(messages.clone());
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) => {
                tracing::debug!(
                    "Generation attempt {}/{} with {} failed: {}",
                    attempt,
                    attempts,
                    generator.model_name(),
                    e
                );
                last_err = e;
            }
            Err(_) => {
                tracing::debug!(
                    "Generation attempt {}/{} with {} timed out",
                    attempt,
                    attempts,
                    generator.model_name()
                );
                last_err = TizzlError::Timeout(timeout.as_millis() as u64);
            }
        }
    }

    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_mock_stack() {
        let config = LLMServiceConfig {
            provider: ProviderKind::Mock,
            embedding_dimensions: 32,
            ..Default::default()
        };
        let generator = build_generator(&config).unwrap();
        assert_eq!(generator.model_name(), MOCK_MODEL);

        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.model_name(), HASH_EMBEDDER_MODEL);
        assert_eq!(embedder.dimensions(), 32);
    }

    struct SlowGenerator;

    #[async_trait::async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _messages: Vec<ChatMessage>) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_times_out() {
        let result = generate_with_timeout(
            &SlowGenerator,
            vec![ChatMessage::user("hi")],
            Duration::from_millis(100),
            1,
        )
        .await;
        assert!(matches!(result, Err(TizzlError::Timeout(100))));
    }
}
