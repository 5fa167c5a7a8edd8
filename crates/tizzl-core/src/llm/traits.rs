//! LLM trait definitions

use super::{ChatMessage, MetricsSnapshot};
use crate::error::Result;
use async_trait::async_trait;

/// Embedding generation trait
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for batch of texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Text generation trait (prompt in, free text out)
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a completion for the conversation
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Get model name
    fn model_name(&self) -> &str;

    /// Request counters for networked backends
    fn metrics(&self) -> Option<MetricsSnapshot> {
        None
    }
}
