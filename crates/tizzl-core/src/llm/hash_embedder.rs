//! Deterministic pseudo-embeddings derived from a hash of the text
//!
//! Used whenever no embedding service is reachable. Identical text always
//! maps to the identical unit vector, so the index stays searchable with
//! reduced relevance.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;

pub const HASH_EMBEDDER_MODEL: &str = "blake3-pseudo";

/// Embedder that never fails
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Synchronous form of [`Embedder::embed`]
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        pseudo_embedding(text, self.dimensions)
    }
}

/// Unit-length vector expanded from the blake3 XOF of the normalised text
pub fn pseudo_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let normalised = text
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut hasher = blake3::Hasher::new();
    hasher.update(normalised.as_bytes());
    let mut reader = hasher.finalize_xof();

    let mut bytes = vec![0u8; dimensions * 4];
    reader.fill(&mut bytes);

    let mut values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| {
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            (raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
        })
        .collect();

    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut values {
            *v /= norm;
        }
    }
    values
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        HASH_EMBEDDER_MODEL
    }
}
