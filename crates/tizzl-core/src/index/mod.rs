//! Vector index capability and implementations
//!
//! Stores one vector per product with a metadata snapshot and answers
//! filtered nearest-neighbour queries under cosine distance.

mod ann;
mod memory;

pub use ann::{AnnIndex, ANN_THRESHOLD};
pub use memory::InMemoryVectorIndex;

use crate::error::Result;
use crate::llm::{Embedder, HashEmbedder};
use crate::models::Product;
use crate::search::{Candidate, CandidateMetadata, FilterPredicate};
use async_trait::async_trait;

/// One stored vector with its metadata snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: CandidateMetadata,
    pub document: String,
}

/// Approximate nearest-neighbour search with structured predicates
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Number of stored vectors
    async fn len(&self) -> Result<usize>;

    /// Up to `k` nearest neighbours satisfying `predicate`, ascending distance
    async fn search(
        &self,
        query: &[f32],
        predicate: &FilterPredicate,
        k: usize,
    ) -> Result<Vec<Candidate>>;

    /// Insert or replace entries by id
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Remove one entry, returning whether it existed
    async fn remove(&self, id: &str) -> Result<bool>;

    /// Drop every entry
    async fn clear(&self) -> Result<()>;

    /// Stored vector for an id
    async fn vector(&self, id: &str) -> Result<Option<Vec<f32>>>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Cosine similarity of two vectors; 0.0 for mismatched or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Cosine distance clamped to [0, 2]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    (1.0 - cosine_similarity(a, b)).clamp(0.0, 2.0)
}

/// Embed every product's search text and upsert it into the index.
///
/// Falls back to hash embeddings for the whole batch when the embedder
/// fails, so indexing never blocks on the embedding provider.
pub async fn index_products(
    products: &[Product],
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
) -> Result<usize> {
    if products.is_empty() {
        return Ok(0);
    }

    let texts: Vec<String> = products.iter().map(|p| p.search_text()).collect();
    let vectors = match embedder.embed_batch(&texts).await {
        Ok(vectors) if vectors.len() == texts.len() => vectors,
        Ok(vectors) => {
            tracing::warn!(
                "Embedder returned {} vectors for {} products, using hash embeddings",
                vectors.len(),
                texts.len()
            );
            hash_vectors(&texts, embedder.dimensions())
        }
        Err(e) => {
            tracing::warn!("Embedding failed during indexing ({}), using hash embeddings", e);
            hash_vectors(&texts, embedder.dimensions())
        }
    };

    let entries: Vec<IndexEntry> = products
        .iter()
        .zip(texts)
        .zip(vectors)
        .map(|((product, document), vector)| IndexEntry {
            id: product.product_id.clone(),
            vector,
            metadata: CandidateMetadata::from_product(product),
            document,
        })
        .collect();

    let count = entries.len();
    index.upsert(entries).await?;
    tracing::info!("Indexed {} products", count);
    Ok(count)
}

fn hash_vectors(texts: &[String], dimensions: usize) -> Vec<Vec<f32>> {
    let fallback = HashEmbedder::new(dimensions);
    texts.iter().map(|t| fallback.embed_sync(t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TizzlError;
    use crate::models::Category;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_cosine_distance_range() {
        assert!(cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) <= 2.0);
        assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(TizzlError::ProviderUnavailable("down".into()))
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(TizzlError::ProviderUnavailable("down".into()))
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_index_products_with_failing_embedder() {
        let index = InMemoryVectorIndex::new();
        let products = vec![
            Product::new("P1", "Tee", Category::Tops, 20.0),
            Product::new("P2", "Jeans", Category::Bottoms, 60.0),
        ];

        let count = index_products(&products, &BrokenEmbedder, &index).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(index.len().await.unwrap(), 2);

        let stored = index.vector("P1").await.unwrap().unwrap();
        assert_eq!(stored.len(), 8);
    }
}
