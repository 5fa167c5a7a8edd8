//! Result cache in front of the orchestrator

use super::{RetrievalOrchestrator, RetrievalOutput};
use crate::cache::{CacheStats, TtlCache};
use crate::error::Result;
use crate::models::StyleRequest;
use std::sync::Arc;
use std::time::Duration;

/// Memoises complete retrieval outputs keyed on the normalised request.
///
/// Degraded outputs are not stored so a recovered provider is picked up
/// on the next call.
pub struct CachedRetriever {
    inner: Arc<RetrievalOrchestrator>,
    cache: TtlCache<RetrievalOutput>,
}

impl CachedRetriever {
    pub fn new(inner: Arc<RetrievalOrchestrator>) -> Self {
        Self {
            inner,
            cache: TtlCache::new(),
        }
    }

    pub fn with_ttl(inner: Arc<RetrievalOrchestrator>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: TtlCache::with_ttl(ttl),
        }
    }

    pub fn orchestrator(&self) -> &RetrievalOrchestrator {
        &self.inner
    }

    pub async fn retrieve_products(&self, request: &StyleRequest) -> Result<RetrievalOutput> {
        request.validate()?;
        let key = request.cache_key();

        if let Some(mut hit) = self.cache.get(&key) {
            tracing::debug!("Result cache hit for '{}'", request.query);
            hit.diagnostics.cache_hit = true;
            return Ok(hit);
        }

        let output = self.inner.retrieve_products(request).await?;
        if !output.diagnostics.degraded.any() {
            self.cache.set(key, output.clone());
        }
        Ok(output)
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::index::{index_products, InMemoryVectorIndex};
    use crate::llm::{HashEmbedder, MockGenerator};
    use crate::models::{Category, Product};

    async fn cached() -> CachedRetriever {
        cached_with(vec![
            Product::new("a", "Linen Shirt", Category::Tops, 40.0),
            Product::new("b", "Denim Jacket", Category::Outerwear, 90.0),
        ])
        .await
    }

    async fn cached_with(products: Vec<Product>) -> CachedRetriever {
        let embedder = Arc::new(HashEmbedder::new(16));
        let index = Arc::new(InMemoryVectorIndex::new());
        index_products(&products, embedder.as_ref(), index.as_ref())
            .await
            .unwrap();

        let orchestrator = RetrievalOrchestrator::new(
            RetrievalConfig::default(),
            embedder,
            Some(Arc::new(MockGenerator::new())),
            index,
            None,
        )
        .unwrap();
        CachedRetriever::new(Arc::new(orchestrator))
    }

    #[tokio::test]
    async fn test_second_call_hits_cache() {
        let retriever = cached().await;
        let first = retriever
            .retrieve_products(&StyleRequest::new("linen shirt"))
            .await
            .unwrap();
        assert!(!first.diagnostics.cache_hit);

        let second = retriever
            .retrieve_products(&StyleRequest::new("  Linen   SHIRT "))
            .await
            .unwrap();
        assert!(second.diagnostics.cache_hit);
        assert_eq!(first.product_ids(), second.product_ids());
        assert_eq!(retriever.stats().total_entries, 1);
    }

    #[tokio::test]
    async fn test_invalid_request_not_cached() {
        let retriever = cached().await;
        assert!(retriever
            .retrieve_products(&StyleRequest::new("   "))
            .await
            .is_err());
        assert_eq!(retriever.stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_nearby_budgets_are_separate_entries() {
        let retriever = cached_with(vec![
            Product::new("coat", "Wool Coat", Category::Outerwear, 100.003),
            Product::new("tee", "Cotton Tee", Category::Tops, 20.0),
        ])
        .await;

        let above = retriever
            .retrieve_products(&StyleRequest::new("wool coat").with_budget(100.004))
            .await
            .unwrap();
        assert!(above.product_ids().contains(&"coat"));

        let below = retriever
            .retrieve_products(&StyleRequest::new("wool coat").with_budget(100.001))
            .await
            .unwrap();
        assert!(!below.diagnostics.cache_hit);
        assert!(!below.product_ids().contains(&"coat"));
        assert_eq!(retriever.stats().total_entries, 2);
    }
}
