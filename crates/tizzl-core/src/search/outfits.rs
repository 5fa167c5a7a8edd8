//! Similar-item lookup and outfit pairing

use super::orchestrator::materialize;
use super::{CandidateRetriever, FilterPredicate, RankedProduct};
use crate::catalog::ProductCatalog;
use crate::error::{Result, TizzlError};
use crate::index::VectorIndex;
use crate::models::{Category, Product};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Items taken from each complementary category
pub const PER_CATEGORY_LIMIT: usize = 3;

/// Maximum pairs returned by one outfit lookup
pub const MAX_OUTFITS: usize = 5;

/// An anchor product paired with a complementary item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitPair {
    pub anchor: Product,
    pub item: Product,
    pub category: Category,
}

/// Lookups that start from an existing product rather than free text
pub struct OutfitPlanner {
    retriever: Arc<CandidateRetriever>,
    index: Arc<dyn VectorIndex>,
    catalog: Option<Arc<dyn ProductCatalog>>,
    fetch_timeout: Duration,
}

impl OutfitPlanner {
    pub fn new(
        retriever: Arc<CandidateRetriever>,
        index: Arc<dyn VectorIndex>,
        catalog: Option<Arc<dyn ProductCatalog>>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            index,
            catalog,
            fetch_timeout,
        }
    }

    /// Up to `k` in-stock products nearest to the stored vector of `product_id`
    pub async fn find_similar(&self, product_id: &str, k: usize) -> Result<Vec<RankedProduct>> {
        let vector = self
            .index
            .vector(product_id)
            .await?
            .ok_or_else(|| TizzlError::NotFound(format!("product {}", product_id)))?;

        let retrieval = self
            .retriever
            .search_vector(
                &vector,
                &FilterPredicate::in_stock_only(),
                k.saturating_add(1),
                false,
            )
            .await?;

        let candidates: Vec<_> = retrieval
            .candidates
            .into_iter()
            .filter(|c| c.product_id != product_id)
            .take(k)
            .collect();

        let (products, _) =
            materialize(self.catalog.as_deref(), candidates, self.fetch_timeout).await;
        tracing::debug!("Found {} products similar to {}", products.len(), product_id);
        Ok(products)
    }

    /// Resolve an anchor id through the catalog, then pair it
    pub async fn outfits_for_id(
        &self,
        product_id: &str,
        occasion: Option<&str>,
    ) -> Result<Vec<OutfitPair>> {
        let catalog = self
            .catalog
            .as_ref()
            .ok_or_else(|| TizzlError::NotFound("no product catalog configured".to_string()))?;
        let anchor = catalog
            .get(product_id)
            .await?
            .ok_or_else(|| TizzlError::NotFound(format!("product {}", product_id)))?;
        self.outfit_combinations(&anchor, occasion).await
    }

    /// Pair the anchor with items from its complementary categories
    pub async fn outfit_combinations(
        &self,
        anchor: &Product,
        occasion: Option<&str>,
    ) -> Result<Vec<OutfitPair>> {
        let query = match occasion {
            Some(occasion) => format!("match with {} for {}", anchor.name, occasion),
            None => format!("coordinate with {}", anchor.name),
        };
        let (vector, degraded) = self.retriever.embed_query(&query).await;

        let searches = anchor.category.complementary().iter().map(|category| {
            let predicate = FilterPredicate::in_stock_only().with_categories(vec![*category]);
            let vector = &vector;
            async move {
                let retrieval = self
                    .retriever
                    .search_vector(vector, &predicate, PER_CATEGORY_LIMIT, degraded)
                    .await?;
                Ok::<_, TizzlError>((*category, retrieval.candidates))
            }
        });
        let per_category = try_join_all(searches).await?;

        let mut outfits = Vec::new();
        for (category, candidates) in per_category {
            if outfits.len() >= MAX_OUTFITS {
                break;
            }
            let candidates: Vec<_> = candidates
                .into_iter()
                .filter(|c| c.product_id != anchor.product_id)
                .collect();
            let (items, _) =
                materialize(self.catalog.as_deref(), candidates, self.fetch_timeout).await;

            outfits.extend(items.into_iter().map(|ranked| OutfitPair {
                anchor: anchor.clone(),
                item: ranked.product,
                category,
            }));
        }

        outfits.truncate(MAX_OUTFITS);
        tracing::debug!(
            "Built {} outfit pairs for {}",
            outfits.len(),
            anchor.product_id
        );
        Ok(outfits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::config::RetrievalConfig;
    use crate::index::{index_products, InMemoryVectorIndex};
    use crate::llm::HashEmbedder;

    async fn planner(products: Vec<Product>) -> OutfitPlanner {
        let embedder = Arc::new(HashEmbedder::new(32));
        let index = Arc::new(InMemoryVectorIndex::new());
        index_products(&products, embedder.as_ref(), index.as_ref())
            .await
            .unwrap();
        let catalog = Arc::new(InMemoryCatalog::from_products(products));
        let retriever = Arc::new(CandidateRetriever::new(
            embedder,
            index.clone(),
            RetrievalConfig::default(),
        ));
        OutfitPlanner::new(retriever, index, Some(catalog), Duration::from_secs(1))
    }

    fn wardrobe() -> Vec<Product> {
        let mut products = vec![
            Product::new("top1", "Silk Blouse", Category::Tops, 80.0),
            Product::new("top2", "Cotton Tee", Category::Tops, 20.0),
            Product::new("skirt", "Midi Skirt", Category::Bottoms, 60.0),
            Product::new("jeans", "Straight Jeans", Category::Bottoms, 90.0),
            Product::new("loafer", "Leather Loafer", Category::Shoes, 120.0),
            Product::new("trench", "Trench Coat", Category::Outerwear, 200.0),
            Product::new("belt", "Woven Belt", Category::Accessories, 30.0),
            Product::new("ring", "Gold Ring", Category::Jewelry, 150.0),
        ];
        let mut sold_out = Product::new("boot", "Ankle Boot", Category::Shoes, 140.0);
        sold_out.in_stock = false;
        products.push(sold_out);
        products
    }

    #[tokio::test]
    async fn test_find_similar_excludes_self() {
        let planner = planner(wardrobe()).await;
        let similar = planner.find_similar("top1", 3).await.unwrap();
        assert_eq!(similar.len(), 3);
        assert!(similar.iter().all(|r| r.product.product_id != "top1"));
        assert!(similar.iter().all(|r| r.product.product_id != "boot"));
    }

    #[tokio::test]
    async fn test_find_similar_unbounded_k() {
        let planner = planner(wardrobe()).await;
        let similar = planner.find_similar("top1", usize::MAX).await.unwrap();
        // every other in-stock item
        assert_eq!(similar.len(), 7);
        assert!(similar.iter().all(|r| r.product.product_id != "top1"));
    }

    #[tokio::test]
    async fn test_find_similar_unknown_product() {
        let planner = planner(wardrobe()).await;
        let result = planner.find_similar("nope", 3).await;
        assert!(matches!(result, Err(TizzlError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_outfits_use_complementary_categories() {
        let planner = planner(wardrobe()).await;
        let outfits = planner.outfits_for_id("top1", Some("work")).await.unwrap();

        assert!(!outfits.is_empty());
        assert!(outfits.len() <= MAX_OUTFITS);
        for pair in &outfits {
            assert_eq!(pair.anchor.product_id, "top1");
            assert!(Category::Tops.complementary().contains(&pair.item.category));
            assert!(pair.item.in_stock);
        }
        // bottoms come first in the tops pairing order
        assert_eq!(outfits[0].category, Category::Bottoms);
    }
}
