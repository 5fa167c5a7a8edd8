//! Product catalog capability
//!
//! The catalog is the authoritative source of full product records; the
//! vector index only holds metadata snapshots.

use crate::error::{Result, TizzlError};
use crate::models::Product;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// Source of full product records
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Products for the given ids in the same order; unknown ids are
    /// silently omitted
    async fn fetch_products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>>;

    /// Single product lookup
    async fn get(&self, id: &str) -> Result<Option<Product>> {
        let mut found = self.fetch_products_by_ids(&[id.to_string()]).await?;
        Ok(found.pop())
    }
}

/// Catalog held in process memory
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = Self::new();
        catalog.insert_all(products);
        catalog
    }

    /// Load a JSON array of products from disk
    pub fn load_json(path: &Path) -> Result<Vec<Product>> {
        let content = std::fs::read_to_string(path)?;
        let products: Vec<Product> = serde_json::from_str(&content)?;
        tracing::info!("Loaded {} products from {}", products.len(), path.display());
        Ok(products)
    }

    pub fn insert_all(&self, products: impl IntoIterator<Item = Product>) {
        if let Ok(mut map) = self.products.write() {
            for product in products {
                map.insert(product.product_id.clone(), product);
            }
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        self.products
            .write()
            .map(|mut map| map.remove(id).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.products.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every product, ordered by id
    pub fn all(&self) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .products
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        products.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        products
    }
}

#[async_trait]
impl ProductCatalog for InMemoryCatalog {
    async fn fetch_products_by_ids(&self, ids: &[String]) -> Result<Vec<Product>> {
        let map = self
            .products
            .read()
            .map_err(|e| TizzlError::Other(anyhow::anyhow!("catalog lock poisoned: {}", e)))?;
        Ok(ids.iter().filter_map(|id| map.get(id).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fetch_preserves_order_and_skips_unknown() {
        let catalog = InMemoryCatalog::from_products(vec![
            Product::new("a", "A", Category::Tops, 1.0),
            Product::new("b", "B", Category::Tops, 2.0),
            Product::new("c", "C", Category::Tops, 3.0),
        ]);
        let ids = vec!["c".to_string(), "gone".to_string(), "a".to_string()];
        let products = catalog.fetch_products_by_ids(&ids).await.unwrap();
        let got: Vec<&str> = products.iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(got, vec!["c", "a"]);

        assert!(catalog.get("b").await.unwrap().is_some());
        assert!(catalog.remove("b"));
        assert!(catalog.get("b").await.unwrap().is_none());
    }

    #[test]
    fn test_load_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("products.json");
        std::fs::write(
            &path,
            r#"[{"product_id": "p1", "name": "Linen Shirt", "category": "tops", "price": 45.0,
                "attributes": {"colors": ["white"]}, "sizes": ["S", "M"]}]"#,
        )
        .unwrap();

        let products = InMemoryCatalog::load_json(&path).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].attributes.colors, vec!["white".to_string()]);
        assert!(products[0].in_stock);
    }
}
