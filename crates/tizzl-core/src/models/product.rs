//! Catalog product model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Top-level product category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tops,
    Bottoms,
    Dresses,
    Outerwear,
    Shoes,
    Accessories,
    Bags,
    Jewelry,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Tops,
        Category::Bottoms,
        Category::Dresses,
        Category::Outerwear,
        Category::Shoes,
        Category::Accessories,
        Category::Bags,
        Category::Jewelry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tops => "tops",
            Category::Bottoms => "bottoms",
            Category::Dresses => "dresses",
            Category::Outerwear => "outerwear",
            Category::Shoes => "shoes",
            Category::Accessories => "accessories",
            Category::Bags => "bags",
            Category::Jewelry => "jewelry",
        }
    }

    /// Categories that pair well with this one in an outfit
    pub fn complementary(&self) -> &'static [Category] {
        use Category::*;
        match self {
            Tops => &[Bottoms, Outerwear, Shoes, Accessories],
            Bottoms => &[Tops, Shoes, Outerwear, Accessories],
            Dresses => &[Outerwear, Shoes, Bags, Jewelry],
            Outerwear => &[Tops, Bottoms, Dresses, Accessories],
            Shoes => &[Tops, Bottoms, Dresses, Bags],
            Accessories => &[Tops, Bottoms, Dresses, Outerwear],
            Bags => &[Shoes, Jewelry, Accessories],
            Jewelry => &[Dresses, Tops, Bags],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Category::ALL
            .iter()
            .find(|c| c.as_str() == lower)
            .copied()
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Occasion {
    Casual,
    Work,
    Formal,
    Cocktail,
    Athletic,
    Beach,
    Party,
}

impl Occasion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Occasion::Casual => "casual",
            Occasion::Work => "work",
            Occasion::Formal => "formal",
            Occasion::Cocktail => "cocktail",
            Occasion::Athletic => "athletic",
            Occasion::Beach => "beach",
            Occasion::Party => "party",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
    AllSeason,
}

impl Season {
    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
            Season::AllSeason => "all_season",
        }
    }
}

/// Descriptive product attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductAttributes {
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub occasions: Vec<Occasion>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub fit: Option<String>,
}

/// Catalog item, owned by the catalog store and only read here
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub attributes: ProductAttributes,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Minimal product; remaining fields take their defaults
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        category: Category,
        price: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            product_id: product_id.into(),
            name: name.into(),
            category,
            subcategory: None,
            description: String::new(),
            attributes: ProductAttributes::default(),
            price,
            sale_price: None,
            currency: default_currency(),
            sizes: Vec::new(),
            in_stock: true,
            images: Vec::new(),
            url: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Price the customer pays: sale price when present, else list price
    pub fn display_price(&self) -> f64 {
        self.sale_price.unwrap_or(self.price)
    }

    pub fn is_on_sale(&self) -> bool {
        self.sale_price.is_some_and(|sale| sale < self.price)
    }

    /// Document text embedded into the vector index
    pub fn search_text(&self) -> String {
        let attrs = &self.attributes;
        let mut parts: Vec<String> = vec![
            self.name.clone(),
            self.description.clone(),
            format!("Category: {}", self.category),
        ];

        if let Some(ref sub) = self.subcategory {
            parts.push(format!("Subcategory: {}", sub));
        }
        if !attrs.colors.is_empty() {
            parts.push(format!("Colors: {}", attrs.colors.join(", ")));
        }
        if let Some(ref pattern) = attrs.pattern {
            parts.push(format!("Pattern: {}", pattern));
        }
        if let Some(ref material) = attrs.material {
            parts.push(format!("Material: {}", material));
        }
        if let Some(ref style) = attrs.style {
            parts.push(format!("Style: {}", style));
        }
        if let Some(ref brand) = attrs.brand {
            parts.push(format!("Brand: {}", brand));
        }
        if !attrs.occasions.is_empty() {
            let occasions: Vec<&str> = attrs.occasions.iter().map(|o| o.as_str()).collect();
            parts.push(format!("Occasions: {}", occasions.join(", ")));
        }
        if !attrs.seasons.is_empty() {
            let seasons: Vec<&str> = attrs.seasons.iter().map(|s| s.as_str()).collect();
            parts.push(format!("Seasons: {}", seasons.join(", ")));
        }

        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_price_prefers_sale() {
        let mut product = Product::new("SKU1", "Linen Shirt", Category::Tops, 80.0);
        assert_eq!(product.display_price(), 80.0);
        assert!(!product.is_on_sale());

        product.sale_price = Some(55.0);
        assert_eq!(product.display_price(), 55.0);
        assert!(product.is_on_sale());
    }

    #[test]
    fn test_search_text_includes_attributes() {
        let mut product = Product::new("SKU2", "Silk Midi Dress", Category::Dresses, 180.0);
        product.description = "Bias-cut midi".to_string();
        product.attributes.colors = vec!["navy".to_string(), "black".to_string()];
        product.attributes.occasions = vec![Occasion::Cocktail, Occasion::Party];
        product.attributes.seasons = vec![Season::AllSeason];

        let text = product.search_text();
        assert!(text.starts_with("Silk Midi Dress Bias-cut midi Category: dresses"));
        assert!(text.contains("Colors: navy, black"));
        assert!(text.contains("Occasions: cocktail, party"));
        assert!(text.contains("Seasons: all_season"));
        assert!(!text.contains("Brand:"));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Tops".parse::<Category>().unwrap(), Category::Tops);
        assert_eq!(" jewelry ".parse::<Category>().unwrap(), Category::Jewelry);
        assert!("hats".parse::<Category>().is_err());
    }

    #[test]
    fn test_product_deserialize_defaults() {
        let product: Product = serde_json::from_str(
            r#"{"product_id":"SKU9","name":"Tee","category":"tops","price":20.0}"#,
        )
        .unwrap();
        assert!(product.in_stock);
        assert_eq!(product.currency, "USD");
        assert!(product.sizes.is_empty());
    }
}
