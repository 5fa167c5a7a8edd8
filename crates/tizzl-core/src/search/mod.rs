//! Retrieval pipeline
//!
//! Provides:
//! - Query enhancement through the text generator
//! - Structured filter predicates derived from the request
//! - Filtered vector retrieval (recall stage)
//! - LLM reranking and business-rule filtering (precision stage)
//! - The orchestrator that sequences the stages and owns fallbacks

mod cached;
mod enhancer;
mod filter;
mod orchestrator;
mod outfits;
mod reranker;
mod retriever;
mod rules;

pub use cached::CachedRetriever;
pub use enhancer::{parse_keywords, EnhancedQuery, QueryEnhancer, MAX_KEYWORDS};
pub use filter::{FilterBuilder, FilterPredicate};
pub use orchestrator::{
    DegradedFlags, PipelineState, RetrievalDiagnostics, RetrievalOrchestrator, RetrievalOutput,
    StageCount,
};
pub use outfits::{OutfitPair, OutfitPlanner, MAX_OUTFITS, PER_CATEGORY_LIMIT};
pub use reranker::{merge_ranking, parse_ranked_ids, RankParse, RerankOutcome, Reranker};
pub use retriever::{CandidateRetriever, Retrieval};
pub use rules::{BusinessRuleFilter, RuleSubject};

use crate::models::{Category, Product};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Metadata snapshot stored alongside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    pub name: String,
    pub category: Category,
    pub price: f64,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub occasions: Vec<String>,
    #[serde(default)]
    pub description: String,
}

fn default_true() -> bool {
    true
}

impl CandidateMetadata {
    pub fn new(name: impl Into<String>, category: Category, price: f64) -> Self {
        Self {
            name: name.into(),
            category,
            price,
            sale_price: None,
            in_stock: true,
            colors: Vec::new(),
            sizes: Vec::new(),
            brand: None,
            occasions: Vec::new(),
            description: String::new(),
        }
    }

    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category: product.category,
            price: product.price,
            sale_price: product.sale_price,
            in_stock: product.in_stock,
            colors: product.attributes.colors.clone(),
            sizes: product.sizes.clone(),
            brand: product.attributes.brand.clone(),
            occasions: product
                .attributes
                .occasions
                .iter()
                .map(|o| o.as_str().to_string())
                .collect(),
            description: product.description.clone(),
        }
    }

    pub fn display_price(&self) -> f64 {
        self.sale_price.unwrap_or(self.price)
    }
}

/// Provisionally retrieved catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub product_id: String,
    pub metadata: CandidateMetadata,
    /// Cosine distance to the query, lower is more similar
    pub distance: f32,
    /// Text the stored vector was computed from
    #[serde(default)]
    pub document: String,
}

impl Candidate {
    pub fn new(product_id: impl Into<String>, metadata: CandidateMetadata, distance: f32) -> Self {
        Self {
            product_id: product_id.into(),
            metadata,
            distance: distance.max(0.0),
            document: String::new(),
        }
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = document.into();
        self
    }

    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }

    /// Product built from the metadata snapshot alone
    pub fn to_product(&self) -> Product {
        let meta = &self.metadata;
        let mut product = Product::new(
            self.product_id.clone(),
            meta.name.clone(),
            meta.category,
            meta.price,
        );
        product.sale_price = meta.sale_price;
        product.in_stock = meta.in_stock;
        product.sizes = meta.sizes.clone();
        product.description = meta.description.clone();
        product.attributes.colors = meta.colors.clone();
        product.attributes.brand = meta.brand.clone();
        product
    }
}

/// Ascending distance, ties broken by ascending product id
pub fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.product_id.cmp(&b.product_id))
}

/// Sort candidates into the canonical retrieval order
pub fn sort_candidates(candidates: &mut [Candidate]) {
    candidates.sort_by(compare_candidates);
}

/// One entry of an ordered stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProduct {
    /// 1-based position in the final list
    pub rank: usize,
    pub product: Product,
    /// Retrieval distance of the underlying candidate
    pub distance: f32,
}
