//! Tizzl Core Library
//!
//! Hybrid product retrieval for conversational fashion search.
//!
//! # Features
//! - LLM query enhancement with deterministic fallback
//! - Filtered vector retrieval over product embeddings (exact or HNSW)
//! - LLM reranking that never drops or invents products
//! - Business rules for budget, stock, categories, colors and sizes
//! - Similar-item and outfit lookups

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod llm;
pub mod models;
pub mod search;

pub use catalog::{InMemoryCatalog, ProductCatalog};
pub use config::{Config, LLMServiceConfig, ProviderKind, RetrievalConfig};
pub use error::{Error, Result, TizzlError};
pub use index::{index_products, InMemoryVectorIndex, IndexEntry, VectorIndex};
pub use llm::{
    build_embedder, build_generator, AnthropicClient, ChatMessage, Embedder, HashEmbedder,
    HttpEmbedder, MetricsSnapshot, MockGenerator, OpenAIClient, TextGenerator,
};
pub use models::{Category, Occasion, Product, ProductAttributes, Season, StyleRequest};
pub use search::{
    Candidate, CandidateMetadata, CachedRetriever, DegradedFlags, FilterPredicate, OutfitPair,
    OutfitPlanner, PipelineState, RankedProduct, RetrievalDiagnostics, RetrievalOrchestrator,
    RetrievalOutput,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "tizzl";
