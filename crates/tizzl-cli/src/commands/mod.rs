//! CLI command handlers

pub mod config;
pub mod outfits;
pub mod search;
pub mod similar;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tizzl_core::{
    build_embedder, build_generator, index_products, Config, InMemoryCatalog,
    InMemoryVectorIndex, ProductCatalog, RetrievalOrchestrator, TextGenerator,
};

/// Orchestrator plus the generator it was built with
pub struct Pipeline {
    pub orchestrator: RetrievalOrchestrator,
    pub generator: Arc<dyn TextGenerator>,
}

impl Pipeline {
    /// Log provider request counters, visible with --verbose
    pub fn log_metrics(&self) {
        if let Some(m) = self.generator.metrics() {
            tracing::info!(
                "{}: {} requests, {} errors, {} cache hits, {:.0}ms avg latency",
                self.generator.model_name(),
                m.total_requests,
                m.total_errors,
                m.cache_hits,
                m.avg_latency_ms
            );
        }
    }
}

/// Load a catalog file, embed it into a fresh index and wire the pipeline
pub async fn load_pipeline(config: &Config, catalog_path: &Path) -> Result<Pipeline> {
    let products = InMemoryCatalog::load_json(catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;

    let embedder = build_embedder(&config.llm_service)?;
    let generator = build_generator(&config.llm_service)?;

    let index = Arc::new(InMemoryVectorIndex::new());
    let indexed = index_products(&products, embedder.as_ref(), index.as_ref()).await?;
    tracing::info!("Indexed {} products with {}", indexed, embedder.model_name());

    let catalog: Arc<dyn ProductCatalog> = Arc::new(InMemoryCatalog::from_products(products));
    let orchestrator = RetrievalOrchestrator::new(
        config.retrieval.clone(),
        embedder,
        Some(Arc::clone(&generator)),
        index,
        Some(catalog),
    )?;
    Ok(Pipeline {
        orchestrator,
        generator,
    })
}
