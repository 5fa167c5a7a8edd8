//! Retrieval orchestration
//!
//! Sequences enhancement, filtering, retrieval, reranking and business
//! rules for a single request, and owns every fallback decision.

use super::{
    BusinessRuleFilter, Candidate, CandidateRetriever, FilterBuilder, FilterPredicate,
    OutfitPlanner, QueryEnhancer, RankedProduct, Reranker,
};
use crate::catalog::ProductCatalog;
use crate::config::RetrievalConfig;
use crate::error::{Result, TizzlError};
use crate::index::VectorIndex;
use crate::llm::{Embedder, TextGenerator};
use crate::models::StyleRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Stage reached by one retrieval call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Enhancing,
    FilteringAndRetrieving,
    Reranking,
    RuleFiltering,
    Done,
    Degraded,
    Failed,
}

/// Stages that fell back to their deterministic alternative
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedFlags {
    pub enhancer: bool,
    pub embedding: bool,
    pub reranker: bool,
    pub catalog: bool,
}

impl DegradedFlags {
    pub fn any(&self) -> bool {
        self.enhancer || self.embedding || self.reranker || self.catalog
    }

    /// Names of the degraded stages
    pub fn stages(&self) -> Vec<&'static str> {
        let mut stages = Vec::new();
        if self.enhancer {
            stages.push("enhancer");
        }
        if self.embedding {
            stages.push("embedding");
        }
        if self.reranker {
            stages.push("reranker");
        }
        if self.catalog {
            stages.push("catalog");
        }
        stages
    }
}

/// Item counts after each stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCount {
    pub retrieved: usize,
    pub fetched: usize,
    pub returned: usize,
}

/// Observability record for one retrieval call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalDiagnostics {
    pub search_text: String,
    pub keywords: Vec<String>,
    pub predicate: FilterPredicate,
    pub counts: StageCount,
    pub index_size: usize,
    /// The index held no vectors at all
    pub empty_catalog: bool,
    pub reranked: bool,
    pub degraded: DegradedFlags,
    pub transitions: Vec<PipelineState>,
    pub final_state: PipelineState,
    pub cache_hit: bool,
    pub elapsed_ms: u64,
}

impl Default for RetrievalDiagnostics {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            keywords: Vec::new(),
            predicate: FilterPredicate::default(),
            counts: StageCount::default(),
            index_size: 0,
            empty_catalog: false,
            reranked: false,
            degraded: DegradedFlags::default(),
            transitions: vec![PipelineState::Init],
            final_state: PipelineState::Init,
            cache_hit: false,
            elapsed_ms: 0,
        }
    }
}

impl RetrievalDiagnostics {
    fn enter(&mut self, state: PipelineState) {
        tracing::debug!("Pipeline state: {:?}", state);
        self.transitions.push(state);
        self.final_state = state;
    }

    fn finish(&mut self, started: Instant) {
        let state = if self.degraded.any() {
            PipelineState::Degraded
        } else {
            PipelineState::Done
        };
        self.enter(state);
        self.elapsed_ms = started.elapsed().as_millis() as u64;
    }
}

/// Ranked products plus diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutput {
    pub products: Vec<RankedProduct>,
    pub diagnostics: RetrievalDiagnostics,
}

impl RetrievalOutput {
    pub fn product_ids(&self) -> Vec<&str> {
        self.products
            .iter()
            .map(|r| r.product.product_id.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Runs the retrieval pipeline for styling requests.
///
/// Providers are injected at construction; the orchestrator holds no
/// per-request state, so one instance serves concurrent requests.
pub struct RetrievalOrchestrator {
    config: RetrievalConfig,
    enhancer: QueryEnhancer,
    filter_builder: FilterBuilder,
    retriever: Arc<CandidateRetriever>,
    reranker: Reranker,
    rules: BusinessRuleFilter,
    index: Arc<dyn VectorIndex>,
    catalog: Option<Arc<dyn ProductCatalog>>,
}

impl RetrievalOrchestrator {
    pub fn new(
        config: RetrievalConfig,
        embedder: Arc<dyn Embedder>,
        generator: Option<Arc<dyn TextGenerator>>,
        index: Arc<dyn VectorIndex>,
        catalog: Option<Arc<dyn ProductCatalog>>,
    ) -> Result<Self> {
        config.validate()?;

        let attempts = config.generation_attempts();
        let enhancer =
            QueryEnhancer::new(generator.clone(), config.generate_timeout(), attempts);
        let reranker = Reranker::new(
            generator,
            config.generate_timeout(),
            attempts,
            config.max_rerank_candidates,
        );
        let retriever = Arc::new(CandidateRetriever::new(
            embedder,
            Arc::clone(&index),
            config.clone(),
        ));

        Ok(Self {
            config,
            enhancer,
            filter_builder: FilterBuilder::new(),
            retriever,
            reranker,
            rules: BusinessRuleFilter::new(),
            index,
            catalog,
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Similar-item and outfit lookups sharing this pipeline's providers
    pub fn outfit_planner(&self) -> OutfitPlanner {
        OutfitPlanner::new(
            Arc::clone(&self.retriever),
            Arc::clone(&self.index),
            self.catalog.clone(),
            self.config.search_timeout(),
        )
    }

    /// Run the pipeline, aborting with `Cancelled` when `cancel` resolves first
    pub async fn retrieve_products_until<F>(
        &self,
        request: &StyleRequest,
        cancel: F,
    ) -> Result<RetrievalOutput>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => {
                tracing::info!("Retrieval cancelled by caller");
                Err(TizzlError::Cancelled)
            }
            result = self.retrieve_products(request) => result,
        }
    }

    /// Run the full pipeline for one request
    pub async fn retrieve_products(&self, request: &StyleRequest) -> Result<RetrievalOutput> {
        let started = Instant::now();
        request.validate()?;
        let predicate = self.filter_builder.build(request)?;

        let mut diag = RetrievalDiagnostics {
            predicate: predicate.clone(),
            ..Default::default()
        };

        diag.enter(PipelineState::Enhancing);
        let enhanced = self.enhancer.enhance(&request.query).await;
        diag.degraded.enhancer = enhanced.degraded;
        diag.keywords = enhanced.keywords;
        diag.search_text = with_occasion(enhanced.search_text, request.occasion.as_deref());

        diag.enter(PipelineState::FilteringAndRetrieving);
        let retrieval = match self
            .retriever
            .retrieve(&diag.search_text, &predicate, self.config.recall_top_k)
            .await
        {
            Ok(retrieval) => retrieval,
            Err(e) => {
                diag.enter(PipelineState::Failed);
                tracing::warn!("Retrieval failed for '{}': {}", request.query, e);
                return Err(e);
            }
        };
        diag.degraded.embedding = retrieval.embedding_degraded;
        diag.index_size = retrieval.index_size;
        diag.counts.retrieved = retrieval.candidates.len();

        if retrieval.index_size == 0 {
            tracing::info!("Vector index is empty, returning no products");
            diag.empty_catalog = true;
            diag.finish(started);
            return Ok(RetrievalOutput {
                products: Vec::new(),
                diagnostics: diag,
            });
        }

        let final_size = self.config.final_size(request.max_results);
        let threshold = self.config.rerank_threshold_for(final_size);
        let mut candidates = retrieval.candidates;

        if candidates.len() > threshold {
            diag.enter(PipelineState::Reranking);
            let outcome = self.reranker.rerank(&request.query, candidates).await;
            diag.reranked = outcome.invoked;
            diag.degraded.reranker = outcome.degraded;
            candidates = outcome.candidates;
        } else {
            tracing::debug!(
                "Skipping rerank: {} candidates <= threshold {}",
                candidates.len(),
                threshold
            );
        }

        diag.enter(PipelineState::RuleFiltering);
        let (products, catalog_degraded) = materialize(
            self.catalog.as_deref(),
            candidates,
            self.config.search_timeout(),
        )
        .await;
        diag.degraded.catalog = catalog_degraded;
        diag.counts.fetched = products.len();

        let mut products = self.rules.apply(products, request, final_size);
        for (i, ranked) in products.iter_mut().enumerate() {
            ranked.rank = i + 1;
        }
        diag.counts.returned = products.len();
        diag.finish(started);

        tracing::info!(
            "Retrieved {} products for '{}' ({} candidates, reranked: {}, degraded: {:?}) in {}ms",
            products.len(),
            request.query,
            diag.counts.retrieved,
            diag.reranked,
            diag.degraded.stages(),
            diag.elapsed_ms
        );

        Ok(RetrievalOutput {
            products,
            diagnostics: diag,
        })
    }
}

/// Append the occasion tag when the search text does not mention it yet
fn with_occasion(search_text: String, occasion: Option<&str>) -> String {
    match occasion.map(str::trim).filter(|o| !o.is_empty()) {
        Some(occasion)
            if !search_text
                .to_lowercase()
                .contains(&occasion.to_lowercase()) =>
        {
            format!("{} {}", search_text, occasion)
        }
        _ => search_text,
    }
}

/// Resolve candidates to full products, keeping candidate order.
///
/// Uses the catalog when one is wired and it answers in time; otherwise
/// builds products from the metadata snapshots. The flag reports a
/// catalog failure.
pub(crate) async fn materialize(
    catalog: Option<&dyn ProductCatalog>,
    candidates: Vec<Candidate>,
    timeout: Duration,
) -> (Vec<RankedProduct>, bool) {
    let snapshot = |candidates: Vec<Candidate>| -> Vec<RankedProduct> {
        candidates
            .into_iter()
            .enumerate()
            .map(|(i, c)| RankedProduct {
                rank: i + 1,
                product: c.to_product(),
                distance: c.distance,
            })
            .collect()
    };

    let Some(catalog) = catalog else {
        return (snapshot(candidates), false);
    };
    if candidates.is_empty() {
        return (Vec::new(), false);
    }

    let ids: Vec<String> = candidates.iter().map(|c| c.product_id.clone()).collect();
    let fetched = match tokio::time::timeout(timeout, catalog.fetch_products_by_ids(&ids)).await {
        Ok(Ok(products)) => products,
        Ok(Err(e)) => {
            tracing::warn!("Catalog fetch failed ({}), using index snapshots", e);
            return (snapshot(candidates), true);
        }
        Err(_) => {
            tracing::warn!(
                "Catalog fetch timed out after {}ms, using index snapshots",
                timeout.as_millis()
            );
            return (snapshot(candidates), true);
        }
    };

    let mut by_id: HashMap<String, _> = fetched
        .into_iter()
        .map(|p| (p.product_id.clone(), p))
        .collect();
    let missing = candidates.len().saturating_sub(by_id.len());
    if missing > 0 {
        tracing::debug!("{} candidates no longer in the catalog", missing);
    }

    let products = candidates
        .into_iter()
        .filter_map(|c| by_id.remove(&c.product_id).map(|p| (p, c.distance)))
        .enumerate()
        .map(|(i, (product, distance))| RankedProduct {
            rank: i + 1,
            product,
            distance,
        })
        .collect();
    (products, false)
}
