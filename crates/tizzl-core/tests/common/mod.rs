//! Counting providers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tizzl_core::error::{Result, TizzlError};
use tizzl_core::index::{index_products, InMemoryVectorIndex, IndexEntry, VectorIndex};
use tizzl_core::search::{Candidate, FilterPredicate};
use tizzl_core::{
    Category, ChatMessage, Embedder, HashEmbedder, InMemoryCatalog, MockGenerator, Product,
    RetrievalConfig, RetrievalOrchestrator, TextGenerator,
};

pub const DIMS: usize = 32;

/// How a [`CountingGenerator`] answers
pub enum Behaviour {
    /// Canned offline answers
    Mock,
    /// Ranks listed products in reverse and invents one extra id;
    /// keyword prompts get the mock answer
    ReverseWithInjection,
    /// Every call fails
    Fail,
    /// Sleeps far longer than any test timeout
    Hang,
}

/// Text generator that records every prompt it receives
pub struct CountingGenerator {
    behaviour: Behaviour,
    prompts: Mutex<Vec<String>>,
}

impl CountingGenerator {
    pub fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts that asked for a ranking
    pub fn rerank_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains("PRODUCTS:"))
            .cloned()
            .collect()
    }
}

fn listed_ids(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .filter_map(|l| l.strip_prefix("- ID: "))
        .filter_map(|l| l.split(" | ").next())
        .map(|s| s.to_string())
        .collect()
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let prompt = messages
            .iter()
            .filter(|m| m.role == "user")
            .map(|m| m.content.clone())
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt.clone());

        match self.behaviour {
            Behaviour::Mock => MockGenerator::new().generate(messages).await,
            Behaviour::ReverseWithInjection => {
                if prompt.contains("PRODUCTS:") {
                    let mut ids = listed_ids(&prompt);
                    ids.reverse();
                    ids.insert(1, "INJECTED-999".to_string());
                    Ok(serde_json::json!({ "ranking": ids }).to_string())
                } else {
                    MockGenerator::new().generate(messages).await
                }
            }
            Behaviour::Fail => Err(TizzlError::ProviderUnavailable("503".into())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }

    fn model_name(&self) -> &str {
        "counting"
    }
}

/// Hash embedder that counts calls and can be switched to fail
pub struct CountingEmbedder {
    inner: HashEmbedder,
    fail: bool,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: HashEmbedder::new(DIMS),
            fail,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TizzlError::ProviderUnavailable("embeddings down".into()));
        }
        self.inner.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TizzlError::ProviderUnavailable("embeddings down".into()));
        }
        self.inner.embed_batch(texts).await
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn model_name(&self) -> &str {
        "counting-embedder"
    }
}

/// Index wrapper that fails the first `failures` searches
pub struct FlakyIndex {
    inner: InMemoryVectorIndex,
    failures: usize,
    searches: AtomicUsize,
}

impl FlakyIndex {
    pub fn new(inner: InMemoryVectorIndex, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            inner,
            failures,
            searches: AtomicUsize::new(0),
        })
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    async fn len(&self) -> Result<usize> {
        self.inner.len().await
    }

    async fn search(
        &self,
        query: &[f32],
        predicate: &FilterPredicate,
        k: usize,
    ) -> Result<Vec<Candidate>> {
        let n = self.searches.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(TizzlError::IndexUnavailable("connection reset".into()));
        }
        self.inner.search(query, predicate, k).await
    }

    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()> {
        self.inner.upsert(entries).await
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        self.inner.remove(id).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }

    async fn vector(&self, id: &str) -> Result<Option<Vec<f32>>> {
        self.inner.vector(id).await
    }
}

pub fn product(id: &str, name: &str, category: Category, price: f64) -> Product {
    Product::new(id, name, category, price)
}

/// `count` in-stock tops with distinct names
pub fn tops(count: usize) -> Vec<Product> {
    (0..count)
        .map(|i| {
            product(
                &format!("TOP-{:02}", i),
                &format!("Going out top style {}", i),
                Category::Tops,
                20.0 + i as f64,
            )
        })
        .collect()
}

/// Index populated with hash embeddings of `products`
pub async fn seeded_index(products: &[Product]) -> InMemoryVectorIndex {
    let index = InMemoryVectorIndex::new();
    index_products(products, &HashEmbedder::new(DIMS), &index)
        .await
        .unwrap();
    index
}

pub struct Pipeline {
    pub orchestrator: RetrievalOrchestrator,
    pub generator: Arc<CountingGenerator>,
    pub embedder: Arc<CountingEmbedder>,
}

pub async fn pipeline(
    products: Vec<Product>,
    behaviour: Behaviour,
    config: RetrievalConfig,
) -> Pipeline {
    let index = Arc::new(seeded_index(&products).await);
    pipeline_with_index(index, Some(products), behaviour, false, config)
}

pub fn pipeline_with_index(
    index: Arc<dyn VectorIndex>,
    catalog: Option<Vec<Product>>,
    behaviour: Behaviour,
    failing_embedder: bool,
    config: RetrievalConfig,
) -> Pipeline {
    let generator = CountingGenerator::new(behaviour);
    let embedder = CountingEmbedder::new(failing_embedder);
    let catalog = catalog.map(|products| {
        Arc::new(InMemoryCatalog::from_products(products)) as Arc<dyn tizzl_core::ProductCatalog>
    });

    let orchestrator = RetrievalOrchestrator::new(
        config,
        embedder.clone(),
        Some(generator.clone()),
        index,
        catalog,
    )
    .unwrap();

    Pipeline {
        orchestrator,
        generator,
        embedder,
    }
}
