//! Filtered vector retrieval (recall stage)

use super::{sort_candidates, Candidate, FilterPredicate};
use crate::config::RetrievalConfig;
use crate::error::{Result, TizzlError};
use crate::index::VectorIndex;
use crate::llm::{Embedder, HashEmbedder};
use std::collections::HashSet;
use std::sync::Arc;

/// Candidates for one query plus how they were obtained
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retrieval {
    /// Ascending distance, ties by product id
    pub candidates: Vec<Candidate>,
    /// Index size observed before searching
    pub index_size: usize,
    /// Query vector came from the hash fallback
    pub embedding_degraded: bool,
    /// Index calls made, including retries
    pub index_attempts: u32,
}

/// Embeds the enriched query and runs the filtered index search
pub struct CandidateRetriever {
    embedder: Arc<dyn Embedder>,
    fallback: HashEmbedder,
    index: Arc<dyn VectorIndex>,
    config: RetrievalConfig,
}

impl CandidateRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        config: RetrievalConfig,
    ) -> Self {
        let fallback = HashEmbedder::new(embedder.dimensions());
        Self {
            embedder,
            fallback,
            index,
            config,
        }
    }

    /// Up to `top_k` candidates matching `predicate`
    pub async fn retrieve(
        &self,
        search_text: &str,
        predicate: &FilterPredicate,
        top_k: usize,
    ) -> Result<Retrieval> {
        let (vector, embedding_degraded) = self.embed_query(search_text).await;
        self.search_vector(&vector, predicate, top_k, embedding_degraded)
            .await
    }

    /// Search with a precomputed query vector
    pub async fn search_vector(
        &self,
        vector: &[f32],
        predicate: &FilterPredicate,
        top_k: usize,
        embedding_degraded: bool,
    ) -> Result<Retrieval> {
        let max_attempts = 1 + self.config.index_retries;
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.search_once(vector, predicate, top_k).await {
                Ok((candidates, index_size)) => {
                    let candidates = self.finish(candidates);
                    tracing::debug!(
                        "Retrieved {} candidates from index of {} (attempt {})",
                        candidates.len(),
                        index_size,
                        attempt
                    );
                    return Ok(Retrieval {
                        candidates,
                        index_size,
                        embedding_degraded,
                        index_attempts: attempt,
                    });
                }
                Err(TizzlError::MalformedPredicate(msg)) => {
                    tracing::warn!("Index rejected predicate: {}", msg);
                    return Err(TizzlError::RetrievalUnavailable(format!(
                        "malformed predicate: {}",
                        msg
                    )));
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    tracing::warn!(
                        "Vector index attempt {}/{} failed ({}), retrying",
                        attempt,
                        max_attempts,
                        e
                    );
                }
                Err(e) => {
                    tracing::warn!("Vector index unavailable after {} attempts: {}", attempt, e);
                    return Err(TizzlError::RetrievalUnavailable(e.to_string()));
                }
            }
        }
    }

    /// Query vector, falling back to a hash embedding on provider failure
    pub async fn embed_query(&self, text: &str) -> (Vec<f32>, bool) {
        let timeout = self.config.embed_timeout();
        match tokio::time::timeout(timeout, self.embedder.embed(text)).await {
            Ok(Ok(vector)) if !vector.is_empty() => (vector, false),
            Ok(Ok(_)) => {
                tracing::warn!("Embedder returned an empty vector, using hash embedding");
                (self.fallback.embed_sync(text), true)
            }
            Ok(Err(e)) => {
                tracing::warn!("Embedding failed ({}), using hash embedding", e);
                (self.fallback.embed_sync(text), true)
            }
            Err(_) => {
                tracing::warn!(
                    "Embedding timed out after {}ms, using hash embedding",
                    timeout.as_millis()
                );
                (self.fallback.embed_sync(text), true)
            }
        }
    }

    async fn search_once(
        &self,
        vector: &[f32],
        predicate: &FilterPredicate,
        top_k: usize,
    ) -> Result<(Vec<Candidate>, usize)> {
        let timeout = self.config.search_timeout();
        let timeout_err = || TizzlError::Timeout(timeout.as_millis() as u64);

        let index_size = tokio::time::timeout(timeout, self.index.len())
            .await
            .map_err(|_| timeout_err())??;
        if index_size == 0 {
            return Ok((Vec::new(), 0));
        }

        let k = top_k.min(index_size);
        let hits = tokio::time::timeout(timeout, self.index.search(vector, predicate, k))
            .await
            .map_err(|_| timeout_err())??;
        Ok((hits, index_size))
    }

    fn finish(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        sort_candidates(&mut candidates);

        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.product_id.clone()));

        if let Some(threshold) = self.config.similarity_threshold {
            let before = candidates.len();
            candidates.retain(|c| c.similarity() >= threshold);
            if candidates.len() < before {
                tracing::debug!(
                    "Similarity threshold {} dropped {} candidates",
                    threshold,
                    before - candidates.len()
                );
            }
        }
        candidates
    }
}
