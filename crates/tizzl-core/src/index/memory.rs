//! In-process vector index

use super::{cosine_distance, AnnIndex, IndexEntry, VectorIndex, ANN_THRESHOLD};
use crate::error::{Result, TizzlError};
use crate::search::{sort_candidates, Candidate, FilterPredicate};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Over-fetch factor for ANN queries so post-filtering still fills `k`
const ANN_OVERFETCH: usize = 4;

/// Vector index held in memory.
///
/// Small collections are scanned exactly. Once the collection reaches
/// [`ANN_THRESHOLD`] entries an HNSW graph is built lazily and rebuilt
/// after writes; filtered ANN results that cannot fill `k` fall back to
/// the exact scan.
pub struct InMemoryVectorIndex {
    entries: RwLock<BTreeMap<String, IndexEntry>>,
    ann: RwLock<Option<AnnIndex>>,
    ann_threshold: usize,
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::with_ann_threshold(ANN_THRESHOLD)
    }

    /// Override the entry count at which the HNSW graph is used
    pub fn with_ann_threshold(ann_threshold: usize) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            ann: RwLock::new(None),
            ann_threshold,
        }
    }

    fn read_entries(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, IndexEntry>>> {
        self.entries
            .read()
            .map_err(|e| TizzlError::IndexUnavailable(format!("lock poisoned: {}", e)))
    }

    fn write_entries(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, IndexEntry>>> {
        self.entries
            .write()
            .map_err(|e| TizzlError::IndexUnavailable(format!("lock poisoned: {}", e)))
    }

    fn invalidate_ann(&self) {
        if let Ok(mut ann) = self.ann.write() {
            *ann = None;
        }
    }

    fn exact_search(
        entries: &BTreeMap<String, IndexEntry>,
        query: &[f32],
        predicate: &FilterPredicate,
        k: usize,
    ) -> Vec<Candidate> {
        let mut hits: Vec<Candidate> = entries
            .values()
            .filter(|entry| predicate.matches(&entry.metadata))
            .map(|entry| to_candidate(entry, cosine_distance(query, &entry.vector)))
            .collect();
        sort_candidates(&mut hits);
        hits.truncate(k);
        hits
    }

    fn ann_search(
        &self,
        entries: &BTreeMap<String, IndexEntry>,
        query: &[f32],
        predicate: &FilterPredicate,
        k: usize,
    ) -> Result<Option<Vec<Candidate>>> {
        if entries.len() < self.ann_threshold {
            return Ok(None);
        }

        {
            let mut ann = self
                .ann
                .write()
                .map_err(|e| TizzlError::IndexUnavailable(format!("lock poisoned: {}", e)))?;
            if ann.is_none() {
                *ann = Some(AnnIndex::build(
                    entries
                        .values()
                        .map(|entry| (entry.id.clone(), entry.vector.clone())),
                ));
            }
        }

        let ann = self
            .ann
            .read()
            .map_err(|e| TizzlError::IndexUnavailable(format!("lock poisoned: {}", e)))?;
        let Some(ref ann) = *ann else {
            return Ok(None);
        };

        let mut hits: Vec<Candidate> = ann
            .search(query, k.saturating_mul(ANN_OVERFETCH).max(k + 16))
            .into_iter()
            .filter_map(|(id, distance)| entries.get(&id).map(|entry| (entry, distance)))
            .filter(|(entry, _)| predicate.matches(&entry.metadata))
            .map(|(entry, distance)| to_candidate(entry, distance))
            .collect();

        if hits.len() < k {
            tracing::debug!(
                "ANN returned {} filtered hits for k={}, falling back to exact scan",
                hits.len(),
                k
            );
            return Ok(None);
        }

        sort_candidates(&mut hits);
        hits.truncate(k);
        Ok(Some(hits))
    }
}

fn to_candidate(entry: &IndexEntry, distance: f32) -> Candidate {
    Candidate::new(entry.id.clone(), entry.metadata.clone(), distance)
        .with_document(entry.document.clone())
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn len(&self) -> Result<usize> {
        Ok(self.read_entries()?.len())
    }

    async fn search(
        &self,
        query: &[f32],
        predicate: &FilterPredicate,
        k: usize,
    ) -> Result<Vec<Candidate>> {
        predicate.validate()?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let entries = self.read_entries()?;
        if let Some(hits) = self.ann_search(&entries, query, predicate, k)? {
            return Ok(hits);
        }
        Ok(Self::exact_search(&entries, query, predicate, k))
    }

    async fn upsert(&self, new_entries: Vec<IndexEntry>) -> Result<()> {
        if new_entries.is_empty() {
            return Ok(());
        }
        {
            let mut entries = self.write_entries()?;
            for entry in new_entries {
                entries.insert(entry.id.clone(), entry);
            }
        }
        self.invalidate_ann();
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let removed = self.write_entries()?.remove(id).is_some();
        if removed {
            self.invalidate_ann();
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        self.write_entries()?.clear();
        self.invalidate_ann();
        Ok(())
    }

    async fn vector(&self, id: &str) -> Result<Option<Vec<f32>>> {
        Ok(self.read_entries()?.get(id).map(|entry| entry.vector.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use crate::search::CandidateMetadata;

    fn entry(id: &str, vector: Vec<f32>, category: Category, price: f64) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            vector,
            metadata: CandidateMetadata::new(id, category, price),
            document: format!("doc {}", id),
        }
    }

    async fn seeded() -> InMemoryVectorIndex {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(vec![
                entry("A", vec![1.0, 0.0], Category::Tops, 40.0),
                entry("B", vec![0.9, 0.1], Category::Tops, 120.0),
                entry("C", vec![0.0, 1.0], Category::Shoes, 80.0),
                entry("D", vec![0.7, 0.7], Category::Bottoms, 60.0),
            ])
            .await
            .unwrap();
        index
    }

    #[tokio::test]
    async fn test_search_orders_by_distance() {
        let index = seeded().await;
        let hits = index
            .search(&[1.0, 0.0], &FilterPredicate::unconstrained(), 3)
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|c| c.product_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "D"]);
        assert_eq!(hits[0].document, "doc A");
    }

    #[tokio::test]
    async fn test_search_applies_predicate() {
        let index = seeded().await;
        let predicate = FilterPredicate {
            categories: Some(vec![Category::Tops]),
            max_price: Some(100.0),
            in_stock: Some(true),
        };
        let hits = index.search(&[1.0, 0.0], &predicate, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].product_id, "A");
    }

    #[tokio::test]
    async fn test_malformed_predicate_rejected() {
        let index = seeded().await;
        let predicate = FilterPredicate::unconstrained().with_categories(vec![]);
        let result = index.search(&[1.0, 0.0], &predicate, 3).await;
        assert!(matches!(result, Err(TizzlError::MalformedPredicate(_))));
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_remove() {
        let index = seeded().await;
        index
            .upsert(vec![entry("A", vec![0.0, 1.0], Category::Tops, 40.0)])
            .await
            .unwrap();
        assert_eq!(index.len().await.unwrap(), 4);
        assert_eq!(index.vector("A").await.unwrap(), Some(vec![0.0, 1.0]));

        assert!(index.remove("A").await.unwrap());
        assert!(!index.remove("A").await.unwrap());
        assert_eq!(index.len().await.unwrap(), 3);

        index.clear().await.unwrap();
        assert!(index.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_ann_path_matches_exact_top_hit() {
        let index = InMemoryVectorIndex::with_ann_threshold(10);
        let entries: Vec<IndexEntry> = (0..60)
            .map(|i| {
                let angle = i as f32 * 0.05;
                entry(
                    &format!("P{:02}", i),
                    vec![angle.cos(), angle.sin()],
                    Category::Tops,
                    10.0,
                )
            })
            .collect();
        index.upsert(entries).await.unwrap();

        let hits = index
            .search(&[1.0, 0.0], &FilterPredicate::unconstrained(), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].product_id, "P00");
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[tokio::test]
    async fn test_ann_falls_back_when_filter_starves() {
        let index = InMemoryVectorIndex::with_ann_threshold(10);
        let mut entries: Vec<IndexEntry> = (0..50)
            .map(|i| entry(&format!("T{:02}", i), vec![1.0, i as f32 * 0.01], Category::Tops, 10.0))
            .collect();
        entries.push(entry("S1", vec![0.0, 1.0], Category::Shoes, 10.0));
        index.upsert(entries).await.unwrap();

        let predicate = FilterPredicate::unconstrained().with_categories(vec![Category::Shoes]);
        let hits = index.search(&[1.0, 0.0], &predicate, 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].product_id, "S1");
    }
}
