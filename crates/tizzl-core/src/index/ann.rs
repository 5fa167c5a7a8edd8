//! HNSW approximate nearest neighbor index for vector search

use super::cosine_distance;
use instant_distance::{Builder, HnswMap, Search};

/// Minimum entry count to justify building an ANN index.
/// Below this threshold, brute-force is fast enough.
pub const ANN_THRESHOLD: usize = 1000;

/// Wrapper for f32 vectors implementing instant_distance::Point
#[derive(Clone)]
struct EmbeddingPoint {
    values: Vec<f32>,
}

impl instant_distance::Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        cosine_distance(&self.values, &other.values)
    }
}

/// HNSW-backed approximate nearest neighbor index over product ids
pub struct AnnIndex {
    map: HnswMap<EmbeddingPoint, String>,
    len: usize,
}

impl AnnIndex {
    /// Build from (id, vector) pairs
    pub fn build<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let (points, keys): (Vec<EmbeddingPoint>, Vec<String>) = entries
            .into_iter()
            .map(|(key, values)| (EmbeddingPoint { values }, key))
            .unzip();
        let len = keys.len();

        let map = Builder::default().build(points, keys);
        tracing::info!("Built ANN index with {} embeddings", len);

        Self { map, len }
    }

    /// Up to `k` approximate nearest neighbours as (id, cosine distance)
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(String, f32)> {
        let query_point = EmbeddingPoint {
            values: query.to_vec(),
        };
        let mut search = Search::default();

        self.map
            .search(&query_point, &mut search)
            .take(k)
            .map(|item| (item.value.clone(), item.distance))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
