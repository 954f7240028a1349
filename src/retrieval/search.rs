//! Nearest-neighbor semantic search
//!
//! Embeds the query text, validates its dimension, queries the vector index
//! for the top k, and ranks the rows itself: the index is expected to return
//! results already sorted, but the service never relies on that.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graph::GraphStore;
use crate::providers::EmbeddingProvider;
use crate::types::{ScoreOrder, SearchResult, SimilarityFunction};

/// Marker substituted for records without a stored bio
pub const BIO_UNAVAILABLE: &str = "(bio unavailable)";

/// Semantic search service over a named vector index
pub struct SemanticSearch {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    index_name: String,
    dimensions: usize,
    order: ScoreOrder,
}

impl SemanticSearch {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        index_name: impl Into<String>,
        dimensions: usize,
        similarity: SimilarityFunction,
    ) -> Self {
        Self {
            store,
            embedder,
            index_name: index_name.into(),
            dimensions,
            order: similarity.score_order(),
        }
    }

    /// Override the ranking direction derived from the similarity function
    pub fn with_score_order(mut self, order: ScoreOrder) -> Self {
        self.order = order;
        self
    }

    /// Top-k records most similar to the query text
    ///
    /// `k == 0` short-circuits to an empty result without embedding the
    /// query or touching the index.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        if embedding.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        let neighbors = self
            .store
            .query_nearest(&self.index_name, k, &embedding)
            .await?;
        tracing::debug!(
            "Index '{}' returned {} neighbor(s) for k={}",
            self.index_name,
            neighbors.len(),
            k
        );

        let mut results: Vec<SearchResult> = neighbors
            .into_iter()
            .map(|neighbor| SearchResult {
                name: neighbor.name,
                bio: neighbor
                    .bio
                    .unwrap_or_else(|| BIO_UNAVAILABLE.to_string()),
                score: neighbor.score,
            })
            .collect();
        results.sort_by(|a, b| self.compare_scores(a.score, b.score));
        results.truncate(k);
        Ok(results)
    }

    fn compare_scores(&self, a: f64, b: f64) -> Ordering {
        match self.order {
            ScoreOrder::Descending => b.total_cmp(&a),
            ScoreOrder::Ascending => a.total_cmp(&b),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::graph::testing::MemoryGraphStore;
    use crate::graph::{IndexSpec, Neighbor};
    use crate::pipeline::{EmbeddingPipeline, IndexProvisioner};
    use crate::providers::embedding::testing::FakeEmbedder;

    const DIMS: usize = 768;
    const INDEX: &str = "bio_text_embeddings";

    fn scripted(rows: &[(&str, Option<&str>, f64)]) -> Vec<Neighbor> {
        rows.iter()
            .map(|(name, bio, score)| Neighbor {
                name: name.to_string(),
                bio: bio.map(|b| b.to_string()),
                score: *score,
            })
            .collect()
    }

    fn service(store: Arc<MemoryGraphStore>, embedder: Arc<FakeEmbedder>) -> SemanticSearch {
        SemanticSearch::new(store, embedder, INDEX, DIMS, SimilarityFunction::Cosine)
    }

    #[tokio::test]
    async fn zero_k_short_circuits() {
        let store = Arc::new(MemoryGraphStore::new());
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let results = service(store.clone(), embedder.clone())
            .search("anything", 0)
            .await
            .unwrap();

        assert!(results.is_empty());
        assert!(embedder.calls().is_empty());
        assert_eq!(store.query_calls(), 0);
    }

    #[tokio::test]
    async fn wrong_query_dimension_never_reaches_the_index() {
        let store = Arc::new(MemoryGraphStore::new());
        let embedder = Arc::new(FakeEmbedder::new(512));
        let err = service(store.clone(), embedder)
            .search("query", 3)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: DIMS,
                actual: 512
            }
        ));
        assert_eq!(store.query_calls(), 0);
    }

    #[tokio::test]
    async fn results_are_sorted_even_when_the_index_is_not() {
        let store = Arc::new(MemoryGraphStore::new().with_scripted_neighbors(scripted(&[
            ("second", Some("b"), 0.72),
            ("first", Some("a"), 0.95),
            ("third", Some("c"), 0.44),
        ])));
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let results = service(store, embedder).search("query", 3).await.unwrap();

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn euclidean_ranking_prefers_lower_scores() {
        let store = Arc::new(MemoryGraphStore::new().with_scripted_neighbors(scripted(&[
            ("far", Some("a"), 9.3),
            ("near", Some("b"), 0.2),
        ])));
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let results = SemanticSearch::new(
            store,
            embedder,
            INDEX,
            DIMS,
            SimilarityFunction::Euclidean,
        )
        .search("query", 2)
        .await
        .unwrap();

        assert_eq!(results[0].name, "near");
        assert_eq!(results[1].name, "far");
    }

    #[tokio::test]
    async fn score_order_override_takes_precedence() {
        // a store whose euclidean scores are already normalized higher-is-better
        let store = Arc::new(MemoryGraphStore::new().with_scripted_neighbors(scripted(&[
            ("worse", Some("a"), 0.3),
            ("better", Some("b"), 0.9),
        ])));
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let results = SemanticSearch::new(
            store,
            embedder,
            INDEX,
            DIMS,
            SimilarityFunction::Euclidean,
        )
        .with_score_order(ScoreOrder::Descending)
        .search("query", 2)
        .await
        .unwrap();

        assert_eq!(results[0].name, "better");
    }

    #[tokio::test]
    async fn extra_index_rows_are_truncated_to_k() {
        let store = Arc::new(MemoryGraphStore::new().with_scripted_neighbors(scripted(&[
            ("a", Some("a"), 0.9),
            ("b", Some("b"), 0.8),
            ("c", Some("c"), 0.7),
        ])));
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let results = service(store, embedder).search("query", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn missing_bio_yields_the_unavailable_marker() {
        let store = Arc::new(
            MemoryGraphStore::new()
                .with_scripted_neighbors(scripted(&[("ghost", None, 0.5)])),
        );
        let embedder = Arc::new(FakeEmbedder::new(DIMS));
        let results = service(store, embedder).search("query", 1).await.unwrap();

        assert_eq!(results[0].bio, BIO_UNAVAILABLE);
    }

    #[tokio::test]
    async fn embeds_indexes_and_searches_end_to_end() {
        let store = Arc::new(MemoryGraphStore::new().with_records(&[
            (
                "Alice Johnson",
                "Alice Johnson is a seasoned marketing executive with over 15 years of \
                 experience in digital transformation and brand development.",
            ),
            (
                "John Doe",
                "John Doe brings 20 years of financial expertise and specializes in \
                 strategic financial planning and risk management.",
            ),
        ]));
        let embedder = Arc::new(FakeEmbedder::new(DIMS));

        let summary = EmbeddingPipeline::new(store.clone(), embedder.clone(), 5)
            .run()
            .await
            .unwrap();
        assert_eq!(summary.records_processed, 2);
        assert_eq!(store.embedding_of("John Doe").unwrap().len(), DIMS);
        assert_eq!(store.embedding_of("Alice Johnson").unwrap().len(), DIMS);

        let spec = IndexSpec {
            name: INDEX.to_string(),
            label: "Executive".to_string(),
            property: "textEmbedding".to_string(),
            dimensions: DIMS,
            similarity: SimilarityFunction::Cosine,
        };
        IndexProvisioner::new(store.clone(), spec, Duration::from_secs(60))
            .ensure_index()
            .await
            .unwrap();

        let results = service(store, embedder)
            .search("financial risk management", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "John Doe");
    }
}
