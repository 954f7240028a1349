//! Storage boundary: a transactional graph store with a vector index primitive
//!
//! The trait covers the five operations the pipeline and search paths need;
//! `HttpGraphStore` implements it against Neo4j's HTTP transactional Cypher
//! API.

pub mod http;

#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpGraphStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EntityRecord, SimilarityFunction};

/// Which records an embedding pass selects
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionMode {
    /// Records with a non-empty text field and no stored embedding
    #[default]
    MissingEmbedding,
    /// Every record with a non-empty text field (re-embedding)
    All,
}

/// One record's embedding write, applied inside a batch transaction
#[derive(Debug, Clone)]
pub struct EmbeddingWrite {
    pub name: String,
    pub vector: Vec<f32>,
}

/// Declarative vector index parameters
///
/// Dimension and similarity function are immutable once the index exists;
/// a conflicting redeclaration is not reconciled, only surfaced.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: String,
    pub label: String,
    pub property: String,
    pub dimensions: usize,
    pub similarity: SimilarityFunction,
}

/// Reported lifecycle state of a vector index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Populating,
    Online,
    Failed,
}

/// Index state and configuration as reported by the store
#[derive(Debug, Clone)]
pub struct IndexStatus {
    pub state: IndexState,
    pub dimensions: Option<usize>,
    pub similarity: Option<SimilarityFunction>,
}

/// Row returned by a nearest-neighbor query
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub name: String,
    pub bio: Option<String>,
    pub score: f64,
}

/// Transactional graph store operations
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Records eligible for an embedding pass, in a stable order
    async fn fetch_pending(&self, selection: SelectionMode) -> Result<Vec<EntityRecord>>;

    /// Write a batch of embeddings in a single transaction
    ///
    /// Either every write in the batch commits or none do. Returns the
    /// number of records written.
    async fn write_embeddings(&self, batch: &[EmbeddingWrite]) -> Result<usize>;

    /// Declare the vector index if it does not already exist
    async fn create_vector_index(&self, spec: &IndexSpec) -> Result<()>;

    /// State of the named vector index, `None` if it is not visible yet
    async fn vector_index_status(&self, name: &str) -> Result<Option<IndexStatus>>;

    /// Top-k nearest neighbors for a query vector
    async fn query_nearest(&self, index: &str, k: usize, vector: &[f32]) -> Result<Vec<Neighbor>>;
}
