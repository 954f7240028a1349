//! bio-semsearch: embedding pipeline and semantic search for graph-stored bios
//!
//! Populates vector embeddings for textual entity records held in a graph
//! database, provisions a vector similarity index over them, and answers
//! top-k nearest-neighbor queries against that index. Embeddings come from
//! Vertex AI behind a provider trait; the graph store is reached through its
//! HTTP transactional Cypher API behind a store trait, so both can be
//! swapped for doubles.

pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use pipeline::{EmbeddingPipeline, IndexProvisioner, PassSummary};
pub use retrieval::SemanticSearch;
pub use types::{EntityRecord, SearchResult, SimilarityFunction};
