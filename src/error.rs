//! Error types for the embedding pipeline and search service

use thiserror::Error;

/// Result type alias for pipeline and search operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline and search errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential acquisition or refresh failure
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Embedding provider error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// A returned vector does not have the configured dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Graph store read failure
    #[error("Graph query failed: {0}")]
    Graph(String),

    /// Storage write transaction failure; the batch rolled back
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// An embedding pass aborted partway; earlier batches stay committed
    #[error("Embedding pass aborted after {batches_committed} committed batch(es): {source}")]
    EmbeddingPass {
        batches_committed: usize,
        #[source]
        source: Box<Error>,
    },

    /// Vector index declaration rejected or index configuration conflict
    #[error("Vector index creation failed: {0}")]
    IndexCreation(String),

    /// Vector index did not come online within the configured bound
    #[error("Vector index '{name}' not online within {timeout_secs}s")]
    IndexTimeout { name: String, timeout_secs: u64 },

    /// Query-time failure against the vector index
    #[error("Semantic search failed: {0}")]
    Search(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }
}
