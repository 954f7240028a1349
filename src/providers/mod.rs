//! Provider abstractions for credentials and embeddings
//!
//! Trait seams keep the pipeline and search service independent of the
//! concrete cloud backend and enable test doubles.

pub mod credentials;
pub mod embedding;
pub mod gcp;

pub use credentials::CredentialProvider;
pub use embedding::EmbeddingProvider;
