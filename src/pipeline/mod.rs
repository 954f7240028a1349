//! Embedding pass orchestration and vector index provisioning

pub mod embed_pass;
pub mod index;

pub use embed_pass::{EmbeddingPipeline, PassSummary};
pub use index::IndexProvisioner;
