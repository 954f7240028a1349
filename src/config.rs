//! Environment-driven configuration for the pipeline and search binaries

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::SimilarityFunction;

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Full application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub graph: GraphConfig,
    pub vertex: VertexConfig,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Load the full configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        let get = |key: &str| std::env::var(key).ok();
        Self::from_lookup(&get)
    }

    fn from_lookup(get: Lookup<'_>) -> Result<Self> {
        Ok(Self {
            graph: GraphConfig::from_lookup(get)?,
            vertex: VertexConfig::from_lookup(get)?,
            pipeline: PipelineConfig::from_lookup(get)?,
        })
    }
}

/// Graph store connection and schema configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// HTTP endpoint of the graph database (e.g. `http://localhost:7474`)
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Node label carrying the text records
    pub entity_label: String,
    /// Unique identity property
    pub key_property: String,
    /// Free-text property embeddings are derived from
    pub text_property: String,
    /// Vector property the pipeline writes
    pub embedding_property: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: "http://localhost:7474".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            entity_label: "Executive".to_string(),
            key_property: "full_name".to_string(),
            text_property: "bio".to_string(),
            embedding_property: "textEmbedding".to_string(),
        }
    }
}

impl GraphConfig {
    /// Load graph settings from process environment variables
    pub fn from_env() -> Result<Self> {
        let get = |key: &str| std::env::var(key).ok();
        Self::from_lookup(&get)
    }

    fn from_lookup(get: Lookup<'_>) -> Result<Self> {
        Ok(Self {
            uri: required(get, "NEO4J_URI")?,
            user: required(get, "NEO4J_USER")?,
            password: required(get, "NEO4J_PASSWORD")?,
            database: get("NEO4J_DATABASE").unwrap_or_else(|| "neo4j".to_string()),
            ..Self::default()
        })
    }
}

/// Vertex AI embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexConfig {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub task_type: String,
    /// Path to the service account JSON key
    pub key_path: PathBuf,
}

impl VertexConfig {
    fn from_lookup(get: Lookup<'_>) -> Result<Self> {
        Ok(Self {
            project_id: required(get, "GOOGLE_PROJECT_ID")?,
            location: get("GOOGLE_LOCATION").unwrap_or_else(|| "us-central1".to_string()),
            model: get("VERTEX_MODEL").unwrap_or_else(|| "textembedding-gecko@003".to_string()),
            task_type: get("VERTEX_TASK_TYPE").unwrap_or_else(|| "CLUSTERING".to_string()),
            key_path: PathBuf::from(required(get, "GOOGLE_APPLICATION_CREDENTIALS")?),
        })
    }
}

/// Embedding pass and index provisioning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum records per embedding call and per write transaction
    pub batch_size: usize,
    pub vector_dimensions: usize,
    pub similarity: SimilarityFunction,
    pub index_name: String,
    pub index_wait_timeout_secs: u64,
    /// Batches dispatched concurrently; 1 means strictly sequential
    pub max_concurrent_batches: usize,
    /// Re-embed every qualifying record instead of only unembedded ones
    pub reembed_all: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            vector_dimensions: 768,
            similarity: SimilarityFunction::Cosine,
            index_name: "bio_text_embeddings".to_string(),
            index_wait_timeout_secs: 300,
            max_concurrent_batches: 1,
            reembed_all: false,
        }
    }
}

impl PipelineConfig {
    fn from_lookup(get: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            batch_size: parse_or(get, "BATCH_SIZE", defaults.batch_size)?,
            vector_dimensions: parse_or(get, "VECTOR_DIMENSIONS", defaults.vector_dimensions)?,
            similarity: parse_or(get, "SIMILARITY_FUNCTION", defaults.similarity)?,
            index_name: get("INDEX_NAME").unwrap_or(defaults.index_name),
            index_wait_timeout_secs: parse_or(
                get,
                "INDEX_WAIT_TIMEOUT",
                defaults.index_wait_timeout_secs,
            )?,
            max_concurrent_batches: parse_or(
                get,
                "MAX_CONCURRENT_BATCHES",
                defaults.max_concurrent_batches,
            )?,
            reembed_all: parse_or(get, "REEMBED_ALL", defaults.reembed_all)?,
        })
    }
}

fn required(get: Lookup<'_>, key: &str) -> Result<String> {
    get(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config(format!("{} is not set", key)))
}

fn parse_or<T>(get: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}
