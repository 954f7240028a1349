//! Vertex AI embedding provider
//!
//! One `:predict` request per batch. The response maps positionally onto the
//! input texts; every returned vector is checked against the configured
//! dimension before it reaches a caller.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::VertexConfig;
use crate::error::{Error, Result};
use crate::providers::credentials::CredentialProvider;
use crate::providers::embedding::EmbeddingProvider;

/// Vertex AI embedding provider
pub struct VertexAiEmbedder {
    creds: Arc<dyn CredentialProvider>,
    http: reqwest::Client,
    project_id: String,
    location: String,
    model: String,
    task_type: String,
    dimensions: usize,
}

impl VertexAiEmbedder {
    pub fn new(
        creds: Arc<dyn CredentialProvider>,
        config: &VertexConfig,
        dimensions: usize,
    ) -> Self {
        Self {
            creds,
            http: reqwest::Client::new(),
            project_id: config.project_id.clone(),
            location: config.location.clone(),
            model: config.model.clone(),
            task_type: config.task_type.clone(),
            dimensions,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}-aiplatform.googleapis.com/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.location, self.project_id, self.location, self.model
        )
    }

    async fn predict(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.creds.get_token().await?;

        let request = PredictRequest {
            instances: texts
                .iter()
                .map(|text| Instance {
                    content: text.clone(),
                    task_type: self.task_type.clone(),
                })
                .collect(),
            parameters: Parameters {
                dimension: self.dimensions,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(token.secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Vertex AI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Vertex AI embedding failed ({}): {}",
                status, body
            )));
        }

        let decoded: PredictResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse Vertex AI response: {}", e)))?;

        let vectors: Vec<Vec<f32>> = decoded
            .predictions
            .into_iter()
            .map(|p| p.embeddings.values)
            .collect();

        validate_vectors(texts.len(), &vectors, self.dimensions)?;
        Ok(vectors)
    }
}

/// Check positional count and per-vector dimension of a provider response
fn validate_vectors(expected_count: usize, vectors: &[Vec<f32>], dimensions: usize) -> Result<()> {
    if vectors.len() != expected_count {
        return Err(Error::Embedding(format!(
            "Provider returned {} vector(s) for {} text(s)",
            vectors.len(),
            expected_count
        )));
    }
    for vector in vectors {
        if vector.len() != dimensions {
            return Err(Error::DimensionMismatch {
                expected: dimensions,
                actual: vector.len(),
            });
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
struct PredictRequest {
    instances: Vec<Instance>,
    parameters: Parameters,
}

#[derive(serde::Serialize)]
struct Instance {
    content: String,
    #[serde(rename = "taskType")]
    task_type: String,
}

#[derive(serde::Serialize)]
struct Parameters {
    dimension: usize,
}

#[derive(serde::Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(serde::Deserialize)]
struct Prediction {
    embeddings: EmbeddingValues,
}

#[derive(serde::Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for VertexAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = [text.to_string()];
        let mut vectors = self.predict(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("No embedding in response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.predict(texts).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "vertex-ai"
    }
}
