//! Neo4j HTTP transactional Cypher client
//!
//! Every call issues one `tx/commit` request: the statements in a request
//! execute in a single transaction, and a server-reported error means the
//! whole transaction rolled back. That property is what gives the embedding
//! pass its one-transaction-per-batch atomicity.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::types::EntityRecord;

use super::{
    EmbeddingWrite, GraphStore, IndexSpec, IndexState, IndexStatus, Neighbor, SelectionMode,
};

/// Graph store backed by Neo4j's HTTP transactional API
pub struct HttpGraphStore {
    http: reqwest::Client,
    tx_endpoint: String,
    user: String,
    password: String,
    label: String,
    key_property: String,
    text_property: String,
    embedding_property: String,
}

impl HttpGraphStore {
    pub fn new(config: &GraphConfig) -> Self {
        let tx_endpoint = format!(
            "{}/db/{}/tx/commit",
            config.uri.trim_end_matches('/'),
            config.database
        );
        Self {
            http: reqwest::Client::new(),
            tx_endpoint,
            user: config.user.clone(),
            password: config.password.clone(),
            label: config.entity_label.clone(),
            key_property: config.key_property.clone(),
            text_property: config.text_property.clone(),
            embedding_property: config.embedding_property.clone(),
        }
    }

    /// Execute statements in one transaction; errors mean it rolled back
    async fn commit(
        &self,
        statements: Vec<Statement>,
    ) -> std::result::Result<Vec<StatementResult>, String> {
        let response = self
            .http
            .post(&self.tx_endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&TxRequest { statements })
            .send()
            .await
            .map_err(|e| format!("Graph request failed: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Graph request failed ({}): {}", status, body));
        }

        let body: TxResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse graph response: {}", e))?;

        if let Some(err) = body.errors.first() {
            return Err(format!("{}: {}", err.code, err.message));
        }

        Ok(body.results)
    }

    fn pending_statement(&self, selection: SelectionMode) -> String {
        let embedding_clause = match selection {
            SelectionMode::MissingEmbedding => {
                format!(" AND n.`{}` IS NULL", self.embedding_property)
            }
            SelectionMode::All => String::new(),
        };
        format!(
            "MATCH (n:`{label}`) WHERE n.`{text}` IS NOT NULL AND n.`{text}` <> ''{clause} \
             RETURN n.`{key}` AS name, n.`{text}` AS bio ORDER BY name",
            label = self.label,
            text = self.text_property,
            key = self.key_property,
            clause = embedding_clause,
        )
    }

    fn write_statement(&self) -> String {
        format!(
            "UNWIND $rows AS row \
             MATCH (n:`{label}` {{`{key}`: row.name}}) \
             CALL db.create.setNodeVectorProperty(n, $property, row.vector) \
             RETURN count(*) AS written",
            label = self.label,
            key = self.key_property,
        )
    }

    fn create_index_statement(&self, spec: &IndexSpec) -> String {
        format!(
            "CREATE VECTOR INDEX `{name}` IF NOT EXISTS \
             FOR (n:`{label}`) ON (n.`{property}`) \
             OPTIONS {{indexConfig: {{\
             `vector.dimensions`: $dimensions, \
             `vector.similarity_function`: $similarity}}}}",
            name = spec.name,
            label = spec.label,
            property = spec.property,
        )
    }

    fn query_statement(&self) -> String {
        format!(
            "CALL db.index.vector.queryNodes($index, $k, $vector) YIELD node, score \
             RETURN node.`{key}` AS name, node.`{text}` AS bio, score",
            key = self.key_property,
            text = self.text_property,
        )
    }

    /// Declare the uniqueness constraint on the identity key
    pub async fn ensure_key_constraint(&self) -> Result<()> {
        let statement = format!(
            "CREATE CONSTRAINT `{name}` IF NOT EXISTS \
             FOR (n:`{label}`) REQUIRE n.`{key}` IS UNIQUE",
            name = format!("{}_name", self.label.to_lowercase()),
            label = self.label,
            key = self.key_property,
        );
        self.commit(vec![Statement::new(statement)])
            .await
            .map_err(Error::Graph)?;
        Ok(())
    }

    /// Upsert seed records by identity key
    pub async fn upsert_records(&self, records: &[SeedRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let statement = format!(
            "UNWIND $rows AS row \
             MERGE (n:`{label}` {{`{key}`: row.name}}) \
             SET n.title = row.title, n.`{text}` = row.bio \
             RETURN count(*) AS upserted",
            label = self.label,
            key = self.key_property,
            text = self.text_property,
        );
        let rows: Vec<Value> = records
            .iter()
            .map(|r| json!({"name": r.name, "title": r.title, "bio": r.bio}))
            .collect();
        let results = self
            .commit(vec![Statement::with_parameters(
                statement,
                json!({ "rows": rows }),
            )])
            .await
            .map_err(Error::Transaction)?;
        single_count(&results).map_err(Error::Transaction)
    }
}

/// Seed row for the loader binary
#[derive(Debug, Clone)]
pub struct SeedRecord {
    pub name: String,
    pub title: String,
    pub bio: String,
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn fetch_pending(&self, selection: SelectionMode) -> Result<Vec<EntityRecord>> {
        let results = self
            .commit(vec![Statement::new(self.pending_statement(selection))])
            .await
            .map_err(Error::Graph)?;

        let mut records = Vec::new();
        for row in rows(&results) {
            let name = row_string(row, 0)
                .ok_or_else(|| Error::Graph("Record row missing a name".to_string()))?;
            let bio = row_string(row, 1)
                .ok_or_else(|| Error::Graph("Record row missing a bio".to_string()))?;
            records.push(EntityRecord {
                name,
                bio,
                embedding: None,
            });
        }
        Ok(records)
    }

    async fn write_embeddings(&self, batch: &[EmbeddingWrite]) -> Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let rows: Vec<Value> = batch
            .iter()
            .map(|write| json!({"name": write.name, "vector": write.vector}))
            .collect();
        let parameters = json!({
            "rows": rows,
            "property": self.embedding_property,
        });
        let results = self
            .commit(vec![Statement::with_parameters(
                self.write_statement(),
                parameters,
            )])
            .await
            .map_err(Error::Transaction)?;
        single_count(&results).map_err(Error::Transaction)
    }

    async fn create_vector_index(&self, spec: &IndexSpec) -> Result<()> {
        let parameters = json!({
            "dimensions": spec.dimensions,
            "similarity": spec.similarity.as_str(),
        });
        self.commit(vec![Statement::with_parameters(
            self.create_index_statement(spec),
            parameters,
        )])
        .await
        .map_err(Error::IndexCreation)?;
        Ok(())
    }

    async fn vector_index_status(&self, name: &str) -> Result<Option<IndexStatus>> {
        let statement = "SHOW VECTOR INDEXES YIELD name, state, options \
                         RETURN name, state, options";
        let results = self
            .commit(vec![Statement::new(statement.to_string())])
            .await
            .map_err(Error::Graph)?;

        for row in rows(&results) {
            if row_string(row, 0).as_deref() == Some(name) {
                let state = row_string(row, 1).unwrap_or_default();
                let options = row.get(2).cloned().unwrap_or(Value::Null);
                return Ok(Some(status_from_row(&state, &options)));
            }
        }
        Ok(None)
    }

    async fn query_nearest(&self, index: &str, k: usize, vector: &[f32]) -> Result<Vec<Neighbor>> {
        let parameters = json!({
            "index": index,
            "k": k,
            "vector": vector,
        });
        let results = self
            .commit(vec![Statement::with_parameters(
                self.query_statement(),
                parameters,
            )])
            .await
            .map_err(Error::Search)?;

        rows(&results)
            .map(|row| neighbor_from_row(row).map_err(Error::Search))
            .collect()
    }
}

#[derive(serde::Serialize)]
struct TxRequest {
    statements: Vec<Statement>,
}

#[derive(serde::Serialize)]
struct Statement {
    statement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

impl Statement {
    fn new(statement: String) -> Self {
        Self {
            statement,
            parameters: None,
        }
    }

    fn with_parameters(statement: String, parameters: Value) -> Self {
        Self {
            statement,
            parameters: Some(parameters),
        }
    }
}

#[derive(serde::Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(serde::Deserialize)]
struct StatementResult {
    #[allow(dead_code)]
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowData>,
}

#[derive(serde::Deserialize)]
struct RowData {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(serde::Deserialize)]
struct TxError {
    code: String,
    message: String,
}

fn rows(results: &[StatementResult]) -> impl Iterator<Item = &[Value]> {
    results
        .iter()
        .flat_map(|result| result.data.iter().map(|data| data.row.as_slice()))
}

fn row_string(row: &[Value], index: usize) -> Option<String> {
    row.get(index)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn single_count(results: &[StatementResult]) -> std::result::Result<usize, String> {
    rows(results)
        .next()
        .and_then(|row| row.first())
        .and_then(Value::as_u64)
        .map(|count| count as usize)
        .ok_or_else(|| "Count missing from response".to_string())
}

fn neighbor_from_row(row: &[Value]) -> std::result::Result<Neighbor, String> {
    let name = row_string(row, 0).ok_or_else(|| "Result row missing a name".to_string())?;
    let bio = row_string(row, 1);
    let score = row
        .get(2)
        .and_then(Value::as_f64)
        .ok_or_else(|| "Result row missing a score".to_string())?;
    Ok(Neighbor { name, bio, score })
}

fn status_from_row(state: &str, options: &Value) -> IndexStatus {
    let state = match state.to_ascii_uppercase().as_str() {
        "ONLINE" => IndexState::Online,
        "FAILED" => IndexState::Failed,
        _ => IndexState::Populating,
    };
    let index_config = options.get("indexConfig");
    let dimensions = index_config
        .and_then(|config| config.get("vector.dimensions"))
        .and_then(Value::as_u64)
        .map(|d| d as usize);
    let similarity = index_config
        .and_then(|config| config.get("vector.similarity_function"))
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok());
    IndexStatus {
        state,
        dimensions,
        similarity,
    }
}
