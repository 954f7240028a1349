//! In-memory `GraphStore` double for pipeline and search tests

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::types::EntityRecord;

use super::{
    EmbeddingWrite, GraphStore, IndexSpec, IndexState, IndexStatus, Neighbor, SelectionMode,
};

#[derive(Debug, Clone)]
struct StoredRecord {
    name: String,
    bio: String,
    embedding: Option<Vec<f32>>,
}

struct StoredIndex {
    spec: IndexSpec,
    polls_remaining: usize,
}

/// In-memory store with scripted failures and call accounting
#[derive(Default)]
pub struct MemoryGraphStore {
    records: Mutex<Vec<StoredRecord>>,
    index: Mutex<Option<StoredIndex>>,
    scripted_neighbors: Mutex<Vec<Neighbor>>,
    fail_write_on_call: Option<usize>,
    polls_until_online: usize,
    write_calls: Mutex<usize>,
    query_calls: Mutex<usize>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, records: &[(&str, &str)]) -> Self {
        *self.records.lock() = records
            .iter()
            .map(|(name, bio)| StoredRecord {
                name: name.to_string(),
                bio: bio.to_string(),
                embedding: None,
            })
            .collect();
        self
    }

    /// Pre-create an index that is already online
    pub fn with_existing_index(self, spec: IndexSpec) -> Self {
        *self.index.lock() = Some(StoredIndex {
            spec,
            polls_remaining: 0,
        });
        self
    }

    /// A newly created index reports online after this many status polls
    pub fn with_polls_until_online(mut self, polls: usize) -> Self {
        self.polls_until_online = polls;
        self
    }

    /// A newly created index never reports online
    pub fn never_online(mut self) -> Self {
        self.polls_until_online = usize::MAX;
        self
    }

    /// Fail the n-th `write_embeddings` call (1-based)
    pub fn with_write_failure_on_call(mut self, call: usize) -> Self {
        self.fail_write_on_call = Some(call);
        self
    }

    /// Return these rows from `query_nearest` instead of computing them
    pub fn with_scripted_neighbors(self, neighbors: Vec<Neighbor>) -> Self {
        *self.scripted_neighbors.lock() = neighbors;
        self
    }

    pub fn write_calls(&self) -> usize {
        *self.write_calls.lock()
    }

    pub fn query_calls(&self) -> usize {
        *self.query_calls.lock()
    }

    pub fn embedding_of(&self, name: &str) -> Option<Vec<f32>> {
        self.records
            .lock()
            .iter()
            .find(|record| record.name == name)
            .and_then(|record| record.embedding.clone())
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        f64::from(dot / (norm_a * norm_b))
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn fetch_pending(&self, selection: SelectionMode) -> Result<Vec<EntityRecord>> {
        Ok(self
            .records
            .lock()
            .iter()
            .filter(|record| !record.bio.is_empty())
            .filter(|record| match selection {
                SelectionMode::MissingEmbedding => record.embedding.is_none(),
                SelectionMode::All => true,
            })
            .map(|record| EntityRecord {
                name: record.name.clone(),
                bio: record.bio.clone(),
                embedding: None,
            })
            .collect())
    }

    async fn write_embeddings(&self, batch: &[EmbeddingWrite]) -> Result<usize> {
        let call_number = {
            let mut calls = self.write_calls.lock();
            *calls += 1;
            *calls
        };
        if self.fail_write_on_call == Some(call_number) {
            return Err(Error::Transaction(
                "injected batch write failure".to_string(),
            ));
        }

        let mut records = self.records.lock();
        let mut written = 0;
        for write in batch {
            if let Some(record) = records.iter_mut().find(|r| r.name == write.name) {
                record.embedding = Some(write.vector.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn create_vector_index(&self, spec: &IndexSpec) -> Result<()> {
        let mut index = self.index.lock();
        // IF NOT EXISTS: redeclaration is a no-op, even with other parameters
        if index.is_none() {
            *index = Some(StoredIndex {
                spec: spec.clone(),
                polls_remaining: self.polls_until_online,
            });
        }
        Ok(())
    }

    async fn vector_index_status(&self, name: &str) -> Result<Option<IndexStatus>> {
        let mut index = self.index.lock();
        Ok(index.as_mut().filter(|stored| stored.spec.name == name).map(
            |stored| {
                let state = if stored.polls_remaining == 0 {
                    IndexState::Online
                } else {
                    stored.polls_remaining = stored.polls_remaining.saturating_sub(1);
                    IndexState::Populating
                };
                IndexStatus {
                    state,
                    dimensions: Some(stored.spec.dimensions),
                    similarity: Some(stored.spec.similarity),
                }
            },
        ))
    }

    async fn query_nearest(&self, _index: &str, k: usize, vector: &[f32]) -> Result<Vec<Neighbor>> {
        *self.query_calls.lock() += 1;

        let scripted = self.scripted_neighbors.lock();
        if !scripted.is_empty() {
            return Ok(scripted.clone());
        }
        drop(scripted);

        let records = self.records.lock();
        let mut neighbors: Vec<Neighbor> = records
            .iter()
            .filter_map(|record| {
                record.embedding.as_ref().map(|embedding| Neighbor {
                    name: record.name.clone(),
                    bio: Some(record.bio.clone()),
                    score: cosine(embedding, vector),
                })
            })
            .collect();
        neighbors.sort_by(|a, b| b.score.total_cmp(&a.score));
        neighbors.truncate(k);
        Ok(neighbors)
    }
}
