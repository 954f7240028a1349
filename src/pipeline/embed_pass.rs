//! Batch embedding orchestrator
//!
//! Selects records lacking embeddings, partitions them into batches, embeds
//! each batch with one provider call, and writes each batch back in its own
//! transaction. Re-running a pass is idempotent: the selection excludes
//! records that already carry an embedding.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::graph::{EmbeddingWrite, GraphStore, SelectionMode};
use crate::providers::EmbeddingProvider;
use crate::types::EntityRecord;

/// Outcome of one embedding pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Records written across all committed batches
    pub records_processed: usize,
    pub batches_committed: usize,
}

/// Orchestrates one embedding pass over the graph store
pub struct EmbeddingPipeline {
    store: Arc<dyn GraphStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    max_concurrent_batches: usize,
    selection: SelectionMode,
}

impl EmbeddingPipeline {
    pub fn new(
        store: Arc<dyn GraphStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            batch_size,
            max_concurrent_batches: 1,
            selection: SelectionMode::default(),
        }
    }

    pub fn with_selection(mut self, selection: SelectionMode) -> Self {
        self.selection = selection;
        self
    }

    /// Dispatch up to `max` batches concurrently, each in its own transaction
    pub fn with_max_concurrent_batches(mut self, max: usize) -> Self {
        self.max_concurrent_batches = max.max(1);
        self
    }

    /// Run one embedding pass and return how much work it committed
    ///
    /// The pass aborts on the first batch failure; batches committed before
    /// the failure stay committed, and the error carries their count.
    pub async fn run(&self) -> Result<PassSummary> {
        if self.batch_size == 0 {
            return Err(Error::config("Batch size must be at least 1"));
        }

        let pending = self.store.fetch_pending(self.selection).await?;
        if pending.is_empty() {
            tracing::info!("No records pending embedding");
            return Ok(PassSummary::default());
        }

        let batches: Vec<Vec<EntityRecord>> = pending
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        tracing::info!(
            "Embedding {} record(s) in {} batch(es) of up to {} (provider: {})",
            pending.len(),
            batches.len(),
            self.batch_size,
            self.embedder.name()
        );

        if self.max_concurrent_batches > 1 {
            self.run_concurrent(batches).await
        } else {
            self.run_sequential(batches).await
        }
    }

    async fn run_sequential(&self, batches: Vec<Vec<EntityRecord>>) -> Result<PassSummary> {
        let mut summary = PassSummary::default();
        for (number, batch) in batches.iter().enumerate() {
            match self.process_batch(batch).await {
                Ok(written) => {
                    summary.records_processed += written;
                    summary.batches_committed += 1;
                    tracing::debug!("Batch {} committed ({} record(s))", number + 1, written);
                }
                Err(e) => {
                    tracing::error!(
                        "Batch {} failed, {} batch(es) already committed: {}",
                        number + 1,
                        summary.batches_committed,
                        e
                    );
                    return Err(Error::EmbeddingPass {
                        batches_committed: summary.batches_committed,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(summary)
    }

    async fn run_concurrent(&self, batches: Vec<Vec<EntityRecord>>) -> Result<PassSummary> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_batches));
        let batch_futures: Vec<_> = batches
            .into_iter()
            .map(|batch| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore.acquire().await.unwrap();
                    self.process_batch(&batch).await
                }
            })
            .collect();

        // every batch runs to commit or rollback independently
        let mut summary = PassSummary::default();
        let mut first_error = None;
        for result in join_all(batch_futures).await {
            match result {
                Ok(written) => {
                    summary.records_processed += written;
                    summary.batches_committed += 1;
                }
                Err(e) => {
                    if first_error.is_some() {
                        tracing::error!("Additional batch failure: {}", e);
                    } else {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(Error::EmbeddingPass {
                batches_committed: summary.batches_committed,
                source: Box::new(e),
            }),
            None => Ok(summary),
        }
    }

    async fn process_batch(&self, batch: &[EntityRecord]) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|record| record.bio.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(Error::embedding(format!(
                "Provider returned {} vector(s) for {} text(s)",
                vectors.len(),
                batch.len()
            )));
        }

        // vector i belongs to record i
        let writes: Vec<EmbeddingWrite> = batch
            .iter()
            .zip(vectors)
            .map(|(record, vector)| EmbeddingWrite {
                name: record.name.clone(),
                vector,
            })
            .collect();
        self.store.write_embeddings(&writes).await
    }
}
