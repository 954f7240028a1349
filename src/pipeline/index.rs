//! Vector index provisioning
//!
//! Declares the index idempotently, then polls its state with exponential
//! backoff under a hard deadline. Run this after at least one record carries
//! an embedding, otherwise the index comes online empty.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::{Error, Result};
use crate::graph::{GraphStore, IndexSpec, IndexState, IndexStatus};

const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Declares the vector index and waits for it to come online
pub struct IndexProvisioner {
    store: Arc<dyn GraphStore>,
    spec: IndexSpec,
    wait_timeout: Duration,
    initial_poll_interval: Duration,
    max_poll_interval: Duration,
}

impl IndexProvisioner {
    pub fn new(store: Arc<dyn GraphStore>, spec: IndexSpec, wait_timeout: Duration) -> Self {
        Self {
            store,
            spec,
            wait_timeout,
            initial_poll_interval: INITIAL_POLL_INTERVAL,
            max_poll_interval: MAX_POLL_INTERVAL,
        }
    }

    pub fn with_poll_intervals(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_poll_interval = initial;
        self.max_poll_interval = max;
        self
    }

    /// Declare the index if absent and wait until it reports online
    ///
    /// Safe to call on every run. Fails with `IndexCreation` on declaration
    /// rejection, a failed index, or a configuration conflict with an
    /// existing index, and with `IndexTimeout` once the deadline passes.
    pub async fn ensure_index(&self) -> Result<()> {
        self.store.create_vector_index(&self.spec).await?;
        tracing::info!(
            "Vector index '{}' declared ({} dimensions, {})",
            self.spec.name,
            self.spec.dimensions,
            self.spec.similarity
        );

        let deadline = Instant::now() + self.wait_timeout;
        let mut interval = self.initial_poll_interval;

        loop {
            if let Some(status) = self.store.vector_index_status(&self.spec.name).await? {
                self.check_conflict(&status)?;
                match status.state {
                    IndexState::Online => {
                        tracing::info!("Vector index '{}' is online", self.spec.name);
                        return Ok(());
                    }
                    IndexState::Failed => {
                        return Err(Error::IndexCreation(format!(
                            "Index '{}' reported a failed state",
                            self.spec.name
                        )));
                    }
                    IndexState::Populating => {
                        tracing::debug!("Vector index '{}' still populating", self.spec.name);
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::IndexTimeout {
                    name: self.spec.name.clone(),
                    timeout_secs: self.wait_timeout.as_secs(),
                });
            }
            sleep(interval.min(deadline - now)).await;
            interval = (interval * 2).min(self.max_poll_interval);
        }
    }

    /// An existing index with different parameters is surfaced, not reconciled
    fn check_conflict(&self, status: &IndexStatus) -> Result<()> {
        if let Some(dimensions) = status.dimensions {
            if dimensions != self.spec.dimensions {
                return Err(Error::IndexCreation(format!(
                    "Index '{}' exists with {} dimensions, requested {}",
                    self.spec.name, dimensions, self.spec.dimensions
                )));
            }
        }
        if let Some(similarity) = status.similarity {
            if similarity != self.spec.similarity {
                return Err(Error::IndexCreation(format!(
                    "Index '{}' exists with similarity '{}', requested '{}'",
                    self.spec.name, similarity, self.spec.similarity
                )));
            }
        }
        Ok(())
    }
}
