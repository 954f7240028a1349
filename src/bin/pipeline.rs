//! Embedding pipeline binary
//!
//! Embeds every pending record, then provisions the vector index and waits
//! for it to come online. Exits non-zero on any failure.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bio_semsearch::config::AppConfig;
use bio_semsearch::graph::{HttpGraphStore, IndexSpec, SelectionMode};
use bio_semsearch::pipeline::{EmbeddingPipeline, IndexProvisioner};
use bio_semsearch::providers::gcp::{GcpAuth, VertexAiEmbedder};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bio_semsearch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("Pipeline failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.vertex.model);
    tracing::info!("  - Dimensions: {}", config.pipeline.vector_dimensions);
    tracing::info!("  - Batch size: {}", config.pipeline.batch_size);
    tracing::info!("  - Index: {}", config.pipeline.index_name);

    let auth = Arc::new(GcpAuth::from_service_account(
        &config.vertex.key_path,
        config.vertex.project_id.clone(),
    )?);
    let embedder = Arc::new(VertexAiEmbedder::new(
        auth,
        &config.vertex,
        config.pipeline.vector_dimensions,
    ));
    let store = Arc::new(HttpGraphStore::new(&config.graph));

    let selection = if config.pipeline.reembed_all {
        SelectionMode::All
    } else {
        SelectionMode::MissingEmbedding
    };
    let summary = EmbeddingPipeline::new(store.clone(), embedder, config.pipeline.batch_size)
        .with_selection(selection)
        .with_max_concurrent_batches(config.pipeline.max_concurrent_batches)
        .run()
        .await?;
    tracing::info!(
        "Embedded {} record(s) across {} batch(es)",
        summary.records_processed,
        summary.batches_committed
    );

    let spec = IndexSpec {
        name: config.pipeline.index_name.clone(),
        label: config.graph.entity_label.clone(),
        property: config.graph.embedding_property.clone(),
        dimensions: config.pipeline.vector_dimensions,
        similarity: config.pipeline.similarity,
    };
    IndexProvisioner::new(
        store,
        spec,
        Duration::from_secs(config.pipeline.index_wait_timeout_secs),
    )
    .ensure_index()
    .await?;

    tracing::info!("Pipeline completed successfully");
    Ok(())
}
