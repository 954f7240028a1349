//! Semantic search CLI
//!
//! Embeds the query text and prints the top-k records ranked by similarity.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bio_semsearch::config::AppConfig;
use bio_semsearch::graph::HttpGraphStore;
use bio_semsearch::providers::gcp::{GcpAuth, VertexAiEmbedder};
use bio_semsearch::retrieval::SemanticSearch;

#[derive(Parser)]
#[command(
    name = "bio-semsearch-query",
    about = "Nearest-neighbor semantic search over embedded bios"
)]
struct Args {
    /// Query text to embed and search with
    query: String,

    /// Number of results to return
    #[arg(short = 'k', long = "top-k", default_value_t = 5)]
    k: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bio_semsearch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        tracing::error!("Search failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

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

    let search = SemanticSearch::new(
        store,
        embedder,
        config.pipeline.index_name.clone(),
        config.pipeline.vector_dimensions,
        config.pipeline.similarity,
    );

    tracing::info!("Searching for: {}", args.query);
    let results = search.search(&args.query, args.k).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (rank, result) in results.iter().enumerate() {
        println!("\n{}. {} (score: {:.4})", rank + 1, result.name, result.score);
        println!("   {}", result.bio);
    }

    Ok(())
}
