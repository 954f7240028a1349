//! Seed loader
//!
//! Upserts the demo executive records and the uniqueness constraint on the
//! identity key. One-off glue, kept separate from the pipeline core.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bio_semsearch::config::GraphConfig;
use bio_semsearch::graph::http::SeedRecord;
use bio_semsearch::graph::HttpGraphStore;

const EXECUTIVES: &[(&str, &str, &str)] = &[
    (
        "Alice Johnson",
        "Chief Marketing Officer",
        "Alice Johnson is a seasoned marketing executive with over 15 years of \
         experience in digital transformation and brand development. She has led \
         successful marketing campaigns for Fortune 500 companies and pioneered \
         several innovative digital marketing strategies.",
    ),
    (
        "John Doe",
        "Chief Financial Officer",
        "John Doe brings 20 years of financial expertise in technology and \
         manufacturing sectors. He has overseen multiple successful mergers and \
         acquisitions, and specializes in strategic financial planning and risk \
         management.",
    ),
];

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
        tracing::error!("Load failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = GraphConfig::from_env()?;
    let store = HttpGraphStore::new(&config);

    store.ensure_key_constraint().await?;

    let records: Vec<SeedRecord> = EXECUTIVES
        .iter()
        .map(|(name, title, bio)| SeedRecord {
            name: name.to_string(),
            title: title.to_string(),
            bio: bio.to_string(),
        })
        .collect();
    let upserted = store.upsert_records(&records).await?;
    tracing::info!("Loaded {} executive record(s)", upserted);

    Ok(())
}
