//! docsage server binary
//!
//! Run with: cargo run -p docsage --bin docsage-server

use docsage::{config::AppConfig, server::Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docsage=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("configuration loaded");
    tracing::info!("  - database: {}", config.database_path.display());
    tracing::info!(
        "  - vector index: {}",
        config.index.url.as_deref().unwrap_or("in-memory")
    );
    tracing::info!("  - collection: {}", config.index.collection);
    tracing::info!(
        "  - model backends: {}",
        if config.llm.api_key.is_some() {
            "hosted"
        } else {
            "local (no API_KEY_FOR_LLM set)"
        }
    );

    let server = Server::new(config)?;

    println!("docsage listening on http://{}", server.address());
    println!("  POST /ingest     - upload documents");
    println!("  POST /ask        - ask a question");
    println!("  POST /ask/stream - ask with a streamed answer");
    println!("  GET  /health     - service health");

    server.start().await?;

    Ok(())
}
