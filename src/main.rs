use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

mod config;
mod dashboard;
mod db;
mod engine;
mod live_scores;
mod predictions;

use config::Config;
use dashboard::{AppState, SharedSnapshot, Snapshot};
use db::Database;
use engine::Enricher;
use live_scores::{start_refresh_loop, HttpLiveFeed, LiveGameFeed};
use predictions::{PredictionSource, SqlitePredictionSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);

    // One source per league; each is fetched concurrently on every pass
    let sources: Vec<Arc<dyn PredictionSource>> = SqlitePredictionSource::all(&db)
        .into_iter()
        .map(|s| Arc::new(s) as Arc<dyn PredictionSource>)
        .collect();
    info!("Configured {} prediction source(s)", sources.len());
    let enricher = Arc::new(Enricher::new(
        sources,
        Duration::from_millis(config.source_timeout_ms),
    ));

    let feed_url = Url::parse(&config.live_feed_url).context("Invalid LIVE_FEED_URL")?;
    let feed: Arc<dyn LiveGameFeed> = Arc::new(HttpLiveFeed::new(
        feed_url,
        config.live_feed_api_key.clone(),
        Duration::from_secs(config.feed_timeout_secs),
    )?);

    let snapshot: SharedSnapshot = Arc::new(RwLock::new(Snapshot::default()));
    start_refresh_loop(
        feed,
        enricher,
        snapshot.clone(),
        Duration::from_secs(config.poll_interval_secs),
        Duration::from_secs(config.feed_timeout_secs),
    );

    let app = dashboard::router(AppState { snapshot });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run API server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
