use clap::Parser;
use std::net::SocketAddr;
use url::Url;

/// Live-game prediction enrichment service
#[derive(Parser, Debug, Clone)]
#[command(name = "livepicks", version, about)]
pub struct Config {
    /// SQLite database holding the per-sport prediction runs
    #[arg(long, env = "DATABASE_PATH", default_value = "predictions.db")]
    pub database_path: String,

    /// API listen address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Live-score feed endpoint returning `{"games": [...]}`
    #[arg(
        long,
        env = "LIVE_FEED_URL",
        default_value = "http://127.0.0.1:9000/live-games"
    )]
    pub live_feed_url: String,

    /// Live-score feed API key, sent as `x-api-key`
    #[arg(long, env = "LIVE_FEED_API_KEY")]
    pub live_feed_api_key: Option<String>,

    /// Seconds between enrichment passes
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "15")]
    pub poll_interval_secs: u64,

    /// Per-source timeout for prediction fetches, in milliseconds
    #[arg(long, env = "SOURCE_TIMEOUT_MS", default_value = "3000")]
    pub source_timeout_ms: u64,

    /// HTTP timeout for the live feed, in seconds
    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value = "10")]
    pub feed_timeout_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.live_feed_url)
            .map_err(|e| anyhow::anyhow!("live_feed_url is not a valid URL: {}", e))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("live_feed_url must use http or https, got '{}'", url.scheme());
        }
        if self.dashboard_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("dashboard_addr '{}' is not a socket address", self.dashboard_addr);
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be positive");
        }
        if self.source_timeout_ms == 0 {
            anyhow::bail!("source_timeout_ms must be positive");
        }
        if self.feed_timeout_secs == 0 {
            anyhow::bail!("feed_timeout_secs must be positive");
        }
        Ok(())
    }
}
