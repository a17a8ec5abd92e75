use anyhow::Result;
use async_trait::async_trait;

use crate::db::models::LiveGame;

/// Trait every live-game feed must implement.
#[async_trait]
pub trait LiveGameFeed: Send + Sync {
    /// Return a snapshot of all currently in-progress games.
    async fn fetch_live_games(&self) -> Result<Vec<LiveGame>>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
