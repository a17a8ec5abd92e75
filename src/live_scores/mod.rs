pub mod http;
pub mod provider;

pub use http::HttpLiveFeed;
pub use provider::LiveGameFeed;

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::dashboard::SharedSnapshot;
use crate::engine::Enricher;

/// Spawns the refresh loop: poll the live feed, enrich every game, and swap
/// the result into `snapshot`.
///
/// A failed poll, or one that takes longer than `feed_timeout`, keeps the
/// previous snapshot.
pub fn start_refresh_loop(
    feed: Arc<dyn LiveGameFeed>,
    enricher: Arc<Enricher>,
    snapshot: SharedSnapshot,
    poll_interval: Duration,
    feed_timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Refresh loop started (feed={}, interval={:?}, feed timeout={:?})",
            feed.name(),
            poll_interval,
            feed_timeout
        );

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let games = match tokio::time::timeout(feed_timeout, feed.fetch_live_games()).await {
                Ok(Ok(games)) => games,
                Ok(Err(e)) => {
                    warn!("Live feed '{}' failed: {:#}", feed.name(), e);
                    continue;
                }
                Err(_) => {
                    warn!("Live feed '{}' timed out after {:?}", feed.name(), feed_timeout);
                    continue;
                }
            };

            let enriched = enricher.enrich(&games).await;
            let mut snap = snapshot.write().await;
            snap.games = enriched;
            snap.refreshed_at = Some(Utc::now());
        }
    })
}
