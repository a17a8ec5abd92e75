use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{matcher, probability, status, EnrichedGame, GamePredictions, Market};
use crate::db::models::{League, LiveGame, PredictionRecord};
use crate::predictions::{PredictionSource, SourceError};

/// Candidate prediction rows per league for one enrichment pass.
pub type Candidates = HashMap<League, Vec<PredictionRecord>>;

/// Attaches model predictions to live games.
///
/// Each call fetches fresh snapshots from every source concurrently; no
/// state is kept between calls.
pub struct Enricher {
    sources: Vec<Arc<dyn PredictionSource>>,
    source_timeout: Duration,
}

impl Enricher {
    pub fn new(sources: Vec<Arc<dyn PredictionSource>>, source_timeout: Duration) -> Self {
        Enricher {
            sources,
            source_timeout,
        }
    }

    /// Enrich `live_games`, preserving their order. Never fails: a source
    /// that errors or times out only costs its own league's predictions.
    pub async fn enrich(&self, live_games: &[LiveGame]) -> Vec<EnrichedGame> {
        let candidates = self.fetch_candidates().await;
        let enriched = enrich_with(live_games, &candidates);
        let matched = enriched.iter().filter(|g| g.predictions.is_some()).count();
        info!(
            "Enriched {} live game(s): {} matched, {} with a pick hitting",
            enriched.len(),
            matched,
            enriched
                .iter()
                .filter(|g| g.predictions.as_ref().is_some_and(|p| p.has_any_hitting))
                .count()
        );
        enriched
    }

    /// Fetch every source at once and wait for all of them.
    pub async fn fetch_candidates(&self) -> Candidates {
        let timeout = self.source_timeout;
        let fetches: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                async move {
                    let result =
                        match tokio::time::timeout(timeout, source.fetch_predictions()).await {
                            Ok(result) => result,
                            Err(_) => Err(SourceError::Timeout(timeout)),
                        };
                    (source.league(), result)
                }
            })
            .collect();

        let results = futures_util::future::join_all(fetches).await;

        let mut candidates = Candidates::new();
        for (league, result) in results {
            match result {
                Ok(records) => {
                    debug!("{} source returned {} prediction(s)", league, records.len());
                    candidates.entry(league).or_default().extend(records);
                }
                Err(e) => {
                    warn!("{} prediction source failed, continuing without it: {}", league, e);
                    candidates.entry(league).or_default();
                }
            }
        }
        candidates
    }
}

/// Match, derive and score every game against already-fetched candidates.
pub fn enrich_with(live_games: &[LiveGame], candidates: &Candidates) -> Vec<EnrichedGame> {
    live_games
        .iter()
        .map(|game| {
            let league_candidates = candidates
                .get(&game.league)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let predictions =
                matcher::match_game(game, league_candidates).map(|record| predict(game, record));
            if predictions.is_none() {
                debug!(
                    "No prediction for {} {} vs {} ({})",
                    game.league, game.home_team, game.away_team, game.external_game_id
                );
            }
            EnrichedGame {
                game: game.clone(),
                predictions,
            }
        })
        .collect()
}

/// Each market is derived on its own; a missing one does not block the rest.
pub fn predict(game: &LiveGame, record: &PredictionRecord) -> GamePredictions {
    let mut predictions = GamePredictions::default();
    for market in Market::ALL {
        if let Some(derived) = probability::derive(record, market) {
            predictions.set(market, status::status(game, market, derived));
        }
    }
    predictions
}
