//! Per-sport prediction sources.
//!
//! Each source returns the newest prediction run for its league, already
//! joined with betting lines, as `PredictionRecord`s. Raw model outputs
//! (edges, fair totals, predicted scores) are passed through untouched;
//! turning them into probabilities is the engine's job.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::db::models::{League, PredictionRecord};
use crate::db::Database;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("database error: {0:#}")]
    Database(anyhow::Error),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Trait every prediction source must implement.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    /// League whose live games these predictions are matched against.
    fn league(&self) -> League;

    /// Latest-run predictions for the league.
    async fn fetch_predictions(&self) -> Result<Vec<PredictionRecord>, SourceError>;
}

/// Reads one league's prediction tables from the shared SQLite database.
pub struct SqlitePredictionSource {
    db: Database,
    league: League,
}

impl SqlitePredictionSource {
    pub fn new(db: Database, league: League) -> Self {
        SqlitePredictionSource { db, league }
    }

    /// One source per supported league. They share the database handle, but
    /// each fetch reads through its own connection.
    pub fn all(db: &Database) -> Vec<SqlitePredictionSource> {
        League::ALL
            .iter()
            .map(|league| SqlitePredictionSource::new(db.clone(), *league))
            .collect()
    }

    fn query(db: &Database, league: League) -> anyhow::Result<Vec<PredictionRecord>> {
        let records = match league {
            League::Nfl => db
                .latest_nfl_predictions()?
                .into_iter()
                .map(PredictionRecord::Nfl)
                .collect(),
            League::Cfb => db
                .latest_cfb_predictions()?
                .into_iter()
                .map(PredictionRecord::Cfb)
                .collect(),
            League::Nba => db
                .latest_nba_predictions()?
                .into_iter()
                .map(PredictionRecord::Nba)
                .collect(),
            League::Ncaab => db
                .latest_ncaab_predictions()?
                .into_iter()
                .map(PredictionRecord::Ncaab)
                .collect(),
        };
        Ok(records)
    }
}

#[async_trait]
impl PredictionSource for SqlitePredictionSource {
    fn league(&self) -> League {
        self.league
    }

    async fn fetch_predictions(&self) -> Result<Vec<PredictionRecord>, SourceError> {
        let db = self.db.clone();
        let league = self.league;
        // rusqlite is synchronous; keep it off the async workers
        let records = tokio::task::spawn_blocking(move || Self::query(&db, league))
            .await?
            .map_err(SourceError::Database)?;
        debug!("{} source: {} prediction rows in latest run", league, records.len());
        Ok(records)
    }
}
