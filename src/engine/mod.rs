//! Live-game prediction enrichment.
//!
//! ```text
//!  PredictionSource ×4 ──join_all──▶ candidates by league
//!                                        │
//!  LiveGame[] ──▶ matcher ──▶ probability ──▶ status ──▶ EnrichedGame[]
//! ```
//!
//! Everything after the fetch join is synchronous and pure.

pub mod enricher;
pub mod matcher;
pub mod probability;
pub mod status;

pub use enricher::Enricher;

use serde::{Deserialize, Serialize};

use crate::db::models::LiveGame;

/// The three bet markets a pick is tracked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Moneyline,
    Spread,
    Total,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::Moneyline, Market::Spread, Market::Total];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictedSide {
    Home,
    Away,
    Over,
    Under,
}

/// Live status of one market's pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPrediction {
    pub predicted_side: PredictedSide,
    pub is_hitting: bool,
    /// Probability of the predicted side (never below 0.5)
    pub probability: f64,
    /// Line for the predicted side, when one is posted
    pub line: Option<f64>,
    /// Market-specific score margin the hit test is based on
    pub current_differential: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamePredictions {
    pub moneyline: Option<MarketPrediction>,
    pub spread: Option<MarketPrediction>,
    pub over_under: Option<MarketPrediction>,
    pub has_any_hitting: bool,
}

impl GamePredictions {
    pub fn set(&mut self, market: Market, prediction: MarketPrediction) {
        match market {
            Market::Moneyline => self.moneyline = Some(prediction),
            Market::Spread => self.spread = Some(prediction),
            Market::Total => self.over_under = Some(prediction),
        }
        self.has_any_hitting = [&self.moneyline, &self.spread, &self.over_under]
            .into_iter()
            .any(|m| matches!(m, Some(p) if p.is_hitting));
    }
}

/// A live game plus its predictions. `predictions` is `None` when no
/// prediction row matched, which is different from a match with no markets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedGame {
    #[serde(flatten)]
    pub game: LiveGame,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub predictions: Option<GamePredictions>,
}
