use super::probability::DerivedProbability;
use super::{Market, MarketPrediction, PredictedSide};
use crate::db::models::LiveGame;

/// Pick a side from the derived probability and check it against the
/// current score. Exact ties and pushes never count as hitting.
pub fn status(game: &LiveGame, market: Market, derived: DerivedProbability) -> MarketPrediction {
    let p = derived.probability;
    let margin = f64::from(game.home_score) - f64::from(game.away_score);

    let (predicted_side, line, current_differential, is_hitting) = match market {
        Market::Moneyline => {
            let side = if p > 0.5 { PredictedSide::Home } else { PredictedSide::Away };
            let hitting = match side {
                PredictedSide::Home => margin > 0.0,
                _ => margin < 0.0,
            };
            (side, None, margin, hitting)
        }
        Market::Spread => {
            // Missing line is scored as a pick'em
            let home_line = derived.line.unwrap_or(0.0);
            let adjusted = margin + home_line;
            let (side, side_line, hitting) = if p > 0.5 {
                (PredictedSide::Home, derived.line, adjusted > 0.0)
            } else {
                (PredictedSide::Away, derived.line.map(|l| -l), adjusted < 0.0)
            };
            (side, side_line, adjusted, hitting)
        }
        Market::Total => {
            let points = f64::from(game.home_score) + f64::from(game.away_score);
            let side = if p > 0.5 { PredictedSide::Over } else { PredictedSide::Under };
            match derived.line {
                Some(line) => {
                    let diff = points - line;
                    let hitting = match side {
                        PredictedSide::Over => diff > 0.0,
                        _ => diff < 0.0,
                    };
                    (side, Some(line), diff, hitting)
                }
                None => (side, None, points, false),
            }
        }
    };

    let probability = match predicted_side {
        PredictedSide::Home | PredictedSide::Over => p,
        PredictedSide::Away | PredictedSide::Under => 1.0 - p,
    };

    MarketPrediction {
        predicted_side,
        is_hitting,
        probability,
        line,
        current_differential,
    }
}
