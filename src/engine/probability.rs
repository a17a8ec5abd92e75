//! Uniform per-market probabilities from heterogeneous prediction rows.
//!
//! Each market has an ordered list of signals; the first one present wins.
//! All outputs are "probability home" (moneyline, spread) or "probability
//! over" (total). Picking a side happens in `status`.
//!
//! The coarse 0.6/0.4 split and the bounded edge mapping below are
//! calibration-free placeholders. They only give a direction when the
//! source stored no real probability.

use tracing::debug;

use super::Market;
use crate::db::models::PredictionRecord;

/// Probability per point of edge.
pub const EDGE_SLOPE: f64 = 0.05;
/// Largest distance from 0.5 an edge can move the probability.
pub const EDGE_CAP: f64 = 0.35;
/// Probability given to the favoured side when only a direction is known.
pub const COARSE_FAVOURED: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedProbability {
    /// Home (moneyline/spread) or over (total) probability
    pub probability: f64,
    /// Home spread or total line; never set for moneyline
    pub line: Option<f64>,
}

type Signal = fn(&PredictionRecord) -> Option<f64>;

const MONEYLINE_SIGNALS: &[Signal] = &[stored_win_prob, predicted_score_split];
const SPREAD_SIGNALS: &[Signal] = &[stored_cover_prob, spread_edge_prob, win_prob_as_cover_proxy];
const TOTAL_SIGNALS: &[Signal] = &[stored_over_prob, total_edge_prob, over_lean_split];

/// Derive the market's probability, or `None` when the row carries no
/// signal for it at all.
pub fn derive(record: &PredictionRecord, market: Market) -> Option<DerivedProbability> {
    let (signals, line) = match market {
        Market::Moneyline => (MONEYLINE_SIGNALS, None),
        Market::Spread => (SPREAD_SIGNALS, record.home_spread()),
        Market::Total => (TOTAL_SIGNALS, record.total_line()),
    };
    let probability = signals.iter().find_map(|signal| signal(record))?;
    Some(DerivedProbability { probability, line })
}

/// Map a signed edge onto [0.15, 0.85]; positive favours home/over.
pub fn edge_to_probability(edge: f64) -> f64 {
    let shift = (edge.abs() * EDGE_SLOPE).min(EDGE_CAP);
    if edge < 0.0 {
        0.5 - shift
    } else {
        0.5 + shift
    }
}

fn coarse_split(home_or_over: bool) -> f64 {
    if home_or_over {
        COARSE_FAVOURED
    } else {
        1.0 - COARSE_FAVOURED
    }
}

/// Stored probabilities outside [0, 1] are treated as missing.
fn valid_probability(value: Option<f64>) -> Option<f64> {
    let p = value?;
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Some(p)
    } else {
        debug!("Ignoring out-of-range stored probability {}", p);
        None
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

// ── Moneyline ────────────────────────────────────────────────────────────────

fn stored_win_prob(record: &PredictionRecord) -> Option<f64> {
    match record {
        PredictionRecord::Nfl(p) => valid_probability(p.home_win_prob),
        PredictionRecord::Nba(p) => valid_probability(p.home_win_prob),
        PredictionRecord::Ncaab(p) => valid_probability(p.home_win_prob),
        PredictionRecord::Cfb(_) => None,
    }
}

fn predicted_score_split(record: &PredictionRecord) -> Option<f64> {
    match record {
        PredictionRecord::Cfb(p) => {
            let home = finite(p.pred_home_score)?;
            let away = finite(p.pred_away_score)?;
            if home == away {
                None
            } else {
                Some(coarse_split(home > away))
            }
        }
        _ => None,
    }
}

// ── Spread ───────────────────────────────────────────────────────────────────

fn stored_cover_prob(record: &PredictionRecord) -> Option<f64> {
    match record {
        PredictionRecord::Nfl(p) => valid_probability(p.home_cover_prob),
        PredictionRecord::Cfb(p) => valid_probability(p.home_cover_prob),
        PredictionRecord::Ncaab(p) => valid_probability(p.home_cover_prob),
        PredictionRecord::Nba(_) => None,
    }
}

fn spread_edge_prob(record: &PredictionRecord) -> Option<f64> {
    match record {
        PredictionRecord::Cfb(p) => finite(p.spread_edge).map(edge_to_probability),
        _ => None,
    }
}

/// Winning is not covering; this is only a directional stand-in.
fn win_prob_as_cover_proxy(record: &PredictionRecord) -> Option<f64> {
    match record {
        PredictionRecord::Nba(p) => valid_probability(p.home_win_prob),
        PredictionRecord::Ncaab(p) => valid_probability(p.home_win_prob),
        PredictionRecord::Nfl(_) | PredictionRecord::Cfb(_) => None,
    }
}

// ── Total ────────────────────────────────────────────────────────────────────

fn stored_over_prob(record: &PredictionRecord) -> Option<f64> {
    match record {
        PredictionRecord::Nfl(p) => valid_probability(p.over_prob),
        PredictionRecord::Cfb(p) => valid_probability(p.over_prob),
        PredictionRecord::Ncaab(p) => valid_probability(p.over_prob),
        PredictionRecord::Nba(_) => None,
    }
}

fn total_edge_prob(record: &PredictionRecord) -> Option<f64> {
    match record {
        PredictionRecord::Cfb(p) => finite(p.total_edge).map(edge_to_probability),
        PredictionRecord::Nba(p) => {
            let model = finite(p.model_total)?;
            let market = finite(p.total_line)?;
            Some(edge_to_probability(model - market))
        }
        PredictionRecord::Nfl(_) | PredictionRecord::Ncaab(_) => None,
    }
}

fn over_lean_split(record: &PredictionRecord) -> Option<f64> {
    match record {
        PredictionRecord::Ncaab(p) => p.over_lean.map(coarse_split),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CfbPrediction, NbaPrediction, NcaabPrediction, NflPrediction};
    use approx::assert_relative_eq;

    fn nfl() -> NflPrediction {
        NflPrediction {
            game_key: "KC@BUF".into(),
            home_team: "Buffalo Bills".into(),
            away_team: "Kansas City Chiefs".into(),
            home_win_prob: None,
            home_cover_prob: None,
            over_prob: None,
            home_spread: Some(-2.5),
            total_line: Some(47.5),
        }
    }

    fn cfb() -> CfbPrediction {
        CfbPrediction {
            game_id: 401,
            home_team: "Georgia".into(),
            away_team: "Alabama".into(),
            home_cover_prob: None,
            over_prob: None,
            pred_home_score: None,
            pred_away_score: None,
            spread_edge: None,
            total_edge: None,
            home_spread: Some(-3.0),
            total_line: Some(52.5),
        }
    }

    fn nba() -> NbaPrediction {
        NbaPrediction {
            game_id: 55,
            home_team: "Boston Celtics".into(),
            away_team: "Miami Heat".into(),
            home_win_prob: None,
            model_total: None,
            home_spread: Some(-6.5),
            total_line: Some(216.0),
        }
    }

    fn ncaab() -> NcaabPrediction {
        NcaabPrediction {
            game_id: 9001,
            home_team: "Duke".into(),
            away_team: "North Carolina".into(),
            home_win_prob: None,
            home_cover_prob: None,
            over_prob: None,
            over_lean: None,
            home_spread: None,
            total_line: Some(148.5),
        }
    }

    #[test]
    fn edge_mapping_is_bounded() {
        assert_relative_eq!(edge_to_probability(0.0), 0.5);
        assert_relative_eq!(edge_to_probability(2.0), 0.6, epsilon = 1e-12);
        assert_relative_eq!(edge_to_probability(-2.0), 0.4, epsilon = 1e-12);
        assert_relative_eq!(edge_to_probability(100.0), 0.85, epsilon = 1e-12);
        assert_relative_eq!(edge_to_probability(-100.0), 0.15, epsilon = 1e-12);
        for edge in [-1e9, -7.0, 7.0, 1e9] {
            let p = edge_to_probability(edge);
            assert!((0.15..=0.85).contains(&p), "edge {} mapped to {}", edge, p);
        }
    }

    #[test]
    fn stored_probability_beats_conflicting_edge() {
        // Edge alone says strongly away/under
        let edge_only = PredictionRecord::Cfb(CfbPrediction {
            spread_edge: Some(-10.0),
            total_edge: Some(-20.0),
            ..cfb()
        });
        let d = derive(&edge_only, Market::Spread).unwrap();
        assert_relative_eq!(d.probability, 0.15, epsilon = 1e-12);

        let rec = PredictionRecord::Cfb(CfbPrediction {
            home_cover_prob: Some(0.7),
            over_prob: Some(0.7),
            spread_edge: Some(-10.0),
            total_edge: Some(-20.0),
            ..cfb()
        });
        let spread = derive(&rec, Market::Spread).unwrap();
        assert_relative_eq!(spread.probability, 0.7);
        assert_eq!(spread.line, Some(-3.0));
        let total = derive(&rec, Market::Total).unwrap();
        assert_relative_eq!(total.probability, 0.7);
        assert_eq!(total.line, Some(52.5));

        // An unusable stored value falls back to the edge
        let bad = PredictionRecord::Cfb(CfbPrediction {
            home_cover_prob: Some(-0.2),
            spread_edge: Some(-10.0),
            ..cfb()
        });
        let d = derive(&bad, Market::Spread).unwrap();
        assert_relative_eq!(d.probability, 0.15, epsilon = 1e-12);
    }

    #[test]
    fn stored_cover_prob_wins_over_fallbacks() {

        let rec = PredictionRecord::Ncaab(NcaabPrediction {
            home_cover_prob: Some(0.7),
            home_win_prob: Some(0.2),
            ..ncaab()
        });
        let d = derive(&rec, Market::Spread).unwrap();
        assert_relative_eq!(d.probability, 0.7);
    }

    #[test]
    fn direct_over_prob_used_verbatim_despite_lean() {
        let rec = PredictionRecord::Ncaab(NcaabPrediction {
            over_prob: Some(0.7),
            over_lean: Some(false),
            ..ncaab()
        });
        let d = derive(&rec, Market::Total).unwrap();
        assert_relative_eq!(d.probability, 0.7);
        assert_eq!(d.line, Some(148.5));
    }

    #[test]
    fn predicted_scores_give_coarse_moneyline() {
        let rec = PredictionRecord::Cfb(CfbPrediction {
            pred_home_score: Some(20.0),
            pred_away_score: Some(27.0),
            ..cfb()
        });
        let d = derive(&rec, Market::Moneyline).unwrap();
        assert_relative_eq!(d.probability, 0.4);
        assert_eq!(d.line, None);

        let level = PredictionRecord::Cfb(CfbPrediction {
            pred_home_score: Some(24.0),
            pred_away_score: Some(24.0),
            ..cfb()
        });
        assert!(derive(&level, Market::Moneyline).is_none());
    }

    #[test]
    fn basketball_win_prob_proxies_cover() {
        let rec = PredictionRecord::Nba(NbaPrediction {
            home_win_prob: Some(0.58),
            ..nba()
        });
        let d = derive(&rec, Market::Spread).unwrap();
        assert_relative_eq!(d.probability, 0.58);
        assert_eq!(d.line, Some(-6.5));
    }

    #[test]
    fn nba_total_from_model_vs_market() {
        let rec = PredictionRecord::Nba(NbaPrediction {
            model_total: Some(212.0),
            ..nba()
        });
        // 212 - 216 = -4 points under → 0.5 - 0.2
        let d = derive(&rec, Market::Total).unwrap();
        assert_relative_eq!(d.probability, 0.3, epsilon = 1e-12);

        let no_line = PredictionRecord::Nba(NbaPrediction {
            model_total: Some(212.0),
            total_line: None,
            ..nba()
        });
        assert!(derive(&no_line, Market::Total).is_none());
    }

    #[test]
    fn over_lean_gives_coarse_total() {
        let rec = PredictionRecord::Ncaab(NcaabPrediction {
            over_lean: Some(true),
            ..ncaab()
        });
        assert_relative_eq!(derive(&rec, Market::Total).unwrap().probability, 0.6);
    }

    #[test]
    fn missing_signals_leave_market_absent() {
        let rec = PredictionRecord::Nfl(NflPrediction {
            home_win_prob: Some(0.55),
            ..nfl()
        });
        assert!(derive(&rec, Market::Moneyline).is_some());
        assert!(derive(&rec, Market::Spread).is_none());
        assert!(derive(&rec, Market::Total).is_none());
    }

    #[test]
    fn out_of_range_probability_falls_through() {
        let rec = PredictionRecord::Ncaab(NcaabPrediction {
            home_cover_prob: Some(1.7),
            home_win_prob: Some(0.45),
            ..ncaab()
        });
        assert_relative_eq!(derive(&rec, Market::Spread).unwrap().probability, 0.45);

        let rec = PredictionRecord::Nfl(NflPrediction {
            home_win_prob: Some(f64::NAN),
            ..nfl()
        });
        assert!(derive(&rec, Market::Moneyline).is_none());
    }
}
