use serde::{Deserialize, Serialize};
use std::fmt;

/// The four competitions the engine knows prediction tables for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum League {
    /// Pro American football
    Nfl,
    /// College American football
    Cfb,
    /// Pro basketball
    Nba,
    /// College basketball
    Ncaab,
}

impl League {
    pub const ALL: [League; 4] = [League::Nfl, League::Cfb, League::Nba, League::Ncaab];

    /// Parse the league labels used by live feeds ("nba", "basketball_ncaab", "NCAAF"...).
    pub fn from_feed_str(s: &str) -> Option<League> {
        match s.trim().to_lowercase().as_str() {
            "nfl" | "americanfootball_nfl" | "american_football" => Some(League::Nfl),
            "cfb" | "ncaaf" | "americanfootball_ncaaf" | "college_football" => Some(League::Cfb),
            "nba" | "basketball_nba" => Some(League::Nba),
            "ncaab" | "ncaam" | "cbb" | "basketball_ncaab" | "college_basketball" => {
                Some(League::Ncaab)
            }
            _ => None,
        }
    }

    /// Token the live feed puts in front of numeric game ids, e.g. `NBA-55`.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            League::Nfl => "NFL",
            League::Cfb => "CFB",
            League::Nba => "NBA",
            League::Ncaab => "NCAAB",
        }
    }

    /// Whether the prediction table keys games by the same numeric id the
    /// live feed embeds in `external_game_id`.
    pub fn has_numeric_game_ids(&self) -> bool {
        matches!(self, League::Nba | League::Ncaab)
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id_prefix())
    }
}

/// An in-progress game as reported by the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveGame {
    pub id: String,
    pub league: League,
    pub home_team: String,
    pub away_team: String,
    pub home_score: i32,
    pub away_score: i32,
    /// League-specific encoding, may embed a numeric id (e.g. "NBA-55")
    pub external_game_id: String,
    /// Quarter/half number when the feed reports one
    pub period: Option<i32>,
    /// Game clock as displayed by the feed ("7:42")
    pub clock: Option<String>,
}

/// Latest-run prediction row for pro football, lines joined on `game_key`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NflPrediction {
    pub game_key: String,
    pub home_team: String,
    pub away_team: String,
    pub home_win_prob: Option<f64>,
    pub home_cover_prob: Option<f64>,
    pub over_prob: Option<f64>,
    pub home_spread: Option<f64>,
    pub total_line: Option<f64>,
}

/// College football mostly stores predicted scores and line edges. Newer
/// runs may also carry calibrated cover/over probabilities next to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CfbPrediction {
    pub game_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub home_cover_prob: Option<f64>,
    pub over_prob: Option<f64>,
    pub pred_home_score: Option<f64>,
    pub pred_away_score: Option<f64>,
    /// Model spread minus market spread; positive favours home
    pub spread_edge: Option<f64>,
    /// Model total minus market total; positive favours the over
    pub total_edge: Option<f64>,
    pub home_spread: Option<f64>,
    pub total_line: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NbaPrediction {
    pub game_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub home_win_prob: Option<f64>,
    /// Model's fair total, compared against `total_line` downstream
    pub model_total: Option<f64>,
    pub home_spread: Option<f64>,
    pub total_line: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NcaabPrediction {
    pub game_id: i64,
    pub home_team: String,
    pub away_team: String,
    pub home_win_prob: Option<f64>,
    pub home_cover_prob: Option<f64>,
    pub over_prob: Option<f64>,
    /// Direction-only total lean (true = over), no magnitude
    pub over_lean: Option<bool>,
    pub home_spread: Option<f64>,
    pub total_line: Option<f64>,
}

/// One sport's native prediction row. Probability fields always mean
/// "probability home" or "probability over", never the picked side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "league", rename_all = "lowercase")]
pub enum PredictionRecord {
    Nfl(NflPrediction),
    Cfb(CfbPrediction),
    Nba(NbaPrediction),
    Ncaab(NcaabPrediction),
}

impl PredictionRecord {
    pub fn league(&self) -> League {
        match self {
            PredictionRecord::Nfl(_) => League::Nfl,
            PredictionRecord::Cfb(_) => League::Cfb,
            PredictionRecord::Nba(_) => League::Nba,
            PredictionRecord::Ncaab(_) => League::Ncaab,
        }
    }

    pub fn home_team(&self) -> &str {
        match self {
            PredictionRecord::Nfl(p) => &p.home_team,
            PredictionRecord::Cfb(p) => &p.home_team,
            PredictionRecord::Nba(p) => &p.home_team,
            PredictionRecord::Ncaab(p) => &p.home_team,
        }
    }

    pub fn away_team(&self) -> &str {
        match self {
            PredictionRecord::Nfl(p) => &p.away_team,
            PredictionRecord::Cfb(p) => &p.away_team,
            PredictionRecord::Nba(p) => &p.away_team,
            PredictionRecord::Ncaab(p) => &p.away_team,
        }
    }

    /// Native numeric game id, for the leagues whose tables have one that
    /// lines up with the live feed.
    pub fn numeric_game_id(&self) -> Option<i64> {
        match self {
            PredictionRecord::Nba(p) => Some(p.game_id),
            PredictionRecord::Ncaab(p) => Some(p.game_id),
            PredictionRecord::Nfl(_) | PredictionRecord::Cfb(_) => None,
        }
    }

    pub fn home_spread(&self) -> Option<f64> {
        match self {
            PredictionRecord::Nfl(p) => p.home_spread,
            PredictionRecord::Cfb(p) => p.home_spread,
            PredictionRecord::Nba(p) => p.home_spread,
            PredictionRecord::Ncaab(p) => p.home_spread,
        }
    }

    pub fn total_line(&self) -> Option<f64> {
        match self {
            PredictionRecord::Nfl(p) => p.total_line,
            PredictionRecord::Cfb(p) => p.total_line,
            PredictionRecord::Nba(p) => p.total_line,
            PredictionRecord::Ncaab(p) => p.total_line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn league_from_feed_labels() {
        assert_eq!(League::from_feed_str("NBA"), Some(League::Nba));
        assert_eq!(League::from_feed_str(" basketball_ncaab "), Some(League::Ncaab));
        assert_eq!(League::from_feed_str("ncaaf"), Some(League::Cfb));
        assert_eq!(League::from_feed_str("americanfootball_nfl"), Some(League::Nfl));
        assert_eq!(League::from_feed_str("soccer"), None);
    }

    #[test]
    fn only_basketball_has_numeric_ids() {
        assert!(League::Nba.has_numeric_game_ids());
        assert!(League::Ncaab.has_numeric_game_ids());
        assert!(!League::Nfl.has_numeric_game_ids());
        assert!(!League::Cfb.has_numeric_game_ids());
    }

    #[test]
    fn record_serializes_with_league_tag() {
        let rec = PredictionRecord::Nba(NbaPrediction {
            game_id: 55,
            home_team: "Boston Celtics".into(),
            away_team: "Miami Heat".into(),
            home_win_prob: Some(0.64),
            model_total: None,
            home_spread: Some(-5.5),
            total_line: None,
        });
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["league"], "nba");
        assert_eq!(json["game_id"], 55);
        assert_eq!(rec.numeric_game_id(), Some(55));
    }
}
