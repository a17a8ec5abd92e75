//! Resolve a live game to its prediction row.
//!
//! Strategies run in order and the first hit wins:
//! 1. numeric id embedded in `external_game_id` (basketball only)
//! 2. normalized home/away name equality, same orientation only

use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::db::models::{LiveGame, PredictionRecord};

type MatchStrategy = for<'a> fn(&LiveGame, &'a [PredictionRecord]) -> Option<&'a PredictionRecord>;

const STRATEGIES: &[(&str, MatchStrategy)] = &[("id", match_by_id), ("names", match_by_names)];

/// Find the prediction row for `game` among its league's candidates.
pub fn match_game<'a>(
    game: &LiveGame,
    candidates: &'a [PredictionRecord],
) -> Option<&'a PredictionRecord> {
    for (name, strategy) in STRATEGIES {
        if let Some(record) = strategy(game, candidates) {
            debug!(
                "Matched {} {} vs {} by {}",
                game.league, game.home_team, game.away_team, name
            );
            return Some(record);
        }
    }
    None
}

/// Match on the numeric id the feed embeds after the league prefix.
pub fn match_by_id<'a>(
    game: &LiveGame,
    candidates: &'a [PredictionRecord],
) -> Option<&'a PredictionRecord> {
    if !game.league.has_numeric_game_ids() {
        return None;
    }
    let id = parse_external_id(&game.external_game_id, game.league.id_prefix())?;
    candidates
        .iter()
        .find(|c| c.league() == game.league && c.numeric_game_id() == Some(id))
}

/// Match when both normalized team names agree in the same orientation.
/// A swapped home/away pair is not a match. Ties go to the first candidate.
pub fn match_by_names<'a>(
    game: &LiveGame,
    candidates: &'a [PredictionRecord],
) -> Option<&'a PredictionRecord> {
    let home = normalize_team_name(&game.home_team);
    let away = normalize_team_name(&game.away_team);
    if home.is_empty() || away.is_empty() {
        return None;
    }
    candidates.iter().find(|c| {
        normalize_team_name(c.home_team()) == home && normalize_team_name(c.away_team()) == away
    })
}

/// "NBA-55" → 55 for prefix "NBA". The prefix is required.
pub fn parse_external_id(external_id: &str, prefix: &str) -> Option<i64> {
    let external_id = external_id.trim();
    let head = external_id.get(..prefix.len())?;
    if !head.eq_ignore_ascii_case(prefix) {
        return None;
    }
    let rest = external_id[prefix.len()..].trim_start_matches(['-', '_', ':']);
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// "São Paulo St." → "sao paulo st"
/// "Saint Mary's (CA)" → "saint marys ca"
///
/// Accents are stripped by decomposing (NFD) and dropping combining marks.
/// Letters that do not decompose are spelled out by hand.
pub fn normalize_team_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut folded = String::with_capacity(lowered.len());
    for c in lowered.nfd().filter(|c| !is_combining_mark(*c)) {
        match c {
            '\'' | '’' | '`' | '.' => {}
            'ß' => folded.push_str("ss"),
            'æ' => folded.push_str("ae"),
            'œ' => folded.push_str("oe"),
            'þ' => folded.push_str("th"),
            'ø' => folded.push('o'),
            'đ' | 'ð' => folded.push('d'),
            'ł' => folded.push('l'),
            'ı' => folded.push('i'),
            c if c.is_alphanumeric() => folded.push(c),
            _ => folded.push(' '),
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
