use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::provider::LiveGameFeed;
use crate::db::models::{League, LiveGame};

/// Live-score feed polled over HTTP as JSON.
///
/// Expected body: `{"games": [{"id", "league", "home_team", "away_team",
/// "home_score", "away_score", "external_game_id", "status", "period",
/// "clock"}]}`. Scores may arrive as numbers or numeric strings.
pub struct HttpLiveFeed {
    http: Client,
    url: Url,
    api_key: Option<String>,
}

impl HttpLiveFeed {
    pub fn new(url: Url, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpLiveFeed { http, url, api_key })
    }
}

#[async_trait]
impl LiveGameFeed for HttpLiveFeed {
    fn name(&self) -> &str {
        "HttpLiveFeed"
    }

    async fn fetch_live_games(&self) -> Result<Vec<LiveGame>> {
        debug!("Fetching live games from {}", self.url);
        let mut req = self.http.get(self.url.clone());
        if let Some(key) = &self.api_key {
            req = req.header("x-api-key", key);
        }

        let resp = req.send().await.context("Live feed request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("Live feed error: {}", resp.status());
        }

        let raw: serde_json::Value = resp
            .json()
            .await
            .context("Failed to parse live feed response")?;

        Ok(parse_live_games_response(&raw))
    }
}

fn is_finished(status: &str) -> bool {
    matches!(
        status.to_lowercase().as_str(),
        "final" | "finished" | "ft" | "post" | "completed" | "closed"
    )
}

/// Missing scores count as 0; anything that is not an `i32` is rejected.
fn score(v: &serde_json::Value) -> Option<i32> {
    match v {
        serde_json::Value::Null => Some(0),
        serde_json::Value::Number(n) => n.as_i64().and_then(|s| i32::try_from(s).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Games in unsupported leagues, without team names, with unusable scores,
/// or already over are dropped. Feed order is kept.
pub fn parse_live_games_response(raw: &serde_json::Value) -> Vec<LiveGame> {
    let games = match raw["games"].as_array() {
        Some(a) => a,
        None => return vec![],
    };

    games
        .iter()
        .filter_map(|g| {
            let league = League::from_feed_str(g["league"].as_str()?)?;
            if g["status"].as_str().is_some_and(is_finished) {
                return None;
            }
            let id = match &g["id"] {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let home_team = g["home_team"].as_str()?.to_string();
            let away_team = g["away_team"].as_str()?.to_string();
            let external_game_id = g["external_game_id"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let home_score = score(&g["home_score"])?;
            let away_score = score(&g["away_score"])?;

            Some(LiveGame {
                id,
                league,
                home_team,
                away_team,
                home_score,
                away_score,
                external_game_id,
                period: g["period"].as_i64().and_then(|p| i32::try_from(p).ok()),
                clock: g["clock"].as_str().map(str::to_string),
            })
        })
        .collect()
}
