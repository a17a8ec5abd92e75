use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::engine::EnrichedGame;

/// Latest enrichment pass, in live-feed order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub games: Vec<EnrichedGame>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

pub type SharedSnapshot = Arc<RwLock<Snapshot>>;

#[derive(Clone)]
pub struct AppState {
    pub snapshot: SharedSnapshot,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub games: usize,
    pub matched: usize,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Build the read-only API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/games", get(games_handler))
        .route("/api/games/hitting", get(hitting_handler))
        .route("/api/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// GET /api/games
async fn games_handler(State(state): State<Arc<AppState>>) -> Json<Vec<EnrichedGame>> {
    let snap = state.snapshot.read().await;
    Json(snap.games.clone())
}

/// GET /api/games/hitting
async fn hitting_handler(State(state): State<Arc<AppState>>) -> Json<Vec<EnrichedGame>> {
    let snap = state.snapshot.read().await;
    Json(hitting_games(&snap.games))
}

fn hitting_games(games: &[EnrichedGame]) -> Vec<EnrichedGame> {
    games
        .iter()
        .filter(|g| g.predictions.as_ref().is_some_and(|p| p.has_any_hitting))
        .cloned()
        .collect()
}

/// GET /api/health
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Health> {
    let snap = state.snapshot.read().await;
    Json(Health {
        games: snap.games.len(),
        matched: snap.games.iter().filter(|g| g.predictions.is_some()).count(),
        refreshed_at: snap.refreshed_at,
    })
}
