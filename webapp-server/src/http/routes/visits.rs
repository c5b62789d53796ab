//! Visit statistics endpoint

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::db::stores::{VisitStats, VisitStore};
use crate::http::error::ApiError;
use crate::http::server::AppState;

/// GET /api/visits/stats
async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<VisitStats>, ApiError> {
    let stats = VisitStore::new(&state.db, &state.config.stage).stats().await?;
    Ok(Json(stats))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/visits/stats", get(stats))
}
