//! Health and readiness endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::http::server::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub stage: String,
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /health
///
/// A disabled database is reported, not treated as unhealthy.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = if state.db.is_enabled().await {
        "enabled"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "healthy",
        version: state.config.version.clone(),
        stage: state.config.stage.clone(),
        database,
        timestamp: Utc::now(),
    })
}

/// GET /ready
async fn ready() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ready", "timestamp": Utc::now() }))
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
}
