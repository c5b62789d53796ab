//! Feature flag endpoint

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::db::stores::FlagStore;
use crate::http::server::AppState;

/// GET /api/flags - name to enabled map; defaults when the database is unavailable
async fn flags(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, bool>> {
    Json(FlagStore::new(&state.db).all().await)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/flags", get(flags))
}
