//! Visit logging middleware
//!
//! Every request except the health probe is appended to the visit log
//! after the response is produced. Logging runs on a spawned task and its
//! failures never reach the caller.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::extractors::ClientInfo;
use super::server::AppState;
use crate::db::stores::VisitStore;

const HEALTH_PATH: &str = "/health";

pub async fn log_visits(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if path == HEALTH_PATH {
        return next.run(request).await;
    }

    let client = ClientInfo::from_parts(request.headers(), request.extensions());
    let started = Instant::now();

    let response = next.run(request).await;

    let elapsed_ms = i32::try_from(started.elapsed().as_millis()).unwrap_or(i32::MAX);
    tokio::spawn(async move {
        let store = VisitStore::new(&state.db, &state.config.stage);
        if let Err(e) = store
            .record(
                &path,
                client.user_agent.as_deref(),
                client.ip.as_deref(),
                Some(elapsed_ms),
            )
            .await
        {
            tracing::warn!(error = %e, path = %path, "Failed to log visit");
        }
    });

    response
}
