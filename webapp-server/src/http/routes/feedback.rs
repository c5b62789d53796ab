//! Feedback endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::stores::{
    FeedbackDetail, FeedbackPage, FeedbackRecord, FeedbackResponse, FeedbackStats, FeedbackStore,
    SubmitContext,
};
use crate::http::error::ApiError;
use crate::http::extractors::{ClientInfo, FeedbackId, JsonBody};
use crate::http::server::AppState;
use crate::models::{
    FeedbackFilterParams, Page, PageParams, ResponseRequest, StatusUpdateRequest,
    SubmitFeedbackRequest, VoteRequest, VoteTally,
};

/// Submission acknowledgement
#[derive(Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub feedback_id: i32,
    pub created_at: NaiveDateTime,
    pub message: &'static str,
}

/// Vote acknowledgement
#[derive(Serialize)]
pub struct VoteResponse {
    pub success: bool,
    pub votes: VoteTally,
}

/// List query: filters plus pagination
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(flatten)]
    pub filter: FeedbackFilterParams,
    #[serde(flatten)]
    pub page: PageParams,
}

/// POST /api/feedback/submit
async fn submit(
    State(state): State<Arc<AppState>>,
    client: ClientInfo,
    JsonBody(req): JsonBody<SubmitFeedbackRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let context = SubmitContext {
        ip: client.ip,
        user_agent: client.user_agent,
        version: state.config.version.clone(),
        stage: state.config.stage.clone(),
    };
    let submitted = FeedbackStore::new(&state.db).submit(req, &context).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            success: true,
            feedback_id: submitted.id,
            created_at: submitted.created_at,
            message: "Thank you for your feedback!",
        }),
    ))
}

/// GET /api/feedback/list
async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FeedbackPage>, ApiError> {
    let filter = query.filter.validate()?;
    let page = Page::from(&query.page);
    let result = FeedbackStore::new(&state.db).list(&filter, page).await?;
    Ok(Json(result))
}

/// GET /api/feedback/stats/summary
async fn stats_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeedbackStats>, ApiError> {
    Ok(Json(FeedbackStore::new(&state.db).stats_summary().await?))
}

/// GET /api/feedback/{id}
async fn get_feedback(
    State(state): State<Arc<AppState>>,
    FeedbackId(id): FeedbackId,
) -> Result<Json<FeedbackDetail>, ApiError> {
    Ok(Json(FeedbackStore::new(&state.db).get_by_id(id).await?))
}

/// POST /api/feedback/{id}/vote
async fn vote(
    State(state): State<Arc<AppState>>,
    FeedbackId(id): FeedbackId,
    JsonBody(req): JsonBody<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let votes = FeedbackStore::new(&state.db).vote(id, req).await?;
    Ok(Json(VoteResponse {
        success: true,
        votes,
    }))
}

/// PATCH /api/feedback/{id} - triage status and priority
async fn update_status(
    State(state): State<Arc<AppState>>,
    FeedbackId(id): FeedbackId,
    JsonBody(req): JsonBody<StatusUpdateRequest>,
) -> Result<Json<FeedbackRecord>, ApiError> {
    Ok(Json(FeedbackStore::new(&state.db).update_status(id, req).await?))
}

/// POST /api/feedback/{id}/responses
async fn add_response(
    State(state): State<Arc<AppState>>,
    FeedbackId(id): FeedbackId,
    JsonBody(req): JsonBody<ResponseRequest>,
) -> Result<(StatusCode, Json<FeedbackResponse>), ApiError> {
    let response = FeedbackStore::new(&state.db).add_response(id, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Feedback routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/feedback/submit", post(submit))
        .route("/api/feedback/list", get(list))
        .route("/api/feedback/stats/summary", get(stats_summary))
        .route("/api/feedback/{id}", get(get_feedback).patch(update_status))
        .route("/api/feedback/{id}/vote", post(vote))
        .route("/api/feedback/{id}/responses", post(add_response))
}
