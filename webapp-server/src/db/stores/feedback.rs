//! Feedback store
//!
//! Handles user feedback with:
//! - Validated submission with request metadata
//! - Filtered, paginated listing with a matching total
//! - Detail view with responses and vote tally
//! - Per-user vote upsert
//! - Triage (status/priority) and admin responses

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Row};

use super::{driver, parent_or_driver};
use crate::db::compose::{ComposedQuery, WhereClause};
use crate::db::manager::ConnectionManager;
use crate::error::{Result, StoreError};
use crate::models::{
    FeedbackFilter, FeedbackStatus, Page, ResponseRequest, StatusUpdateRequest,
    SubmitFeedbackRequest, VoteRequest, VoteTally,
};

const TABLE: &str = "user_feedback";

/// Columns a list filter may constrain
pub const FILTER_COLUMNS: &[&str] = &["status", "feedback_type", "priority", "user_id"];

/// Days counted as "recent" in the summary
const RECENT_WINDOW_DAYS: i32 = 7;

/// Entries in the top-voted summary
const TOP_VOTED_LIMIT: i64 = 5;

/// Feedback row
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FeedbackRecord {
    pub id: i32,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub feedback_type: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub priority: Option<String>,
    pub environment: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
}

/// Admin response row
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FeedbackResponse {
    pub id: i32,
    pub feedback_id: i32,
    pub responder_id: String,
    pub response: String,
    pub is_public: Option<bool>,
    pub created_at: NaiveDateTime,
}

/// Feedback with its responses (oldest first) and vote tally
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackDetail {
    #[serde(flatten)]
    pub feedback: FeedbackRecord,
    pub responses: Vec<FeedbackResponse>,
    pub votes: VoteTally,
}

/// One page of feedback plus the unwindowed total
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackPage {
    pub feedback: Vec<FeedbackRecord>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Result of a successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmittedFeedback {
    pub id: i32,
    pub created_at: NaiveDateTime,
}

/// Request-derived values stored alongside a submission
#[derive(Debug, Clone, Default)]
pub struct SubmitContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub version: String,
    /// Environment recorded when the submission names none
    pub stage: String,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TypeCount {
    pub feedback_type: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PriorityCount {
    pub priority: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TopVoted {
    pub id: i32,
    pub subject: String,
    pub feedback_type: String,
    pub upvotes: i64,
    pub downvotes: i64,
}

/// Aggregate counts across all feedback
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStats {
    pub by_status: Vec<StatusCount>,
    pub by_type: Vec<TypeCount>,
    pub by_priority: Vec<PriorityCount>,
    pub recent_count: i64,
    pub top_voted: Vec<TopVoted>,
}

/// Feedback store
pub struct FeedbackStore<'a> {
    db: &'a ConnectionManager,
}

impl<'a> FeedbackStore<'a> {
    pub fn new(db: &'a ConnectionManager) -> Self {
        Self { db }
    }

    /// Validate and insert a submission.
    ///
    /// Validation runs before the database is consulted, so invalid input
    /// is rejected the same way whether or not persistence is enabled.
    pub async fn submit(
        &self,
        request: SubmitFeedbackRequest,
        context: &SubmitContext,
    ) -> Result<SubmittedFeedback> {
        let feedback = request.validate()?;
        let pool = self.db.require_pool().await?;

        let metadata = serde_json::json!({
            "ip": context.ip,
            "timestamp": Utc::now().to_rfc3339(),
            "version": context.version,
        });
        let environment = feedback.environment.as_deref().unwrap_or(&context.stage);

        let (id, created_at): (i32, NaiveDateTime) = sqlx::query_as(
            r#"
            INSERT INTO user_feedback
                (user_id, email, feedback_type, subject, message, environment, user_agent, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, created_at
            "#,
        )
        .bind(feedback.user_id.as_deref())
        .bind(feedback.email.as_deref())
        .bind(feedback.feedback_type.as_str())
        .bind(&feedback.subject)
        .bind(&feedback.message)
        .bind(environment)
        .bind(context.user_agent.as_deref())
        .bind(metadata)
        .fetch_one(&pool)
        .await
        .map_err(driver("insert feedback"))?;

        tracing::info!(feedback_id = id, feedback_type = %feedback.feedback_type, "Feedback submitted");
        Ok(SubmittedFeedback { id, created_at })
    }

    /// List feedback newest first.
    pub async fn list(&self, filter: &FeedbackFilter, page: Page) -> Result<FeedbackPage> {
        let clause = WhereClause::build(filter.pairs(), FILTER_COLUMNS);

        let select = ComposedQuery::select(
            "SELECT * FROM user_feedback",
            &clause,
            Some("created_at DESC, id DESC"),
        )
        .paginate(page);
        let feedback = self
            .db
            .query(&select)
            .await?
            .iter()
            .map(FeedbackRecord::from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(driver("decode feedback rows"))?;

        let count = self.db.query(&ComposedQuery::count(TABLE, &clause)).await?;
        let total = match count.first() {
            Some(row) => row
                .try_get::<i64, _>(0)
                .map_err(driver("decode feedback count"))?,
            None => 0,
        };

        Ok(FeedbackPage {
            feedback,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    /// Get a single feedback item with responses and votes.
    pub async fn get_by_id(&self, id: i32) -> Result<FeedbackDetail> {
        let pool = self.db.require_pool().await?;

        let feedback: FeedbackRecord = sqlx::query_as("SELECT * FROM user_feedback WHERE id = $1")
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(driver("select feedback"))?
            .ok_or_else(|| StoreError::not_found("feedback", id))?;

        let responses: Vec<FeedbackResponse> = sqlx::query_as(
            "SELECT * FROM feedback_responses WHERE feedback_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(id)
        .fetch_all(&pool)
        .await
        .map_err(driver("select feedback responses"))?;

        let votes = self.tally(&pool, id).await?;

        Ok(FeedbackDetail {
            feedback,
            responses,
            votes,
        })
    }

    /// Record or replace a user's vote and return the new tally.
    pub async fn vote(&self, id: i32, request: VoteRequest) -> Result<VoteTally> {
        let vote = request.validate()?;
        let pool = self.db.require_pool().await?;

        sqlx::query(
            r#"
            INSERT INTO feedback_votes (feedback_id, user_id, vote_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (feedback_id, user_id)
            DO UPDATE SET vote_type = EXCLUDED.vote_type, created_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(id)
        .bind(&vote.user_id)
        .bind(vote.vote_type.as_str())
        .execute(&pool)
        .await
        .map_err(parent_or_driver("upsert vote", "feedback", id))?;

        self.tally(&pool, id).await
    }

    /// Aggregate counts by status, type and priority, plus recent and top-voted.
    pub async fn stats_summary(&self) -> Result<FeedbackStats> {
        let pool = self.db.require_pool().await?;

        let by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM user_feedback GROUP BY status",
        )
        .fetch_all(&pool);

        let by_type = sqlx::query_as::<_, TypeCount>(
            "SELECT feedback_type, COUNT(*) AS count FROM user_feedback GROUP BY feedback_type",
        )
        .fetch_all(&pool);

        let by_priority = sqlx::query_as::<_, PriorityCount>(
            "SELECT priority, COUNT(*) AS count FROM user_feedback GROUP BY priority",
        )
        .fetch_all(&pool);

        let recent = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM user_feedback WHERE created_at >= NOW() - make_interval(days => $1)",
        )
        .bind(RECENT_WINDOW_DAYS)
        .fetch_one(&pool);

        let top_voted = sqlx::query_as::<_, TopVoted>(
            r#"
            SELECT f.id, f.subject, f.feedback_type,
                   COALESCE(SUM(CASE WHEN v.vote_type = 'up' THEN 1 ELSE 0 END), 0) AS upvotes,
                   COALESCE(SUM(CASE WHEN v.vote_type = 'down' THEN 1 ELSE 0 END), 0) AS downvotes
            FROM user_feedback f
            LEFT JOIN feedback_votes v ON f.id = v.feedback_id
            GROUP BY f.id, f.subject, f.feedback_type
            ORDER BY upvotes DESC, f.id ASC
            LIMIT $1
            "#,
        )
        .bind(TOP_VOTED_LIMIT)
        .fetch_all(&pool);

        let (by_status, by_type, by_priority, (recent_count,), top_voted) =
            tokio::try_join!(by_status, by_type, by_priority, recent, top_voted)
                .map_err(driver("feedback statistics"))?;

        Ok(FeedbackStats {
            by_status,
            by_type,
            by_priority,
            recent_count,
            top_voted,
        })
    }

    /// Change status and optionally priority.
    ///
    /// Moving to `resolved` stamps `resolved_at`.
    pub async fn update_status(&self, id: i32, request: StatusUpdateRequest) -> Result<FeedbackRecord> {
        let update = request.validate()?;
        let pool = self.db.require_pool().await?;

        let record: Option<FeedbackRecord> = sqlx::query_as(
            r#"
            UPDATE user_feedback
            SET status = $2,
                priority = COALESCE($3, priority),
                resolved_at = CASE WHEN $4 THEN CURRENT_TIMESTAMP ELSE resolved_at END
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.status.as_str())
        .bind(update.priority.map(|p| p.as_str()))
        .bind(update.status == FeedbackStatus::Resolved)
        .fetch_optional(&pool)
        .await
        .map_err(driver("update feedback status"))?;

        let record = record.ok_or_else(|| StoreError::not_found("feedback", id))?;
        tracing::info!(feedback_id = id, status = %update.status, "Feedback status updated");
        Ok(record)
    }

    /// Attach an admin response.
    pub async fn add_response(&self, id: i32, request: ResponseRequest) -> Result<FeedbackResponse> {
        let response = request.validate()?;
        let pool = self.db.require_pool().await?;

        sqlx::query_as(
            r#"
            INSERT INTO feedback_responses (feedback_id, responder_id, response, is_public)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&response.responder_id)
        .bind(&response.response)
        .bind(response.is_public)
        .fetch_one(&pool)
        .await
        .map_err(parent_or_driver("insert feedback response", "feedback", id))
    }

    async fn tally(&self, pool: &sqlx::PgPool, id: i32) -> Result<VoteTally> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT vote_type, COUNT(*)
            FROM feedback_votes
            WHERE feedback_id = $1
            GROUP BY vote_type
            "#,
        )
        .bind(id)
        .fetch_all(pool)
        .await
        .map_err(driver("count votes"))?;

        Ok(VoteTally::from_counts(counts))
    }
}
