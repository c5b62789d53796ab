//! Store integration tests against a real PostgreSQL database
//!
//! Run with: TEST_DATABASE_URL=postgres://... cargo test -p webapp-server -- --ignored

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::{Mutex, MutexGuard};

use webapp_server::config::{PoolSettings, TlsMode};
use webapp_server::db::migrations;
use webapp_server::db::stores::{FeedbackStore, FlagStore, SubmitContext, VisitStore};
use webapp_server::db::{ConnectionDescriptor, ConnectionManager, StaticResolver};
use webapp_server::models::{
    FeedbackFilter, FeedbackStatus, Page, Priority, ResponseRequest, StatusUpdateRequest,
    SubmitFeedbackRequest, ValidationError, VoteRequest, VoteTally,
};
use webapp_server::StoreError;

/// Tests share one database; run them one at a time.
static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

struct TestDb {
    manager: ConnectionManager,
    _guard: MutexGuard<'static, ()>,
}

async fn test_db() -> TestDb {
    let guard = DB_LOCK.lock().await;
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL required");

    let settings = PoolSettings {
        tls: TlsMode::Disabled,
        run_migrations: true,
        ..PoolSettings::default()
    };
    let manager = ConnectionManager::connect(
        Arc::new(StaticResolver(ConnectionDescriptor::Url(url))),
        settings,
    )
    .await;
    assert!(manager.is_enabled().await, "test database unreachable");

    let pool = manager.require_pool().await.unwrap();
    sqlx::query(
        "TRUNCATE user_feedback, feedback_responses, feedback_votes, visits RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .expect("truncate failed");

    TestDb {
        manager,
        _guard: guard,
    }
}

fn context() -> SubmitContext {
    SubmitContext {
        ip: Some("203.0.113.7".into()),
        user_agent: Some("integration-test".into()),
        version: "1.2.3".into(),
        stage: "test".into(),
    }
}

fn submission(subject: &str, feedback_type: &str, user_id: Option<&str>) -> SubmitFeedbackRequest {
    SubmitFeedbackRequest {
        user_id: user_id.map(str::to_owned),
        email: Some("user@example.com".into()),
        feedback_type: Some(feedback_type.into()),
        subject: Some(subject.into()),
        message: Some("Details".into()),
        environment: None,
    }
}

fn vote(user_id: &str, vote_type: &str) -> VoteRequest {
    VoteRequest {
        user_id: Some(user_id.into()),
        vote_type: Some(vote_type.into()),
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn submit_then_get_round_trip() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);

    let submitted = store
        .submit(submission("Button broken", "bug", Some("u1")), &context())
        .await
        .unwrap();
    let detail = store.get_by_id(submitted.id).await.unwrap();

    assert_eq!(detail.feedback.id, submitted.id);
    assert_eq!(detail.feedback.subject, "Button broken");
    assert_eq!(detail.feedback.feedback_type, "bug");
    assert_eq!(detail.feedback.status, "pending");
    assert_eq!(detail.feedback.priority.as_deref(), Some("medium"));
    assert_eq!(detail.feedback.environment.as_deref(), Some("test"));
    assert_eq!(detail.feedback.user_agent.as_deref(), Some("integration-test"));
    assert_eq!(detail.feedback.created_at, submitted.created_at);
    assert!(detail.feedback.resolved_at.is_none());
    assert!(detail.responses.is_empty());
    assert_eq!(detail.votes, VoteTally { up: 0, down: 0 });

    let metadata = detail.feedback.metadata.unwrap();
    assert_eq!(metadata["ip"], "203.0.113.7");
    assert_eq!(metadata["version"], "1.2.3");
    assert!(metadata["timestamp"].is_string());
}

#[tokio::test]
#[ignore = "requires database"]
async fn explicit_environment_is_kept() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);

    let mut request = submission("S", "feature", None);
    request.environment = Some("staging".into());
    let submitted = store.submit(request, &context()).await.unwrap();

    let detail = store.get_by_id(submitted.id).await.unwrap();
    assert_eq!(detail.feedback.environment.as_deref(), Some("staging"));
}

#[tokio::test]
#[ignore = "requires database"]
async fn invalid_type_inserts_nothing() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);

    let err = store
        .submit(submission("S", "nonsense", None), &context())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(ValidationError::InvalidVariant { .. })));

    let page = store.list(&FeedbackFilter::default(), Page::default()).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.feedback.is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn missing_feedback_is_not_found() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);

    let err = store.get_by_id(999999).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { resource: "feedback", .. }));

    let err = store.vote(999999, vote("u1", "up")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let err = store
        .update_status(
            999999,
            StatusUpdateRequest {
                status: Some("closed".into()),
                priority: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));

    let err = store
        .add_response(
            999999,
            ResponseRequest {
                responder_id: Some("admin".into()),
                response: Some("Thanks".into()),
                is_public: true,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[tokio::test]
#[ignore = "requires database"]
async fn revote_replaces_previous_vote() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);
    let id = store
        .submit(submission("S", "feature", None), &context())
        .await
        .unwrap()
        .id;

    assert_eq!(store.vote(id, vote("u1", "up")).await.unwrap(), VoteTally { up: 1, down: 0 });
    assert_eq!(store.vote(id, vote("u1", "down")).await.unwrap(), VoteTally { up: 0, down: 1 });
    assert_eq!(store.vote(id, vote("u2", "up")).await.unwrap(), VoteTally { up: 1, down: 1 });

    let pool = db.manager.require_pool().await.unwrap();
    let (rows,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM feedback_votes WHERE feedback_id = $1 AND user_id = 'u1'")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn pages_are_bounded_disjoint_and_share_total() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);

    for i in 0..7 {
        store
            .submit(submission(&format!("Item {}", i), "question", Some("pager")), &context())
            .await
            .unwrap();
    }
    store
        .submit(submission("Other user", "question", Some("someone-else")), &context())
        .await
        .unwrap();

    let filter = FeedbackFilter {
        user_id: Some("pager".into()),
        ..Default::default()
    };

    let mut page = Page::new(3, 0);
    let mut seen = HashSet::new();
    loop {
        let result = store.list(&filter, page).await.unwrap();
        assert_eq!(result.total, 7);
        assert_eq!(result.limit, 3);
        assert!(result.feedback.len() <= 3);
        if result.feedback.is_empty() {
            break;
        }
        for record in &result.feedback {
            assert_eq!(record.user_id.as_deref(), Some("pager"));
            assert!(seen.insert(record.id), "record {} returned twice", record.id);
        }
        page = page.next();
    }
    assert_eq!(seen.len(), 7);
}

#[tokio::test]
#[ignore = "requires database"]
async fn zero_limit_returns_empty_page_with_total() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);

    for i in 0..3 {
        store
            .submit(submission(&format!("Item {}", i), "bug", None), &context())
            .await
            .unwrap();
    }

    let result = store
        .list(&FeedbackFilter::default(), Page::coerce(Some("0"), None))
        .await
        .unwrap();
    assert_eq!(result.limit, 0);
    assert!(result.feedback.is_empty());
    assert_eq!(result.total, 3);
}

#[tokio::test]
#[ignore = "requires database"]
async fn oversized_optional_fields_are_rejected_before_insert() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);

    let mut request = submission("S", "bug", None);
    request.email = Some(format!("{}@example.com", "a".repeat(300)));
    let err = store.submit(request, &context()).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::TooLong { field: "email", .. })
    ));

    let mut request = submission("S", "bug", None);
    request.environment = Some("e".repeat(60));
    let err = store.submit(request, &context()).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::TooLong { field: "environment", max: 50 })
    ));

    let page = store.list(&FeedbackFilter::default(), Page::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[ignore = "requires database"]
async fn list_is_newest_first_and_filters_by_status() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);

    let first = store.submit(submission("First", "bug", None), &context()).await.unwrap().id;
    let second = store.submit(submission("Second", "bug", None), &context()).await.unwrap().id;

    let all = store.list(&FeedbackFilter::default(), Page::default()).await.unwrap();
    let ids: Vec<i32> = all.feedback.iter().map(|f| f.id).collect();
    assert_eq!(ids, vec![second, first]);

    store
        .update_status(
            first,
            StatusUpdateRequest {
                status: Some("resolved".into()),
                priority: Some("high".into()),
            },
        )
        .await
        .unwrap();

    let resolved = store
        .list(
            &FeedbackFilter {
                status: Some(FeedbackStatus::Resolved),
                priority: Some(Priority::High),
                ..Default::default()
            },
            Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(resolved.total, 1);
    assert_eq!(resolved.feedback[0].id, first);
}

#[tokio::test]
#[ignore = "requires database"]
async fn resolving_stamps_resolved_at() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);
    let id = store.submit(submission("S", "bug", None), &context()).await.unwrap().id;

    let reviewed = store
        .update_status(
            id,
            StatusUpdateRequest {
                status: Some("reviewed".into()),
                priority: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(reviewed.status, "reviewed");
    assert_eq!(reviewed.priority.as_deref(), Some("medium"));
    assert!(reviewed.resolved_at.is_none());

    let resolved = store
        .update_status(
            id,
            StatusUpdateRequest {
                status: Some("resolved".into()),
                priority: Some("urgent".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(resolved.status, "resolved");
    assert_eq!(resolved.priority.as_deref(), Some("urgent"));
    assert!(resolved.resolved_at.is_some());
}

#[tokio::test]
#[ignore = "requires database"]
async fn responses_are_listed_oldest_first() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);
    let id = store.submit(submission("S", "question", None), &context()).await.unwrap().id;

    for text in ["Looking into it", "Fixed in 1.2.4"] {
        store
            .add_response(
                id,
                ResponseRequest {
                    responder_id: Some("admin".into()),
                    response: Some(text.into()),
                    is_public: true,
                },
            )
            .await
            .unwrap();
    }

    let err = store
        .add_response(
            id,
            ResponseRequest {
                responder_id: Some("admin".into()),
                response: Some("   ".into()),
                is_public: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    let detail = store.get_by_id(id).await.unwrap();
    let texts: Vec<&str> = detail.responses.iter().map(|r| r.response.as_str()).collect();
    assert_eq!(texts, ["Looking into it", "Fixed in 1.2.4"]);
    assert_eq!(detail.responses[0].is_public, Some(true));
}

#[tokio::test]
#[ignore = "requires database"]
async fn stats_summary_aggregates() {
    let db = test_db().await;
    let store = FeedbackStore::new(&db.manager);

    let bug = store.submit(submission("Bug", "bug", None), &context()).await.unwrap().id;
    let idea = store.submit(submission("Idea", "feature", None), &context()).await.unwrap().id;
    store.vote(idea, vote("u1", "up")).await.unwrap();
    store.vote(idea, vote("u2", "up")).await.unwrap();
    store.vote(bug, vote("u1", "down")).await.unwrap();

    let stats = store.stats_summary().await.unwrap();
    assert_eq!(stats.recent_count, 2);

    let pending = stats.by_status.iter().find(|s| s.status == "pending").unwrap();
    assert_eq!(pending.count, 2);
    assert_eq!(stats.by_type.len(), 2);
    assert_eq!(stats.by_priority.len(), 1);

    assert_eq!(stats.top_voted[0].id, idea);
    assert_eq!(stats.top_voted[0].upvotes, 2);
    assert_eq!(stats.top_voted[1].downvotes, 1);
}

#[tokio::test]
#[ignore = "requires database"]
async fn visits_are_recorded_and_summarized() {
    let db = test_db().await;
    let store = VisitStore::new(&db.manager, "test");

    let first = store
        .record("/api/flags", Some("agent"), Some("::ffff:10.0.0.9"), Some(12))
        .await
        .unwrap();
    let visit = first.visit.unwrap();
    assert_eq!(first.total_visits, 1);
    assert_eq!(visit.ip_address.as_deref(), Some("10.0.0.9"));
    assert_eq!(visit.stage.as_deref(), Some("test"));

    store.record("/api/flags", None, Some("not-an-ip"), None).await.unwrap();
    let third = store.record("/", None, None, Some(1)).await.unwrap();
    assert_eq!(third.total_visits, 3);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_visits, 3);
    assert_eq!(stats.unique_paths, 2);
    assert_eq!(stats.recent_visits.len(), 3);
    assert_eq!(stats.recent_visits[0].endpoint.as_deref(), Some("/"));
    assert!(stats.recent_visits[1].ip_address.is_none());
}

#[tokio::test]
#[ignore = "requires database"]
async fn flags_are_seeded_and_upserted() {
    let db = test_db().await;
    let store = FlagStore::new(&db.manager);

    let flags = store.all().await;
    assert_eq!(flags.get("darkMode"), Some(&false));
    assert_eq!(flags.get("betaFeatures"), Some(&false));
    assert_eq!(flags.get("debugMode"), Some(&false));

    let flag = store
        .upsert("integrationFlag", true, Some("Created by tests".into()))
        .await
        .unwrap();
    assert_eq!(flag.enabled, Some(true));
    assert!(store.is_enabled("integrationFlag").await);
    assert!(!store.is_enabled("doesNotExist").await);

    let flag = store.upsert("integrationFlag", false, None).await.unwrap();
    assert_eq!(flag.enabled, Some(false));
    assert_eq!(flag.description.as_deref(), Some("Created by tests"));
}

#[tokio::test]
#[ignore = "requires database"]
async fn migration_status_reports_latest() {
    let db = test_db().await;
    let pool = db.manager.require_pool().await.unwrap();

    let status = migrations::status(&pool).await.unwrap();
    assert!(status.migrated);
    assert!(status.latest.unwrap().starts_with("0002_"));
    assert!(status.run_on.is_some());
    assert!(status.message.is_none());
}
