//! Store implementations over the connection manager
//!
//! Each store follows these patterns:
//! - Validates input before touching the database
//! - Returns `NotConfigured` (or a documented fallback) when disabled
//! - Upserts via ON CONFLICT (no check-then-insert)

pub mod feedback;
pub mod flags;
pub mod visits;

pub use feedback::{
    FeedbackDetail, FeedbackPage, FeedbackRecord, FeedbackResponse, FeedbackStats, FeedbackStore,
    SubmitContext, SubmittedFeedback,
};
pub use flags::{FeatureFlag, FlagStore};
pub use visits::{RecordedVisit, Visit, VisitStats, VisitStore};

use super::manager::observe_error;
use crate::error::StoreError;

/// Log a failed statement and wrap it.
pub(crate) fn driver(statement: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| {
        observe_error(&err, statement);
        StoreError::Driver(err)
    }
}

/// Like [`driver`], but a foreign-key violation means the parent row is missing.
pub(crate) fn parent_or_driver(
    statement: &'static str,
    resource: &'static str,
    id: i32,
) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| match StoreError::missing_parent(err, resource, id) {
        StoreError::Driver(err) => driver(statement)(err),
        other => other,
    }
}
