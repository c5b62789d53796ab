//! Domain models with validation at construction
//!
//! All caller input is validated before it reaches the database.
//! Invalid input returns ValidationError, not panic.

pub mod feedback;
pub mod pagination;
pub mod validation;

pub use feedback::{
    FeedbackFilter, FeedbackFilterParams, FeedbackStatus, FeedbackType, NewFeedback, NewResponse,
    Priority, ResponseRequest, StatusUpdate, StatusUpdateRequest, SubmitFeedbackRequest, Vote,
    VoteRequest, VoteTally, VoteType,
};
pub use pagination::{Page, PageParams};
pub use validation::ValidationError;
