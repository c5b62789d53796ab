//! Feedback domain types and request validation
//!
//! Raw request bodies deserialize into the `*Request`/`*Params` structs with
//! every field optional; validated forms are produced by `validate`.

use serde::{Deserialize, Serialize};

use super::validation::{bounded_text, optional_text, required_text};
use super::ValidationError;

/// Matches `user_feedback.subject VARCHAR(500)`
pub const MAX_SUBJECT_LEN: usize = 500;

/// Matches the `VARCHAR(255)` identity columns
pub const MAX_IDENTITY_LEN: usize = 255;

/// Matches `user_feedback.environment VARCHAR(50)`
pub const MAX_ENVIRONMENT_LEN: usize = 50;

/// Declares a closed set of lowercase string values stored in a
/// CHECK-constrained text column.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every accepted value, in declaration order.
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            /// Get string representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value),+
                }
            }

            /// Parse from the stored/requested string form.
            pub fn parse(value: &str) -> Result<Self, ValidationError> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    other => Err(ValidationError::InvalidVariant {
                        field: $field,
                        value: other.to_owned(),
                        expected: Self::VALUES,
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum! {
    /// Kind of feedback submitted
    FeedbackType, field = "feedback_type" {
        Bug => "bug",
        Feature => "feature",
        Improvement => "improvement",
        Question => "question",
        Other => "other",
    }
}

text_enum! {
    /// Triage status of a feedback item
    FeedbackStatus, field = "status" {
        Pending => "pending",
        Reviewed => "reviewed",
        InProgress => "in_progress",
        Resolved => "resolved",
        Closed => "closed",
    }
}

text_enum! {
    Priority, field = "priority" {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

text_enum! {
    VoteType, field = "vote_type" {
        Up => "up",
        Down => "down",
    }
}

impl Default for FeedbackType {
    fn default() -> Self {
        Self::Other
    }
}

/// Raw submission body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitFeedbackRequest {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub feedback_type: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub environment: Option<String>,
}

/// Validated feedback submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub feedback_type: FeedbackType,
    pub subject: String,
    pub message: String,
    /// Falls back to the deployment stage when absent
    pub environment: Option<String>,
}

impl SubmitFeedbackRequest {
    /// Validate a submission.
    ///
    /// # Rules
    /// - `subject` and `message` are required and non-blank
    /// - `subject` is at most 500 characters
    /// - `feedback_type` defaults to `other` and must be a known type
    /// - `user_id` and `email` are at most 255 characters, `environment` at most 50
    pub fn validate(self) -> Result<NewFeedback, ValidationError> {
        let subject = required_text("subject", self.subject, Some(MAX_SUBJECT_LEN))?;
        let message = required_text("message", self.message, None)?;

        let feedback_type = match optional_text(self.feedback_type) {
            Some(raw) => FeedbackType::parse(&raw)?,
            None => FeedbackType::default(),
        };

        Ok(NewFeedback {
            user_id: bounded_text("user_id", self.user_id, MAX_IDENTITY_LEN)?,
            email: bounded_text("email", self.email, MAX_IDENTITY_LEN)?,
            feedback_type,
            subject,
            message,
            environment: bounded_text("environment", self.environment, MAX_ENVIRONMENT_LEN)?,
        })
    }
}

/// Raw list filter from the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackFilterParams {
    pub status: Option<String>,
    pub feedback_type: Option<String>,
    pub priority: Option<String>,
    pub user_id: Option<String>,
}

/// Typed list filter; `None` fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    pub status: Option<FeedbackStatus>,
    pub feedback_type: Option<FeedbackType>,
    pub priority: Option<Priority>,
    pub user_id: Option<String>,
}

impl FeedbackFilterParams {
    pub fn validate(self) -> Result<FeedbackFilter, ValidationError> {
        Ok(FeedbackFilter {
            status: optional_text(self.status)
                .map(|s| FeedbackStatus::parse(&s))
                .transpose()?,
            feedback_type: optional_text(self.feedback_type)
                .map(|s| FeedbackType::parse(&s))
                .transpose()?,
            priority: optional_text(self.priority)
                .map(|s| Priority::parse(&s))
                .transpose()?,
            user_id: optional_text(self.user_id),
        })
    }
}

impl FeedbackFilter {
    /// Column/value pairs in the order they are applied.
    pub fn pairs(&self) -> [(&'static str, Option<String>); 4] {
        [
            ("status", self.status.map(|s| s.as_str().to_owned())),
            (
                "feedback_type",
                self.feedback_type.map(|t| t.as_str().to_owned()),
            ),
            ("priority", self.priority.map(|p| p.as_str().to_owned())),
            ("user_id", self.user_id.clone()),
        ]
    }
}

/// Raw vote body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoteRequest {
    pub user_id: Option<String>,
    pub vote_type: Option<String>,
}

/// Validated vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub user_id: String,
    pub vote_type: VoteType,
}

impl VoteRequest {
    pub fn validate(self) -> Result<Vote, ValidationError> {
        let user_id = required_text("user_id", self.user_id, Some(MAX_IDENTITY_LEN))?;
        let raw = optional_text(self.vote_type).ok_or(ValidationError::Empty { field: "vote_type" })?;

        Ok(Vote {
            user_id,
            vote_type: VoteType::parse(&raw)?,
        })
    }
}

/// Raw status update body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
}

/// Validated status update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: FeedbackStatus,
    pub priority: Option<Priority>,
}

impl StatusUpdateRequest {
    pub fn validate(self) -> Result<StatusUpdate, ValidationError> {
        let raw = optional_text(self.status).ok_or(ValidationError::Empty { field: "status" })?;

        Ok(StatusUpdate {
            status: FeedbackStatus::parse(&raw)?,
            priority: optional_text(self.priority)
                .map(|p| Priority::parse(&p))
                .transpose()?,
        })
    }
}

/// Raw response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseRequest {
    pub responder_id: Option<String>,
    pub response: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// Validated admin response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResponse {
    pub responder_id: String,
    pub response: String,
    pub is_public: bool,
}

impl ResponseRequest {
    pub fn validate(self) -> Result<NewResponse, ValidationError> {
        Ok(NewResponse {
            responder_id: required_text("responder_id", self.responder_id, Some(MAX_IDENTITY_LEN))?,
            response: required_text("response", self.response, None)?,
            is_public: self.is_public,
        })
    }
}

/// Per-feedback vote tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub up: i64,
    pub down: i64,
}

impl VoteTally {
    /// Fold `(vote_type, count)` rows into a tally; unknown types are ignored.
    pub fn from_counts<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        rows.into_iter()
            .fold(Self::default(), |mut tally, (vote_type, count)| {
                match VoteType::parse(&vote_type) {
                    Ok(VoteType::Up) => tally.up = count,
                    Ok(VoteType::Down) => tally.down = count,
                    Err(_) => {}
                }
                tally
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(feedback_type: Option<&str>) -> SubmitFeedbackRequest {
        SubmitFeedbackRequest {
            feedback_type: feedback_type.map(str::to_owned),
            subject: Some("S".into()),
            message: Some("M".into()),
            ..Default::default()
        }
    }

    #[test]
    fn enum_round_trips_through_strings() {
        for value in FeedbackStatus::VALUES {
            assert_eq!(FeedbackStatus::parse(value).unwrap().as_str(), *value);
        }
        assert_eq!(FeedbackStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn serde_uses_stored_form() {
        let json = serde_json::to_string(&FeedbackStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let parsed: Priority = serde_json::from_str("\"urgent\"").unwrap();
        assert_eq!(parsed, Priority::Urgent);
    }

    #[test]
    fn submission_minimal_is_valid() {
        let new = submission(Some("bug")).validate().unwrap();
        assert_eq!(new.feedback_type, FeedbackType::Bug);
        assert_eq!(new.subject, "S");
        assert_eq!(new.message, "M");
        assert!(new.user_id.is_none());
        assert!(new.email.is_none());
    }

    #[test]
    fn submission_type_defaults_to_other() {
        let new = submission(None).validate().unwrap();
        assert_eq!(new.feedback_type, FeedbackType::Other);
    }

    #[test]
    fn submission_rejects_unknown_type() {
        let err = submission(Some("nonsense")).validate().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidVariant { field: "feedback_type", .. }
        ));
    }

    #[test]
    fn submission_requires_subject_and_message() {
        let err = SubmitFeedbackRequest {
            message: Some("M".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "subject" });

        let err = SubmitFeedbackRequest {
            subject: Some("S".into()),
            message: Some("".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "message" });
    }

    #[test]
    fn submission_bounds_identity_and_environment() {
        let long = |n: usize| Some("x".repeat(n));

        let mut request = submission(Some("bug"));
        request.user_id = long(MAX_IDENTITY_LEN + 1);
        assert_eq!(
            request.validate().unwrap_err(),
            ValidationError::TooLong { field: "user_id", max: 255 }
        );

        let mut request = submission(Some("bug"));
        request.email = long(300);
        assert_eq!(
            request.validate().unwrap_err(),
            ValidationError::TooLong { field: "email", max: 255 }
        );

        let mut request = submission(Some("bug"));
        request.environment = long(60);
        assert_eq!(
            request.validate().unwrap_err(),
            ValidationError::TooLong { field: "environment", max: 50 }
        );

        let mut request = submission(Some("bug"));
        request.user_id = long(MAX_IDENTITY_LEN);
        request.email = long(MAX_IDENTITY_LEN);
        request.environment = long(MAX_ENVIRONMENT_LEN);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn filter_params_validate_enums() {
        let filter = FeedbackFilterParams {
            status: Some("pending".into()),
            user_id: Some("u1".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(filter.status, Some(FeedbackStatus::Pending));
        assert_eq!(filter.user_id.as_deref(), Some("u1"));

        let err = FeedbackFilterParams {
            priority: Some("whenever".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.field(), "priority");
    }

    #[test]
    fn filter_pairs_keep_column_order() {
        let filter = FeedbackFilter {
            priority: Some(Priority::High),
            ..Default::default()
        };
        let columns: Vec<_> = filter.pairs().iter().map(|(c, _)| *c).collect();
        assert_eq!(columns, ["status", "feedback_type", "priority", "user_id"]);
        assert_eq!(filter.pairs()[2].1.as_deref(), Some("high"));
    }

    #[test]
    fn vote_requires_user_and_known_type() {
        let err = VoteRequest {
            user_id: None,
            vote_type: Some("up".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "user_id" });

        let err = VoteRequest {
            user_id: Some("u".into()),
            vote_type: Some("sideways".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.field(), "vote_type");

        let vote = VoteRequest {
            user_id: Some("u".into()),
            vote_type: Some("down".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(vote.vote_type, VoteType::Down);
    }

    #[test]
    fn tally_defaults_to_zero() {
        assert_eq!(VoteTally::from_counts(Vec::new()), VoteTally { up: 0, down: 0 });

        let tally = VoteTally::from_counts(vec![("down".to_owned(), 3), ("bogus".to_owned(), 9)]);
        assert_eq!(tally, VoteTally { up: 0, down: 3 });
    }

    #[test]
    fn status_update_requires_status() {
        let err = StatusUpdateRequest::default().validate().unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "status" });

        let update = StatusUpdateRequest {
            status: Some("resolved".into()),
            priority: Some("low".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(update.status, FeedbackStatus::Resolved);
        assert_eq!(update.priority, Some(Priority::Low));
    }
}
