//! Error types for webapp-server stores

use thiserror::Error;

use crate::models::ValidationError;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure of a store operation
#[derive(Error, Debug)]
pub enum StoreError {
    /// No usable database; an expected, non-fatal operating mode
    #[error("database is not configured")]
    NotConfigured,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{resource} '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    /// The SQL statement failed
    #[error("database error: {0}")]
    Driver(#[from] sqlx::Error),
}

impl StoreError {
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Map a foreign-key violation onto `NotFound` for the referenced row.
    pub(crate) fn missing_parent(err: sqlx::Error, resource: &'static str, id: impl ToString) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => Self::not_found(resource, id),
            _ => Self::Driver(err),
        }
    }
}
