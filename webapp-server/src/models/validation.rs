//! Validation error types

use std::fmt;

/// Validation error for caller input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is missing or blank
    Empty { field: &'static str },

    /// Field exceeds maximum length
    TooLong { field: &'static str, max: usize },

    /// Field has invalid format
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    /// Value is not one of the accepted variants
    InvalidVariant {
        field: &'static str,
        value: String,
        expected: &'static [&'static str],
    },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field }
            | Self::TooLong { field, .. }
            | Self::InvalidFormat { field, .. }
            | Self::InvalidVariant { field, .. } => *field,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty { field } => write!(f, "{} is required", field),
            Self::TooLong { field, max } => {
                write!(f, "{} exceeds maximum length of {} characters", field, max)
            }
            Self::InvalidFormat { field, reason } => write!(f, "{}: {}", field, reason),
            Self::InvalidVariant {
                field,
                value,
                expected,
            } => write!(
                f,
                "invalid {} '{}' (expected one of: {})",
                field,
                value,
                expected.join(", ")
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Trim a required text field, rejecting blank and oversized values.
pub(crate) fn required_text(
    field: &'static str,
    value: Option<String>,
    max: Option<usize>,
) -> Result<String, ValidationError> {
    let value = value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::Empty { field })?;

    if let Some(max) = max {
        if value.chars().count() > max {
            return Err(ValidationError::TooLong { field, max });
        }
    }

    Ok(value)
}

/// Normalize an optional text field: blank becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// Like [`optional_text`], but rejects values longer than `max` characters.
pub(crate) fn bounded_text(
    field: &'static str,
    value: Option<String>,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match optional_text(value) {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong { field, max }),
        other => Ok(other),
    }
}
