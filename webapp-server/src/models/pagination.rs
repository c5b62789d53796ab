//! Limit/offset pagination

use serde::{Deserialize, Serialize};

/// Maximum rows per page
pub const MAX_LIMIT: i64 = 100;

/// Default rows per page
pub const DEFAULT_LIMIT: i64 = 20;

/// Default offset
pub const DEFAULT_OFFSET: i64 = 0;

/// Pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Rows per page (0..=100)
    pub limit: i64,
    /// Rows to skip (>= 0)
    pub offset: i64,
}

impl Page {
    /// Create a page window, clamping out-of-range values.
    ///
    /// - Limit is clamped to 0..=100; a zero limit yields an empty page
    /// - Offset is clamped to a minimum of 0
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: limit.clamp(0, MAX_LIMIT),
            offset: offset.max(0),
        }
    }

    /// Best-effort coercion of raw query-string values.
    ///
    /// Leading integers are honored (`"15abc"` → 15); anything without one
    /// falls back to the default. Never fails.
    pub fn coerce(limit: Option<&str>, offset: Option<&str>) -> Self {
        Self::new(
            limit.and_then(leading_integer).unwrap_or(DEFAULT_LIMIT),
            offset.and_then(leading_integer).unwrap_or(DEFAULT_OFFSET),
        )
    }

    /// The window immediately after this one.
    pub fn next(&self) -> Self {
        Self::new(self.limit, self.offset + self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

/// Query parameters for pagination, kept as raw strings so malformed input
/// degrades to defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl From<&PageParams> for Page {
    fn from(params: &PageParams) -> Self {
        Self::coerce(params.limit.as_deref(), params.offset.as_deref())
    }
}

/// Parse the leading `[-]digits` prefix of a string.
fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    digits[..end].parse::<i64>().ok().map(|n| n * sign)
}
