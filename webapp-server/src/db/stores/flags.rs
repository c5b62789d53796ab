//! Feature flag store
//!
//! Reads never fail: a disabled database or a failed query falls back to
//! the built-in defaults.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::driver;
use crate::db::manager::ConnectionManager;
use crate::error::Result;
use crate::models::feedback::MAX_IDENTITY_LEN;
use crate::models::validation::{optional_text, required_text};

/// Flags seeded by the initial migration, all off
pub const DEFAULT_FLAGS: &[&str] = &["darkMode", "betaFeatures", "debugMode"];

/// Feature flag row
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FeatureFlag {
    pub id: i32,
    pub name: String,
    pub enabled: Option<bool>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Default flag map
pub fn default_flags() -> BTreeMap<String, bool> {
    DEFAULT_FLAGS
        .iter()
        .map(|name| ((*name).to_owned(), false))
        .collect()
}

pub struct FlagStore<'a> {
    db: &'a ConnectionManager,
}

impl<'a> FlagStore<'a> {
    pub fn new(db: &'a ConnectionManager) -> Self {
        Self { db }
    }

    /// Every flag as `name -> enabled`; defaults when unavailable.
    pub async fn all(&self) -> BTreeMap<String, bool> {
        match self.list().await {
            Ok(flags) => flags
                .into_iter()
                .map(|flag| (flag.name, flag.enabled.unwrap_or(false)))
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "Using default feature flags");
                default_flags()
            }
        }
    }

    /// Whether `name` is on; unknown flags and a disabled database read as off.
    pub async fn is_enabled(&self, name: &str) -> bool {
        let Some(pool) = self.db.pool().await else {
            return false;
        };

        let enabled: std::result::Result<Option<(Option<bool>,)>, _> =
            sqlx::query_as("SELECT enabled FROM feature_flags WHERE name = $1")
                .bind(name)
                .fetch_optional(&pool)
                .await;

        match enabled {
            Ok(row) => row.and_then(|(enabled,)| enabled).unwrap_or(false),
            Err(e) => {
                tracing::error!(error = %e, flag = %name, "Failed to read feature flag");
                false
            }
        }
    }

    /// All flag rows ordered by name.
    pub async fn list(&self) -> Result<Vec<FeatureFlag>> {
        let pool = self.db.require_pool().await?;

        sqlx::query_as("SELECT * FROM feature_flags ORDER BY name")
            .fetch_all(&pool)
            .await
            .map_err(driver("list feature flags"))
    }

    /// Create or update a flag. A `None` description keeps the existing one.
    pub async fn upsert(
        &self,
        name: &str,
        enabled: bool,
        description: Option<String>,
    ) -> Result<FeatureFlag> {
        let name = required_text("name", Some(name.to_owned()), Some(MAX_IDENTITY_LEN))?;
        let description = optional_text(description);
        let pool = self.db.require_pool().await?;

        let flag: FeatureFlag = sqlx::query_as(
            r#"
            INSERT INTO feature_flags (name, enabled, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (name)
            DO UPDATE SET enabled = EXCLUDED.enabled,
                          description = COALESCE(EXCLUDED.description, feature_flags.description)
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(enabled)
        .bind(description)
        .fetch_one(&pool)
        .await
        .map_err(driver("upsert feature flag"))?;

        tracing::info!(flag = %flag.name, enabled, "Feature flag updated");
        Ok(flag)
    }
}
