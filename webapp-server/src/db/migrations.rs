//! Embedded schema migrations
//!
//! SQL files live in `webapp-server/migrations/` and are compiled into the
//! binary. sqlx records applied versions in `_sqlx_migrations`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply all pending migrations.
pub async fn run(pool: &PgPool) -> Result<(), MigrateError> {
    tracing::info!(available = MIGRATOR.iter().count(), "Running database migrations");
    MIGRATOR.run(pool).await?;
    tracing::info!("Database migrations complete");
    Ok(())
}

/// Applied-migration summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationStatus {
    pub migrated: bool,
    pub latest: Option<String>,
    pub run_on: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MigrationStatus {
    fn not_migrated(message: &str) -> Self {
        Self {
            migrated: false,
            latest: None,
            run_on: None,
            message: Some(message.to_owned()),
        }
    }
}

/// Report the most recently applied migration.
pub async fn status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let (table_exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(MigrationStatus::not_migrated("Migrations table does not exist"));
    }

    let latest: Option<(i64, String, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT version, description, installed_on
        FROM _sqlx_migrations
        WHERE success
        ORDER BY version DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    Ok(match latest {
        Some((version, description, installed_on)) => MigrationStatus {
            migrated: true,
            latest: Some(format!("{:04}_{}", version, description.replace(' ', "_"))),
            run_on: Some(installed_on),
            message: None,
        },
        None => MigrationStatus::not_migrated("No migrations have been run"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_embedded_in_order() {
        let versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn not_migrated_omits_message_only_when_absent() {
        let status = MigrationStatus::not_migrated("No migrations have been run");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["migrated"], false);
        assert_eq!(json["message"], "No migrations have been run");
    }
}
