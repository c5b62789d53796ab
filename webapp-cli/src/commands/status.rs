//! Database status command
//!
//! Prints connection and migration state as JSON.

use anyhow::{Context, Result};
use serde_json::json;

use webapp_server::db::migrations;
use webapp_server::{AppConfig, ConnectionManager};

pub async fn run_status() -> Result<()> {
    let config = AppConfig::from_env();
    let db = ConnectionManager::from_config(&config);

    let report = match db.pool().await {
        Some(pool) => {
            let status = migrations::status(&pool)
                .await
                .context("Failed to read migration status")?;
            json!({
                "boundary": config.boundary,
                "stage": config.stage,
                "database": "enabled",
                "migrations": status,
            })
        }
        None => json!({
            "boundary": config.boundary,
            "stage": config.stage,
            "database": "disabled",
        }),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    db.cleanup().await;
    Ok(())
}
