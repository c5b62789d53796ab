//! HTTP server command
//!
//! Connects lazily: a missing or unreachable database leaves the server up
//! with persistence disabled.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use webapp_server::http::{run_server, AppState, ServerConfig};
use webapp_server::{AppConfig, ConnectionManager};

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to
    #[arg(long, short = 'b', env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Apply embedded migrations once connected (same as RUN_MIGRATIONS_ON_STARTUP=true)
    #[arg(long)]
    pub migrate: bool,
}

pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let mut config = AppConfig::from_env();
    if args.migrate {
        config.run_migrations = true;
    }
    if !config.validate() {
        tracing::warn!("Continuing with incomplete database configuration");
    }

    let db = Arc::new(ConnectionManager::from_config(&config));
    // Initialize before binding.
    if db.is_enabled().await {
        tracing::info!("Database connection ready");
    } else {
        tracing::warn!("Database not available, continuing without persistence");
    }

    let server = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
    };

    run_server(AppState::new(db, config), server)
        .await
        .context("Server error")?;

    Ok(())
}
