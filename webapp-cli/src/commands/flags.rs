//! Feature flag management
//!
//!   webapp flags list
//!   webapp flags set darkMode true --description "Dark theme"

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use webapp_server::db::FlagStore;
use webapp_server::{AppConfig, ConnectionManager};

#[derive(Parser, Debug)]
#[command(about = "List or change feature flags")]
pub struct FlagsArgs {
    #[command(subcommand)]
    pub command: FlagsCommand,
}

#[derive(Subcommand, Debug)]
pub enum FlagsCommand {
    /// Print every flag as a name → enabled JSON map (defaults when no database)
    List,
    /// Create or update a flag
    Set {
        /// Flag name (e.g., "darkMode")
        name: String,
        /// New state
        #[arg(action = clap::ArgAction::Set, value_parser = clap::value_parser!(bool))]
        enabled: bool,
        /// Description; the stored one is kept when omitted
        #[arg(long, short = 'd')]
        description: Option<String>,
    },
}

pub async fn run_flags(args: FlagsArgs) -> Result<()> {
    let config = AppConfig::from_env();
    let db = ConnectionManager::from_config(&config);
    let result = dispatch(&db, args.command).await;
    db.cleanup().await;
    result
}

async fn dispatch(db: &ConnectionManager, command: FlagsCommand) -> Result<()> {
    let store = FlagStore::new(db);

    match command {
        FlagsCommand::List => {
            let flags = store.all().await;
            println!("{}", serde_json::to_string_pretty(&flags)?);
        }
        FlagsCommand::Set {
            name,
            enabled,
            description,
        } => {
            if !db.is_enabled().await {
                bail!("Database not configured. Set DATABASE_URL or DATABASE_HOST in the environment or ~/.webapp/.env");
            }
            let flag = store
                .upsert(&name, enabled, description)
                .await
                .with_context(|| format!("Failed to update flag '{}'", name))?;
            println!("{}", serde_json::to_string_pretty(&flag)?);
        }
    }

    Ok(())
}
