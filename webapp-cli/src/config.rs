//! Environment file loading
//!
//! Files are loaded before tracing starts (so `RUST_LOG` can come from
//! them); the outcome is returned and logged once a subscriber exists.

use std::path::{Path, PathBuf};

/// Directory under `$HOME` holding the user-level `.env`
const USER_DIR: &str = ".webapp";

/// Result of reading one env file
#[derive(Debug)]
pub enum EnvFile {
    Loaded(PathBuf),
    Failed {
        path: Option<PathBuf>,
        error: dotenvy::Error,
    },
}

impl EnvFile {
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => tracing::info!("Loaded environment from {}", path.display()),
            Self::Failed { path: Some(path), error } => {
                tracing::warn!(error = %error, path = %path.display(), "Failed to parse env file")
            }
            Self::Failed { path: None, error } => {
                tracing::warn!(error = %error, "Failed to parse .env in working directory")
            }
        }
    }
}

/// Path of the user-level env file, if a home directory exists
pub fn user_env_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(USER_DIR).join(".env"))
}

/// Load `.env` from the working directory, then `~/.webapp/.env`.
///
/// Existing variables are never overridden, so the working directory wins.
pub fn load_dotenv() -> Vec<EnvFile> {
    let mut outcomes = Vec::new();

    match dotenvy::dotenv() {
        Ok(path) => outcomes.push(EnvFile::Loaded(path)),
        Err(e) if e.not_found() => {}
        Err(error) => outcomes.push(EnvFile::Failed { path: None, error }),
    }

    if let Some(outcome) = user_env_path().and_then(|path| load_file(&path)) {
        outcomes.push(outcome);
    }

    outcomes
}

/// Load one env file; `None` when it does not exist.
fn load_file(path: &Path) -> Option<EnvFile> {
    if !path.exists() {
        return None;
    }

    Some(match dotenvy::from_path(path) {
        Ok(()) => EnvFile::Loaded(path.to_path_buf()),
        Err(error) => EnvFile::Failed {
            path: Some(path.to_path_buf()),
            error,
        },
    })
}
