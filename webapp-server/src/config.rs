//! Application configuration loaded from environment variables
//!
//! - `BOUNDARY`: deployment isolation domain (default: nonprod)
//! - `STAGE`: environment within the boundary (default: unknown)
//! - `VERSION` / `K_REVISION`: reported build version (default: local)
//! - `PROJECT_ID` / `GCP_PROJECT`: cloud project used for secret lookup
//! - `DATABASE_URL`, or `DATABASE_HOST` + `DATABASE_PORT` + `DATABASE_NAME`
//!   + `DATABASE_USER` + `DATABASE_PASSWORD`
//! - `DATABASE_SSL_MODE`: `require` | `disable` (default: boundary-derived)
//! - `ALLOYDB_AUTH_PROXY` / `USE_AUTH_PROXY`: connect through the auth proxy
//! - `RUN_MIGRATIONS_ON_STARTUP`: apply embedded migrations after connecting

use std::time::Duration;

/// Default PostgreSQL port
pub const DEFAULT_DATABASE_PORT: u16 = 5432;

/// Boundary name meaning "developer machine"
pub const LOCAL_BOUNDARY: &str = "local";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub boundary: String,
    pub stage: String,
    pub version: String,
    pub project_id: Option<String>,
    pub database: DatabaseConfig,
    pub run_migrations: bool,
}

/// Database connection settings as configured (before credential resolution)
#[derive(Clone, Default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub ssl_mode: Option<SslPreference>,
    pub auth_proxy: bool,
}

// Credentials never reach the logs.
impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ssl_mode", &self.ssl_mode)
            .field("auth_proxy", &self.auth_proxy)
            .finish()
    }
}

/// Explicit TLS preference from `DATABASE_SSL_MODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslPreference {
    Require,
    Disable,
}

impl SslPreference {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "require" => Some(Self::Require),
            "disable" => Some(Self::Disable),
            _ => None,
        }
    }
}

/// TLS mode actually used for pooled connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// Plain TCP
    Disabled,
    /// Encrypted, certificate not verified
    Permissive,
}

/// Pool sizing and timeouts
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
    pub tls: TlsMode,
    pub run_migrations: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 20,
            idle_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(2),
            tls: TlsMode::Disabled,
            run_migrations: false,
        }
    }
}

impl AppConfig {
    /// Create config from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup (for testing)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| get(key).is_some_and(|v| v.trim() == "true");

        let port = get("DATABASE_PORT")
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_DATABASE_PORT);

        Self {
            boundary: get("BOUNDARY").unwrap_or_else(|| "nonprod".to_owned()),
            stage: get("STAGE").unwrap_or_else(|| "unknown".to_owned()),
            version: get("VERSION")
                .or_else(|| get("K_REVISION"))
                .unwrap_or_else(|| "local".to_owned()),
            project_id: get("PROJECT_ID").or_else(|| get("GCP_PROJECT")),
            database: DatabaseConfig {
                url: get("DATABASE_URL"),
                host: get("DATABASE_HOST"),
                port,
                name: get("DATABASE_NAME"),
                user: get("DATABASE_USER"),
                password: get("DATABASE_PASSWORD"),
                ssl_mode: get("DATABASE_SSL_MODE").and_then(|m| SslPreference::parse(&m)),
                auth_proxy: flag("ALLOYDB_AUTH_PROXY") || flag("USE_AUTH_PROXY"),
            },
            run_migrations: flag("RUN_MIGRATIONS_ON_STARTUP"),
        }
    }

    /// TLS mode: explicit preference wins, otherwise only the local
    /// boundary connects without TLS.
    pub fn tls_mode(&self) -> TlsMode {
        match self.database.ssl_mode {
            Some(SslPreference::Require) => TlsMode::Permissive,
            Some(SslPreference::Disable) => TlsMode::Disabled,
            None if self.boundary == LOCAL_BOUNDARY => TlsMode::Disabled,
            None => TlsMode::Permissive,
        }
    }

    /// Pool settings derived from this configuration
    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            tls: self.tls_mode(),
            run_migrations: self.run_migrations,
            ..PoolSettings::default()
        }
    }

    /// Warn about half-configured database settings
    pub fn validate(&self) -> bool {
        if self.database.host.is_some() && self.database.name.is_none() {
            tracing::warn!("Database host specified but no database name provided");
            return false;
        }
        true
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
