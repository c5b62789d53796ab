//! Database credential resolution
//!
//! Provides a trait for producing a connection descriptor, with:
//! - Environment/config implementation with secret-store fallback
//! - Mock implementations for testing
//!
//! Priority: `DATABASE_URL` > `DATABASE_HOST` params > auth proxy (IAM)
//! > secret store > unavailable.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AppConfig;

/// Service account the auth proxy authenticates as
pub const PROXY_SERVICE_ACCOUNT: &str = "webapp-k8s";

/// Auth proxy listens on the pod's loopback
pub const PROXY_HOST: &str = "localhost";
pub const PROXY_PORT: u16 = 5432;

/// Stage whose credentials come from a ConfigMap, never the secret store
pub const PREVIEW_STAGE: &str = "preview";

/// How to reach the database
#[derive(Clone, PartialEq, Eq)]
pub enum ConnectionDescriptor {
    /// Full connection string
    Url(String),
    /// Discrete connection parameters
    Params {
        host: String,
        port: u16,
        database: Option<String>,
        user: Option<String>,
        password: Option<String>,
    },
    /// Local auth proxy with workload-identity authentication (no password)
    AuthProxy { user: String, database: String },
    /// No database configured; a valid operating mode
    Unavailable,
}

impl ConnectionDescriptor {
    /// Short label safe to log
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Params { .. } => "params",
            Self::AuthProxy { .. } => "auth-proxy",
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(_) => f.write_str("Url(<redacted>)"),
            Self::Params {
                host,
                port,
                database,
                user,
                ..
            } => f
                .debug_struct("Params")
                .field("host", host)
                .field("port", port)
                .field("database", database)
                .field("user", user)
                .finish_non_exhaustive(),
            Self::AuthProxy { user, database } => f
                .debug_struct("AuthProxy")
                .field("user", user)
                .field("database", database)
                .finish(),
            Self::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Error during credential resolution
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("secret store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("secret store returned {status} for {secret}")]
    Status { secret: String, status: u16 },

    #[error("secret {secret} payload is not valid: {reason}")]
    Payload { secret: String, reason: String },
}

/// Source of a connection descriptor (testable)
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    async fn resolve(&self) -> Result<ConnectionDescriptor, CredentialError>;
}

/// Remote secret lookup (testable)
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Payload of the latest version of `secret`.
    async fn access_latest(&self, secret: &str) -> Result<String, CredentialError>;
}

/// Secret holding the connection string for a boundary
pub fn connection_secret_name(boundary: &str) -> String {
    format!("webapp-{}-alloydb-connection", boundary)
}

/// IAM database user for a project
pub fn proxy_user(project_id: &str) -> String {
    format!("{}@{}.iam", PROXY_SERVICE_ACCOUNT, project_id)
}

/// Per-stage database name used behind the auth proxy
pub fn proxy_database(stage: &str) -> String {
    format!("webapp_{}", stage)
}

/// Resolver over application config, falling back to a secret store
pub struct EnvResolver {
    config: AppConfig,
    secrets: Option<Arc<dyn SecretStore>>,
}

impl EnvResolver {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            secrets: None,
        }
    }

    pub fn with_secret_store(mut self, secrets: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(secrets);
        self
    }
}

#[async_trait]
impl CredentialResolver for EnvResolver {
    async fn resolve(&self) -> Result<ConnectionDescriptor, CredentialError> {
        let cfg = &self.config;
        let db = &cfg.database;

        if let Some(url) = &db.url {
            tracing::info!("Using DATABASE_URL from environment");
            return Ok(ConnectionDescriptor::Url(url.clone()));
        }

        if let Some(host) = &db.host {
            tracing::info!(host = %host, port = db.port, "Using individual database parameters");
            return Ok(ConnectionDescriptor::Params {
                host: host.clone(),
                port: db.port,
                database: db.name.clone(),
                user: db.user.clone(),
                password: db.password.clone(),
            });
        }

        let Some(project_id) = cfg.project_id.as_deref() else {
            tracing::info!("No PROJECT_ID found, database features disabled");
            return Ok(ConnectionDescriptor::Unavailable);
        };

        if db.auth_proxy {
            let user = proxy_user(project_id);
            let database = proxy_database(&cfg.stage);
            tracing::info!(user = %user, database = %database, "Using auth proxy with IAM authentication");
            return Ok(ConnectionDescriptor::AuthProxy { user, database });
        }

        if cfg.stage == PREVIEW_STAGE {
            tracing::info!("Preview stage: skipping secret store lookup");
            return Ok(ConnectionDescriptor::Unavailable);
        }

        let Some(secrets) = &self.secrets else {
            tracing::info!("No secret store configured, database features disabled");
            return Ok(ConnectionDescriptor::Unavailable);
        };

        let secret = connection_secret_name(&cfg.boundary);
        tracing::info!(secret = %secret, project = %project_id, "Fetching database credentials from secret store");
        let url = secrets.access_latest(&secret).await?;

        Ok(ConnectionDescriptor::Url(url.trim().to_owned()))
    }
}

/// Resolver returning a fixed descriptor
pub struct StaticResolver(pub ConnectionDescriptor);

#[async_trait]
impl CredentialResolver for StaticResolver {
    async fn resolve(&self) -> Result<ConnectionDescriptor, CredentialError> {
        Ok(self.0.clone())
    }
}
