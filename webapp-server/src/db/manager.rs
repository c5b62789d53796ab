//! Connection manager
//!
//! Owns the memoized pool. Initialization runs on the first caller and at
//! most once until [`ConnectionManager::cleanup`]; concurrent callers await
//! the same attempt. A missing or unreachable database leaves the manager
//! disabled rather than failing callers.

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::PgPool;
use tokio::sync::{OnceCell, RwLock};

use super::compose::{ComposedQuery, Param};
use super::credentials::{
    ConnectionDescriptor, CredentialResolver, EnvResolver, PREVIEW_STAGE,
};
use super::secrets::GcpSecretManager;
use super::{migrations, pool};
use crate::config::{AppConfig, PoolSettings};
use crate::error::{Result, StoreError};

type PoolCell = Arc<OnceCell<Option<PgPool>>>;

pub struct ConnectionManager {
    resolver: Arc<dyn CredentialResolver>,
    settings: PoolSettings,
    state: RwLock<PoolCell>,
}

impl ConnectionManager {
    /// Create a manager; nothing is resolved or connected until first use.
    pub fn new(resolver: Arc<dyn CredentialResolver>, settings: PoolSettings) -> Self {
        Self {
            resolver,
            settings,
            state: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    /// Create a manager over the environment resolver for `config`.
    ///
    /// The secret store is attached only when a project id is configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut resolver = EnvResolver::new(config.clone());

        match config.project_id.as_deref() {
            Some(project) if config.stage != PREVIEW_STAGE => match GcpSecretManager::new(project) {
                Ok(secrets) => resolver = resolver.with_secret_store(Arc::new(secrets)),
                Err(e) => tracing::warn!(error = %e, "Secret store client unavailable"),
            },
            _ => {}
        }

        Self::new(Arc::new(resolver), config.pool_settings())
    }

    /// Create a manager and run initialization before returning.
    pub async fn connect(resolver: Arc<dyn CredentialResolver>, settings: PoolSettings) -> Self {
        let manager = Self::new(resolver, settings);
        if !manager.is_enabled().await {
            tracing::warn!("Database not available, continuing without persistence");
        }
        manager
    }

    /// Whether a working pool exists. Triggers initialization; never fails.
    pub async fn is_enabled(&self) -> bool {
        self.pool().await.is_some()
    }

    /// The pool, or `None` when the database is disabled.
    pub async fn pool(&self) -> Option<PgPool> {
        let cell = self.state.read().await.clone();
        let pool = cell.get_or_init(|| self.initialize()).await.clone();
        pool
    }

    /// The pool, or [`StoreError::NotConfigured`].
    pub async fn require_pool(&self) -> Result<PgPool> {
        self.pool().await.ok_or(StoreError::NotConfigured)
    }

    /// Execute a composed query and return every row.
    ///
    /// Driver errors are logged and propagated; there is no retry.
    pub async fn query(&self, query: &ComposedQuery) -> Result<Vec<PgRow>> {
        let pool = self.require_pool().await?;
        query.to_query().fetch_all(&pool).await.map_err(|e| {
            observe_error(&e, &query.sql);
            StoreError::Driver(e)
        })
    }

    /// Execute raw SQL with positional parameters.
    pub async fn query_raw(&self, sql: &str, params: Vec<Param>) -> Result<Vec<PgRow>> {
        self.query(&ComposedQuery {
            sql: sql.to_owned(),
            params,
        })
        .await
    }

    /// Close the pool and forget the outcome; the next caller re-initializes.
    ///
    /// An initialization still in flight is awaited so its pool is closed too.
    pub async fn cleanup(&self) {
        let previous = {
            let mut state = self.state.write().await;
            std::mem::replace(&mut *state, Arc::new(OnceCell::new()))
        };

        // Waits for a running initializer; settles an untouched cell as disabled.
        let settled = previous.get_or_init(|| async { None }).await;
        if let Some(pool) = settled {
            pool.close().await;
            tracing::info!("Database connection pool closed");
        }
    }

    async fn initialize(&self) -> Option<PgPool> {
        let descriptor = match self.resolver.resolve().await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::error!(error = %e, "Failed to resolve database credentials");
                return None;
            }
        };

        let options = match pool::connect_options(&descriptor, &self.settings) {
            Ok(Some(options)) => options,
            Ok(None) => {
                tracing::info!("Database not configured");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, kind = descriptor.kind(), "Invalid database connection settings");
                return None;
            }
        };

        if let ConnectionDescriptor::AuthProxy { database, .. } = &descriptor {
            if let Err(e) = pool::ensure_database(&options, database).await {
                tracing::warn!(error = %e, database = %database, "Could not ensure database exists");
            }
        }

        let pool = pool::create_pool(options, &self.settings);

        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
            tracing::error!(error = %e, kind = descriptor.kind(), "Database connection failed");
            pool.close().await;
            return None;
        }

        tracing::info!(
            kind = descriptor.kind(),
            max_connections = self.settings.max_connections,
            "Database connection established"
        );

        if self.settings.run_migrations {
            if let Err(e) = migrations::run(&pool).await {
                tracing::error!(error = %e, "Database migrations failed");
            }
        }

        Some(pool)
    }
}

/// Log a failed statement; pool-level faults get their own message.
pub(crate) fn observe_error(err: &sqlx::Error, statement: &str) {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => {
            tracing::error!(error = %err, "unexpected database pool error");
        }
        _ => tracing::error!(error = %err, statement = %statement, "Database query error"),
    }
}
