//! webapp-server: feedback and visit-tracking data layer
//!
//! Lazily connects to PostgreSQL through a memoized connection manager,
//! resolving credentials from the environment, an auth proxy or a secret
//! store. Runs without a database: stores report `NotConfigured` and the
//! HTTP layer answers 503.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;

pub use config::AppConfig;
pub use db::ConnectionManager;
pub use error::{Result, StoreError};
