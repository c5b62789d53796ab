//! Database layer - credentials, connection manager and stores
//!
//! # Design Principles
//!
//! - One memoized pool per manager, created on first use
//! - A missing database is a mode, not an error: stores return `NotConfigured`
//! - Filters are composed from allowlisted columns with bound parameters
//! - Rely on DB constraints, map violations - no check-then-insert

pub mod compose;
pub mod credentials;
pub mod manager;
pub mod migrations;
pub mod pool;
pub mod secrets;
pub mod stores;

pub use compose::{ComposedQuery, Param, WhereClause};
pub use credentials::{
    ConnectionDescriptor, CredentialError, CredentialResolver, EnvResolver, SecretStore,
    StaticResolver,
};
pub use manager::ConnectionManager;
pub use secrets::GcpSecretManager;
pub use stores::*;
