//! HTTP server layer
//!
//! Axum server with:
//! - CORS (localhost only by default)
//! - Request tracing and visit logging
//! - Graceful shutdown
//! - JSON error responses mapped from store errors

pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerConfig, ServerError};
