//! ScopeGate HTTP Server - scope registration, authorization and role management
//!
//! This crate exposes the ScopeGate engine over HTTP and provides clients for
//! the OAuth2 provider and policy service it delegates to.

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod tracing;

pub use api::{AuthorizeResponse, HealthResponse, InitResponse, StatusResponse};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::app;
pub use state::AppState;
