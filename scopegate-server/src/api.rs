//! API request and response types
//!
//! Scopes, roles and actions travel as the core types (`ScopeDefinition`,
//! `Scope`, `Role`, `Action`); only the envelopes are defined here.

use serde::{Deserialize, Serialize};

/// `{"status": "ok"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always `ok`
    pub status: String,
}

impl StatusResponse {
    /// Successful status
    pub fn ok() -> Self {
        StatusResponse {
            status: "ok".to_string(),
        }
    }
}

/// Response to a successful scope initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    /// Always `ok`
    pub status: String,
    /// Root token; shown only once
    pub token: String,
}

/// Diagnostics attached to authorization responses in debug mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeDiagnostics {
    /// Scopes governing the route
    pub matched_scopes: Vec<String>,
    /// Scope that granted access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_by: Option<String>,
    /// Time taken to evaluate (milliseconds)
    pub evaluation_time_ms: f64,
}

/// Response to an allowed authorization request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    /// Always `ok`
    pub status: String,
    /// Only present in debug mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<AuthorizeDiagnostics>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status
    pub status: HealthStatus,

    /// Service version
    pub version: String,

    /// Uptime in seconds
    pub uptime_seconds: u64,

    /// Number of registered scopes
    pub scopes: usize,
}

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is healthy
    Healthy,
    /// Service is up but scopes are not registered yet
    Uninitialized,
}
