//! Request types for authorization

use crate::types::Action;
use serde::{Deserialize, Serialize};

/// Authorization request: a bearer token and the action it is presented for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Presented bearer token (may be empty)
    pub token: String,
    /// Method and URI being accessed
    pub action: Action,
    /// Request ID for tracing
    pub request_id: String,
}

impl AuthorizationRequest {
    /// Create a new request
    pub fn new(token: impl Into<String>, action: Action) -> Self {
        AuthorizationRequest {
            token: token.into(),
            action,
            request_id: generate_request_id(),
        }
    }

    /// Token length in bytes, used for the short-token check
    pub fn token_len(&self) -> usize {
        self.token.len()
    }
}

/// Request builder for fluent API
#[derive(Debug, Default)]
pub struct RequestBuilder {
    token: Option<String>,
    method: Option<String>,
    uri: Option<String>,
}

impl RequestBuilder {
    /// Create a new request builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the HTTP method
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the request URI
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Build the request. A missing token is treated as an empty one.
    pub fn build(self) -> crate::Result<AuthorizationRequest> {
        let method = self
            .method
            .ok_or_else(|| crate::ScopeGateError::validation("Missing method"))?;
        let uri = self
            .uri
            .ok_or_else(|| crate::ScopeGateError::validation("Missing uri"))?;

        Ok(AuthorizationRequest::new(
            self.token.unwrap_or_default(),
            Action::new(method, uri),
        ))
    }
}

/// Generate a unique request ID
fn generate_request_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("req_{:x}_{:x}", timestamp, counter)
}
