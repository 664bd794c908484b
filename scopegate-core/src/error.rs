//! Error types for ScopeGate

use thiserror::Error;

/// Main error type for ScopeGate operations
#[derive(Error, Debug)]
pub enum ScopeGateError {
    /// Malformed scope, role or action. Always fixable by the caller.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A scope name appeared twice in one registration batch
    #[error("Validation error: scope {0} already exists")]
    DuplicateScope(String),

    /// Scopes were registered already
    #[error("scopes have already been initialized")]
    AlreadyInitialized,

    /// Scopes were never registered
    #[error("scopes haven't been initialized")]
    NotInitialized,

    /// Token is malformed, too short or inactive
    #[error("invalid token")]
    InvalidToken,

    /// Valid identity without a granting scope
    #[error("access: invalid token or unauthorized")]
    Unauthorized,

    /// An external collaborator failed
    #[error("{service} unavailable: {message}")]
    CollaboratorUnavailable {
        /// Collaborator that failed (e.g. "introspection", "policy")
        service: &'static str,
        /// Upstream detail, only meant for logs
        message: String,
    },

    /// A collaborator call did not complete in time
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Entity not found in a collaborator
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ScopeGateError {
    /// Shorthand for a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        ScopeGateError::Validation(msg.into())
    }

    /// Shorthand for a collaborator failure
    pub fn unavailable(service: &'static str, msg: impl std::fmt::Display) -> Self {
        ScopeGateError::CollaboratorUnavailable {
            service,
            message: msg.to_string(),
        }
    }

    /// Whether the caller can fix this by changing its input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScopeGateError::Validation(_)
                | ScopeGateError::DuplicateScope(_)
                | ScopeGateError::AlreadyInitialized
                | ScopeGateError::NotInitialized
                | ScopeGateError::NotFound(_)
                | ScopeGateError::SerializationError(_)
        )
    }
}

/// Result type alias for ScopeGate operations
pub type Result<T> = std::result::Result<T, ScopeGateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_display() {
        let err = ScopeGateError::unavailable("policy", "connection refused");
        assert_eq!(err.to_string(), "policy unavailable: connection refused");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_client_errors() {
        assert!(ScopeGateError::validation("bad").is_client_error());
        assert!(ScopeGateError::DuplicateScope("x".into()).is_client_error());
        assert!(ScopeGateError::AlreadyInitialized.is_client_error());
        assert!(!ScopeGateError::InvalidToken.is_client_error());
        assert!(!ScopeGateError::Timeout(10).is_client_error());
    }
}
