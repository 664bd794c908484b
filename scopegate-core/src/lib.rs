//! ScopeGate Core - scope-based authorization for HTTP APIs
//!
//! This crate maps `(method, URI)` pairs to named scopes through a route trie
//! and decides whether a bearer token may perform a request by asking an
//! introspection service who the token belongs to and a policy service whether
//! that subject holds any of the governing scopes.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod collaborators;
pub mod engine;
pub mod error;
pub mod memory;
pub mod registry;
pub mod request;
pub mod roles;
pub mod scopefile;
pub mod token;
pub mod trie;
pub mod types;

pub use collaborators::{
    Collaborators, PolicyService, TokenIntrospector, TokenIssuer, UserDirectory,
};
pub use engine::{
    AuthorizationResult, Decision, DenyReason, EngineConfig, EngineMetrics, MetricsSnapshot,
    ScopeEngine,
};
pub use error::{Result, ScopeGateError};
pub use memory::InMemoryCollaborators;
pub use registry::{RegistrySnapshot, ScopeRegistry};
pub use request::{AuthorizationRequest, RequestBuilder};
pub use roles::{ADMIN_DESCRIPTION, ADMIN_ROLE};
pub use scopefile::{load_scopes, parse_scopes, ScopeFileFormat};
pub use trie::RouteTrie;
pub use types::{
    Action, ClientCredentials, DirectoryUser, Method, MethodMask, Role, Scope, ScopeDefinition,
    ScopeIndex,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }
}
