//! Contracts the engine requires from external services
//!
//! The OAuth2 provider issues and introspects tokens, the policy service stores
//! roles and answers grant questions, and the user directory resolves role
//! members. None of them is implemented here beyond [`crate::memory`].

use crate::error::Result;
use crate::types::{ClientCredentials, DirectoryUser, Role};
use async_trait::async_trait;
use std::sync::Arc;

/// Registers the OAuth2 client owning the scope set
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Register (or replace) the root client for the given scope names
    async fn register_client(&self, scope_names: &[String]) -> Result<ClientCredentials>;
}

/// Resolves bearer tokens to subjects
#[async_trait]
pub trait TokenIntrospector: Send + Sync {
    /// Subject of an active token. Fails with `InvalidToken` if inactive or malformed.
    async fn introspect(&self, token: &str) -> Result<String>;
}

/// Stores roles and decides subject-to-scope grants
#[async_trait]
pub trait PolicyService: Send + Sync {
    /// Create a role and its policy
    async fn create_role(&self, role: &Role) -> Result<()>;

    /// Delete a role and its policy
    async fn delete_role(&self, id: &str) -> Result<()>;

    /// Replace the role stored under `id`
    async fn update_role(&self, id: &str, role: &Role) -> Result<()> {
        self.delete_role(id).await?;
        self.create_role(role).await
    }

    /// Fetch a single role
    async fn get_role(&self, id: &str) -> Result<Role>;

    /// All roles
    async fn list_roles(&self) -> Result<Vec<Role>>;

    /// Ids of the roles `subject` is a member of
    async fn list_roles_for_subject(&self, subject: &str) -> Result<Vec<String>>;

    /// Whether `subject` may act on `scope`
    async fn is_authorized(&self, subject: &str, scope: &str) -> Result<bool>;
}

/// Resolves user ids for role membership validation
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by id
    async fn find_user_by_id(&self, id: &str) -> Result<Option<DirectoryUser>>;
}

/// The set of collaborators an engine talks to
#[derive(Clone)]
pub struct Collaborators {
    /// OAuth2 client registration
    pub issuer: Arc<dyn TokenIssuer>,
    /// Token introspection
    pub introspector: Arc<dyn TokenIntrospector>,
    /// Roles and grants
    pub policy: Arc<dyn PolicyService>,
    /// Users
    pub directory: Arc<dyn UserDirectory>,
}

impl Collaborators {
    /// Bundle collaborators
    pub fn new(
        issuer: Arc<dyn TokenIssuer>,
        introspector: Arc<dyn TokenIntrospector>,
        policy: Arc<dyn PolicyService>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Collaborators {
            issuer,
            introspector,
            policy,
            directory,
        }
    }
}
