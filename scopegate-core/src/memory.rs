//! In-memory collaborators
//!
//! Used for standalone deployments, the CLI and tests. Backed by `DashMap` so
//! they can be shared across request tasks without extra locking.

use crate::collaborators::{
    Collaborators, PolicyService, TokenIntrospector, TokenIssuer, UserDirectory,
};
use crate::error::{Result, ScopeGateError};
use crate::types::{ClientCredentials, DirectoryUser, Role};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Client id used for the root OAuth2 client
pub const ROOT_CLIENT_ID: &str = "scopegate-root";

/// Records the scope set of the last registered client
#[derive(Debug, Default)]
pub struct InMemoryTokenIssuer {
    scopes: RwLock<Option<Vec<String>>>,
}

impl InMemoryTokenIssuer {
    /// Create a new issuer
    pub fn new() -> Self {
        Self::default()
    }

    /// Scopes of the registered client, if any
    pub fn registered_scopes(&self) -> Option<Vec<String>> {
        self.scopes.read().clone()
    }
}

#[async_trait]
impl TokenIssuer for InMemoryTokenIssuer {
    async fn register_client(&self, scope_names: &[String]) -> Result<ClientCredentials> {
        *self.scopes.write() = Some(scope_names.to_vec());
        Ok(ClientCredentials {
            client_id: ROOT_CLIENT_ID.to_string(),
            client_secret: String::new(),
        })
    }
}

/// Maps known tokens to subjects
#[derive(Debug, Default)]
pub struct StaticIntrospector {
    tokens: DashMap<String, String>,
}

impl StaticIntrospector {
    /// Create an introspector with no active tokens
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate `token` for `subject`
    pub fn insert(&self, token: impl Into<String>, subject: impl Into<String>) {
        self.tokens.insert(token.into(), subject.into());
    }

    /// Revoke a token
    pub fn revoke(&self, token: &str) {
        self.tokens.remove(token);
    }
}

#[async_trait]
impl TokenIntrospector for StaticIntrospector {
    async fn introspect(&self, token: &str) -> Result<String> {
        self.tokens
            .get(token)
            .map(|subject| subject.value().clone())
            .ok_or(ScopeGateError::InvalidToken)
    }
}

/// Roles kept in a map; a subject is granted a scope when one of its roles lists it
#[derive(Debug, Default)]
pub struct InMemoryPolicyService {
    roles: DashMap<String, Role>,
}

impl InMemoryPolicyService {
    /// Create an empty policy service
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored roles
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether no role is stored
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[async_trait]
impl PolicyService for InMemoryPolicyService {
    async fn create_role(&self, role: &Role) -> Result<()> {
        if self.roles.contains_key(&role.id) {
            return Err(ScopeGateError::validation(format!(
                "role {} already exists",
                role.id
            )));
        }
        self.roles.insert(role.id.clone(), role.clone());
        Ok(())
    }

    async fn delete_role(&self, id: &str) -> Result<()> {
        self.roles
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ScopeGateError::NotFound(format!("role {} doesn't exist", id)))
    }

    async fn get_role(&self, id: &str) -> Result<Role> {
        self.roles
            .get(id)
            .map(|role| role.value().clone())
            .ok_or_else(|| ScopeGateError::NotFound(format!("role {} doesn't exist", id)))
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = self.roles.iter().map(|r| r.value().clone()).collect();
        roles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(roles)
    }

    async fn list_roles_for_subject(&self, subject: &str) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self
            .roles
            .iter()
            .filter(|r| r.members.iter().any(|m| m == subject))
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn is_authorized(&self, subject: &str, scope: &str) -> Result<bool> {
        Ok(self.roles.iter().any(|r| r.grants(subject, scope)))
    }
}

/// Fixed set of users
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<String, DirectoryUser>,
}

impl InMemoryUserDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory containing the given user ids
    pub fn with_users<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let directory = Self::new();
        for id in ids {
            directory.add(id);
        }
        directory
    }

    /// Add a user
    pub fn add(&self, id: impl Into<String>) {
        let id = id.into();
        self.users.insert(
            id.clone(),
            DirectoryUser {
                id,
                email: None,
            },
        );
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<DirectoryUser>> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }
}

/// Handles to a full set of in-memory collaborators
#[derive(Clone, Default)]
pub struct InMemoryCollaborators {
    /// Token issuer
    pub issuer: Arc<InMemoryTokenIssuer>,
    /// Token introspector
    pub introspector: Arc<StaticIntrospector>,
    /// Policy service
    pub policy: Arc<InMemoryPolicyService>,
    /// User directory
    pub directory: Arc<InMemoryUserDirectory>,
}

impl InMemoryCollaborators {
    /// Fresh, empty collaborators
    pub fn new() -> Self {
        Self::default()
    }

    /// Type-erased bundle for the engine
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.issuer.clone(),
            self.introspector.clone(),
            self.policy.clone(),
            self.directory.clone(),
        )
    }
}
