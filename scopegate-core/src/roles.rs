//! Role management
//!
//! Roles are named groups of members and scopes stored in the policy service.
//! The `admin` role is reserved: it is provisioned with every registered scope
//! at initialization, cannot be deleted, and updates cannot change its scopes.

use crate::collaborators::PolicyService;
use crate::engine::ScopeEngine;
use crate::error::{Result, ScopeGateError};
use crate::types::Role;
use ahash::AHashSet;
use tracing::{debug, info, instrument, warn};

/// Reserved role granted every registered scope
pub const ADMIN_ROLE: &str = "admin";

/// Description of the reserved admin role
pub const ADMIN_DESCRIPTION: &str = "Special policy for admin to do anything on all scopes";

/// The admin role for a set of scope names
pub fn admin_role(scope_names: &[String]) -> Role {
    Role {
        id: ADMIN_ROLE.to_string(),
        description: ADMIN_DESCRIPTION.to_string(),
        members: Vec::new(),
        scopes: scope_names.to_vec(),
    }
}

/// Replace any existing admin role with one granting `scope_names`
pub(crate) async fn provision_admin_role(
    policy: &dyn PolicyService,
    scope_names: &[String],
) -> Result<()> {
    if let Err(e) = policy.delete_role(ADMIN_ROLE).await {
        debug!("no previous admin role removed: {}", e);
    }

    policy.create_role(&admin_role(scope_names)).await?;
    info!("provisioned admin role with {} scopes", scope_names.len());
    Ok(())
}

fn dedup(values: &mut Vec<String>) {
    let mut seen = AHashSet::with_capacity(values.len());
    values.retain(|v| seen.insert(v.clone()));
}

impl ScopeEngine {
    /// Check a role against the directory and the registered scopes.
    /// Returns the normalized role.
    #[instrument(skip(self, role), fields(role = %role.id))]
    pub async fn validate_role(&self, mut role: Role) -> Result<Role> {
        let Some(snapshot) = self.registry().snapshot() else {
            return Err(ScopeGateError::NotInitialized);
        };

        role.id = role.id.trim().to_lowercase();
        if role.id.is_empty() {
            return Err(ScopeGateError::validation("role: name must not be empty"));
        }

        dedup(&mut role.members);
        dedup(&mut role.scopes);

        for member in &role.members {
            let user = self
                .collaborators()
                .directory
                .find_user_by_id(member)
                .await?;
            if user.is_none() {
                return Err(ScopeGateError::validation(format!(
                    "role: member {} doesn't exist",
                    member
                )));
            }
        }

        for scope in &role.scopes {
            if !snapshot.contains(scope) {
                return Err(ScopeGateError::validation(format!(
                    "role: scope {} doesn't exist",
                    scope
                )));
            }
        }

        Ok(role)
    }

    /// Validate and store a new role
    pub async fn create_role(&self, role: Role) -> Result<Role> {
        let role = self.validate_role(role).await?;
        if role.id == ADMIN_ROLE {
            return Err(ScopeGateError::validation("role: admin is reserved"));
        }

        self.collaborators().policy.create_role(&role).await?;
        info!(role = %role.id, "role created");
        Ok(role)
    }

    /// Replace role `id`. The admin role keeps its name, description and scopes;
    /// only its members can change.
    pub async fn update_role(&self, id: &str, role: Role) -> Result<Role> {
        let mut role = self.validate_role(role).await?;

        if id == ADMIN_ROLE {
            let names = self
                .registry()
                .snapshot()
                .map(|s| s.names())
                .unwrap_or_default();
            let members = std::mem::take(&mut role.members);
            role = admin_role(&names);
            role.members = members;
        } else if role.id != id {
            self.check_rename_target(&role.id).await?;
        }

        self.collaborators().policy.update_role(id, &role).await?;
        info!(role = %id, "role updated");
        Ok(role)
    }

    /// A role may only be renamed to a free, non-reserved id. Checked before the
    /// old role is removed.
    async fn check_rename_target(&self, target: &str) -> Result<()> {
        if target == ADMIN_ROLE {
            return Err(ScopeGateError::validation("role: admin is reserved"));
        }
        match self.collaborators().policy.get_role(target).await {
            Ok(_) => Err(ScopeGateError::validation(format!(
                "role: {} already exists",
                target
            ))),
            Err(ScopeGateError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Delete a role; the admin role cannot be deleted
    pub async fn delete_role(&self, id: &str) -> Result<()> {
        if !self.registry().is_initialized() {
            return Err(ScopeGateError::NotInitialized);
        }
        if id == ADMIN_ROLE {
            return Err(ScopeGateError::validation("role: admin can't be deleted"));
        }

        self.collaborators().policy.delete_role(id).await?;
        info!(role = %id, "role deleted");
        Ok(())
    }

    /// Fetch a role
    pub async fn get_role(&self, id: &str) -> Result<Role> {
        if !self.registry().is_initialized() {
            return Err(ScopeGateError::NotInitialized);
        }
        self.collaborators().policy.get_role(id).await
    }

    /// All roles
    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        if !self.registry().is_initialized() {
            return Err(ScopeGateError::NotInitialized);
        }
        self.collaborators().policy.list_roles().await
    }

    /// Role ids of the subject behind `token`. The root token holds the admin role.
    pub async fn roles_for_token(&self, token: &str) -> Result<Vec<String>> {
        if !self.registry().is_initialized() {
            return Err(ScopeGateError::NotInitialized);
        }
        if self.is_root_token(token) {
            return Ok(vec![ADMIN_ROLE.to_string()]);
        }

        let subject = self
            .call(self.collaborators().introspector.introspect(token))
            .await
            .map_err(|e| {
                warn!("roles: can't resolve token: {}", e);
                e
            })?;
        self.call(self.collaborators().policy.list_roles_for_subject(&subject))
            .await
    }
}
