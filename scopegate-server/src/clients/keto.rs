//! Policy service client (Keto)
//!
//! A ScopeGate role is stored as two Keto objects: a Keto role holding the
//! members, and a policy `scopegate.role.<id>` whose subject is that role and
//! whose resources are the role's scopes. All policies use the single action
//! `perform`, since scope names already identify what is being done.

use super::check_status;
use crate::metrics::LatencyTimer;
use crate::tracing::trace_collaborator_call;
use async_trait::async_trait;
use scopegate_core::{PolicyService, Result, Role, ScopeGateError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const SERVICE: &str = "keto";

/// Prefix of policy ids backing roles
pub const ROLE_POLICY_PREFIX: &str = "scopegate.role.";

/// Action used in every policy and authorization check
pub const STUB_ACTION: &str = "perform";

/// Page size for list calls
const LIST_LIMIT: &str = "500";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KetoRole {
    id: String,
    #[serde(default)]
    members: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KetoPolicy {
    id: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    subjects: Vec<String>,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    effect: String,
}

#[derive(Debug, Serialize)]
struct WardenRequest<'a> {
    subject: &'a str,
    action: &'a str,
    resource: &'a str,
}

#[derive(Debug, Deserialize)]
struct WardenResponse {
    allowed: bool,
}

fn policy_id(role_id: &str) -> String {
    format!("{}{}", ROLE_POLICY_PREFIX, role_id)
}

fn to_role(role: KetoRole, policy: KetoPolicy) -> Role {
    Role {
        id: role.id,
        description: policy.description,
        members: role.members,
        scopes: policy.resources,
    }
}

/// Keto HTTP client
#[derive(Debug, Clone)]
pub struct KetoClient {
    http: reqwest::Client,
    base_url: String,
}

impl KetoClient {
    /// Create a client for the Keto endpoint at `base_url`
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        KetoClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let timer = LatencyTimer::new(SERVICE);
        let response = trace_collaborator_call(SERVICE, request.send())
            .await
            .map_err(|e| ScopeGateError::unavailable(SERVICE, e))?;
        timer.record();
        check_status(SERVICE, response).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| ScopeGateError::unavailable(SERVICE, e))
    }

    async fn fetch_role(&self, id: &str) -> Result<KetoRole> {
        self.get_json(self.http.get(self.url(&format!("/roles/{}", id))))
            .await
    }

    async fn fetch_policy(&self, id: &str) -> Result<KetoPolicy> {
        self.get_json(self.http.get(self.url(&format!("/policies/{}", policy_id(id)))))
            .await
    }
}

#[async_trait]
impl PolicyService for KetoClient {
    #[instrument(skip(self, role), fields(role = %role.id))]
    async fn create_role(&self, role: &Role) -> Result<()> {
        let keto_role = KetoRole {
            id: role.id.clone(),
            members: role.members.clone(),
        };
        self.send(self.http.post(self.url("/roles")).json(&keto_role))
            .await?;

        let policy = KetoPolicy {
            id: policy_id(&role.id),
            description: role.description.clone(),
            subjects: vec![role.id.clone()],
            resources: role.scopes.clone(),
            actions: vec![STUB_ACTION.to_string()],
            effect: "allow".to_string(),
        };
        self.send(self.http.post(self.url("/policies")).json(&policy))
            .await?;

        info!("keto: created policy {} for role {}", policy.id, role.id);
        Ok(())
    }

    /// The role and its policy are deleted independently, so a policy left
    /// behind by a half-deleted role is still removed. The first failure is
    /// returned.
    #[instrument(skip(self))]
    async fn delete_role(&self, id: &str) -> Result<()> {
        let role = self
            .send(self.http.delete(self.url(&format!("/roles/{}", id))))
            .await;
        let policy = self
            .send(self.http.delete(self.url(&format!("/policies/{}", policy_id(id)))))
            .await;

        if let Err(e) = &role {
            debug!("keto: can't delete role {}: {}", id, e);
        }
        if let Err(e) = &policy {
            debug!("keto: can't delete policy for role {}: {}", id, e);
        }
        role.and(policy)?;

        info!("keto: deleted policy for role {}", id);
        Ok(())
    }

    async fn get_role(&self, id: &str) -> Result<Role> {
        let role = self.fetch_role(id).await?;
        let policy = self.fetch_policy(id).await?;
        Ok(to_role(role, policy))
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let policies: Vec<KetoPolicy> = self
            .get_json(
                self.http
                    .get(self.url("/policies"))
                    .query(&[("offset", "0"), ("limit", LIST_LIMIT)]),
            )
            .await?;

        let mut roles = Vec::new();
        for policy in policies {
            let Some(role_id) = policy.id.strip_prefix(ROLE_POLICY_PREFIX) else {
                continue;
            };
            let role = self.fetch_role(role_id).await?;
            roles.push(to_role(role, policy));
        }

        debug!("keto: listed {} roles", roles.len());
        Ok(roles)
    }

    async fn list_roles_for_subject(&self, subject: &str) -> Result<Vec<String>> {
        let roles: Vec<KetoRole> = self
            .get_json(
                self.http
                    .get(self.url("/roles"))
                    .query(&[("member", subject), ("limit", LIST_LIMIT)]),
            )
            .await?;
        Ok(roles.into_iter().map(|r| r.id).collect())
    }

    async fn is_authorized(&self, subject: &str, scope: &str) -> Result<bool> {
        debug!("keto: authorizing subject {} for scope {}", subject, scope);
        let request = WardenRequest {
            subject,
            action: STUB_ACTION,
            resource: scope,
        };

        let response: WardenResponse = self
            .get_json(
                self.http
                    .post(self.url("/warden/subjects/authorize"))
                    .json(&request),
            )
            .await?;
        Ok(response.allowed)
    }
}
