//! OAuth2 provider client (Hydra admin API)
//!
//! Registers the root client for the scope set and introspects bearer tokens.

use super::check_status;
use crate::metrics::LatencyTimer;
use crate::tracing::trace_collaborator_call;
use async_trait::async_trait;
use parking_lot::RwLock;
use scopegate_core::memory::ROOT_CLIENT_ID;
use scopegate_core::{ClientCredentials, Result, ScopeGateError, TokenIntrospector, TokenIssuer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

const SERVICE: &str = "hydra";

#[derive(Debug, Serialize)]
struct ClientRegistration<'a> {
    client_id: &'a str,
    client_name: &'a str,
    client_secret: &'a str,
    grant_types: [&'a str; 2],
    response_types: [&'a str; 2],
    scope: &'a str,
    redirect_uris: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RegisteredClient {
    client_id: String,
    #[serde(default)]
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Introspection {
    active: bool,
    #[serde(default)]
    sub: Option<String>,
}

/// Hydra admin API client
#[derive(Debug)]
pub struct HydraClient {
    http: reqwest::Client,
    admin_url: String,
    callback_url: Option<String>,
    /// Space-joined scopes of the root client, sent along with introspection
    scopes: RwLock<String>,
}

impl HydraClient {
    /// Create a client for the admin endpoint at `admin_url`
    pub fn new(http: reqwest::Client, admin_url: &str, callback_url: Option<String>) -> Self {
        HydraClient {
            http,
            admin_url: admin_url.trim_end_matches('/').to_string(),
            callback_url,
            scopes: RwLock::new(String::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.admin_url, path)
    }
}

#[async_trait]
impl TokenIssuer for HydraClient {
    #[instrument(skip(self))]
    async fn register_client(&self, scope_names: &[String]) -> Result<ClientCredentials> {
        let scope = scope_names.join(" ");

        // a previous instance may have left its client behind
        if let Err(e) = self
            .http
            .delete(self.url(&format!("/clients/{}", ROOT_CLIENT_ID)))
            .send()
            .await
        {
            debug!("hydra: couldn't delete previous root client: {}", e);
        }

        let registration = ClientRegistration {
            client_id: ROOT_CLIENT_ID,
            client_name: "scopegate",
            client_secret: "",
            grant_types: ["authorization_code", "client_credentials"],
            response_types: ["code", "id_token"],
            scope: &scope,
            redirect_uris: self.callback_url.as_deref().into_iter().collect(),
        };

        let timer = LatencyTimer::new(SERVICE);
        let request = self.http.post(self.url("/clients")).json(&registration);
        let response = trace_collaborator_call(SERVICE, request.send())
            .await
            .map_err(|e| ScopeGateError::unavailable(SERVICE, e))?;
        timer.record();

        let client: RegisteredClient = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ScopeGateError::unavailable(SERVICE, e))?;

        *self.scopes.write() = scope;
        info!("hydra: created client (id: {}) with scopes {:?}", client.client_id, scope_names);

        Ok(ClientCredentials {
            client_id: client.client_id,
            client_secret: client.client_secret.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl TokenIntrospector for HydraClient {
    async fn introspect(&self, token: &str) -> Result<String> {
        if token.is_empty() {
            return Err(ScopeGateError::InvalidToken);
        }

        let scope = self.scopes.read().clone();
        let timer = LatencyTimer::new(SERVICE);
        let request = self
            .http
            .post(self.url("/oauth2/introspect"))
            .form(&[("token", token), ("scope", scope.as_str())]);
        let response = trace_collaborator_call(SERVICE, request.send())
            .await
            .map_err(|e| ScopeGateError::unavailable(SERVICE, e))?;
        timer.record();

        let data: Introspection = check_status(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(|e| ScopeGateError::unavailable(SERVICE, e))?;

        match data.sub {
            Some(sub) if data.active && !sub.is_empty() => Ok(sub),
            _ => {
                warn!("hydra: inactive token presented");
                Err(ScopeGateError::InvalidToken)
            }
        }
    }
}
