//! HTTP clients for the external collaborators

pub mod hydra;
pub mod keto;

pub use hydra::HydraClient;
pub use keto::KetoClient;

use crate::config::ServerConfig;
use scopegate_core::memory::{
    InMemoryPolicyService, InMemoryTokenIssuer, InMemoryUserDirectory, StaticIntrospector,
};
use scopegate_core::{Collaborators, ScopeGateError};
use std::sync::Arc;
use std::time::Duration;

/// Map a non-success response to a core error
pub(crate) async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ScopeGateError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ScopeGateError::NotFound(format!("{} {}", service, url)));
    }
    Err(ScopeGateError::unavailable(
        service,
        format!("{} returned {}: {}", url, status, body),
    ))
}

/// Shared HTTP client with the collaborator timeout applied
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ScopeGateError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ScopeGateError::ConfigError(format!("http client: {}", e)))
}

/// Build the collaborators described by `config`
pub fn from_config(config: &ServerConfig) -> Result<Collaborators, ScopeGateError> {
    let directory = Arc::new(InMemoryUserDirectory::with_users(
        config.directory.users.iter().cloned(),
    ));

    match (&config.hydra, &config.keto) {
        (Some(hydra), Some(keto)) => {
            let timeout = Duration::from_millis(config.engine.collaborator_timeout_ms);
            let http = http_client(timeout)?;
            let hydra = Arc::new(HydraClient::new(
                http.clone(),
                &hydra.admin_url,
                hydra.callback_url.clone(),
            ));
            let keto = Arc::new(KetoClient::new(http, &keto.url));
            Ok(Collaborators::new(hydra.clone(), hydra, keto, directory))
        }
        _ => {
            let introspector = StaticIntrospector::new();
            for (token, subject) in &config.standalone.tokens {
                introspector.insert(token.clone(), subject.clone());
            }
            Ok(Collaborators::new(
                Arc::new(InMemoryTokenIssuer::new()),
                Arc::new(introspector),
                Arc::new(InMemoryPolicyService::new()),
                directory,
            ))
        }
    }
}
