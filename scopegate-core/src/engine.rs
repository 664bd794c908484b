//! Authorization decision procedure
//!
//! For each request: validate the action, let the root token through, look up
//! the scopes governing the route, allow unregistered routes, reject short
//! tokens, introspect the token, and allow if the policy service grants the
//! subject any one of the matched scopes.

use crate::collaborators::Collaborators;
use crate::error::{Result, ScopeGateError};
use crate::registry::ScopeRegistry;
use crate::request::AuthorizationRequest;
use crate::types::{Scope, ScopeDefinition};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

/// Why a request was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DenyReason {
    /// Method or URI is malformed
    InvalidRequest,
    /// Token is too short, inactive or malformed
    InvalidToken,
    /// The introspection service failed
    IntrospectionFailed,
    /// No matched scope is granted to the subject
    Unauthorized,
    /// No matched scope was granted and the policy service failed for some
    PolicyUnavailable,
}

/// Authorization decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// Request may proceed
    Allow,
    /// Request is denied
    Deny(DenyReason),
}

impl Decision {
    /// Check if decision allows the action
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Deny reason, if denied
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(*reason),
        }
    }
}

/// Authorization result with details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationResult {
    /// The decision
    pub decision: Decision,
    /// Explanation for the decision
    pub explanation: String,
    /// Names of the scopes governing the route
    pub matched_scopes: Vec<String>,
    /// Scope that granted access, if a policy check allowed
    pub granted_by: Option<String>,
    /// Subject the token resolved to
    pub subject: Option<String>,
    /// Evaluation time in nanoseconds
    pub evaluation_time_ns: u64,
}

impl AuthorizationResult {
    fn new(decision: Decision, explanation: impl Into<String>) -> Self {
        AuthorizationResult {
            decision,
            explanation: explanation.into(),
            matched_scopes: Vec::new(),
            granted_by: None,
            subject: None,
            evaluation_time_ns: 0,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tokens shorter than this are rejected on registered routes
    pub min_token_length: usize,
    /// Timeout for each introspection or policy call in milliseconds
    pub collaborator_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            min_token_length: 10,
            collaborator_timeout_ms: 2_000,
        }
    }
}

/// Main ScopeGate engine
pub struct ScopeEngine {
    /// Published scopes and the root token
    registry: Arc<ScopeRegistry>,
    /// External services
    collaborators: Collaborators,
    /// Engine configuration
    config: Arc<EngineConfig>,
    /// Metrics
    metrics: Arc<EngineMetrics>,
}

impl ScopeEngine {
    /// Create a new engine with default configuration
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_config(collaborators, EngineConfig::default())
    }

    /// Create a new engine with specified configuration
    pub fn with_config(collaborators: Collaborators, config: EngineConfig) -> Self {
        ScopeEngine {
            registry: Arc::new(ScopeRegistry::new()),
            collaborators,
            config: Arc::new(config),
            metrics: Arc::new(EngineMetrics::new()),
        }
    }

    /// Register scopes once; returns the root token
    pub async fn initialize_scopes(&self, definitions: Vec<ScopeDefinition>) -> Result<String> {
        self.registry
            .initialize(definitions, &self.collaborators)
            .await
    }

    /// Registered scopes in registration order
    pub fn scopes(&self) -> Result<Vec<Scope>> {
        self.registry.scopes()
    }

    /// Drop published scopes after a failed initialization; ignored once initialized
    pub fn reset(&self) {
        self.registry.reset();
    }

    /// Whether `token` bypasses scope checks
    pub fn is_root_token(&self, token: &str) -> bool {
        self.registry.is_root_token(token)
    }

    /// Authorize a request
    #[instrument(
        skip(self, request),
        fields(
            request_id = %request.request_id,
            method = %request.action.method,
            uri = %request.action.uri
        )
    )]
    pub async fn authorize(&self, request: &AuthorizationRequest) -> AuthorizationResult {
        let start = Instant::now();
        let mut result = self.evaluate(request).await;
        result.evaluation_time_ns = start.elapsed().as_nanos() as u64;

        self.metrics.record_authorization(result.decision);
        match result.decision {
            Decision::Allow => debug!("access: allowed ({})", result.explanation),
            Decision::Deny(reason) => info!(?reason, "access: denied ({})", result.explanation),
        }

        result
    }

    async fn evaluate(&self, request: &AuthorizationRequest) -> AuthorizationResult {
        let action = match request.action.validate() {
            Ok(action) => action,
            Err(e) => {
                return AuthorizationResult::new(
                    Decision::Deny(DenyReason::InvalidRequest),
                    e.to_string(),
                )
            }
        };

        if self.registry.is_root_token(&request.token) {
            self.metrics.record_root_bypass();
            return AuthorizationResult::new(Decision::Allow, "root token");
        }

        let Some(snapshot) = self.registry.snapshot() else {
            self.metrics.record_unregistered();
            return AuthorizationResult::new(Decision::Allow, "no scopes published");
        };

        let matched = snapshot.matching_scopes(action.method, &action.uri);
        debug!("access: found {} scopes for {} {}", matched.len(), action.method, action.uri);

        if matched.is_empty() {
            self.metrics.record_unregistered();
            return AuthorizationResult::new(
                Decision::Allow,
                format!("{} {} not registered for any scope", action.method, action.uri),
            );
        }

        let matched_scopes: Vec<String> = matched
            .iter()
            .filter_map(|idx| snapshot.scope(*idx))
            .map(|scope| scope.name.clone())
            .collect();

        let mut result = AuthorizationResult::new(Decision::Allow, String::new());
        result.matched_scopes = matched_scopes.clone();

        if request.token_len() < self.config.min_token_length {
            result.decision = Decision::Deny(DenyReason::InvalidToken);
            result.explanation = "token too short".to_string();
            return result;
        }

        let subject = match self
            .call(self.collaborators.introspector.introspect(&request.token))
            .await
        {
            Ok(subject) => subject,
            Err(ScopeGateError::InvalidToken) => {
                result.decision = Decision::Deny(DenyReason::InvalidToken);
                result.explanation = "token is not active".to_string();
                return result;
            }
            Err(e) => {
                error!("access: error introspecting token: {}", e);
                self.metrics.record_collaborator_failure();
                result.decision = Decision::Deny(DenyReason::IntrospectionFailed);
                result.explanation = "error checking token".to_string();
                return result;
            }
        };
        result.subject = Some(subject.clone());

        let mut failures = 0usize;
        for scope in &matched_scopes {
            match self
                .call(self.collaborators.policy.is_authorized(&subject, scope))
                .await
            {
                Ok(true) => {
                    result.explanation = format!("{} granted by {}", subject, scope);
                    result.granted_by = Some(scope.clone());
                    return result;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("access: error checking {} for {}: {}", scope, subject, e);
                    self.metrics.record_collaborator_failure();
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            result.decision = Decision::Deny(DenyReason::PolicyUnavailable);
            result.explanation = format!("{} policy checks failed", failures);
        } else {
            result.decision = Decision::Deny(DenyReason::Unauthorized);
            result.explanation = format!("{} is not granted any matched scope", subject);
        }
        result
    }

    /// Await a collaborator call under the configured timeout
    pub(crate) async fn call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = Duration::from_millis(self.config.collaborator_timeout_ms);
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ScopeGateError::Timeout(self.config.collaborator_timeout_ms)),
        }
    }

    /// The scope registry
    pub fn registry(&self) -> &Arc<ScopeRegistry> {
        &self.registry
    }

    /// The collaborators
    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get engine metrics
    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }
}

/// Point-in-time copy of [`EngineMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Decisions made
    pub total_authorizations: u64,
    /// Allow decisions
    pub total_allowed: u64,
    /// Deny decisions
    pub total_denied: u64,
    /// Requests let through by the root token
    pub root_bypasses: u64,
    /// Requests allowed because no scope governs the route
    pub unregistered_routes: u64,
    /// Failed or timed out collaborator calls
    pub collaborator_failures: u64,
}

/// Engine metrics
#[derive(Debug, Default)]
pub struct EngineMetrics {
    total_authorizations: AtomicU64,
    total_allowed: AtomicU64,
    total_denied: AtomicU64,
    root_bypasses: AtomicU64,
    unregistered_routes: AtomicU64,
    collaborator_failures: AtomicU64,
}

impl EngineMetrics {
    fn new() -> Self {
        Self::default()
    }

    fn record_authorization(&self, decision: Decision) {
        self.total_authorizations.fetch_add(1, Ordering::Relaxed);

        match decision {
            Decision::Allow => self.total_allowed.fetch_add(1, Ordering::Relaxed),
            Decision::Deny(_) => self.total_denied.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn record_root_bypass(&self) {
        self.root_bypasses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_unregistered(&self) {
        self.unregistered_routes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_collaborator_failure(&self) {
        self.collaborator_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_authorizations: self.total_authorizations.load(Ordering::Relaxed),
            total_allowed: self.total_allowed.load(Ordering::Relaxed),
            total_denied: self.total_denied.load(Ordering::Relaxed),
            root_bypasses: self.root_bypasses.load(Ordering::Relaxed),
            unregistered_routes: self.unregistered_routes.load(Ordering::Relaxed),
            collaborator_failures: self.collaborator_failures.load(Ordering::Relaxed),
        }
    }
}
