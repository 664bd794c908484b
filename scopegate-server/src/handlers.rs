//! HTTP request handlers

use crate::api::{
    AuthorizeDiagnostics, AuthorizeResponse, HealthResponse, HealthStatus, InitResponse,
    StatusResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::tracing::{authorization_span, record_decision};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use scopegate_core::{
    Action, AuthorizationRequest, Decision, Role, Scope, ScopeDefinition, ScopeGateError,
};
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

/// Role id that stands for the caller's own roles
pub const SELF_ROLE_ID: &str = "self";

/// Query parameters for debug mode
#[derive(Debug, Deserialize)]
pub struct DebugParams {
    #[serde(default)]
    debug: bool,
}

/// Token from an `Authorization: Bearer <token>` header; empty when absent
pub fn bearer_token(headers: &HeaderMap) -> String {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("request body is empty".to_string()));
    }
    Ok(serde_json::from_slice(body)?)
}

/// List registered scopes
pub async fn list_scopes(State(state): State<AppState>) -> ApiResult<Json<Vec<Scope>>> {
    let scopes = state.engine.scopes().map_err(|e| {
        warn!("error getting scopes: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(scopes))
}

/// Register the scope set once and hand out the root token
pub async fn init_scopes(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<InitResponse>> {
    let definitions: Vec<ScopeDefinition> = parse_body(&body)?;
    let count = definitions.len();

    match state.engine.initialize_scopes(definitions).await {
        Ok(token) => {
            crate::metrics::record_initialization(true, count);
            info!("initialized {} scopes", count);
            Ok(Json(InitResponse {
                status: "ok".to_string(),
                token,
            }))
        }
        Err(e) => {
            error!("error initializing scopes: {}", e);
            crate::metrics::record_initialization(false, count);
            // a rejected second call must not drop the published scopes
            if !matches!(e, ScopeGateError::AlreadyInitialized) {
                state.engine.reset();
            }

            if e.is_client_error() {
                Err(e.into())
            } else {
                Err(ApiError::BadRequest("error initializing scopes".to_string()))
            }
        }
    }
}

/// Decide whether the bearer token may perform the action in the body
pub async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<DebugParams>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<AuthorizeResponse>> {
    let start = Instant::now();
    let action: Action = parse_body(&body)?;
    let token = bearer_token(&headers);

    let span = authorization_span(&action.method, &action.uri);
    async move {
        let request = AuthorizationRequest::new(token, action);
        let result = state.engine.authorize(&request).await;

        let elapsed = start.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        crate::metrics::record_authorization(result.decision, elapsed.as_secs_f64());

        match result.decision {
            Decision::Allow => {
                record_decision("allow", elapsed_ms);
                debug!(
                    "authorized {} {} ({:.2}ms)",
                    request.action.method, request.action.uri, elapsed_ms
                );

                let diagnostics = (state.debug || params.debug).then(|| AuthorizeDiagnostics {
                    matched_scopes: result.matched_scopes,
                    granted_by: result.granted_by,
                    evaluation_time_ms: elapsed_ms,
                });
                Ok(Json(AuthorizeResponse {
                    status: "ok".to_string(),
                    diagnostics,
                }))
            }
            Decision::Deny(reason) => {
                record_decision("deny", elapsed_ms);
                info!(
                    "error authorizing token for action {} {}: {}",
                    request.action.method, request.action.uri, result.explanation
                );
                Err(ApiError::Denied(reason))
            }
        }
    }
    .instrument(span)
    .await
}

/// Create a role
pub async fn create_role(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Role>> {
    let role: Role = parse_body(&body)?;
    let role = state.engine.create_role(role).await?;
    crate::metrics::record_role_operation("create");
    Ok(Json(role))
}

/// List all roles
pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Json<Vec<Role>>> {
    Ok(Json(state.engine.list_roles().await?))
}

/// Get a role, or the caller's role ids for `/roles/self`
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    if id == SELF_ROLE_ID {
        let roles = state
            .engine
            .roles_for_token(&bearer_token(&headers))
            .await?;
        return Ok(Json(roles).into_response());
    }

    Ok(Json(state.engine.get_role(&id).await?).into_response())
}

/// Replace a role
pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Role>> {
    let role: Role = parse_body(&body)?;
    let role = state.engine.update_role(&id, role).await?;
    crate::metrics::record_role_operation("update");
    Ok(Json(role))
}

/// Delete a role
pub async fn delete_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    state.engine.delete_role(&id).await?;
    crate::metrics::record_role_operation("delete");
    Ok(Json(StatusResponse::ok()))
}

fn health(state: &AppState) -> HealthResponse {
    let scopes = state
        .engine
        .registry()
        .snapshot()
        .map(|s| s.len())
        .unwrap_or_default();
    let status = if state.engine.registry().is_initialized() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Uninitialized
    };

    HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        scopes,
    }
}

/// Health check - liveness probe
pub async fn health_live(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health(&state))
}

/// Health check - readiness probe; ready once scopes are registered
pub async fn health_ready(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let health = health(&state);
    if health.status != HealthStatus::Healthy {
        return Err(ApiError::ServiceUnavailable(
            "scopes haven't been initialized".to_string(),
        ));
    }
    Ok(Json(health))
}

/// Prometheus metrics endpoint
pub async fn metrics() -> String {
    crate::metrics::get_prometheus_metrics()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), "");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), "abc.def");

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), "");
    }

    #[test]
    fn test_parse_body() {
        let action: Action = parse_body(&Bytes::from_static(
            br#"{"method": "GET", "uri": "/a", "name": "ignored"}"#,
        ))
        .unwrap();
        assert_eq!(action, Action::new("GET", "/a"));

        assert!(matches!(
            parse_body::<Action>(&Bytes::new()),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            parse_body::<Action>(&Bytes::from_static(b"{")),
            Err(ApiError::SerializationError(_))
        ));
    }
}
