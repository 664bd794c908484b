//! Route table

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application routes without middleware
pub fn routes(state: AppState) -> Router {
    Router::new()
        // Scopes
        .route("/scopes", get(handlers::list_scopes))
        .route("/scopes/init", post(handlers::init_scopes))
        .route("/scopes/authorize", post(handlers::authorize))
        // Roles
        .route("/roles", post(handlers::create_role).get(handlers::list_roles))
        .route(
            "/roles/:id",
            get(handlers::get_role)
                .put(handlers::update_role)
                .delete(handlers::delete_role),
        )
        // Health checks
        .route("/health/live", get(handlers::health_live))
        .route("/health/ready", get(handlers::health_ready))
        // Metrics
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

/// Application routes with compression, CORS and request tracing
pub fn app(state: AppState) -> Router {
    routes(state)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use scopegate_core::{InMemoryCollaborators, ScopeEngine};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let engine = Arc::new(ScopeEngine::new(InMemoryCollaborators::new().collaborators()));
        app(AppState::new(engine))
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let response = test_app()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_authorize_requires_body() {
        let response = test_app()
            .oneshot(
                Request::post("/scopes/authorize")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_init_then_list_scopes() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(
                Request::post("/scopes/init")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"[{"name": "docs.read", "method": "GET", "uri": "/docs/:id"}]"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/scopes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let scopes: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(scopes[0]["name"], "docs.read");
    }
}
