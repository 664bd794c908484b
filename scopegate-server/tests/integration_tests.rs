//! Integration tests for the ScopeGate HTTP server

use scopegate_core::{InMemoryCollaborators, ScopeEngine};
use scopegate_server::{
    api::{HealthResponse, HealthStatus, InitResponse},
    app, AppState,
};
use serde_json::{json, Value};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

struct TestServer {
    base_url: String,
    collab: InMemoryCollaborators,
    client: reqwest::Client,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn init(&self, scopes: Value) -> reqwest::Response {
        self.client
            .post(self.url("/scopes/init"))
            .json(&scopes)
            .send()
            .await
            .expect("Failed to send request")
    }

    async fn authorize(&self, token: Option<&str>, method: &str, uri: &str) -> reqwest::Response {
        let mut request = self
            .client
            .post(self.url("/scopes/authorize"))
            .json(&json!({ "method": method, "uri": uri }));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to send request")
    }
}

/// Test server setup helper
async fn setup_test_server() -> TestServer {
    // Initialize Prometheus metrics (only once for all tests)
    INIT.call_once(|| {
        scopegate_server::metrics::init_prometheus().expect("Failed to init Prometheus");
        scopegate_server::metrics::init_metrics();
    });

    let collab = InMemoryCollaborators::new();
    collab.directory.add("alice");
    collab.introspector.insert("alice-access-token", "alice");

    let engine = Arc::new(ScopeEngine::new(collab.collaborators()));
    let state = AppState::with_debug(engine, false);

    // Find an available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to port");
    let addr = listener.local_addr().expect("Failed to get local address");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        collab,
        client: reqwest::Client::new(),
        _handle: handle,
    }
}

fn roles_scopes() -> Value {
    json!([
        {"name": "roles.write", "method": "POST", "uri": "/roles", "description": "Create roles"},
        {"name": "roles.read", "method": "GET", "uri": "/roles/:id"}
    ])
}

#[tokio::test]
async fn test_health_endpoints() {
    let server = setup_test_server().await;

    let response = reqwest::get(server.url("/health/live")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: HealthResponse = response.json().await.unwrap();
    assert_eq!(body.status, HealthStatus::Uninitialized);
    assert_eq!(body.version, env!("CARGO_PKG_VERSION"));

    let response = reqwest::get(server.url("/health/ready")).await.unwrap();
    assert_eq!(response.status().as_u16(), 503);

    server.init(roles_scopes()).await;
    let response = reqwest::get(server.url("/health/ready")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: HealthResponse = response.json().await.unwrap();
    assert_eq!(body.scopes, 2);
}

#[tokio::test]
async fn test_scopes_lifecycle() {
    let server = setup_test_server().await;

    let response = reqwest::get(server.url("/scopes")).await.unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = server.init(roles_scopes()).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: InitResponse = response.json().await.unwrap();
    assert_eq!(body.status, "ok");
    assert_eq!(body.token.len(), 64);

    let scopes: Vec<Value> = reqwest::get(server.url("/scopes"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scopes.len(), 2);
    assert_eq!(scopes[0]["name"], "roles.write");
    assert_eq!(scopes[1]["method"], "GET");

    let response = server.init(roles_scopes()).await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("already been initialized"));

    // the rejected call left the registered scopes in place
    let scopes: Vec<Value> = reqwest::get(server.url("/scopes"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(scopes.len(), 2);
    let response = server.authorize(Some("short"), "POST", "/roles").await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn test_failed_init_resets_and_can_be_retried() {
    let server = setup_test_server().await;

    let response = server
        .init(json!([{"name": "ab", "method": "GET", "uri": "/a"}]))
        .await;
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    let response = server.init(json!({"not": "a list"})).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = server.init(roles_scopes()).await;
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_authorize_flow() {
    let server = setup_test_server().await;

    // bootstrap mode: everything is allowed
    let response = server.authorize(None, "POST", "/roles").await;
    assert_eq!(response.status().as_u16(), 200);

    let body: InitResponse = server.init(roles_scopes()).await.json().await.unwrap();
    let root = body.token;

    let response = server.authorize(Some(&root), "POST", "/roles").await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // unregistered route
    let response = server.authorize(None, "DELETE", "/roles").await;
    assert_eq!(response.status().as_u16(), 200);

    // registered route without a usable token
    let response = server.authorize(Some("short"), "POST", "/roles").await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");

    let response = server.authorize(Some("alice-access-token"), "POST", "/roles").await;
    assert_eq!(response.status().as_u16(), 403);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    // grant alice the scope through a role
    let response = server
        .client
        .post(server.url("/roles"))
        .json(&json!({"name": "writers", "members": ["alice"], "scopes": ["roles.write"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = server.authorize(Some("alice-access-token"), "POST", "/roles").await;
    assert_eq!(response.status().as_u16(), 200);

    // malformed action
    let response = server.authorize(Some(&root), "FETCH", "/roles").await;
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_authorize_debug_diagnostics() {
    let server = setup_test_server().await;
    server.init(roles_scopes()).await;
    server
        .client
        .post(server.url("/roles"))
        .json(&json!({"name": "readers", "members": ["alice"], "scopes": ["roles.read"]}))
        .send()
        .await
        .unwrap();

    let body: Value = server
        .client
        .post(server.url("/scopes/authorize?debug=true"))
        .bearer_auth("alice-access-token")
        .json(&json!({"method": "GET", "uri": "/roles/writers"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["diagnostics"]["matchedScopes"], json!(["roles.read"]));
    assert_eq!(body["diagnostics"]["grantedBy"], "roles.read");
}

#[tokio::test]
async fn test_role_management() {
    let server = setup_test_server().await;
    let body: InitResponse = server.init(roles_scopes()).await.json().await.unwrap();
    let root = body.token;

    // unknown member
    let response = server
        .client
        .post(server.url("/roles"))
        .json(&json!({"name": "readers", "members": ["mallory"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let role: Value = server
        .client
        .post(server.url("/roles"))
        .json(&json!({
            "name": "Readers",
            "description": "Read roles",
            "members": ["alice"],
            "scopes": ["roles.read"]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(role["name"], "readers");

    let role: Value = reqwest::get(server.url("/roles/readers"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(role["description"], "Read roles");

    let response = reqwest::get(server.url("/roles/nobody")).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let roles: Vec<Value> = reqwest::get(server.url("/roles"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(roles.len(), 2);

    // caller's own roles
    let mine: Vec<String> = server
        .client
        .get(server.url("/roles/self"))
        .bearer_auth("alice-access-token")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine, vec!["readers"]);

    let mine: Vec<String> = server
        .client
        .get(server.url("/roles/self"))
        .bearer_auth(&root)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine, vec!["admin"]);

    // admin cannot be deleted, other roles can
    let response = server.client.delete(server.url("/roles/admin")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = server.client.delete(server.url("/roles/readers")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(server.collab.policy.len() == 1);
}

#[tokio::test]
async fn test_update_admin_role_keeps_scopes() {
    let server = setup_test_server().await;
    server.init(roles_scopes()).await;

    let role: Value = server
        .client
        .put(server.url("/roles/admin"))
        .json(&json!({
            "name": "admin",
            "description": "mine now",
            "members": ["alice"],
            "scopes": []
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(role["scopes"], json!(["roles.write", "roles.read"]));
    assert_eq!(role["members"], json!(["alice"]));
    assert_ne!(role["description"], "mine now");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let server = setup_test_server().await;
    server.authorize(None, "GET", "/anything").await;

    let response = reqwest::get(server.url("/metrics")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
}
