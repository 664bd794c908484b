//! Integration tests for ScopeGate CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const JSON_SCOPES: &str = r#"[
    {"name": "docs.read", "method": "GET", "uri": "/docs/:id", "description": "Read a document"},
    {"name": "docs.write", "method": "POST", "uri": "/docs/*"},
    {"name": "docs.admin", "method": "POST", "uri": "/docs/:id/acl"}
]"#;

const TOML_SCOPES: &str = r#"
[[scope]]
name = "users.list"
method = "GET"
uri = "/users"

[[scope]]
name = "users.update"
method = "PUT"
uri = "/users/:id"
"#;

fn scope_file(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    write!(file, "{}", content).unwrap();
    file.flush().unwrap();
    file
}

fn scopegate() -> Command {
    Command::cargo_bin("scopegate").unwrap()
}

/// Test the version command
#[test]
fn test_cli_version() {
    scopegate()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("scopegate"));
}

/// Test the help command
#[test]
fn test_cli_help() {
    scopegate()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scope-based authorization"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("match"))
        .stdout(predicate::str::contains("benchmark"))
        .stdout(predicate::str::contains("token"));
}

/// Test validate command with a JSON scope file
#[test]
fn test_validate_json_scopes() {
    let file = scope_file(JSON_SCOPES, ".json");

    scopegate()
        .arg("validate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("valid!"))
        .stdout(predicate::str::contains("Scopes: 3"))
        .stdout(predicate::str::contains("docs.admin"));
}

/// Test validate command with a TOML scope file
#[test]
fn test_validate_toml_scopes() {
    let file = scope_file(TOML_SCOPES, ".toml");

    scopegate()
        .arg("validate")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Scopes: 2"))
        .stdout(predicate::str::contains("users.update"));
}

/// Test validate command with unparseable content
#[test]
fn test_validate_invalid_syntax() {
    let file = scope_file("invalid syntax [[[", ".json");

    scopegate()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid"));
}

/// Test validate command with a duplicate scope name
#[test]
fn test_validate_duplicate_scope() {
    let file = scope_file(
        r#"[
            {"name": "docs.read", "method": "GET", "uri": "/docs"},
            {"name": "DOCS.READ", "method": "GET", "uri": "/other"}
        ]"#,
        ".json",
    );

    scopegate()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("docs.read"));
}

/// Test validate command with a scope that has an invalid method
#[test]
fn test_validate_invalid_method() {
    let file = scope_file(
        r#"[{"name": "docs.read", "method": "FETCH", "uri": "/docs"}]"#,
        ".json",
    );

    scopegate()
        .arg("validate")
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid"));
}

/// Test validate command with missing file
#[test]
fn test_validate_missing_file() {
    scopegate()
        .arg("validate")
        .arg("/nonexistent/scopes.json")
        .assert()
        .failure();
}

/// Test validate command without file argument
#[test]
fn test_validate_no_file() {
    scopegate()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

/// Test match command on a governed route
#[test]
fn test_match_governed_route() {
    let file = scope_file(JSON_SCOPES, ".json");

    scopegate()
        .arg("match")
        .arg("--scopes").arg(file.path())
        .arg("--method").arg("GET")
        .arg("--url").arg("/docs/42?draft=true")
        .assert()
        .success()
        .stdout(predicate::str::contains("GOVERNED"))
        .stdout(predicate::str::contains("docs.read"));
}

/// Test match command where several scopes govern the route
#[test]
fn test_match_multiple_scopes_json() {
    let file = scope_file(JSON_SCOPES, ".json");

    let output = scopegate()
        .arg("match")
        .arg("--scopes").arg(file.path())
        .arg("--method").arg("post")
        .arg("--url").arg("/docs/42/acl")
        .arg("--format").arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["method"], "POST");
    assert_eq!(body["public"], false);
    let mut names: Vec<&str> = body["matched"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["docs.admin", "docs.write"]);
}

/// Test match command on a route no scope governs
#[test]
fn test_match_public_route() {
    let file = scope_file(TOML_SCOPES, ".toml");

    scopegate()
        .arg("match")
        .arg("--scopes").arg(file.path())
        .arg("--method").arg("DELETE")
        .arg("--url").arg("/users/7")
        .assert()
        .success()
        .stdout(predicate::str::contains("PUBLIC"));
}

/// Test match command with an invalid request
#[test]
fn test_match_invalid_request() {
    let file = scope_file(JSON_SCOPES, ".json");

    scopegate()
        .arg("match")
        .arg("--scopes").arg(file.path())
        .arg("--method").arg("GET")
        .arg("--url").arg("/")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid URI"));
}

/// Test match command with missing arguments
#[test]
fn test_match_missing_url() {
    let file = scope_file(JSON_SCOPES, ".json");

    scopegate()
        .arg("match")
        .arg("--scopes").arg(file.path())
        .arg("--method").arg("GET")
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

/// Test benchmark command with default parameters
#[test]
fn test_benchmark_default() {
    scopegate()
        .arg("benchmark")
        .arg("--requests").arg("1000")
        .assert()
        .success()
        .stdout(predicate::str::contains("Requests: 1000"))
        .stdout(predicate::str::contains("Threads: 8"))
        .stdout(predicate::str::contains("Throughput"));
}

/// Test benchmark command against a scope file
#[test]
fn test_benchmark_with_scopes() {
    let file = scope_file(JSON_SCOPES, ".json");

    scopegate()
        .arg("benchmark")
        .arg("--scopes").arg(file.path())
        .arg("--requests").arg("100")
        .arg("--threads").arg("2")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scopes: 3"))
        .stdout(predicate::str::contains("Governed: 90"))
        .stdout(predicate::str::contains("Public: 10"));
}

/// Test benchmark command with an empty scope file
#[test]
fn test_benchmark_empty_scopes() {
    let file = scope_file("[]", ".json");

    scopegate()
        .arg("benchmark")
        .arg("--scopes").arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no scopes"));
}

/// Test token command
#[test]
fn test_token() {
    let output = scopegate().arg("token").output().unwrap();
    assert!(output.status.success());

    let token = String::from_utf8(output.stdout).unwrap();
    let token = token.trim();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
}

/// Test verbose flag emits debug logs
#[test]
fn test_verbose_flag() {
    let file = scope_file(JSON_SCOPES, ".json");

    scopegate()
        .arg("--verbose")
        .arg("match")
        .arg("--scopes").arg(file.path())
        .arg("--method").arg("GET")
        .arg("--url").arg("/docs/42")
        .assert()
        .success()
        .stdout(predicate::str::contains("loaded 3 scope definitions"))
        .stdout(predicate::str::contains("matched 1 scopes"));

    scopegate()
        .arg("benchmark")
        .arg("--requests").arg("10")
        .arg("-v")
        .assert()
        .success()
        .stdout(predicate::str::contains("using synthetic scopes"));
}

/// Test debug logs are off without the verbose flag
#[test]
fn test_quiet_by_default() {
    let file = scope_file(JSON_SCOPES, ".json");

    scopegate()
        .arg("match")
        .arg("--scopes").arg(file.path())
        .arg("--method").arg("GET")
        .arg("--url").arg("/docs/42")
        .assert()
        .success()
        .stdout(predicate::str::contains("loaded").not());
}

/// Test invalid subcommand
#[test]
fn test_invalid_command() {
    scopegate()
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
