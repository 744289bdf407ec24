#![allow(deprecated)]
//! CLI contract: help text, exit codes and output against a mock site.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENV_VARS: &[&str] = &[
    "ALMASEO_SITE_URL",
    "ALMASEO_API_TOKEN",
    "ALMASEO_NONCE",
    "ALMASEO_TRANSPORT",
    "ALMASEO_REST_ROUTE",
    "ALMASEO_AJAX_ACTION",
    "ALMASEO_TIMEOUT",
];

fn almaseo() -> Command {
    let mut cmd = Command::cargo_bin("almaseo").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn status_body(score: u8) -> Value {
    json!({
        "entity_id": 42,
        "score": score,
        "breakdown": {
            "focus_keyword": {"pass": true, "note": "Keyword in title"},
            "readability": {"pass": false, "note": "Long sentences"}
        },
        "updated_at": "2026-03-01 10:00:00"
    })
}

/// Runs the binary off the runtime so the mock server keeps serving.
async fn run(args: Vec<String>) -> std::process::Output {
    tokio::task::spawn_blocking(move || almaseo().args(&args).output().unwrap())
        .await
        .unwrap()
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[test]
fn help_lists_commands() {
    almaseo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("--site-url"));
}

#[test]
fn invalid_site_url_is_config_error() {
    almaseo()
        .args(["health", "42", "--site-url", "ftp://example.com"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("site url must be http(s)"));
}

#[test]
fn oversized_timeout_is_config_error() {
    almaseo()
        .args(["health", "1", "--timeout", "18446744073709551615"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("timeout must be between 1 and 3600"));
}

#[test]
fn missing_post_id_is_usage_error() {
    almaseo().arg("health").assert().code(1);
}

#[test]
fn bad_draft_is_config_error() {
    almaseo()
        .args(["health", "42", "--draft", "[1]"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("must be a JSON object"));
}

#[tokio::test(flavor = "multi_thread")]
async fn health_prints_panel() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/almaseo/v1/health/42"))
        .and(query_param("reason", "manual"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(72)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let output = run(args(&["health", "42", "--site-url", &mock_server.uri()])).await;

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Health score: 72/100 [warn]"), "{}", stdout);
    assert!(stdout.contains("Signals: 1 passed, 1 failed"), "{}", stdout);
    assert!(stdout.contains("[FAIL] readability: Long sentences"), "{}", stdout);
}

#[tokio::test(flavor = "multi_thread")]
async fn health_json_output() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/almaseo/v1/health/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(91)))
        .mount(&mock_server)
        .await;

    let output = run(args(&[
        "health",
        "42",
        "--json",
        "--site-url",
        &mock_server.uri(),
    ]))
    .await;

    assert_eq!(output.status.code(), Some(0));
    let v: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    assert_eq!(v["score"], 91);
    assert_eq!(v["breakdown"]["focus_keyword"]["pass"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn health_draft_is_posted() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wp-json/almaseo/v1/health/42"))
        .and(wiremock::matchers::body_json(json!({
            "reason": "field-edit",
            "draft": {"title": "Better title"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(85)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let output = run(args(&[
        "health",
        "42",
        "--draft",
        r#"{"title": "Better title"}"#,
        "--site-url",
        &mock_server.uri(),
    ]))
    .await;

    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("[good]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn health_exit_codes_follow_error_kind() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/almaseo/v1/health/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/almaseo/v1/health/403"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wp-json/almaseo/v1/health/500"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let uri = mock_server.uri();
    for (post_id, expected) in [("404", 3), ("403", 2), ("500", 5)] {
        let output = run(args(&["health", post_id, "--site-url", &uri])).await;
        assert_eq!(output.status.code(), Some(expected), "post {}", post_id);
        assert!(output.stdout.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn watch_stops_after_count() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/almaseo/v1/health/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(60)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let output = run(args(&[
        "watch",
        "42",
        "--interval",
        "1",
        "--count",
        "2",
        "--site-url",
        &mock_server.uri(),
    ]))
    .await;

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("Health score: 60/100").count(), 2);
    assert!(String::from_utf8_lossy(&output.stderr).contains("check #2"));
}
