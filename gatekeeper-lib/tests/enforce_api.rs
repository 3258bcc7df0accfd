use std::sync::Arc;

use gatekeeper_lib::{serve, AppState, Config};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Bind an ephemeral port, spawn the server, and return its base URL.
async fn start_server() -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let cfg: Config = toml::from_str(r#"listen = "127.0.0.1:0""#)?;
    let state = Arc::new(AppState::new(&cfg)?);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(serve(listener, state));

    Ok(format!("http://{addr}"))
}

async fn enforce(
    client: &reqwest::Client,
    base: &str,
    body: Value,
) -> Result<(reqwest::StatusCode, Value), Box<dyn std::error::Error + Send + Sync>> {
    let resp = client
        .post(format!("{base}/enforce"))
        .json(&body)
        .send()
        .await?;
    let status = resp.status();
    let value = if status == reqwest::StatusCode::OK {
        resp.json().await?
    } else {
        Value::Null
    };
    Ok((status, value))
}

#[tokio::test]
async fn test_permissive_decision_is_allowed() -> Result<(), Box<dyn std::error::Error + Send + Sync>>
{
    let base = start_server().await?;
    let client = reqwest::Client::new();

    let (status, body) = enforce(
        &client,
        &base,
        json!({"entity": "u1", "decision": "permissive", "ttl_seconds": 0}),
    )
    .await?;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["allowed"], json!(true));
    assert_eq!(body["reason"], json!("allowed"));
    Ok(())
}

#[tokio::test]
async fn test_block_decision_denies_subsequent_requests(
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let base = start_server().await?;
    let client = reqwest::Client::new();

    let (status, body) = enforce(
        &client,
        &base,
        json!({"entity": "u2", "decision": "block", "ttl_seconds": 60}),
    )
    .await?;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["allowed"], json!(false));
    assert_eq!(body["reason"], json!("blocked"));

    // The block overrides even a permissive decision.
    let (status, body) = enforce(
        &client,
        &base,
        json!({"entity": "u2", "decision": "permissive", "ttl_seconds": 0}),
    )
    .await?;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["allowed"], json!(false));
    assert_eq!(body["reason"], json!("entity is currently blocked"));
    Ok(())
}

#[tokio::test]
async fn test_challenge_tier_rate_limits() -> Result<(), Box<dyn std::error::Error + Send + Sync>>
{
    let base = start_server().await?;
    let client = reqwest::Client::new();

    // Default challenge policy: capacity 5, refill 1/s.
    for i in 0..5 {
        let (_, body) = enforce(
            &client,
            &base,
            json!({"entity": "u3", "decision": "challenge", "ttl_seconds": 0}),
        )
        .await?;
        assert_eq!(body["allowed"], json!(true), "request {i} should pass");
        assert_eq!(body["reason"], json!("allowed (challenge mode)"));
    }

    let (_, body) = enforce(
        &client,
        &base,
        json!({"entity": "u3", "decision": "challenge", "ttl_seconds": 0}),
    )
    .await?;
    assert_eq!(body["allowed"], json!(false));
    assert_eq!(body["reason"], json!("rate limited (challenge)"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_decision_is_rejected() -> Result<(), Box<dyn std::error::Error + Send + Sync>>
{
    let base = start_server().await?;
    let client = reqwest::Client::new();

    let (status, _) = enforce(
        &client,
        &base,
        json!({"entity": "u4", "decision": "FOO", "ttl_seconds": 0}),
    )
    .await?;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);

    // The malformed request must not have touched the block list.
    let (_, body) = enforce(
        &client,
        &base,
        json!({"entity": "u4", "decision": "permissive", "ttl_seconds": 0}),
    )
    .await?;
    assert_eq!(body["allowed"], json!(true));
    Ok(())
}

#[tokio::test]
async fn test_empty_entity_is_rejected() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let base = start_server().await?;
    let client = reqwest::Client::new();

    let (status, _) = enforce(
        &client,
        &base,
        json!({"entity": "", "decision": "permissive", "ttl_seconds": 0}),
    )
    .await?;
    assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_mode_toggle_roundtrip() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let base = start_server().await?;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/mode")).send().await?;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: Value = resp.json().await?;
    assert_eq!(body["mode"], json!("fail-closed"));

    let resp = client
        .post(format!("{base}/mode"))
        .json(&json!({"mode": "fail-open"}))
        .send()
        .await?;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let resp = client.get(format!("{base}/mode")).send().await?;
    let body: Value = resp.json().await?;
    assert_eq!(body["mode"], json!("fail-open"));
    Ok(())
}

#[tokio::test]
async fn test_invalid_mode_is_rejected() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let base = start_server().await?;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/mode"))
        .json(&json!({"mode": "fail-sometimes"}))
        .send()
        .await?;
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_health_endpoints() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let base = start_server().await?;
    let client = reqwest::Client::new();

    for path in ["/health", "/ready", "/live"] {
        let resp = client.get(format!("{base}{path}")).send().await?;
        assert_eq!(resp.status(), reqwest::StatusCode::OK, "{path} should be 200");
    }
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let base = start_server().await?;
    let client = reqwest::Client::new();

    enforce(
        &client,
        &base,
        json!({"entity": "u5", "decision": "monitoring", "ttl_seconds": 0}),
    )
    .await?;

    let resp = client.get(format!("{base}/metrics")).send().await?;
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body = resp.text().await?;
    assert!(
        body.contains("gatekeeper_") || body.contains("# TYPE"),
        "should contain metrics format"
    );
    Ok(())
}

#[tokio::test]
async fn test_unknown_path_and_wrong_method(
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let base = start_server().await?;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/nope")).send().await?;
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    let resp = client.get(format!("{base}/enforce")).send().await?;
    assert_eq!(resp.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}
