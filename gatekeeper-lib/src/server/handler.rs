use http::StatusCode;
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EnforcementMode;
use crate::enforcement::Tier;
use crate::error::{GatekeeperError, Result};
use crate::server::AppState;
use crate::telemetry::{handle_metrics, health_response, live_response, ready_response};

type RespBody = BoxBody<Bytes, hyper::Error>;

/// Input from the upstream decision source.
#[derive(Debug, Deserialize)]
pub struct EnforcementRequest {
    pub entity: String,
    pub decision: Tier,
    /// Block duration in seconds; meaningful only for the block tier.
    /// Negative values are clamped to zero (an already-expired block).
    #[serde(default)]
    pub ttl_seconds: i64,
}

/// Verdict returned to the caller.
#[derive(Debug, Serialize)]
pub struct EnforcementResponse {
    pub allowed: bool,
    pub reason: &'static str,
}

#[derive(Debug, Deserialize)]
struct ModeRequest {
    mode: EnforcementMode,
}

pub async fn route(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> std::result::Result<Response<RespBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let result = match (method.as_str(), path.as_str()) {
        ("POST", "/enforce") => handle_enforce(req, &state).await,
        ("POST", "/mode") => handle_mode_set(req, &state).await,
        ("GET", "/mode") => handle_mode_get(&state),
        ("GET", "/health") => health_response(),
        ("GET", "/ready") => ready_response(),
        ("GET", "/live") => live_response(),
        ("GET", "/metrics") => handle_metrics(&state.registry),
        (_, "/enforce" | "/mode" | "/health" | "/ready" | "/live" | "/metrics") => {
            text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
        }
        _ => text_response(StatusCode::NOT_FOUND, "Not Found"),
    };

    match result {
        Ok(resp) => Ok(resp),
        Err(err) => {
            tracing::error!(%method, %path, error = %err, "handler error");
            Ok(plain_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            ))
        }
    }
}

async fn handle_enforce(req: Request<Incoming>, state: &AppState) -> Result<Response<RespBody>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(error = %e, "failed to read enforcement request body");
            state.metrics.record_malformed_request();
            return text_response(StatusCode::BAD_REQUEST, "invalid request");
        }
    };

    let parsed: EnforcementRequest = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "malformed enforcement request");
            state.metrics.record_malformed_request();
            return text_response(StatusCode::BAD_REQUEST, "invalid request");
        }
    };

    if parsed.entity.is_empty() {
        state.metrics.record_malformed_request();
        return text_response(StatusCode::BAD_REQUEST, "entity must not be empty");
    }

    let ttl = Duration::from_secs(parsed.ttl_seconds.max(0) as u64);
    let verdict = state.enforcer.enforce(&parsed.entity, parsed.decision, ttl);

    state
        .metrics
        .record_verdict(parsed.decision.as_str(), verdict.allowed, verdict.reason.as_str());
    if parsed.decision == Tier::Block {
        state.metrics.record_block_recorded();
    }

    debug!(
        entity = %parsed.entity,
        tier = parsed.decision.as_str(),
        allowed = verdict.allowed,
        reason = verdict.reason.as_str(),
        "enforcement verdict"
    );

    json_response(
        StatusCode::OK,
        &EnforcementResponse { allowed: verdict.allowed, reason: verdict.reason.as_str() },
    )
}

async fn handle_mode_set(req: Request<Incoming>, state: &AppState) -> Result<Response<RespBody>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(error = %e, "failed to read mode request body");
            return text_response(StatusCode::BAD_REQUEST, "invalid request");
        }
    };

    let parsed: ModeRequest = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "malformed mode request");
            return text_response(StatusCode::BAD_REQUEST, "invalid request");
        }
    };

    state.mode.store(Arc::new(parsed.mode));
    state.metrics.record_mode_change(parsed.mode.as_str());
    info!(mode = parsed.mode.as_str(), "enforcement mode set");

    json_response(StatusCode::OK, &json!({ "status": "ok" }))
}

fn handle_mode_get(state: &AppState) -> Result<Response<RespBody>> {
    let mode = **state.mode.load();
    json_response(StatusCode::OK, &json!({ "mode": mode.as_str() }))
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<RespBody>> {
    let body_bytes = serde_json::to_vec(value)
        .map_err(|e| GatekeeperError::Http(format!("Failed to serialize response: {e}")))?;

    let body = Full::new(Bytes::from(body_bytes))
        .map_err(|never| match never {})
        .boxed();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body)
        .map_err(|e| GatekeeperError::Http(format!("Failed to build response: {e}")))
}

fn text_response(status: StatusCode, message: &'static str) -> Result<Response<RespBody>> {
    Ok(plain_response(status, message))
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<RespBody> {
    let body = Full::new(Bytes::from(message))
        .map_err(|never| match never {})
        .boxed();
    let mut resp = Response::new(body);
    *resp.status_mut() = status;
    resp
}
