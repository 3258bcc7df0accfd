use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use hyper::StatusCode;
use serde_json::json;

use crate::error::Result;

type RespBody = BoxBody<Bytes, hyper::Error>;

fn status_response(status: &str) -> Result<Response<RespBody>> {
    let body = json!({ "status": status });
    let body_bytes = serde_json::to_vec(&body).map_err(|e| {
        crate::error::GatekeeperError::Http(format!("Failed to serialize status response: {e}"))
    })?;

    let body = Full::new(Bytes::from(body_bytes))
        .map_err(|never| match never {})
        .boxed();

    let response = Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(body)
        .map_err(|e| {
            crate::error::GatekeeperError::Http(format!("Failed to build status response: {e}"))
        })?;

    Ok(response)
}

/// Health check response - always returns 200 if process is running
pub fn health_response() -> Result<Response<RespBody>> {
    status_response("healthy")
}

/// Readiness check - the service has no external collaborators, so it is
/// ready as soon as it is serving
pub fn ready_response() -> Result<Response<RespBody>> {
    status_response("ready")
}

/// Liveness check - always returns 200 if process is running
pub fn live_response() -> Result<Response<RespBody>> {
    status_response("alive")
}
