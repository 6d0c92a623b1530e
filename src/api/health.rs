//! Health check endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub mode: &'static str,
}

/// Detailed readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub checks: ReadinessChecks,
}

/// Individual readiness checks
#[derive(Serialize)]
pub struct ReadinessChecks {
    pub download_dir: CheckResult,
    pub static_dir: CheckResult,
    pub converter: CheckResult,
}

/// Result of a single health check
#[derive(Serialize)]
pub struct CheckResult {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    const fn ok() -> Self {
        Self {
            status: "ok",
            message: None,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: "fail",
            message: Some(message.into()),
        }
    }

    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: "unavailable",
            message: Some(message.into()),
        }
    }
}

/// Liveness check: is the service running?
async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        mode: state.relay.mode().as_str(),
    })
}

/// Readiness check: can the relay stage and serve content?
async fn ready(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let download_dir = check_dir(state.relay.stager().dir());
    // Missing static assets or converter degrade media replies but not relaying
    let static_dir = match check_dir(&state.static_dir) {
        CheckResult { status: "ok", .. } => CheckResult::ok(),
        CheckResult { message, .. } => CheckResult::unavailable(message.unwrap_or_default()),
    };
    let converter = if state.relay.converter().is_available() {
        CheckResult::ok()
    } else {
        CheckResult::unavailable("converter not found on PATH")
    };

    let all_ok = download_dir.status == "ok";
    let status = if all_ok { "ok" } else { "degraded" };
    let http_status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(ReadinessResponse {
            status,
            checks: ReadinessChecks {
                download_dir,
                static_dir,
                converter,
            },
        }),
    )
}

/// Check that a directory exists
fn check_dir(path: &std::path::Path) -> CheckResult {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => CheckResult::ok(),
        Ok(_) => CheckResult::fail(format!("{} is not a directory", path.display())),
        Err(e) => CheckResult::fail(format!("{}: {e}", path.display())),
    }
}

/// Build health router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(state)
}
