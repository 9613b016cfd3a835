//! Health monitoring endpoints, used by load balancers and container
//! orchestration to decide whether this instance should receive traffic.
//!
//! - `GET /health` is a liveness probe: always 200 if the process can answer.
//! - `GET /ready` is a readiness probe: 503 until the orchestrator can
//!   actually launch a browser context, since that's the one dependency this
//!   system has (there is no database or cache service to ping).

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use tracing::error;

use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is alive", body = Object)),
    tag = "health"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}

#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready", body = Object),
        (status = 503, description = "Service is not ready", body = Object)
    ),
    tag = "health"
)]
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let browser_healthy = match state.orchestrator.check_browser().await {
        Ok(()) => true,
        Err(e) => {
            error!("Browser readiness check failed: {}", e);
            false
        }
    };

    let status = if browser_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(json!({
            "ready": browser_healthy,
            "checks": {
                "browser": browser_healthy,
            }
        })),
    )
}
