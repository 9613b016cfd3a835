//! `POST /api/scan`: accepts a scan request, serves it from the in-process
//! result cache when possible, and otherwise drives the orchestrator through
//! the full pipeline.

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use scan_core::error::{Error, ErrorCode};
use scan_core::{ScanMode, ScanRequest, ScanResult};
use scan_orchestrator::CancellationToken;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequestBody {
    pub url: String,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub mode: ScanMode,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    #[serde(flatten)]
    pub result: ScanResult,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_timestamp: Option<DateTime<Utc>>,
}

pub fn scan_routes() -> Router<AppState> {
    Router::new().route("/", post(run_scan))
}

/// Runs one compliance scan.
#[utoipa::path(
    post,
    path = "/api/scan",
    responses(
        (status = 200, description = "Scan completed", body = Object),
        (status = 400, description = "Missing or invalid url", body = Object),
        (status = 500, description = "Scan failed (browser could not be launched)", body = Object),
    ),
    tag = "scan",
)]
pub async fn run_scan(
    State(state): State<AppState>,
    Json(body): Json<ScanRequestBody>,
) -> Result<Json<ScanResponse>, ApiError> {
    if body.url.trim().is_empty() {
        return Err(ApiError::from(Error::new(ErrorCode::MissingRequiredField, "url is required")));
    }
    if url::Url::parse(&body.url).is_err() {
        return Err(ApiError::from(Error::new(ErrorCode::InvalidInput, "url is not a valid, absolute URL")));
    }

    let _permit = state.scan_permits.clone().acquire_owned().await.map_err(|_| {
        ApiError::from(Error::new(ErrorCode::ServiceUnavailable, "scan concurrency limit reached, try again shortly"))
    })?;

    let request = ScanRequest { url: body.url, force_refresh: body.force_refresh, mode: body.mode };
    let cancel = CancellationToken::new();

    let outcome = state.orchestrator.scan(request, cancel).await?;
    let cache_timestamp = outcome.cached.then_some(outcome.result.completed_at);

    Ok(Json(ScanResponse { result: outcome.result, cached: outcome.cached, cache_timestamp }))
}
