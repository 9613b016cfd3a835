//! `GET /api/cache/stats`: a point-in-time view of the result cache, for
//! operators checking whether the cache is doing anything useful.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn cache_routes() -> Router<AppState> {
    Router::new().route("/stats", get(cache_stats))
}

#[utoipa::path(
    get,
    path = "/api/cache/stats",
    responses((status = 200, description = "Result cache snapshot", body = Object)),
    tag = "cache",
)]
pub async fn cache_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.orchestrator.result_cache();
    let urls = cache.keys();
    let total_cached = urls.len();
    let cached_urls: Vec<String> = urls.into_iter().take(10).collect();

    Json(json!({
        "cacheSize": total_cached,
        "cachedUrls": cached_urls,
        "totalCached": total_cached,
    }))
}
