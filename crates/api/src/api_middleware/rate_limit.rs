//! Token-bucket throttling for the scan endpoint — the one surface worth
//! rate limiting, per `RateLimitConfig`. Keyed by client IP (falls back to a
//! shared bucket when no IP can be determined, e.g. local testing).

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::state::AppState;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Shared across every request; cloned cheaply behind `Arc`.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<DashMap<String, Bucket>>,
    refill_per_sec: f64,
    capacity: f64,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, burst_size: u32) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            refill_per_sec: requests_per_minute as f64 / 60.0,
            capacity: burst_size.max(1) as f64,
        }
    }

    /// Consumes one token for `key`, returning `false` if the bucket is dry.
    fn try_acquire(&self, key: &str) -> bool {
        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: Instant::now(),
        });

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub async fn rate_limit_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = request
        .extensions()
        .get::<scan_core::error::RequestContext>()
        .and_then(|ctx| ctx.source_ip.clone())
        .unwrap_or_else(|| "unknown".to_string());

    if state.rate_limiter.try_acquire(&key) {
        next.run(request).await
    } else {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": {
                    "code": "RATE_LIMIT_EXCEEDED",
                    "message": "Too many scan requests; slow down and try again."
                }
            })),
        )
            .into_response()
    }
}
