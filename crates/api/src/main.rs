//! # Compliance Scan Orchestrator API Server
//!
//! The HTTP front door for the compliance scan platform, built with Axum.
//!
//! ## Middleware Stack
//!
//! Requests flow through middleware in this order:
//! 1. **Security Headers**: HSTS, CSP, X-Frame-Options
//! 2. **Request ID**: unique tracking for request tracing
//! 3. **Tracing**: structured logging with correlation IDs
//! 4. **Compression**: gzip/brotli response compression
//! 5. **CORS**: cross-origin resource sharing policies
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin scan-server
//! ```
//!
//! - **API**: http://localhost:3001/api/
//! - **Health**: http://localhost:3001/health
//! - **Docs**: http://localhost:3001/swagger-ui

use axum::{http::StatusCode, response::IntoResponse, Router, Json};
use scan_core::config::CorsConfig;
use scan_core::{AuditLogger, Config};
use scan_orchestrator::ScanOrchestrator;
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use axum::http::{HeaderName, HeaderValue, Method};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api_middleware;
mod error;
mod error_handler;
mod handlers;
mod health;
mod state;

use crate::{
    handlers::{cache, scan},
    state::AppState,
};

/// Builds a CORS layer from configuration settings.
fn build_cors_layer(cors_config: &CorsConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let mut cors = CorsLayer::new();

    if cors_config.allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            cors_config.allowed_origins.iter().map(|origin| origin.parse()).collect();
        cors = cors.allow_origin(origins?);
    }

    if cors_config.allowed_methods.contains(&"*".to_string()) {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Result<Vec<Method>, _> =
            cors_config.allowed_methods.iter().map(|method| method.parse()).collect();
        cors = cors.allow_methods(methods?);
    }

    if cors_config.allowed_headers.contains(&"*".to_string()) {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Result<Vec<HeaderName>, _> =
            cors_config.allowed_headers.iter().map(|header| header.parse()).collect();
        cors = cors.allow_headers(headers?);
    }

    if !cors_config.expose_headers.is_empty() {
        let expose_headers: Result<Vec<HeaderName>, _> =
            cors_config.expose_headers.iter().map(|header| header.parse()).collect();
        cors = cors.expose_headers(expose_headers?);
    }

    cors = cors.allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Compliance Scan Orchestrator API...");

    let config = Config::load()?;
    info!("Configuration loaded successfully");

    let audit_logger = AuditLogger::new(
        Arc::new(scan_core::audit::TracingAuditBackend),
        Arc::new(scan_core::error::ErrorMetrics::new()),
    );
    let orchestrator = Arc::new(ScanOrchestrator::new(&config, audit_logger));
    info!("Scan orchestrator initialized");

    let app_state = AppState::new(config.clone(), orchestrator);

    let app = create_app(app_state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn create_app(state: AppState) -> Result<Router, Box<dyn std::error::Error>> {
    #[derive(OpenApi)]
    #[openapi(
        paths(health::health_check, health::readiness_check, scan::run_scan, cache::cache_stats),
        components(schemas()),
        tags(
            (name = "health", description = "Health check endpoints"),
            (name = "scan", description = "Compliance scan execution"),
            (name = "cache", description = "Result cache introspection"),
        )
    )]
    struct ApiDoc;

    let cors_layer = build_cors_layer(&state.config.cors)?;

    let router = Router::new()
        .nest("/api", create_api_routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", axum::routing::get(health::health_check))
        .route("/ready", axum::routing::get(health::readiness_check))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(api_middleware::security_headers::security_headers_middleware))
                .layer(axum::middleware::from_fn(api_middleware::request_id::request_id_middleware))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CompressionLayer::new())
                .layer(cors_layer),
        )
        .with_state(state)
        .fallback(handler_404);

    Ok(router)
}

/// Builds the `/api` route tree. The scan endpoint alone carries the
/// rate-limiter, since it is the one surface expensive enough to throttle.
fn create_api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest(
            "/scan",
            scan::scan_routes().route_layer(axum::middleware::from_fn_with_state(
                state,
                api_middleware::rate_limit::rate_limit_middleware,
            )),
        )
        .nest("/cache", cache::cache_routes())
}

async fn handler_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": "Resource not found" })))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scan_api=debug,scan_orchestrator=debug,scan_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
