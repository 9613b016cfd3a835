use crate::api_middleware::rate_limit::RateLimiter;
use scan_core::Config;
use scan_orchestrator::ScanOrchestrator;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared application state, built once at startup and cloned (cheaply,
/// behind `Arc`) into every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub orchestrator: Arc<ScanOrchestrator>,
    /// Bounds the number of scans running concurrently at
    /// `config.server.max_concurrent_scans`, the way the job executor bounds
    /// concurrent jobs with a semaphore.
    pub scan_permits: Arc<Semaphore>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<ScanOrchestrator>) -> Self {
        let scan_permits = Arc::new(Semaphore::new(config.server.max_concurrent_scans));
        let rate_limiter = RateLimiter::new(config.rate_limit.requests_per_minute, config.rate_limit.burst_size);
        Self { config, orchestrator, scan_permits, rate_limiter }
    }
}
