//! # Configuration Management System
//!
//! Hierarchical configuration for the scan platform, loaded from multiple
//! sources in order of precedence:
//!
//! 1. **Environment variables** (highest precedence)
//! 2. **Environment-specific TOML files** (e.g. `config/production.toml`)
//! 3. **Default TOML file** (`config/default.toml`) (lowest precedence)
//!
//! ## Usage
//!
//! ```rust
//! use scan_core::Config;
//!
//! let config = Config::load().expect("failed to load configuration");
//! let port = config.server.port;
//! ```
//!
//! ## Environment selection
//!
//! Determined by the `RUN_ENV` environment variable (`development` by
//! default; `testing` and `production` are the other recognized values).

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main configuration structure containing all application settings.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// HTTP server bind address and worker count.
    pub server: ServerConfig,
    /// Browser launch behavior for the Scan Orchestrator.
    pub browser: BrowserConfig,
    /// In-process cache TTLs and janitor cadence.
    pub cache: CacheConfig,
    /// Geo-IP lookup endpoint for data-residency resolution.
    pub geo_ip: GeoIpConfig,
    /// Generative-model client configuration (AI/vision fallbacks).
    pub ai: AiConfig,
    /// Request throttling for the scan endpoint.
    pub rate_limit: RateLimitConfig,
    /// Cross-Origin Resource Sharing policy.
    pub cors: CorsConfig,
    /// Application-level settings.
    pub app: AppConfig,
    /// Prometheus metrics configuration.
    pub metrics: MetricsConfig,
}

/// HTTP server configuration.
///
/// # Example
///
/// ```toml
/// [server]
/// host = "0.0.0.0"
/// port = 3001
/// workers = 4
/// max_concurrent_scans = 8
/// ```
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Upper bound on orchestrator instances running concurrently; bounded
    /// by a semaphore the way the job executor bounds concurrent jobs.
    pub max_concurrent_scans: usize,
}

/// Browser launch configuration for the Scan Orchestrator's Browser Session.
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub no_sandbox: bool,
    pub navigation_timeout_ms: u64,
    pub user_data_dir: Option<String>,
}

/// In-process cache TTLs (Result Cache, geo-IP cache, AI-response cache) and
/// janitor sweep cadence.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub result_ttl_secs: u64,
    pub geo_ip_ttl_secs: u64,
    pub ai_cache_ttl_secs: u64,
    pub janitor_interval_secs: u64,
}

/// Geo-IP resolution endpoint for cross-border data-residency checks.
#[derive(Debug, Deserialize, Clone)]
pub struct GeoIpConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
}

/// Generative-model client configuration used by the AI-HTML fallback and
/// the GPC visual-confirmation audit.
#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl AiConfig {
    /// Resolve the API key from the first configured source, accepting the
    /// historical variants this system's key was shipped under.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            env::var("VITE_API_KEY")
                .or_else(|_| env::var("API_KEY"))
                .or_else(|_| env::var("GEMINI_API_KEY"))
                .ok()
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub log_level: String,
    pub debug_mode: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
    pub namespace: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age: Option<u64>,
    pub allow_credentials: bool,
}

impl Config {
    /// Loads configuration from `config/default.toml`, an environment-specific
    /// overlay, and then environment variables, in that order of precedence.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(Environment::with_prefix("").separator("_"));

        let config = builder.build()?;
        let mut loaded_config: Config = config.try_deserialize()?;

        loaded_config.validate(&environment)?;

        Ok(loaded_config)
    }

    /// Validates the loaded configuration, failing fast on insecure or
    /// internally-inconsistent production settings.
    fn validate(&mut self, environment: &str) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("server.port must be nonzero".to_string()));
        }

        if self.cache.result_ttl_secs == 0 {
            return Err(ConfigError::Message(
                "cache.result_ttl_secs must be greater than zero".to_string(),
            ));
        }

        if environment == "production" {
            self.validate_production_security()?;
        }

        Ok(())
    }

    /// Production-only checks: no permissive CORS, no debug mode, and a
    /// warning (not a hard failure, since the AI fallback is optional per
    /// spec) when AI is enabled without a resolvable key.
    fn validate_production_security(&self) -> Result<(), ConfigError> {
        if self.app.debug_mode {
            return Err(ConfigError::Message(
                "Production deployment must not run with debug_mode enabled".to_string(),
            ));
        }

        for origin in &self.cors.allowed_origins {
            if origin == "*" {
                return Err(ConfigError::Message(
                    "Production deployment must not use a wildcard (*) CORS origin".to_string(),
                ));
            }
        }

        if self.ai.enabled && self.ai.resolve_api_key().is_none() {
            tracing::warn!(
                "AI fallback is enabled but no API key is configured (checked config, VITE_API_KEY, API_KEY, GEMINI_API_KEY); detection will fall back to low-confidence results only"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
                workers: 4,
                max_concurrent_scans: 8,
            },
            browser: BrowserConfig {
                headless: true,
                no_sandbox: false,
                navigation_timeout_ms: 30_000,
                user_data_dir: None,
            },
            cache: CacheConfig {
                result_ttl_secs: 86_400,
                geo_ip_ttl_secs: 86_400,
                ai_cache_ttl_secs: 604_800,
                janitor_interval_secs: 3_600,
            },
            geo_ip: GeoIpConfig {
                endpoint: "http://ip-api.com/json".to_string(),
                timeout_ms: 3_000,
            },
            ai: AiConfig {
                enabled: false,
                api_key: None,
                endpoint: "https://example.invalid".to_string(),
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: 30,
                burst_size: 5,
            },
            cors: CorsConfig {
                allowed_origins: vec!["https://example.com".to_string()],
                allowed_methods: vec!["GET".to_string(), "POST".to_string()],
                allowed_headers: vec!["content-type".to_string()],
                expose_headers: vec![],
                max_age: Some(3600),
                allow_credentials: false,
            },
            app: AppConfig {
                environment: "production".to_string(),
                log_level: "info".to_string(),
                debug_mode: false,
            },
            metrics: MetricsConfig {
                enabled: true,
                port: 9100,
                path: "/metrics".to_string(),
                namespace: "scan".to_string(),
            },
        }
    }

    #[test]
    fn production_rejects_wildcard_cors() {
        let mut config = base_config();
        config.cors.allowed_origins = vec!["*".to_string()];
        assert!(config.validate("production").is_err());
    }

    #[test]
    fn production_rejects_debug_mode() {
        let mut config = base_config();
        config.app.debug_mode = true;
        assert!(config.validate("production").is_err());
    }

    #[test]
    fn development_allows_debug_mode() {
        let mut config = base_config();
        config.app.debug_mode = true;
        assert!(config.validate("development").is_ok());
    }

    #[test]
    fn ai_key_resolution_prefers_configured_value() {
        let mut config = base_config();
        config.ai.api_key = Some("configured-key".to_string());
        assert_eq!(config.ai.resolve_api_key().as_deref(), Some("configured-key"));
    }
}
