//! # Error Handling Framework
//!
//! Structured error management for the scan platform, shared by every crate
//! in the workspace.
//!
//! ## Core Features
//!
//! - **Structured Error Types**: categorized error codes for consistent handling
//! - **Rich Context**: request context and error metadata for debugging
//! - **Severity Classification**: appropriate logging/response behavior per error
//! - **Metrics Integration**: error rate tracking for alerting
//! - **Environment-Aware Responses**: production responses never leak internals
//!
//! ## Error Categories
//!
//! - **Browser**: launch, navigation, and capture failures
//! - **Consent**: banner location/click failures
//! - **Detection**: AI/vision fallback unavailability
//! - **DataResidency**: geo-IP lookup failures
//! - **Validation**: request input errors
//! - **Cache**: result cache read/write errors
//! - **Certificate**: verification mismatches and expiry
//! - **Cancellation**: cooperative scan cancellation
//!
//! ## Usage
//!
//! ```rust
//! use scan_core::error::{Error, ErrorCode, Result};
//!
//! fn validate_url(url: &str) -> Result<()> {
//!     if url.is_empty() {
//!         return Err(Error::new(ErrorCode::MissingRequiredField, "url is required"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod codes;
pub mod context;
pub mod framework;
pub mod metrics;

pub use codes::ErrorCode;
pub use context::{ErrorContext, RequestContext};
pub use framework::{Error, ErrorCategory, ErrorSeverity, Result};
pub use metrics::ErrorMetrics;
