use serde::{Deserialize, Serialize};
use std::fmt;

/// Standardized error codes for the scan platform.
/// Business-agnostic technical categories, grouped by range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General System Errors (1000-1999)
    InternalError = 1000,
    ConfigurationError = 1001,
    ServiceUnavailable = 1002,
    Timeout = 1003,

    // Browser & Capture Errors (2000-2999)
    BrowserLaunchFailed = 2000,
    NavTimeout = 2001,
    NavAborted = 2002,
    CaptureContextDestroyed = 2003,

    // Consent Interaction Errors (3000-3999)
    BannerNotFound = 3000,
    BannerNotClickable = 3001,

    // Detection Errors (4000-4999)
    AiFallbackUnavailable = 4000,
    VisionFallbackUnavailable = 4001,

    // Data Residency Errors (5000-5999)
    GeoLookupFailed = 5000,

    // Validation Errors (6000-6999)
    ValidationFailed = 6000,
    InvalidInput = 6001,
    MissingRequiredField = 6002,

    // Cache Errors (7000-7999)
    CacheMiss = 7000,
    CacheError = 7001,

    // Certificate Errors (8000-8999)
    VerificationMismatch = 8000,
    CertificateExpired = 8001,

    // Cancellation (9000-9999)
    ScanCancelled = 9000,
}

impl ErrorCode {
    /// HTTP status this error maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InternalError
            | ErrorCode::ConfigurationError
            | ErrorCode::BrowserLaunchFailed
            | ErrorCode::VerificationMismatch => 500,

            ErrorCode::ServiceUnavailable => 503,

            ErrorCode::Timeout | ErrorCode::NavTimeout => 408,

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField => 400,

            ErrorCode::NavAborted
            | ErrorCode::CaptureContextDestroyed
            | ErrorCode::BannerNotFound
            | ErrorCode::BannerNotClickable
            | ErrorCode::AiFallbackUnavailable
            | ErrorCode::VisionFallbackUnavailable
            | ErrorCode::GeoLookupFailed => 200, // recoverable, never surfaces as a failed HTTP call

            ErrorCode::CacheMiss => 404,
            ErrorCode::CacheError => 500,

            ErrorCode::CertificateExpired => 410,
            ErrorCode::ScanCancelled => 499,
        }
    }

    /// Category used for metrics and logging.
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::InternalError
            | ErrorCode::ConfigurationError
            | ErrorCode::ServiceUnavailable
            | ErrorCode::Timeout => "system",

            ErrorCode::BrowserLaunchFailed
            | ErrorCode::NavTimeout
            | ErrorCode::NavAborted
            | ErrorCode::CaptureContextDestroyed => "browser",

            ErrorCode::BannerNotFound | ErrorCode::BannerNotClickable => "consent",

            ErrorCode::AiFallbackUnavailable | ErrorCode::VisionFallbackUnavailable => "detection",

            ErrorCode::GeoLookupFailed => "data_residency",

            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField => "validation",

            ErrorCode::CacheMiss | ErrorCode::CacheError => "cache",

            ErrorCode::VerificationMismatch | ErrorCode::CertificateExpired => "certificate",

            ErrorCode::ScanCancelled => "cancellation",
        }
    }

    /// Fatal codes abort the scan outright; everything else degrades to a
    /// partial result carrying a `scan_note`.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorCode::BrowserLaunchFailed)
    }

    /// Whether the underlying operation is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::ServiceUnavailable | ErrorCode::Timeout | ErrorCode::GeoLookupFailed
        )
    }

    /// Whether this should be logged at error level vs. a quieter level.
    pub fn should_log_as_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::InternalError
                | ErrorCode::ConfigurationError
                | ErrorCode::BrowserLaunchFailed
                | ErrorCode::VerificationMismatch
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
