use super::{ErrorCode, ErrorContext};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Low priority errors that don't affect system functionality
    Low,
    /// Medium priority errors that may degrade performance
    Medium,
    /// High priority errors that affect core functionality
    High,
    /// Critical errors that require immediate attention
    Critical,
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    System,
    Browser,
    Consent,
    Detection,
    DataResidency,
    Validation,
    Cache,
    Certificate,
    Cancellation,
}

/// Main error type for the scan platform
#[derive(Debug, ThisError, Clone)]
pub struct Error {
    /// Standardized error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional detailed description
    pub details: Option<String>,
    /// Error context for debugging
    pub context: ErrorContext,
    /// Error severity
    pub severity: ErrorSeverity,
    /// Optional cause chain
    pub cause: Option<Box<Error>>,
}

impl Error {
    /// Create a new error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            context: ErrorContext::new(),
            severity: Self::default_severity_for_code(code),
            cause: None,
        }
    }

    /// Create error with details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set error context
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    /// Set error severity
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Chain with another error as cause
    pub fn with_cause(mut self, cause: Error) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Add trace to context
    pub fn add_trace(mut self, trace: impl Into<String>) -> Self {
        self.context = self.context.add_trace(trace.into());
        self
    }

    /// Add metadata to context
    pub fn add_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.add_metadata(key.into(), value);
        self
    }

    /// Get HTTP status code
    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self.code.category() {
            "system" => ErrorCategory::System,
            "browser" => ErrorCategory::Browser,
            "consent" => ErrorCategory::Consent,
            "detection" => ErrorCategory::Detection,
            "data_residency" => ErrorCategory::DataResidency,
            "validation" => ErrorCategory::Validation,
            "cache" => ErrorCategory::Cache,
            "certificate" => ErrorCategory::Certificate,
            "cancellation" => ErrorCategory::Cancellation,
            _ => ErrorCategory::System,
        }
    }

    /// Whether this error should abort the whole scan (fatal) rather than
    /// degrade to a partial result.
    pub fn is_fatal(&self) -> bool {
        self.code.is_fatal()
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Check if should be logged as error level
    pub fn should_log_as_error(&self) -> bool {
        self.code.should_log_as_error() || matches!(self.severity, ErrorSeverity::High | ErrorSeverity::Critical)
    }

    /// Convert to JSON for API responses (sanitized for security)
    pub fn to_api_response(&self) -> serde_json::Value {
        self.to_api_response_with_environment("development")
    }

    /// Convert to JSON for API responses with environment-specific sanitization
    pub fn to_api_response_with_environment(&self, environment: &str) -> serde_json::Value {
        let is_production = environment == "production";

        let (message, details) = if is_production {
            self.sanitize_for_production()
        } else {
            (self.message.clone(), self.details.clone())
        };

        serde_json::json!({
            "error": {
                "code": self.code,
                "message": message,
                "details": if is_production { None } else { details },
                "error_id": self.context.error_id,
                "request_id": self.context.request_id,
                "timestamp": self.context.timestamp
            }
        })
    }

    /// Convert to full debug JSON (for internal logging only, never for API responses)
    pub fn to_debug_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
                "details": self.details,
                "context": self.context,
                "severity": self.severity,
                "cause": self.cause.as_ref().map(|c| c.to_debug_json())
            }
        })
    }

    /// Sanitize error messages and details for production API responses
    fn sanitize_for_production(&self) -> (String, Option<String>) {
        let sanitized_message = match self.code {
            ErrorCode::ValidationFailed => "Input validation failed".to_string(),
            ErrorCode::InvalidInput => "Invalid input provided".to_string(),
            ErrorCode::MissingRequiredField => "Required field missing".to_string(),

            ErrorCode::CacheMiss => "No cached result for this URL".to_string(),

            ErrorCode::BrowserLaunchFailed
            | ErrorCode::InternalError
            | ErrorCode::ConfigurationError
            | ErrorCode::ServiceUnavailable
            | ErrorCode::CacheError
            | ErrorCode::VerificationMismatch => {
                "An internal error occurred. Please try again later".to_string()
            }

            _ => "An error occurred. Please try again later".to_string(),
        };

        (sanitized_message, None)
    }

    /// Get default severity for error code
    fn default_severity_for_code(code: ErrorCode) -> ErrorSeverity {
        match code {
            ErrorCode::ValidationFailed
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField
            | ErrorCode::CacheMiss
            | ErrorCode::BannerNotFound
            | ErrorCode::BannerNotClickable
            | ErrorCode::NavAborted
            | ErrorCode::CaptureContextDestroyed
            | ErrorCode::GeoLookupFailed
            | ErrorCode::AiFallbackUnavailable
            | ErrorCode::VisionFallbackUnavailable
            | ErrorCode::ScanCancelled => ErrorSeverity::Low,

            ErrorCode::NavTimeout | ErrorCode::Timeout | ErrorCode::ServiceUnavailable => {
                ErrorSeverity::Medium
            }

            ErrorCode::CacheError | ErrorCode::CertificateExpired => ErrorSeverity::High,

            ErrorCode::InternalError
            | ErrorCode::ConfigurationError
            | ErrorCode::BrowserLaunchFailed
            | ErrorCode::VerificationMismatch => ErrorSeverity::Critical,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct ErrorSer {
            code: ErrorCode,
            message: String,
            details: Option<String>,
            context: ErrorContext,
            severity: ErrorSeverity,
        }

        let error_ser = ErrorSer {
            code: self.code,
            message: self.message.clone(),
            details: self.details.clone(),
            context: self.context.clone(),
            severity: self.severity,
        };

        error_ser.serialize(serializer)
    }
}

// Convenience constructors for common errors
impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn browser_launch_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BrowserLaunchFailed, message)
    }

    pub fn cache_miss(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CacheMiss, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ScanCancelled, message)
    }
}

// Implement From for common error types
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
            .add_trace("serde_json::Error conversion")
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::new(ErrorCode::ConfigurationError, err.to_string())
            .add_trace("config::ConfigError conversion")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_vs_recoverable() {
        assert!(Error::browser_launch_failed("boom").is_fatal());
        assert!(!Error::new(ErrorCode::NavTimeout, "slow").is_fatal());
    }

    #[test]
    fn production_sanitization_hides_details() {
        let err = Error::internal("pool exhausted: 400 connections").with_details("leak at line 12");
        let response = err.to_api_response_with_environment("production");
        let message = response["error"]["message"].as_str().unwrap();
        assert!(!message.contains("pool exhausted"));
        assert!(response["error"]["details"].is_null());
    }

    #[test]
    fn development_keeps_message() {
        let err = Error::internal("pool exhausted");
        let response = err.to_api_response_with_environment("development");
        assert_eq!(response["error"]["message"], "pool exhausted");
    }
}
