//! Shared foundation for the compliance-scan platform: domain types, the
//! in-process TTL cache, structured error handling, configuration, audit
//! logging, metrics, and the CMP/TMS/regulatory signature tables.

pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod signatures;
pub mod types;
pub mod utils;

pub use audit::{AuditBackend, AuditContext, AuditEvent, AuditEventBuilder, AuditLogger, EventOutcome, EventSeverity, EventType};
pub use cache::{CacheStats, TtlCache};
pub use config::Config;
pub use error::{Error, ErrorCategory, ErrorCode, ErrorContext, ErrorMetrics, ErrorSeverity, RequestContext, Result};
pub use metrics::{MetricsRegistry, MetricsService};
pub use types::{
    normalize_url, Adequacy, Article13Compliance, AuditFinding, CacheEntry, CaptureSource,
    CapturedRequest, CertificateEvidence, CertificateFindings, CertificateMetadata,
    CertificateSubject, CertificateType, CertificateViolation, ComplianceCertificate, Confidence,
    ConsentState, ConsentTimeline, DataResidencyInfo, DataType, DetectionEvidence, DetectionResult,
    EvidenceKind, FindingSeverity, FineEstimate, PerformanceMetrics, PourScores, RequestKind,
    RequestLog, RequestStatus, ScanMode, ScanRequest, ScanResult, ScreenshotHashes, ScreenshotRecord,
};

pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
