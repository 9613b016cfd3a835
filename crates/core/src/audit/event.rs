use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Severity levels for audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

/// Scan-lifecycle event types, recorded as the orchestrator moves a scan
/// through its phases. Distinct from `types::AuditFinding`, which is the
/// GDPR/CCPA compliance-finding domain type this event log is not about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    ScanAccepted,
    ScanStarted,
    PhaseTransition,
    BrowserLaunched,
    BrowserLaunchFailed,
    NavigationCompleted,
    ConsentBannerDetected,
    ConsentBannerNotFound,
    ConsentInteractionAttempted,
    GpcAssertionApplied,
    CaptureLayerAttached,
    RequestMerged,
    DetectionCompleted,
    AiFallbackInvoked,
    AiFallbackFailed,
    ViolationDetected,
    AuditFindingRecorded,
    ScoreComputed,
    CertificateIssued,
    CacheHit,
    CacheMiss,
    ScanCompleted,
    ScanFailed,
    ScanCancelled,

    /// Escape hatch for extensions that don't warrant a dedicated variant.
    Custom(String),
}

/// Core audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier for this event.
    pub id: String,
    pub event_type: EventType,
    pub severity: EventSeverity,
    pub timestamp: DateTime<Utc>,
    /// The scan this event belongs to, when applicable.
    pub scan_id: Option<String>,
    /// Correlates with the HTTP request that triggered the scan.
    pub request_id: Option<String>,
    /// The domain or resource this event concerns (e.g. a request's host).
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
    pub description: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub previous_values: Option<serde_json::Value>,
    pub new_values: Option<serde_json::Value>,
    pub outcome: EventOutcome,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    Success,
    Failure,
    Partial,
    Unknown,
}

impl std::fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventOutcome::Success => write!(f, "success"),
            EventOutcome::Failure => write!(f, "failure"),
            EventOutcome::Partial => write!(f, "partial"),
            EventOutcome::Unknown => write!(f, "unknown"),
        }
    }
}

/// Builder for creating audit events.
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    pub fn new(event_type: EventType, description: impl Into<String>) -> Self {
        Self {
            event: AuditEvent {
                id: Uuid::new_v4().to_string(),
                event_type,
                severity: EventSeverity::Info,
                timestamp: Utc::now(),
                scan_id: None,
                request_id: None,
                resource_type: None,
                resource_id: None,
                source_ip: None,
                user_agent: None,
                description: description.into(),
                metadata: HashMap::new(),
                previous_values: None,
                new_values: None,
                outcome: EventOutcome::Success,
                tags: Vec::new(),
            },
        }
    }

    pub fn severity(mut self, severity: EventSeverity) -> Self {
        self.event.severity = severity;
        self
    }

    pub fn scan_id(mut self, scan_id: impl Into<String>) -> Self {
        self.event.scan_id = Some(scan_id.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.event.request_id = Some(request_id.into());
        self
    }

    pub fn resource(mut self, resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        self.event.resource_type = Some(resource_type.into());
        self.event.resource_id = Some(resource_id.into());
        self
    }

    pub fn source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.event.source_ip = Some(source_ip.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.event.user_agent = Some(user_agent.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.event.metadata.insert(key.into(), value);
        self
    }

    pub fn previous_values(mut self, values: serde_json::Value) -> Self {
        self.event.previous_values = Some(values);
        self
    }

    pub fn new_values(mut self, values: serde_json::Value) -> Self {
        self.event.new_values = Some(values);
        self
    }

    pub fn outcome(mut self, outcome: EventOutcome) -> Self {
        self.event.outcome = outcome;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.event.tags.push(tag.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.event.tags.extend(tags);
        self
    }

    pub fn build(self) -> AuditEvent {
        self.event
    }
}

impl AuditEvent {
    pub fn builder(event_type: EventType, description: impl Into<String>) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type, description)
    }

    pub fn should_alert(&self) -> bool {
        matches!(self.severity, EventSeverity::Critical)
            || matches!(self.outcome, EventOutcome::Failure)
            || matches!(
                self.event_type,
                EventType::BrowserLaunchFailed | EventType::AiFallbackFailed | EventType::ScanFailed
            )
    }

    pub fn category(&self) -> &'static str {
        match &self.event_type {
            EventType::ScanAccepted | EventType::ScanStarted | EventType::PhaseTransition
            | EventType::ScanCompleted | EventType::ScanFailed | EventType::ScanCancelled => "lifecycle",

            EventType::BrowserLaunched | EventType::BrowserLaunchFailed | EventType::NavigationCompleted
            | EventType::CaptureLayerAttached | EventType::RequestMerged => "browser",

            EventType::ConsentBannerDetected | EventType::ConsentBannerNotFound
            | EventType::ConsentInteractionAttempted | EventType::GpcAssertionApplied => "consent",

            EventType::DetectionCompleted | EventType::AiFallbackInvoked | EventType::AiFallbackFailed => {
                "detection"
            }

            EventType::ViolationDetected | EventType::AuditFindingRecorded | EventType::ScoreComputed
            | EventType::CertificateIssued => "compliance",

            EventType::CacheHit | EventType::CacheMiss => "cache",

            EventType::Custom(_) => "custom",
        }
    }

    pub fn to_log_format(&self) -> String {
        format!(
            "[{}] {} on {}: {}",
            self.severity,
            self.event_type,
            self.resource_type.as_deref().unwrap_or("scan"),
            self.description
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Custom(name) => write!(f, "CUSTOM_{}", name.to_uppercase()),
            _ => write!(f, "{:?}", self),
        }
    }
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_launch_failure_alerts() {
        let event = AuditEvent::builder(EventType::BrowserLaunchFailed, "chrome failed to start")
            .outcome(EventOutcome::Failure)
            .build();
        assert!(event.should_alert());
    }

    #[test]
    fn cache_hit_does_not_alert() {
        let event = AuditEvent::builder(EventType::CacheHit, "result cache hit").build();
        assert!(!event.should_alert());
    }

    #[test]
    fn category_groups_consent_events() {
        let event = AuditEvent::builder(EventType::ConsentBannerDetected, "banner found").build();
        assert_eq!(event.category(), "consent");
    }
}
