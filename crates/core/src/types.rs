//! Shared domain types produced and consumed across the scan pipeline:
//! request/result shapes, the capture/consent timeline, detection evidence,
//! audit findings, and the terminal `ScanResult` + `ComplianceCertificate`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// The mode a scan runs in. `Gpc` asserts the `Sec-GPC: 1` signal and skips
/// the consent-accept click in favor of observing an opt-out acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    Standard,
    Gpc,
}

impl Default for ScanMode {
    fn default() -> Self {
        ScanMode::Standard
    }
}

/// Immutable for the scan lifetime once accepted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub url: String,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub mode: ScanMode,
}

impl ScanRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            force_refresh: false,
            mode: ScanMode::Standard,
        }
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Which of the four interception layers produced a `CapturedRequest`.
/// Ordering matters: it is the tie-break priority when two layers observe
/// the same `(url, t_seen bucket)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    Transport = 0,
    InPage = 1,
    ServiceWorker = 2,
    Rewrite = 3,
}

/// A request observed by any capture layer, before consent-state tagging.
/// Lives only within one scan; never persisted past the scan's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedRequest {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body_snippet: Option<Vec<u8>>,
    pub resource_type: String,
    pub t_seen: Duration,
    pub source: CaptureSource,
}

impl CapturedRequest {
    /// Merge key per the four-layer dedup policy: the normalized URL and a
    /// 50ms bucket of `t_seen`. Earliest `t_seen` and richest source wins
    /// among records sharing a key.
    pub fn merge_key(&self) -> (String, u128) {
        (normalize_url(&self.url), self.t_seen.as_millis() / 50)
    }
}

/// Exactly one per scan; mutated by orchestrator phases as consent is
/// observed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentTimeline {
    pub nav_start: DateTime<Utc>,
    pub banner_seen: Option<DateTime<Utc>>,
    pub consent_click_at: Option<DateTime<Utc>>,
    pub post_consent_idle_at: Option<DateTime<Utc>>,
    pub mode: ScanMode,
}

impl ConsentTimeline {
    pub fn new(nav_start: DateTime<Utc>, mode: ScanMode) -> Self {
        Self {
            nav_start,
            banner_seen: None,
            consent_click_at: None,
            post_consent_idle_at: None,
            mode,
        }
    }

    /// `pre` iff no click was ever observed, or `t_seen` precedes it.
    pub fn classify(&self, t_seen: DateTime<Utc>) -> ConsentState {
        match self.consent_click_at {
            Some(click_at) if t_seen >= click_at => ConsentState::Post,
            _ => ConsentState::Pre,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Pixel,
    Script,
    Xhr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentState {
    Pre,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Allowed,
    Violation,
    GpcIgnored,
    UiBias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Identifier,
    Behavioral,
    Location,
    Pii,
    Device,
}

/// A request as it appears in the final report: merged, consent-tagged, and
/// enriched with data-residency information where resolvable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLog {
    pub id: Uuid,
    pub domain: String,
    pub url: String,
    pub t_seen: DateTime<Utc>,
    pub kind: RequestKind,
    pub consent_state: ConsentState,
    pub status: RequestStatus,
    pub data_types: Vec<DataType>,
    pub parameters: Option<serde_json::Value>,
    pub decoded_payload: Option<String>,
    pub data_residency: Option<DataResidencyInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Network,
    Content,
    Dom,
    InlineScript,
    Ai,
}

/// A single piece of evidence accumulated toward a CMP/TMS candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvidence {
    pub kind: EvidenceKind,
    pub pattern: String,
    pub locator: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Two instances exist per scan: one for CMP detection, one for TMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detected: Vec<String>,
    pub primary: Option<String>,
    pub confidence: Confidence,
    pub evidence: Vec<DetectionEvidence>,
}

impl DetectionResult {
    pub fn empty() -> Self {
        Self {
            detected: Vec::new(),
            primary: None,
            confidence: Confidence::Low,
            evidence: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FindingSeverity {
    Minor,
    Major,
    Critical,
}

/// The seven GDPR/CCPA/accessibility finding types, each carrying the
/// regulatory codes it maps to so the certificate builder can expand
/// citations without re-deriving them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AuditFinding {
    ParityOfEase {
        severity: FindingSeverity,
        reject_reachable: bool,
        clicks_to_reject: Option<u32>,
        regulatory_codes: Vec<String>,
    },
    Granularity {
        severity: FindingSeverity,
        pre_ticked_count: u32,
        regulatory_codes: Vec<String>,
    },
    Transparency {
        severity: FindingSeverity,
        article13_compliance: Article13Compliance,
        regulatory_codes: Vec<String>,
    },
    Accessibility {
        severity: FindingSeverity,
        pour_scores: PourScores,
        regulatory_codes: Vec<String>,
    },
    GpcVisual {
        severity: FindingSeverity,
        acknowledged: bool,
        regulatory_codes: Vec<String>,
    },
    UiSymmetry {
        severity: FindingSeverity,
        size_ratio: f64,
        regulatory_codes: Vec<String>,
    },
    DataResidency {
        severity: FindingSeverity,
        info: DataResidencyInfo,
        regulatory_codes: Vec<String>,
    },
}

impl AuditFinding {
    pub fn severity(&self) -> FindingSeverity {
        match self {
            AuditFinding::ParityOfEase { severity, .. }
            | AuditFinding::Granularity { severity, .. }
            | AuditFinding::Transparency { severity, .. }
            | AuditFinding::Accessibility { severity, .. }
            | AuditFinding::GpcVisual { severity, .. }
            | AuditFinding::UiSymmetry { severity, .. }
            | AuditFinding::DataResidency { severity, .. } => *severity,
        }
    }

    pub fn regulatory_codes(&self) -> &[String] {
        match self {
            AuditFinding::ParityOfEase { regulatory_codes, .. }
            | AuditFinding::Granularity { regulatory_codes, .. }
            | AuditFinding::Transparency { regulatory_codes, .. }
            | AuditFinding::Accessibility { regulatory_codes, .. }
            | AuditFinding::GpcVisual { regulatory_codes, .. }
            | AuditFinding::UiSymmetry { regulatory_codes, .. }
            | AuditFinding::DataResidency { regulatory_codes, .. } => regulatory_codes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Article13Compliance {
    Full,
    Partial,
    None,
}

/// Per-principle POUR scores in `[0, 100]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PourScores {
    pub perceivable: u8,
    pub operable: u8,
    pub understandable: u8,
    pub robust: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Adequacy {
    Eea,
    Adequate,
    NonAdequate,
    Unknown,
}

/// Cached per-domain across scans; resolution order is vendor map, then geo
/// lookup, then `Unknown`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResidencyInfo {
    pub request_domain: String,
    pub resolved_ip: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub adequacy: Adequacy,
}

/// Estimated regulatory fine exposure, in euros. `min == max == 0` iff the
/// scan found zero violations — a compliance certificate never implies
/// exposure for a clean site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineEstimate {
    pub min: u64,
    pub max: u64,
}

/// Per-phase wall-clock durations, recorded at phase boundaries; their sum
/// equals total scan wall-clock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub phases: HashMap<String, u64>,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotRecord {
    pub png_base64: String,
    pub sha256_hex: String,
    pub captured_at: DateTime<Utc>,
}

/// The terminal artifact of one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: Uuid,
    pub url: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub risk_score: u8,
    pub risk_grade: char,
    pub violations_count: u32,
    pub fine_estimate: FineEstimate,
    pub screenshot_before: Option<ScreenshotRecord>,
    pub screenshot_after: Option<ScreenshotRecord>,
    pub cmp: DetectionResult,
    pub tms: DetectionResult,
    pub data_layers: Vec<String>,
    pub performance_metrics: PerformanceMetrics,
    pub requests: Vec<RequestLog>,
    pub gdpr_audit: Vec<AuditFinding>,
    pub site_violations: Vec<String>,
    pub data_residency_violations: Vec<DataResidencyInfo>,
    pub certificate: Option<ComplianceCertificate>,
    pub scan_note: Option<String>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateType {
    ScanSummary,
    EvidenceChain,
    Attestation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateMetadata {
    pub cert_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub generator: String,
    pub sig_alg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateSubject {
    pub url: String,
    pub scan_id: Uuid,
    pub scan_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateViolation {
    pub code: String,
    pub article: String,
    pub severity: FindingSeverity,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateFindings {
    pub score: u8,
    pub risk_level: char,
    pub violations: Vec<CertificateViolation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotHashes {
    pub before: Option<String>,
    pub before_captured_at: Option<DateTime<Utc>>,
    pub after: Option<String>,
    pub after_captured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateEvidence {
    pub screenshot_hashes: ScreenshotHashes,
    pub request_log_hash: String,
    pub audit_trail_hash: String,
}

/// The tamper-evident JSON artifact; see `scan-score::certificate` for
/// construction and verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceCertificate {
    pub version: String,
    #[serde(rename = "type")]
    pub cert_type: CertificateType,
    pub metadata: CertificateMetadata,
    pub subject: CertificateSubject,
    pub findings: CertificateFindings,
    pub evidence: CertificateEvidence,
    pub signature: Option<String>,
}

/// A cached scan result with TTL bookkeeping, keyed by normalized URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        let stored_at = Utc::now();
        Self {
            data,
            stored_at,
            expires_at: stored_at + chrono::Duration::from_std(ttl).unwrap_or_default(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// `scheme + "//" + host + path(without trailing slash) + query`; falls back
/// to the raw string if the URL fails to parse. Used identically for reads
/// and writes so cache keys line up exactly.
pub fn normalize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => {
            let mut path = parsed.path().trim_end_matches('/').to_string();
            if path.is_empty() {
                path.push_str("");
            }
            let query = parsed
                .query()
                .map(|q| format!("?{}", q))
                .unwrap_or_default();
            format!("{}//{}{}{}", parsed.scheme(), parsed.host_str().unwrap_or(""), path, query)
        }
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_slash() {
        assert_eq!(
            normalize_url("https://example.com/"),
            normalize_url("https://example.com")
        );
    }

    #[test]
    fn normalize_keeps_query() {
        assert_eq!(
            normalize_url("https://example.com/page?a=1"),
            "https://example.com/page?a=1"
        );
    }

    #[test]
    fn normalize_falls_back_on_unparsable_url() {
        assert_eq!(normalize_url("not a url"), "not a url");
    }

    #[test]
    fn consent_timeline_classifies_pre_when_no_click_observed() {
        let timeline = ConsentTimeline::new(Utc::now(), ScanMode::Standard);
        assert_eq!(timeline.classify(Utc::now()), ConsentState::Pre);
    }

    #[test]
    fn consent_timeline_classifies_around_click() {
        let nav_start = Utc::now();
        let mut timeline = ConsentTimeline::new(nav_start, ScanMode::Standard);
        let click_at = nav_start + chrono::Duration::seconds(5);
        timeline.consent_click_at = Some(click_at);

        assert_eq!(
            timeline.classify(nav_start + chrono::Duration::seconds(1)),
            ConsentState::Pre
        );
        assert_eq!(timeline.classify(click_at), ConsentState::Post);
        assert_eq!(
            timeline.classify(click_at + chrono::Duration::seconds(1)),
            ConsentState::Post
        );
    }

    #[test]
    fn capture_source_orders_by_reliability() {
        assert!(CaptureSource::Transport < CaptureSource::InPage);
        assert!(CaptureSource::InPage < CaptureSource::ServiceWorker);
        assert!(CaptureSource::ServiceWorker < CaptureSource::Rewrite);
    }

    #[test]
    fn cache_entry_expires_after_ttl() {
        let entry = CacheEntry::new(42u32, Duration::from_secs(0));
        assert!(entry.is_expired_at(Utc::now() + chrono::Duration::milliseconds(1)));
    }
}
