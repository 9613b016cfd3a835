//! ExtractArtifacts processing: turns the merged `CapturedRequest` stream
//! into the reported `RequestLog` shape, tagging each record against the
//! consent timeline and the tracking-domain signature table.
//!
//! A request may only be tagged `violation` on a tracking domain when a CMP
//! was detected and the request landed pre-consent — this mirrors invariant
//! 2 in the report's testable properties and is enforced here rather than
//! left to the scoring stage.

use scan_core::signatures::TRACKING_DOMAIN_PATTERNS;
use scan_core::{
    CapturedRequest, ConsentState, ConsentTimeline, DataType, DetectionResult, RequestKind,
    RequestLog, RequestStatus, ScanMode,
};
use uuid::Uuid;

/// Query-parameter names that commonly carry directly identifying or
/// location data, used only to annotate `data_types` for the report — never
/// to decide `status`.
const PII_PARAM_NAMES: &[&str] = &[
    "email", "em", "phone", "tel", "fn", "ln", "name", "uid", "user_id", "external_id",
];
const LOCATION_PARAM_NAMES: &[&str] = &["lat", "lon", "lng", "geo", "zip", "postal"];
const IDENTIFIER_PARAM_NAMES: &[&str] = &["fbclid", "gclid", "msclkid", "ttclid", "cid", "ga", "_ga"];

pub fn classify_requests(
    captured: &[CapturedRequest],
    timeline: &ConsentTimeline,
    cmp: &DetectionResult,
    mode: ScanMode,
) -> Vec<RequestLog> {
    captured
        .iter()
        .map(|request| classify_one(request, timeline, cmp, mode))
        .collect()
}

fn classify_one(
    request: &CapturedRequest,
    timeline: &ConsentTimeline,
    cmp: &DetectionResult,
    mode: ScanMode,
) -> RequestLog {
    let t_seen = timeline.nav_start + chrono::Duration::from_std(request.t_seen).unwrap_or_default();
    let consent_state = timeline.classify(t_seen);
    let domain = request_domain(&request.url);
    let is_tracking = TRACKING_DOMAIN_PATTERNS.iter().any(|p| domain.contains(p));
    let data_types = infer_data_types(&request.url);

    let status = if mode == ScanMode::Gpc {
        RequestStatus::Allowed
    } else if is_tracking && consent_state == ConsentState::Pre && !cmp.detected.is_empty() {
        RequestStatus::Violation
    } else {
        RequestStatus::Allowed
    };

    RequestLog {
        id: Uuid::new_v4(),
        domain,
        url: request.url.clone(),
        t_seen,
        kind: classify_kind(&request.resource_type),
        consent_state,
        status,
        data_types,
        parameters: query_params_json(&request.url),
        decoded_payload: None,
        data_residency: None,
    }
}

/// `resource_type` comes from the CDP debug-formatted enum on the transport
/// layer (`"Image"`, `"Script"`, ...) but plain lowercase strings from the
/// in-page and service-worker layers, so match case-insensitively.
fn classify_kind(resource_type: &str) -> RequestKind {
    match resource_type.to_lowercase().as_str() {
        "image" | "img" | "pixel" => RequestKind::Pixel,
        "script" => RequestKind::Script,
        _ => RequestKind::Xhr,
    }
}

fn request_domain(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| raw.to_string())
}

fn infer_data_types(raw: &str) -> Vec<DataType> {
    let Ok(parsed) = url::Url::parse(raw) else {
        return Vec::new();
    };

    let mut types = Vec::new();
    for (key, _) in parsed.query_pairs() {
        let key_lower = key.to_lowercase();
        if PII_PARAM_NAMES.iter().any(|p| key_lower == *p) && !types.contains(&DataType::Pii) {
            types.push(DataType::Pii);
        }
        if LOCATION_PARAM_NAMES.iter().any(|p| key_lower == *p) && !types.contains(&DataType::Location) {
            types.push(DataType::Location);
        }
        if IDENTIFIER_PARAM_NAMES.iter().any(|p| key_lower == *p) && !types.contains(&DataType::Identifier) {
            types.push(DataType::Identifier);
        }
    }

    if types.is_empty() && parsed.query().is_some() {
        types.push(DataType::Behavioral);
    }

    types
}

fn query_params_json(raw: &str) -> Option<serde_json::Value> {
    let parsed = url::Url::parse(raw).ok()?;
    parsed.query()?;

    let mut map = serde_json::Map::new();
    for (key, value) in parsed.query_pairs() {
        map.insert(key.into_owned(), serde_json::Value::String(value.into_owned()));
    }
    Some(serde_json::Value::Object(map))
}

/// Unique request domains, in first-seen order, for the audit module's
/// per-domain residency resolution.
pub fn unique_domains(requests: &[RequestLog]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut domains = Vec::new();
    for request in requests {
        if seen.insert(request.domain.clone()) {
            domains.push(request.domain.clone());
        }
    }
    domains
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::time::Duration;

    fn captured(url: &str, t_seen_ms: u64) -> CapturedRequest {
        CapturedRequest {
            url: url.to_string(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            body_snippet: None,
            resource_type: "xhr".to_string(),
            t_seen: Duration::from_millis(t_seen_ms),
            source: scan_core::CaptureSource::Transport,
        }
    }

    fn cmp_detected() -> DetectionResult {
        DetectionResult {
            detected: vec!["OneTrust".to_string()],
            primary: Some("OneTrust".to_string()),
            confidence: scan_core::Confidence::High,
            evidence: Vec::new(),
        }
    }

    #[test]
    fn pre_consent_tracking_request_with_cmp_is_a_violation() {
        let timeline = ConsentTimeline::new(Utc::now(), ScanMode::Standard);
        let requests = vec![captured("https://www.google-analytics.com/g/collect?v=2", 0)];

        let logs = classify_requests(&requests, &timeline, &cmp_detected(), ScanMode::Standard);
        assert_eq!(logs[0].status, RequestStatus::Violation);
        assert_eq!(logs[0].consent_state, ConsentState::Pre);
    }

    #[test]
    fn tracking_request_without_detected_cmp_is_not_a_violation() {
        let timeline = ConsentTimeline::new(Utc::now(), ScanMode::Standard);
        let requests = vec![captured("https://www.google-analytics.com/g/collect?v=2", 0)];

        let logs = classify_requests(&requests, &timeline, &DetectionResult::empty(), ScanMode::Standard);
        assert_eq!(logs[0].status, RequestStatus::Allowed);
    }

    #[test]
    fn post_consent_tracking_request_is_allowed() {
        let nav_start = Utc::now();
        let mut timeline = ConsentTimeline::new(nav_start, ScanMode::Standard);
        timeline.consent_click_at = Some(nav_start);

        let requests = vec![captured("https://www.google-analytics.com/g/collect?v=2", 5_000)];
        let logs = classify_requests(&requests, &timeline, &cmp_detected(), ScanMode::Standard);
        assert_eq!(logs[0].consent_state, ConsentState::Post);
        assert_eq!(logs[0].status, RequestStatus::Allowed);
    }

    #[test]
    fn gpc_mode_never_flags_a_violation() {
        let timeline = ConsentTimeline::new(Utc::now(), ScanMode::Gpc);
        let requests = vec![captured("https://www.google-analytics.com/g/collect?v=2", 0)];
        let logs = classify_requests(&requests, &timeline, &cmp_detected(), ScanMode::Gpc);
        assert_eq!(logs[0].status, RequestStatus::Allowed);
    }

    #[test]
    fn capitalized_cdp_resource_type_still_classifies() {
        let mut request = captured("https://a.example/one.png", 0);
        request.resource_type = "Image".to_string();
        assert_eq!(classify_kind(&request.resource_type), RequestKind::Pixel);
    }

    #[test]
    fn pii_param_is_detected() {
        let types = infer_data_types("https://vendor.example/collect?email=me@example.com");
        assert!(types.contains(&DataType::Pii));
    }

    #[test]
    fn unique_domains_preserves_first_seen_order() {
        let timeline = ConsentTimeline::new(Utc::now(), ScanMode::Standard);
        let requests = vec![
            captured("https://a.example/one", 0),
            captured("https://b.example/two", 10),
            captured("https://a.example/three", 20),
        ];
        let logs = classify_requests(&requests, &timeline, &DetectionResult::empty(), ScanMode::Standard);
        assert_eq!(unique_domains(&logs), vec!["a.example".to_string(), "b.example".to_string()]);
    }
}
