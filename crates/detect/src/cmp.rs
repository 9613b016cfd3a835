//! Consent Management Platform detection: evidence-weighted scoring over
//! page content and the merged request stream, no firing guards needed
//! since a CMP script loading is itself sufficient evidence (unlike a TMS,
//! which can load without ever actually firing).

use scan_core::signatures::CMP_SIGNATURES;
use scan_core::{CapturedRequest, Confidence, DetectionEvidence, DetectionResult, EvidenceKind};
use std::collections::HashMap;

const CONTENT_WEIGHT: u32 = 2;
const REQUEST_WEIGHT: u32 = 3;
const HIGH_THRESHOLD: u32 = 5;
const MEDIUM_THRESHOLD: u32 = 3;

/// `content match × 2, request match × 3`; `primary` is the highest scoring
/// vendor, confidence derived from that vendor's total score.
pub fn detect(html: &str, requests: &[CapturedRequest]) -> DetectionResult {
    let html_lower = html.to_lowercase();
    let mut scores: HashMap<&'static str, u32> = HashMap::new();
    let mut evidence = Vec::new();

    for signature in CMP_SIGNATURES {
        let pattern_lower = signature.pattern.to_lowercase();

        if html_lower.contains(&pattern_lower) {
            *scores.entry(signature.vendor).or_insert(0) += CONTENT_WEIGHT;
            evidence.push(DetectionEvidence {
                kind: EvidenceKind::Content,
                pattern: signature.pattern.to_string(),
                locator: "page_html".to_string(),
                weight: CONTENT_WEIGHT,
            });
        }

        if let Some(matched) = requests
            .iter()
            .find(|r| r.url.to_lowercase().contains(&pattern_lower))
        {
            *scores.entry(signature.vendor).or_insert(0) += REQUEST_WEIGHT;
            evidence.push(DetectionEvidence {
                kind: EvidenceKind::Network,
                pattern: signature.pattern.to_string(),
                locator: matched.url.clone(),
                weight: REQUEST_WEIGHT,
            });
        }
    }

    if scores.is_empty() {
        return DetectionResult::empty();
    }

    let mut detected: Vec<&'static str> = scores.keys().copied().collect();
    detected.sort_unstable();

    let (primary_vendor, primary_score) = scores
        .iter()
        .max_by_key(|(_, score)| **score)
        .map(|(vendor, score)| (*vendor, *score))
        .expect("scores checked non-empty above");

    let confidence = if primary_score >= HIGH_THRESHOLD {
        Confidence::High
    } else if primary_score >= MEDIUM_THRESHOLD {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    DetectionResult {
        detected: detected.into_iter().map(String::from).collect(),
        primary: Some(primary_vendor.to_string()),
        confidence,
        evidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use std::time::Duration;

    fn request(url: &str) -> CapturedRequest {
        CapturedRequest {
            url: url.to_string(),
            method: "GET".to_string(),
            headers: Map::new(),
            body_snippet: None,
            resource_type: "script".to_string(),
            t_seen: Duration::from_millis(0),
            source: scan_core::CaptureSource::Transport,
        }
    }

    #[test]
    fn no_signatures_yields_none_detected() {
        let result = detect("<html><body>hello</body></html>", &[]);
        assert!(result.detected.is_empty());
        assert_eq!(result.primary, None);
        assert_eq!(result.confidence, Confidence::Low);
    }

    #[test]
    fn content_and_request_match_reach_high_confidence() {
        let html = "<script>window.OneTrust = {}; optanon.init();</script>";
        let requests = vec![request("https://cdn.cookielaw.org/consent/optanon.js")];

        let result = detect(html, &requests);
        assert_eq!(result.primary.as_deref(), Some("OneTrust"));
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn single_content_match_is_low_confidence() {
        let html = "<script>iubenda_init()</script>";
        let result = detect(html, &[]);
        assert_eq!(result.primary.as_deref(), Some("Iubenda"));
        assert_eq!(result.confidence, Confidence::Low);
    }
}
