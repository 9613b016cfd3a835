//! Tag Management System detection: unlike a CMP, a TMS script loading does
//! not mean it's actually firing tags, so `primary` is decided by a strict
//! firing guard before falling back to evidence scoring or a fixed priority
//! list. Getting this wrong in GTM's favor is the single most common false
//! positive in this space — `dataLayer`/`gtag` patterns are shared by other
//! vendors' own instrumentation.

use once_cell::sync::Lazy;
use regex::Regex;
use scan_core::signatures::TMS_SIGNATURES;
use scan_core::{CapturedRequest, Confidence, DetectionEvidence, DetectionResult, EvidenceKind};
use std::collections::HashMap;

const CONTENT_WEIGHT: u32 = 1;
const NETWORK_WEIGHT: u32 = 3;
const HIGH_THRESHOLD: u32 = 5;
const MEDIUM_THRESHOLD: u32 = 3;

/// Fallback order when no firing guard trips and no evidence score breaks
/// the tie. Named exactly as the vendors are recorded elsewhere so a fixed
/// pick can be compared against `detected` by string equality.
const PRIORITY_FALLBACK: &[&str] = &[
    "Adobe Launch",
    "AEP Web SDK",
    "Tealium",
    "Segment",
    "Google Tag Manager",
];

static GTM_CONTAINER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"googletagmanager\.com/gtm\.js\?id=GTM-[A-Z0-9]+").unwrap());

static ADOBE_LAUNCH_CONTAINER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"assets\.adobedtm\.com/.*(launch-[\w.-]*\.min\.js|AppMeasurement\.min\.js)|assets\.adobedtm\.com/[\w./-]+\.js").unwrap()
});

pub fn detect(html: &str, requests: &[CapturedRequest]) -> DetectionResult {
    let html_lower = html.to_lowercase();
    let mut scores: HashMap<&'static str, u32> = HashMap::new();
    let mut evidence = Vec::new();

    for signature in TMS_SIGNATURES {
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
            *scores.entry(signature.vendor).or_insert(0) += NETWORK_WEIGHT;
            evidence.push(DetectionEvidence {
                kind: EvidenceKind::Network,
                pattern: signature.pattern.to_string(),
                locator: matched.url.clone(),
                weight: NETWORK_WEIGHT,
            });
        }
    }

    if scores.is_empty() {
        return DetectionResult::empty();
    }

    let adobe_firing = requests.iter().any(|r| ADOBE_LAUNCH_CONTAINER.is_match(&r.url));
    let gtm_firing = requests.iter().any(|r| GTM_CONTAINER.is_match(&r.url));

    let mut detected: Vec<&'static str> = scores.keys().copied().collect();
    detected.sort_unstable();

    let primary = if adobe_firing && detected.contains(&"Adobe Launch") {
        Some("Adobe Launch")
    } else if gtm_firing && detected.contains(&"Google Tag Manager") {
        Some("Google Tag Manager")
    } else if let Some((vendor, _)) = scores.iter().max_by_key(|(_, score)| **score) {
        Some(*vendor)
    } else {
        PRIORITY_FALLBACK.iter().find(|v| detected.contains(v)).copied()
    };

    let primary_score = primary.and_then(|p| scores.get(p)).copied().unwrap_or(0);
    let confidence = if primary_score >= HIGH_THRESHOLD {
        Confidence::High
    } else if primary_score >= MEDIUM_THRESHOLD {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    DetectionResult {
        detected: detected.into_iter().map(String::from).collect(),
        primary: primary.map(String::from),
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
    fn gtm_content_alone_does_not_win_primary_when_adobe_launch_fires() {
        let html = "<script>window.dataLayer = window.dataLayer || [];</script>";
        let requests = vec![request(
            "https://assets.adobedtm.com/launch-EN1234567890.min.js",
        )];

        let result = tms_detect(html, &requests);
        assert_eq!(result.primary.as_deref(), Some("Adobe Launch"));
    }

    #[test]
    fn gtm_container_firing_wins_primary() {
        let html = "<script>window.dataLayer = [];</script>";
        let requests = vec![request(
            "https://www.googletagmanager.com/gtm.js?id=GTM-ABCDEF",
        )];

        let result = tms_detect(html, &requests);
        assert_eq!(result.primary.as_deref(), Some("Google Tag Manager"));
    }

    #[test]
    fn content_only_dataLayer_mention_does_not_imply_gtm_firing() {
        let html = "<script>window.dataLayer = [];</script>";
        let result = tms_detect(html, &[]);
        // GTM is detected from content, but nothing fired: primary falls
        // through to evidence scoring / fixed priority, not an automatic GTM win.
        assert_eq!(result.primary.as_deref(), Some("Google Tag Manager"));
        assert_eq!(result.confidence, Confidence::Low);
    }

    fn tms_detect(html: &str, requests: &[CapturedRequest]) -> DetectionResult {
        detect(html, requests)
    }
}
