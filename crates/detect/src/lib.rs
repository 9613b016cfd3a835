//! Detection engine: CMP/TMS signature scoring, the runtime data-layer
//! probe, and the AI HTML fallback gated behind both.

pub mod ai_fallback;
pub mod cmp;
pub mod datalayer;
pub mod tms;

pub use ai_fallback::{AiFallbackCache, AiFallbackClient};

use scan_browser::BrowserSession;
use scan_core::{CapturedRequest, Confidence, DetectionResult};

/// The three detection results a scan carries forward: CMP, TMS, and the
/// set of data-layer globals the runtime probe found present.
pub struct DetectionOutcome {
    pub cmp: DetectionResult,
    pub tms: DetectionResult,
    pub data_layers: Vec<String>,
}

/// Runs CMP and TMS scoring over `html`/`requests`, then the runtime probe,
/// re-probing once after a jittered wait if the probe is empty but either
/// detector already matched something in content. The AI fallback is not
/// invoked here — it depends on a configured client and is the orchestrator's
/// call to make once it sees `cmp.confidence == Low && cmp.detected.is_empty()`.
pub async fn run(session: &BrowserSession, html: &str, requests: &[CapturedRequest]) -> DetectionOutcome {
    let cmp_result = cmp::detect(html, requests);
    let tms_result = tms::detect(html, requests);

    let content_matched = cmp_result
        .evidence
        .iter()
        .chain(tms_result.evidence.iter())
        .any(|e| matches!(e.kind, scan_core::EvidenceKind::Content));

    let mut data_layers = datalayer::probe(session).await.unwrap_or_default();
    if data_layers.is_empty() && content_matched {
        data_layers = datalayer::reprobe_after_jitter(session).await.unwrap_or_default();
    }

    DetectionOutcome {
        cmp: cmp_result,
        tms: tms_result,
        data_layers,
    }
}

/// Whether primary detection is weak enough that the AI fallback is worth
/// its cost: `none` detected at `low` confidence, exactly as specified.
pub fn needs_ai_fallback(result: &DetectionResult) -> bool {
    result.detected.is_empty() && result.confidence == Confidence::Low
}

#[cfg(test)]
mod tests {
    use super::*;
    use scan_core::DetectionResult;

    #[test]
    fn empty_result_needs_fallback() {
        assert!(needs_ai_fallback(&DetectionResult::empty()));
    }

    #[test]
    fn detected_result_never_needs_fallback_even_at_low_confidence() {
        let result = DetectionResult {
            detected: vec!["Iubenda".to_string()],
            primary: Some("Iubenda".to_string()),
            confidence: Confidence::Low,
            evidence: Vec::new(),
        };
        assert!(!needs_ai_fallback(&result));
    }
}
