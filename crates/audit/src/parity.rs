//! Parity of Ease: the first-layer reject control must exist and take no
//! more clicks to reach than accept does.

use scan_browser::BrowserSession;
use scan_core::{AuditFinding, Error, FindingSeverity};

const PROBE_SCRIPT: &str = r#"
(() => {
  const rejectPhrases = /reject all|decline all|reject|decline|deny/i;
  const candidates = Array.from(document.querySelectorAll('button, a, [role="button"]'));

  for (const el of candidates) {
    const text = (el.textContent || '').trim();
    if (rejectPhrases.test(text)) {
      const style = window.getComputedStyle(el);
      const visible = style.display !== 'none' && style.visibility !== 'hidden' && el.offsetParent !== null;
      return { found: true, visibleInFirstLayer: visible };
    }
  }
  return { found: false, visibleInFirstLayer: false };
})()
"#;

#[derive(Debug, serde::Deserialize)]
struct ProbeResult {
    found: bool,
    #[serde(rename = "visibleInFirstLayer")]
    visible_in_first_layer: bool,
}

/// A reject control not present in the first layer at all counts as
/// `clicks_to_reject: None` (unreachable); present but requiring the banner
/// to be expanded first counts as two clicks, matching how a real user would
/// have to act. Returns `None` when reject is reachable in a single click —
/// parity holds and there is nothing to report.
pub async fn audit(session: &BrowserSession) -> Result<Option<AuditFinding>, Error> {
    let probe: ProbeResult = session.evaluate(PROBE_SCRIPT).await?;

    let (reject_reachable, clicks_to_reject) = if !probe.found {
        (false, None)
    } else if probe.visible_in_first_layer {
        (true, Some(1))
    } else {
        (true, Some(2))
    };

    if reject_reachable && clicks_to_reject == Some(1) {
        return Ok(None);
    }

    let severity = if !reject_reachable {
        FindingSeverity::Critical
    } else {
        FindingSeverity::Major
    };

    Ok(Some(AuditFinding::ParityOfEase {
        severity,
        reject_reachable,
        clicks_to_reject,
        regulatory_codes: vec!["GDPR-7.3".to_string(), "EDPB-GL03".to_string()],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_script_matches_common_reject_phrasing() {
        for phrase in ["Reject All", "Decline", "Deny all"] {
            assert!(regex_like_match(phrase));
        }
    }

    fn regex_like_match(text: &str) -> bool {
        let lower = text.to_lowercase();
        ["reject all", "decline all", "reject", "decline", "deny"]
            .iter()
            .any(|p| lower.contains(p))
    }
}
