//! UI Symmetry: a reject control rendered conspicuously smaller than accept
//! is a dark pattern even when both are technically present and clickable.

use scan_browser::BrowserSession;
use scan_core::{AuditFinding, Error, FindingSeverity};

const MAJOR_BIAS_THRESHOLD: f64 = 1.5;
const MINOR_BIAS_THRESHOLD: f64 = 1.15;

const PROBE_SCRIPT: &str = r#"
(() => {
  function area(el) {
    const rect = el.getBoundingClientRect();
    return rect.width * rect.height;
  }

  function find(pattern) {
    const candidates = Array.from(document.querySelectorAll('button, a, [role="button"]'));
    return candidates.find(el => pattern.test((el.textContent || '').trim()));
  }

  const accept = find(/accept all|accept|agree|allow all/i);
  const reject = find(/reject all|decline all|reject|decline|deny/i);

  if (!accept || !reject) return { found: false, acceptArea: 0, rejectArea: 0 };

  return { found: true, acceptArea: area(accept), rejectArea: area(reject) };
})()
"#;

#[derive(Debug, serde::Deserialize)]
struct ProbeResult {
    found: bool,
    #[serde(rename = "acceptArea")]
    accept_area: f64,
    #[serde(rename = "rejectArea")]
    reject_area: f64,
}

/// Returns `None` when either control is missing — that's `ParityOfEase`'s
/// finding to make, not this one's — or when the size ratio is under the
/// minor-bias threshold.
pub async fn audit(session: &BrowserSession) -> Result<Option<AuditFinding>, Error> {
    let probe: ProbeResult = session.evaluate(PROBE_SCRIPT).await?;

    if !probe.found || probe.accept_area <= 0.0 || probe.reject_area <= 0.0 {
        return Ok(None);
    }

    let size_ratio = probe.accept_area.max(probe.reject_area) / probe.accept_area.min(probe.reject_area);

    if size_ratio <= MINOR_BIAS_THRESHOLD {
        return Ok(None);
    }

    let severity = if size_ratio > MAJOR_BIAS_THRESHOLD {
        FindingSeverity::Major
    } else {
        FindingSeverity::Minor
    };

    Ok(Some(AuditFinding::UiSymmetry {
        severity,
        size_ratio,
        regulatory_codes: vec!["EDPB-GL03".to_string()],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_match_documented_bias_cutoffs() {
        assert_eq!(MAJOR_BIAS_THRESHOLD, 1.5);
        assert_eq!(MINOR_BIAS_THRESHOLD, 1.15);
    }
}
