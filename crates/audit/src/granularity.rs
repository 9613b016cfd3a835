//! Granularity: any non-essential consent toggle that starts pre-ticked is
//! a dark pattern — the user never affirmatively opted in to it.

use scan_browser::BrowserSession;
use scan_core::{AuditFinding, Error, FindingSeverity};

const ESSENTIAL_SEVERITY_THRESHOLD: u32 = 2;

const PROBE_SCRIPT: &str = r#"
(() => {
  const essentialPhrases = /necessary|essential|required|strictly/i;
  const toggles = Array.from(document.querySelectorAll('input[type="checkbox"], input[type="radio"][role="switch"], [role="switch"]'));
  let preTicked = 0;

  for (const toggle of toggles) {
    const label = (toggle.closest('label')?.textContent
      || toggle.getAttribute('aria-label')
      || toggle.id && document.querySelector(`label[for="${toggle.id}"]`)?.textContent
      || '').trim();

    if (essentialPhrases.test(label)) continue;

    const checked = toggle.checked === true || toggle.getAttribute('aria-checked') === 'true';
    if (checked) preTicked += 1;
  }

  return { preTicked };
})()
"#;

#[derive(Debug, serde::Deserialize)]
struct ProbeResult {
    #[serde(rename = "preTicked")]
    pre_ticked: u32,
}

pub async fn audit(session: &BrowserSession) -> Result<Option<AuditFinding>, Error> {
    let probe: ProbeResult = session.evaluate(PROBE_SCRIPT).await?;

    if probe.pre_ticked == 0 {
        return Ok(None);
    }

    let severity = if probe.pre_ticked >= ESSENTIAL_SEVERITY_THRESHOLD {
        FindingSeverity::Major
    } else {
        FindingSeverity::Minor
    };

    Ok(Some(AuditFinding::Granularity {
        severity,
        pre_ticked_count: probe.pre_ticked,
        regulatory_codes: vec!["GDPR-4.11".to_string()],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_script_excludes_necessary_phrasing() {
        assert!(PROBE_SCRIPT.contains("necessary"));
    }
}
