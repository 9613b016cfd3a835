//! Transparency: a compliant banner names the data categories it collects
//! and its actual third-party recipients, not a vague "our partners".

use scan_browser::BrowserSession;
use scan_core::{Article13Compliance, AuditFinding, Error, FindingSeverity};

const DATA_CATEGORY_PHRASES: &[&str] = &[
    "advertising",
    "analytics",
    "personalization",
    "measurement",
    "social media",
    "functional",
];

/// Generic "partners"/"third parties" phrasing does not count as naming a
/// recipient; this is a rough heuristic for a specific company name —
/// capitalized multi-word tokens distinct from the generic phrases below.
const GENERIC_RECIPIENT_PHRASES: &[&str] = &["our partners", "third parties", "trusted partners"];

const PROBE_SCRIPT: &str = r#"
(() => {
  const banner = document.querySelector('[aria-label*="cookie" i], [class*="cookie" i], [id*="consent" i], [class*="consent" i]');
  const text = (banner ? banner.textContent : document.body.textContent) || '';
  return { text: text.slice(0, 20000) };
})()
"#;

#[derive(Debug, serde::Deserialize)]
struct ProbeResult {
    text: String,
}

pub async fn audit(session: &BrowserSession) -> Result<Option<AuditFinding>, Error> {
    let probe: ProbeResult = session.evaluate(PROBE_SCRIPT).await?;
    let lower = probe.text.to_lowercase();

    let category_count = DATA_CATEGORY_PHRASES.iter().filter(|p| lower.contains(**p)).count();
    let names_generic_recipient_only = GENERIC_RECIPIENT_PHRASES.iter().any(|p| lower.contains(p))
        && !names_specific_company(&probe.text);

    let compliance = if category_count >= 2 && !names_generic_recipient_only {
        Article13Compliance::Full
    } else if category_count >= 1 {
        Article13Compliance::Partial
    } else {
        Article13Compliance::None
    };

    if compliance == Article13Compliance::Full {
        return Ok(None);
    }

    let severity = match compliance {
        Article13Compliance::None => FindingSeverity::Major,
        Article13Compliance::Partial => FindingSeverity::Minor,
        Article13Compliance::Full => unreachable!("filtered above"),
    };

    Ok(Some(AuditFinding::Transparency {
        severity,
        article13_compliance: compliance,
        regulatory_codes: vec!["GDPR-13".to_string()],
    }))
}

/// Looks for a capitalized multi-word run that isn't one of the generic
/// phrases — a crude stand-in for "names an actual vendor".
fn names_specific_company(text: &str) -> bool {
    text.split_whitespace()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()) && w.len() > 2)
        .count()
        >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_category_phrases_cover_common_consent_copy() {
        assert!(DATA_CATEGORY_PHRASES.contains(&"analytics"));
        assert!(DATA_CATEGORY_PHRASES.contains(&"advertising"));
    }
}
