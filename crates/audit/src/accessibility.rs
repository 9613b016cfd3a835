//! Accessibility (POUR): contrast, keyboard reachability, ARIA labeling, and
//! the document's language attribute on the accept/reject controls.

use scan_browser::BrowserSession;
use scan_core::{AuditFinding, Error, FindingSeverity, PourScores};

const MIN_CONTRAST_RATIO: f64 = 4.5;

const PROBE_SCRIPT: &str = r#"
(() => {
  function luminance(rgb) {
    const [r, g, b] = rgb.map(c => {
      const s = c / 255;
      return s <= 0.03928 ? s / 12.92 : Math.pow((s + 0.055) / 1.055, 2.4);
    });
    return 0.2126 * r + 0.7152 * g + 0.0722 * b;
  }

  function parseRgb(color) {
    const m = color.match(/rgba?\((\d+),\s*(\d+),\s*(\d+)/);
    return m ? [Number(m[1]), Number(m[2]), Number(m[3])] : [255, 255, 255];
  }

  function contrastRatio(el) {
    const style = window.getComputedStyle(el);
    const fg = luminance(parseRgb(style.color));
    const bg = luminance(parseRgb(style.backgroundColor));
    const lighter = Math.max(fg, bg);
    const darker = Math.min(fg, bg);
    return (lighter + 0.05) / (darker + 0.05);
  }

  const phrases = /accept|reject|decline|agree|allow/i;
  const controls = Array.from(document.querySelectorAll('button, a, [role="button"]'))
    .filter(el => phrases.test(el.textContent || ''));

  const contrasts = controls.map(contrastRatio);
  const minContrast = contrasts.length ? Math.min(...contrasts) : 21;

  const labeled = controls.filter(el =>
    el.getAttribute('aria-label') || el.getAttribute('aria-labelledby') || (el.textContent || '').trim().length > 0
  ).length;
  const labelRatio = controls.length ? labeled / controls.length : 1;

  const focusable = controls.filter(el => {
    const tabindex = el.getAttribute('tabindex');
    return el.tabIndex >= 0 && tabindex !== '-1';
  }).length;
  const focusRatio = controls.length ? focusable / controls.length : 1;

  const hasLang = !!document.documentElement.getAttribute('lang');

  return { minContrast, labelRatio, focusRatio, hasLang };
})()
"#;

#[derive(Debug, serde::Deserialize)]
struct ProbeResult {
    #[serde(rename = "minContrast")]
    min_contrast: f64,
    #[serde(rename = "labelRatio")]
    label_ratio: f64,
    #[serde(rename = "focusRatio")]
    focus_ratio: f64,
    #[serde(rename = "hasLang")]
    has_lang: bool,
}

pub async fn audit(session: &BrowserSession) -> Result<Option<AuditFinding>, Error> {
    let probe: ProbeResult = session.evaluate(PROBE_SCRIPT).await?;

    let perceivable = ratio_score(probe.min_contrast / MIN_CONTRAST_RATIO);
    let operable = ratio_score(probe.focus_ratio);
    let understandable = ratio_score(probe.label_ratio);
    let robust = if probe.has_lang { 100 } else { 0 };

    let pour_scores = PourScores {
        perceivable,
        operable,
        understandable,
        robust,
    };

    let worst = [perceivable, operable, understandable, robust]
        .into_iter()
        .min()
        .unwrap_or(100);

    if worst >= 90 {
        return Ok(None);
    }

    let severity = if worst < 50 {
        FindingSeverity::Major
    } else {
        FindingSeverity::Minor
    };

    Ok(Some(AuditFinding::Accessibility {
        severity,
        pour_scores,
        regulatory_codes: vec!["EAA-2019-882".to_string()],
    }))
}

/// Maps a ratio (already-met threshold = 1.0) onto a `[0, 100]` score,
/// clamping overshoot from contrast ratios well above the minimum.
fn ratio_score(ratio: f64) -> u8 {
    (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_score_clamps_to_100() {
        assert_eq!(ratio_score(1.4), 100);
    }

    #[test]
    fn ratio_score_floors_at_zero() {
        assert_eq!(ratio_score(-0.2), 0);
    }

    #[test]
    fn ratio_score_midpoint() {
        assert_eq!(ratio_score(0.5), 50);
    }
}
