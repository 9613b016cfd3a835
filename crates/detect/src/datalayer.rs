//! Runtime data-layer probe: queries the live page for the tag-management
//! globals a CMP/TMS would have populated by the time the page is settled.
//! Run once; if it comes back empty but content signatures already matched,
//! the caller re-probes once after a jittered wait in case the globals are
//! populated asynchronously.

use rand::Rng;
use scan_browser::BrowserSession;
use scan_core::Error;
use std::time::Duration;

const KNOWN_GLOBALS: &[&str] = &["dataLayer", "adobeDataLayer", "digitalData", "_satellite", "utag_data"];

const REPROBE_BASE_MS: u64 = 3000;
const REPROBE_JITTER_PCT: f64 = 0.25;

const PROBE_SCRIPT: &str = r#"
(() => {
  const known = ['dataLayer', 'adobeDataLayer', 'digitalData', '_satellite', 'utag_data'];
  const pattern = /adobe|satellite|alloy|omtrdc|digitalData/i;
  const found = new Set();

  for (const name of known) {
    if (window[name] !== undefined) found.add(name);
  }

  for (const key of Object.keys(window)) {
    if (pattern.test(key) && window[key] !== undefined) found.add(key);
  }

  return Array.from(found);
})()
"#;

/// Queries the page once for known data-layer globals and any window key
/// matching the vendor-name pattern.
pub async fn probe(session: &BrowserSession) -> Result<Vec<String>, Error> {
    session.evaluate::<Vec<String>>(PROBE_SCRIPT).await
}

/// Re-probes after a jittered ~3s wait. Only worth calling when the first
/// probe came back empty but content evidence suggested a TMS is present —
/// some vendors populate the data layer asynchronously after their bootstrap
/// script runs.
pub async fn reprobe_after_jitter(session: &BrowserSession) -> Result<Vec<String>, Error> {
    let jitter_span = (REPROBE_BASE_MS as f64 * REPROBE_JITTER_PCT) as i64;
    let jitter = rand::thread_rng().gen_range(-jitter_span..=jitter_span);
    let wait_ms = (REPROBE_BASE_MS as i64 + jitter).max(0) as u64;
    tokio::time::sleep(Duration::from_millis(wait_ms)).await;
    probe(session).await
}

pub fn is_known_global(name: &str) -> bool {
    KNOWN_GLOBALS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_globals_cover_the_documented_set() {
        for name in ["dataLayer", "adobeDataLayer", "digitalData", "_satellite", "utag_data"] {
            assert!(is_known_global(name));
        }
        assert!(!is_known_global("unrelatedGlobal"));
    }

    #[test]
    fn probe_script_enumerates_the_same_globals() {
        for name in KNOWN_GLOBALS {
            assert!(PROBE_SCRIPT.contains(name));
        }
    }
}
