//! GPC Visual Confirmation: only runs in `gpc` mode, where the Consent
//! Interactor never clicks accept and instead relies on the page honoring
//! `Sec-GPC: 1` on its own. A vision model checks the post-consent
//! screenshot for an explicit acknowledgment of the opt-out signal; absence
//! of one is the `GPC_IGNORED` finding.

use scan_browser::BrowserSession;
use scan_core::utils::sha256_hex;
use scan_core::{AuditFinding, Error, ErrorCode, FindingSeverity, ScanMode, TtlCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type GpcVisionCache = TtlCache<String, bool>;

#[derive(Debug, Serialize)]
struct VisionRequest<'a> {
    screenshot_base64: &'a str,
    prompt: &'static str,
}

const PROMPT: &str = "Does this screenshot show an explicit acknowledgment that the site has \
honored a Global Privacy Control (GPC) opt-out signal, such as a banner or text stating an \
opt-out preference was received and applied? Respond with JSON: {\"acknowledged\": boolean}.";

#[derive(Debug, Deserialize)]
struct VisionResponse {
    acknowledged: bool,
}

pub struct VisionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    cache: Arc<GpcVisionCache>,
}

impl VisionClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, cache: Arc<GpcVisionCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            cache,
        }
    }

    async fn classify_acknowledgment(&self, screenshot_png: &[u8]) -> Result<bool, Error> {
        let cache_key = sha256_hex(screenshot_png);
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(cached);
        }

        use base64::{engine::general_purpose::STANDARD, Engine};
        let screenshot_base64 = STANDARD.encode(screenshot_png);

        let body = VisionRequest {
            screenshot_base64: &screenshot_base64,
            prompt: PROMPT,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::new(ErrorCode::VisionFallbackUnavailable, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::new(
                ErrorCode::VisionFallbackUnavailable,
                format!("vision endpoint returned {}", response.status()),
            ));
        }

        let parsed: VisionResponse = response
            .json()
            .await
            .map_err(|e| Error::new(ErrorCode::VisionFallbackUnavailable, e.to_string()))?;

        self.cache.set(cache_key, parsed.acknowledged);
        Ok(parsed.acknowledged)
    }
}

/// Returns `None` outside `gpc` mode, on any other `ScanMode`; the check is
/// meaningless without a signal to have ignored. A vision-call failure
/// propagates as an error rather than silently passing the site.
pub async fn audit(
    session: &BrowserSession,
    mode: ScanMode,
    client: &VisionClient,
) -> Result<Option<AuditFinding>, Error> {
    if mode != ScanMode::Gpc {
        return Ok(None);
    }

    let screenshot = session.screenshot_png().await?;
    let acknowledged = client.classify_acknowledgment(&screenshot).await?;

    if acknowledged {
        return Ok(None);
    }

    Ok(Some(AuditFinding::GpcVisual {
        severity: FindingSeverity::Critical,
        acknowledged,
        regulatory_codes: vec!["CCPA-1798.135".to_string()],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_asks_for_structured_response() {
        assert!(PROMPT.contains("acknowledged"));
    }
}
