//! AI HTML fallback: the cost-sensitive last resort when primary CMP/TMS
//! detection comes back `none`/`confidence: low`. Sends a bounded slice of
//! the page to a generative model under a strict JSON schema and only
//! accepts a result that itself claims `high` or `medium` confidence — a
//! fallback that is no more sure than the detector it's backing up is
//! useless.

use scan_core::utils::sha256_hex;
use scan_core::{Confidence, DetectionEvidence, DetectionResult, Error, ErrorCode, EvidenceKind, TtlCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const MAX_HTML_BYTES: usize = 50 * 1024;
pub const MAX_SCRIPT_URLS: usize = 50;
pub const MAX_INLINE_SCRIPT_BYTES: usize = 20 * 1024;

pub const AI_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub type AiFallbackCache = TtlCache<String, DetectionResult>;

#[derive(Debug, Serialize)]
struct AiFallbackRequest<'a> {
    html_snippet: &'a str,
    script_urls: &'a [String],
    inline_script_snippet: &'a str,
    schema: &'static str,
}

/// The strict schema the model is instructed to respond with; carried as a
/// literal so the prompt and the deserialization target never drift apart.
const RESPONSE_SCHEMA: &str = r#"{"detected":boolean,"primary":string|null,"confidence":"high"|"medium"|"low","evidence":[{"pattern":string,"locator":string}]}"#;

#[derive(Debug, Deserialize)]
struct AiFallbackResponse {
    detected: bool,
    primary: Option<String>,
    confidence: AiConfidence,
    #[serde(default)]
    evidence: Vec<AiEvidenceItem>,
}

#[derive(Debug, Deserialize)]
struct AiEvidenceItem {
    pattern: String,
    locator: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum AiConfidence {
    High,
    Medium,
    Low,
}

pub struct AiFallbackClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    cache: Arc<AiFallbackCache>,
}

impl AiFallbackClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, cache: Arc<AiFallbackCache>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            cache,
        }
    }

    /// Truncates `html`/`script_urls`/`inline_scripts` to the documented
    /// limits, checks the response cache, and otherwise calls out to the
    /// model. Returns `Ok(None)` (not an error) when the model itself
    /// reports low confidence — that's a valid "still don't know" answer,
    /// distinct from a transport failure.
    pub async fn classify(
        &self,
        html: &str,
        script_urls: &[String],
        inline_scripts: &str,
    ) -> Result<Option<DetectionResult>, Error> {
        let html_snippet = truncate_bytes(html, MAX_HTML_BYTES);
        let urls: Vec<String> = script_urls.iter().take(MAX_SCRIPT_URLS).cloned().collect();
        let inline_snippet = truncate_bytes(inline_scripts, MAX_INLINE_SCRIPT_BYTES);

        let cache_key = sha256_hex(format!("{html_snippet}\0{inline_snippet}").as_bytes());
        if let Some(cached) = self.cache.get(&cache_key) {
            return Ok(Some(cached));
        }

        let body = AiFallbackRequest {
            html_snippet: &html_snippet,
            script_urls: &urls,
            inline_script_snippet: &inline_snippet,
            schema: RESPONSE_SCHEMA,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::new(ErrorCode::AiFallbackUnavailable, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::new(
                ErrorCode::AiFallbackUnavailable,
                format!("AI fallback endpoint returned {}", response.status()),
            ));
        }

        let parsed: AiFallbackResponse = response
            .json()
            .await
            .map_err(|e| Error::new(ErrorCode::AiFallbackUnavailable, e.to_string()))?;

        if parsed.confidence == AiConfidence::Low {
            return Ok(None);
        }

        let result = DetectionResult {
            detected: if parsed.detected {
                parsed.primary.clone().into_iter().collect()
            } else {
                Vec::new()
            },
            primary: parsed.primary,
            confidence: match parsed.confidence {
                AiConfidence::High => Confidence::High,
                AiConfidence::Medium => Confidence::Medium,
                AiConfidence::Low => unreachable!("filtered above"),
            },
            evidence: parsed
                .evidence
                .into_iter()
                .map(|item| DetectionEvidence {
                    kind: EvidenceKind::Ai,
                    pattern: item.pattern,
                    locator: item.locator,
                    weight: 0,
                })
                .collect(),
        };

        self.cache.set_with_ttl(cache_key, result.clone(), AI_CACHE_TTL);
        Ok(Some(result))
    }
}

fn truncate_bytes(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return input.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    input[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_bytes_respects_char_boundaries() {
        let input = "a".repeat(10) + "日本語";
        let truncated = truncate_bytes(&input, 11);
        assert!(truncated.len() <= 11);
        assert!(input.starts_with(&truncated));
    }

    #[test]
    fn truncate_bytes_is_noop_under_the_limit() {
        assert_eq!(truncate_bytes("short", 1024), "short");
    }

    #[test]
    fn limits_match_the_documented_budget() {
        assert_eq!(MAX_HTML_BYTES, 50 * 1024);
        assert_eq!(MAX_SCRIPT_URLS, 50);
        assert_eq!(MAX_INLINE_SCRIPT_BYTES, 20 * 1024);
    }
}
