//! Script rewriter: intercepts every script response at the network layer
//! and, for scripts at or under 100KB, prepends a capture stub that
//! snapshots `window.dataLayer`/`adobeDataLayer`/`digitalData`/`utag_data`
//! before the original script runs. Larger scripts pass through untouched —
//! rewriting them would add interception latency disproportionate to what
//! the snapshot buys.

use base64::{engine::general_purpose::STANDARD, Engine};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FulfillRequestParams,
    GetResponseBodyParams, HeaderEntry, RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::network::ResourceType;
use futures::StreamExt;
use scan_browser::BrowserSession;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Scripts larger than this pass through unmodified.
pub const MAX_REWRITE_BYTES: usize = 100 * 1024;

/// Snapshots the known data-layer globals into `window.__consentCopDataLayers`
/// before the original script body executes. Templated once here rather than
/// built with string concatenation at each call site.
const CAPTURE_STUB: &str = r#"
(() => {
  if (!window.__consentCopDataLayers) window.__consentCopDataLayers = {};
  const snapshot = (name) => {
    try {
      if (window[name] !== undefined && !(name in window.__consentCopDataLayers)) {
        window.__consentCopDataLayers[name] = JSON.parse(JSON.stringify(window[name]));
      }
    } catch (e) { /* non-serializable global, record presence only */
      window.__consentCopDataLayers[name] = window.__consentCopDataLayers[name] ?? true;
    }
  };
  ['dataLayer', 'adobeDataLayer', 'digitalData', 'utag_data'].forEach(snapshot);
})();
"#;

pub struct ScriptRewriter;

impl ScriptRewriter {
    /// Enables `Fetch` domain interception scoped to `Script` resources and
    /// spawns the handler task. Bodies are fetched via the paused request's
    /// `Fetch.getResponseBody`; requests that error out (body unavailable,
    /// encoding failure) fall through to an unmodified continuation so a
    /// single bad script never blocks the page.
    pub async fn attach(session: Arc<BrowserSession>, _nav_start: Instant) -> Result<JoinHandle<()>, String> {
        let pattern = RequestPattern::builder()
            .resource_type(ResourceType::Script)
            .request_stage(RequestStage::Response)
            .build();

        session
            .page
            .execute(EnableParams::builder().patterns(vec![pattern]).build())
            .await
            .map_err(|e| e.to_string())?;

        let mut events = session
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| e.to_string())?;

        let page = session.page.clone();
        Ok(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let request_id = event.request_id.clone();

                let body = page
                    .execute(GetResponseBodyParams::new(request_id.clone()))
                    .await
                    .ok()
                    .map(|r| r.result.clone());

                let Some(body) = body else {
                    let _ = page
                        .execute(ContinueRequestParams::builder().request_id(request_id).build())
                        .await;
                    continue;
                };

                let raw_bytes = if body.base64_encoded {
                    STANDARD.decode(&body.body).unwrap_or_default()
                } else {
                    body.body.clone().into_bytes()
                };

                if raw_bytes.len() > MAX_REWRITE_BYTES || raw_bytes.is_empty() {
                    let _ = page
                        .execute(ContinueRequestParams::builder().request_id(request_id).build())
                        .await;
                    continue;
                }

                let mut rewritten = Vec::with_capacity(CAPTURE_STUB.len() + raw_bytes.len());
                rewritten.extend_from_slice(CAPTURE_STUB.as_bytes());
                rewritten.extend_from_slice(&raw_bytes);

                let response_code = event.response_status_code.unwrap_or(200);
                let headers = event
                    .response_headers
                    .clone()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|h| HeaderEntry::new(h.name, h.value))
                    .collect::<Vec<_>>();

                let fulfill = FulfillRequestParams::builder()
                    .request_id(request_id)
                    .response_code(response_code)
                    .response_headers(headers)
                    .body(STANDARD.encode(&rewritten))
                    .build();

                if let Ok(fulfill) = fulfill {
                    let _ = page.execute(fulfill).await;
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_stub_snapshots_known_data_layer_globals() {
        for global in ["dataLayer", "adobeDataLayer", "digitalData", "utag_data"] {
            assert!(CAPTURE_STUB.contains(global));
        }
    }

    #[test]
    fn max_rewrite_size_matches_spec_budget() {
        assert_eq!(MAX_REWRITE_BYTES, 100 * 1024);
    }
}
