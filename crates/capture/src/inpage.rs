//! In-page monkey-patch capture: an init script wraps `window.fetch` and
//! `XMLHttpRequest.{open,send}` before any page script runs, pushing record
//! objects onto `window.__inPageRequests`. A polling harness drains that
//! array every 500ms and de-duplicates by `(url, tSeen)`.

use crate::benign::is_benign_capture_error;
use scan_browser::BrowserSession;
use scan_core::{CaptureSource, CapturedRequest};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Installed before any page script. Buffers up to 500 records to keep the
/// page-side array from growing unbounded between polls.
pub const INPAGE_CAPTURE_SCRIPT: &str = r#"
(() => {
  if (window.__inPageRequests) return;
  window.__inPageRequests = [];

  const record = (url, method, resourceType) => {
    if (window.__inPageRequests.length >= 500) window.__inPageRequests.shift();
    window.__inPageRequests.push({ url, method, resourceType, tSeen: performance.now() });
  };

  const originalFetch = window.fetch;
  window.fetch = function (input, init) {
    const url = typeof input === 'string' ? input : (input && input.url) || '';
    const method = (init && init.method) || 'GET';
    record(url, method, 'xhr');
    return originalFetch.apply(this, arguments);
  };

  const OriginalXHR = window.XMLHttpRequest;
  const originalOpen = OriginalXHR.prototype.open;
  OriginalXHR.prototype.open = function (method, url) {
    this.__capturedMethod = method;
    this.__capturedUrl = url;
    return originalOpen.apply(this, arguments);
  };
  const originalSend = OriginalXHR.prototype.send;
  OriginalXHR.prototype.send = function () {
    record(this.__capturedUrl || '', this.__capturedMethod || 'GET', 'xhr');
    return originalSend.apply(this, arguments);
  };
})();
"#;

const DRAIN_SCRIPT: &str = r#"
(() => {
  const items = window.__inPageRequests || [];
  window.__inPageRequests = [];
  return items;
})()
"#;

#[derive(Debug, serde::Deserialize)]
struct RawRecord {
    url: String,
    method: String,
    #[serde(rename = "resourceType")]
    resource_type: String,
    t_seen: f64,
}

#[derive(Default)]
pub struct InPageCapture {
    records: Arc<Mutex<Vec<CapturedRequest>>>,
    seen: Arc<Mutex<HashSet<(String, u64)>>>,
    stop: Arc<Notify>,
}

impl InPageCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the monkey-patch init script and spawns the 500ms poller.
    /// The poller stops when `stop()` is called or the session's page has
    /// closed, and swallows context-destroyed errors during navigations.
    pub async fn attach(&self, session: Arc<BrowserSession>) -> JoinHandle<()> {
        if let Err(e) = session.add_init_script(INPAGE_CAPTURE_SCRIPT).await {
            tracing::warn!(error = %e, "failed to install in-page capture script");
        }

        let records = self.records.clone();
        let seen = self.seen.clone();
        let stop = self.stop.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.notified() => break,
                    _ = tokio::time::sleep(POLL_INTERVAL) => {}
                }

                match session.evaluate::<Vec<RawRecord>>(DRAIN_SCRIPT).await {
                    Ok(raw) => {
                        let mut records_guard = records.lock().unwrap_or_else(|e| e.into_inner());
                        let mut seen_guard = seen.lock().unwrap_or_else(|e| e.into_inner());
                        for item in raw {
                            let t_seen = Duration::from_secs_f64(item.t_seen / 1000.0);
                            let dedup_key = (item.url.clone(), t_seen.as_millis() as u64);
                            if !seen_guard.insert(dedup_key) {
                                continue;
                            }
                            records_guard.push(CapturedRequest {
                                url: item.url,
                                method: item.method,
                                headers: Default::default(),
                                body_snippet: None,
                                resource_type: item.resource_type,
                                t_seen,
                                source: CaptureSource::InPage,
                            });
                        }
                    }
                    Err(e) if is_benign_capture_error(&e.to_string()) => {
                        tracing::debug!(error = %e, "in-page poll hit a transient navigation error");
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "in-page poll failed, page likely closed");
                        break;
                    }
                }
            }
        })
    }

    pub fn stop(&self) {
        self.stop.notify_waiters();
    }

    pub fn drain(&self) -> Vec<CapturedRequest> {
        self.records
            .lock()
            .map(|mut g| std::mem::take(&mut *g))
            .unwrap_or_default()
    }

    /// Non-destructive count, for the orchestrator's network-idle poll.
    pub fn len(&self) -> usize {
        self.records.lock().map(|g| g.len()).unwrap_or(0)
    }
}
