//! Service-worker relay capture: an init script registers a worker served
//! from a blob URL. The worker listens for `fetch` events and posts
//! `{type:'SW_REQUEST', data}` back to every client; the page side collects
//! these into `window.__swRequests` for the same polling harness shape the
//! in-page layer uses.

use crate::benign::is_benign_capture_error;
use scan_browser::BrowserSession;
use scan_core::{CaptureSource, CapturedRequest};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Registers the worker (served from a blob URL so no extra network request
/// reveals its presence to the page under test) and installs the page-side
/// message collector.
pub const SERVICE_WORKER_INIT_SCRIPT: &str = r#"
(() => {
  if (window.__swRequests) return;
  window.__swRequests = [];

  window.addEventListener('message', (event) => {
    if (event.data && event.data.type === 'SW_REQUEST') {
      if (window.__swRequests.length >= 500) window.__swRequests.shift();
      window.__swRequests.push(event.data.data);
    }
  });

  if ('serviceWorker' in navigator) {
    const blob = new Blob([`
      self.addEventListener('fetch', (event) => {
        try {
          const req = event.request;
          self.clients.matchAll().then((clients) => {
            clients.forEach((client) => client.postMessage({
              type: 'SW_REQUEST',
              data: { url: req.url, method: req.method, tSeen: performance.now() },
            }));
          });
        } catch (e) {}
      });
    `], { type: 'application/javascript' });
    const workerUrl = URL.createObjectURL(blob);
    navigator.serviceWorker.register(workerUrl).catch(() => {});
  }
})();
"#;

const DRAIN_SCRIPT: &str = r#"
(() => {
  const items = window.__swRequests || [];
  window.__swRequests = [];
  return items;
})()
"#;

#[derive(Debug, serde::Deserialize)]
struct RawRecord {
    url: String,
    method: String,
    t_seen: f64,
}

#[derive(Default)]
pub struct ServiceWorkerCapture {
    records: Arc<Mutex<Vec<CapturedRequest>>>,
    seen: Arc<Mutex<HashSet<(String, u64)>>>,
    stop: Arc<Notify>,
}

impl ServiceWorkerCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the worker bootstrap and spawns the same-cadence poller the
    /// in-page layer uses. Registration failures (e.g. a page that disallows
    /// service workers over the navigated origin) degrade to an empty
    /// stream rather than failing the scan — this layer is defense-in-depth,
    /// not load-bearing.
    pub async fn attach(&self, session: Arc<BrowserSession>) -> JoinHandle<()> {
        if let Err(e) = session.add_init_script(SERVICE_WORKER_INIT_SCRIPT).await {
            tracing::warn!(error = %e, "failed to install service-worker relay script");
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
                                resource_type: "xhr".to_string(),
                                t_seen,
                                source: CaptureSource::ServiceWorker,
                            });
                        }
                    }
                    Err(e) if is_benign_capture_error(&e.to_string()) => {
                        tracing::debug!(error = %e, "service-worker poll hit a transient navigation error");
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "service-worker poll failed, page likely closed");
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
