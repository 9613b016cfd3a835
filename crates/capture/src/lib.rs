//! Four-layer defense-in-depth network capture: CDP transport, an in-page
//! fetch/XHR monkey-patch, a service-worker relay, and a script response
//! rewriter. Each layer can be individually defeated by a sufficiently
//! hostile page; running all four and merging their output is what makes
//! the capture resistant to any single evasion technique.

pub mod benign;
pub mod inpage;
pub mod merge;
pub mod rewriter;
pub mod service_worker;
pub mod transport;

pub use benign::is_benign_capture_error;
pub use inpage::InPageCapture;
pub use merge::merge;
pub use rewriter::ScriptRewriter;
pub use service_worker::ServiceWorkerCapture;
pub use transport::TransportCapture;

use scan_browser::BrowserSession;
use scan_core::CapturedRequest;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Owns all four capture layers for a single scan and exposes the merged
/// stream. `attach` must be called before navigation so the in-page script
/// and the rewriter's route interception are in place for the first
/// request; `transport` is cheap to attach at any point since it listens
/// on the CDP connection rather than patching the page.
pub struct CaptureLayers {
    transport: TransportCapture,
    inpage: InPageCapture,
    service_worker: ServiceWorkerCapture,
    rewriter_task: Option<JoinHandle<()>>,
    inpage_task: Option<JoinHandle<()>>,
    sw_task: Option<JoinHandle<()>>,
}

impl CaptureLayers {
    pub fn new() -> Self {
        Self {
            transport: TransportCapture::new(),
            inpage: InPageCapture::new(),
            service_worker: ServiceWorkerCapture::new(),
            rewriter_task: None,
            inpage_task: None,
            sw_task: None,
        }
    }

    /// Attaches every layer. Transport and rewriter failures are surfaced
    /// since they depend on CDP domains that, if unavailable, indicate a
    /// browser too degraded to trust; in-page and service-worker failures
    /// degrade gracefully since they are defense-in-depth on top of
    /// transport, not load-bearing on their own.
    pub async fn attach(&mut self, session: Arc<BrowserSession>, nav_start: Instant) -> Result<(), String> {
        self.transport.attach(&session.page, nav_start).await?;

        self.inpage_task = Some(self.inpage.attach(session.clone()).await);
        self.sw_task = Some(self.service_worker.attach(session.clone()).await);
        self.rewriter_task = Some(ScriptRewriter::attach(session, nav_start).await?);

        Ok(())
    }

    /// Non-destructive total across all three polled layers, used by the
    /// orchestrator's post-consent network-idle wait to detect when no new
    /// request has arrived recently without tearing down capture early.
    pub fn pending_count(&self) -> usize {
        self.transport.len() + self.inpage.len() + self.service_worker.len()
    }

    /// Stops the polling layers and returns the merged, deduplicated,
    /// time-ordered stream. The transport and rewriter tasks are left to
    /// exit on their own once the page closes; they hold no resources
    /// worth forcing down early.
    pub fn finish(&self) -> Vec<CapturedRequest> {
        self.inpage.stop();
        self.service_worker.stop();

        merge(vec![
            self.transport.drain(),
            self.inpage.drain(),
            self.service_worker.drain(),
        ])
    }
}

impl Default for CaptureLayers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_layers_have_no_background_tasks_until_attached() {
        let layers = CaptureLayers::new();
        assert!(layers.rewriter_task.is_none());
        assert!(layers.inpage_task.is_none());
        assert!(layers.sw_task.is_none());
    }

    #[test]
    fn finish_on_unattached_layers_yields_empty_stream() {
        let layers = CaptureLayers::new();
        assert!(layers.finish().is_empty());
    }
}
