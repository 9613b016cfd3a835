//! Transport-layer capture: subscribes directly to the browser's CDP
//! `Network` events. This is the most reliable of the four layers — nothing
//! on the page can suppress it — so its records win merge ties.

use chromiumoxide::cdp::browser_protocol::network::EventRequestWillBeSent;
use futures::StreamExt;
use scan_core::{CaptureSource, CapturedRequest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

#[derive(Default)]
pub struct TransportCapture {
    records: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl TransportCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a task that drains `Network.requestWillBeSent` events onto the
    /// shared record buffer for as long as the page's event stream stays
    /// open. The task exits on its own once the page closes.
    pub async fn attach(&self, page: &chromiumoxide::Page, nav_start: Instant) -> Result<(), String> {
        let mut events = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| e.to_string())?;

        let records = self.records.clone();
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let headers: HashMap<String, String> = event
                    .request
                    .headers
                    .inner()
                    .as_object()
                    .map(|map| {
                        map.iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                            .collect()
                    })
                    .unwrap_or_default();

                let record = CapturedRequest {
                    url: event.request.url.clone(),
                    method: event.request.method.clone(),
                    headers,
                    body_snippet: event
                        .request
                        .post_data
                        .as_ref()
                        .map(|body| body.as_bytes().iter().take(4096).copied().collect()),
                    resource_type: event
                        .r#type
                        .as_ref()
                        .map(|t| format!("{:?}", t))
                        .unwrap_or_else(|| "other".to_string()),
                    t_seen: Instant::now().saturating_duration_since(nav_start),
                    source: CaptureSource::Transport,
                };

                if let Ok(mut guard) = records.lock() {
                    guard.push(record);
                }
            }
        });

        Ok(())
    }

    pub fn drain(&self) -> Vec<CapturedRequest> {
        self.records.lock().map(|mut g| std::mem::take(&mut *g)).unwrap_or_default()
    }

    /// Non-destructive count, for the orchestrator's network-idle poll.
    pub fn len(&self) -> usize {
        self.records.lock().map(|g| g.len()).unwrap_or(0)
    }
}
