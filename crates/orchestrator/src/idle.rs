//! Post-consent network-idle detection: poll `CaptureLayers::pending_count()`
//! and call the page settled once a tick passes with no new requests,
//! subject to a minimum and maximum wait.

use crate::cancellation::CancellationToken;
use scan_capture::CaptureLayers;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const IDLE_WINDOW: Duration = Duration::from_secs(2);
const MIN_WAIT: Duration = Duration::from_secs(1);
const MAX_WAIT: Duration = Duration::from_secs(15);

/// Returns once the page has gone 2s without a new captured request, the
/// 15s ceiling is hit, or the token is cancelled — whichever comes first.
/// Never returns before `MIN_WAIT` has elapsed.
pub async fn wait_for_network_idle(capture: &CaptureLayers, cancel: &CancellationToken) {
    let started = Instant::now();
    let mut last_count = capture.pending_count();
    let mut last_change = started;

    loop {
        tokio::time::sleep(POLL_INTERVAL).await;

        if cancel.is_cancelled() {
            return;
        }

        let elapsed = started.elapsed();
        if elapsed >= MAX_WAIT {
            return;
        }

        let count = capture.pending_count();
        if count != last_count {
            last_count = count;
            last_change = Instant::now();
        }

        if elapsed >= MIN_WAIT && last_change.elapsed() >= IDLE_WINDOW {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_internally_consistent() {
        assert!(MIN_WAIT < IDLE_WINDOW + MIN_WAIT);
        assert!(IDLE_WINDOW < MAX_WAIT);
        assert!(MIN_WAIT < MAX_WAIT);
    }
}
