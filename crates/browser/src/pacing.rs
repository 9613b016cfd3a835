//! Human-pacing jitter for interaction delays. Every click, type, and scroll
//! the Consent Interactor performs is drawn from a uniform jitter around a
//! base duration rather than fired instantly, so automated interaction
//! timing doesn't stand out against a human's.

use rand::Rng;
use std::time::Duration;

const ACTION_BASE_MS: u64 = 400;
const ACTION_JITTER_PCT: f64 = 0.60;

const TYPING_BASE_MS: u64 = 150;
const TYPING_JITTER_PCT: f64 = 0.50;

/// Draws a duration uniformly from `base * (1 - pct)` to `base * (1 + pct)`.
fn jittered(base_ms: u64, pct: f64) -> Duration {
    let lo = (base_ms as f64 * (1.0 - pct)).max(0.0);
    let hi = base_ms as f64 * (1.0 + pct);
    let ms = rand::thread_rng().gen_range(lo..=hi);
    Duration::from_millis(ms as u64)
}

/// Jitter for a discrete UI action (click, scroll).
pub fn action_delay() -> Duration {
    jittered(ACTION_BASE_MS, ACTION_JITTER_PCT)
}

/// Jitter for a single keystroke while typing.
pub fn typing_delay() -> Duration {
    jittered(TYPING_BASE_MS, TYPING_JITTER_PCT)
}

/// Sleeps for an action-paced delay.
pub async fn pace_action() {
    tokio::time::sleep(action_delay()).await;
}

/// Sleeps for a typing-paced delay.
pub async fn pace_keystroke() {
    tokio::time::sleep(typing_delay()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_delay_stays_within_jitter_band() {
        for _ in 0..200 {
            let delay = action_delay();
            assert!(delay.as_millis() >= (ACTION_BASE_MS as f64 * (1.0 - ACTION_JITTER_PCT)) as u128);
            assert!(delay.as_millis() <= (ACTION_BASE_MS as f64 * (1.0 + ACTION_JITTER_PCT)) as u128 + 1);
        }
    }

    #[test]
    fn typing_delay_stays_within_jitter_band() {
        for _ in 0..200 {
            let delay = typing_delay();
            assert!(delay.as_millis() <= (TYPING_BASE_MS as f64 * (1.0 + TYPING_JITTER_PCT)) as u128 + 1);
        }
    }
}
