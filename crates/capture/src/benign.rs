//! Recognizes the transient CDP errors a polling harness hits mid-navigation.
//! These are expected and are swallowed by design rather than surfaced as
//! `CaptureContextDestroyed`; anything else propagates.

const BENIGN_SUBSTRINGS: &[&str] = &["Execution context was destroyed", "Target closed"];

pub fn is_benign_capture_error(message: &str) -> bool {
    BENIGN_SUBSTRINGS.iter().any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_context_destroyed() {
        assert!(is_benign_capture_error("Execution context was destroyed."));
    }

    #[test]
    fn recognizes_target_closed() {
        assert!(is_benign_capture_error("Target closed."));
    }

    #[test]
    fn rejects_unrelated_errors() {
        assert!(!is_benign_capture_error("connection refused"));
    }
}
