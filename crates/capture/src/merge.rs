//! Merge policy for the four capture layers: records sharing a
//! `(normalized-url, floor(t_seen/50ms))` key collapse into one, keeping the
//! earliest `t_seen` and the richest (lowest-priority-number) source.

use scan_core::{normalize_url, CaptureSource, CapturedRequest};
use std::collections::HashMap;

/// Combines records from every attached layer into the single ordered
/// stream downstream phases consume. Ties are broken by `tSeen`, then by
/// source priority (`transport > inpage > sw > rewrite`, i.e. ascending
/// `CaptureSource` discriminant).
pub fn merge(streams: Vec<Vec<CapturedRequest>>) -> Vec<CapturedRequest> {
    let mut by_key: HashMap<(String, u128), CapturedRequest> = HashMap::new();

    for stream in streams {
        for record in stream {
            let key = (normalize_url(&record.url), record.t_seen.as_millis() / 50);
            match by_key.get(&key) {
                Some(existing) if !supersedes(&record, existing) => {}
                _ => {
                    by_key.insert(key, record);
                }
            }
        }
    }

    let mut merged: Vec<CapturedRequest> = by_key.into_values().collect();
    merged.sort_by(|a, b| a.t_seen.cmp(&b.t_seen).then(a.source.cmp(&b.source)));
    merged
}

/// `candidate` replaces `existing` when it was seen earlier, or at the same
/// instant but from a more reliable layer.
fn supersedes(candidate: &CapturedRequest, existing: &CapturedRequest) -> bool {
    match candidate.t_seen.cmp(&existing.t_seen) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Equal => candidate.source < existing.source,
        std::cmp::Ordering::Greater => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use std::time::Duration;

    fn record(url: &str, ms: u64, source: CaptureSource) -> CapturedRequest {
        CapturedRequest {
            url: url.to_string(),
            method: "GET".to_string(),
            headers: Map::new(),
            body_snippet: None,
            resource_type: "script".to_string(),
            t_seen: Duration::from_millis(ms),
            source,
        }
    }

    #[test]
    fn earliest_t_seen_wins_regardless_of_source() {
        let transport = record("https://example.com/a.js", 100, CaptureSource::Transport);
        let inpage = record("https://example.com/a.js", 10, CaptureSource::InPage);

        let merged = merge(vec![vec![transport], vec![inpage]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, CaptureSource::InPage);
    }

    #[test]
    fn same_bucket_prefers_more_reliable_source() {
        let inpage = record("https://example.com/a.js", 12, CaptureSource::InPage);
        let transport = record("https://example.com/a.js", 10, CaptureSource::Transport);

        let merged = merge(vec![vec![inpage], vec![transport]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, CaptureSource::Transport);
    }

    #[test]
    fn distinct_urls_both_survive() {
        let a = record("https://example.com/a.js", 10, CaptureSource::Transport);
        let b = record("https://example.com/b.js", 10, CaptureSource::Transport);

        let merged = merge(vec![vec![a, b]]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn output_is_ordered_by_t_seen() {
        let late = record("https://example.com/b.js", 500, CaptureSource::Transport);
        let early = record("https://example.com/a.js", 10, CaptureSource::Transport);

        let merged = merge(vec![vec![late, early]]);
        assert_eq!(merged[0].url, "https://example.com/a.js");
        assert_eq!(merged[1].url, "https://example.com/b.js");
    }
}
