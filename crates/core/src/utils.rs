//! Small domain helpers used across crates: canonical JSON serialization for
//! stable hashing, and SHA-256 digests for evidence chaining.

use sha2::{Digest, Sha256};

/// Serializes `value` with all object keys sorted recursively, so that two
/// semantically identical values always hash to the same bytes regardless
/// of field insertion order. Used for the certificate's evidence hashes and
/// the request-log/audit-trail digests.
pub fn canonical_json(value: &serde_json::Value) -> String {
    serde_json::to_string(&sort_keys(value)).expect("canonical JSON values are always serializable")
}

fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_keys).collect())
        }
        other => other.clone(),
    }
}

/// SHA-256 digest of arbitrary bytes, hex-encoded. Used for screenshot,
/// request-log, and audit-trail evidence hashes in the compliance
/// certificate.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Hash of the canonical JSON form of a serializable value.
pub fn sha256_of_json(value: &serde_json::Value) -> String {
    sha256_hex(canonical_json(value).as_bytes())
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut out, "{:02x}", byte).expect("writing to a String cannot fail");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_is_stable_under_key_reordering() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn canonical_json_sorts_nested_objects() {
        let value = json!({"outer": {"z": 1, "a": 2}});
        assert_eq!(canonical_json(&value), r#"{"outer":{"a":2,"z":1}}"#);
    }

    #[test]
    fn sha256_hex_matches_known_digest() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
        );
    }

    #[test]
    fn sha256_of_json_is_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(sha256_of_json(&a), sha256_of_json(&b));
    }
}
