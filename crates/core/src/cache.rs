//! Generic in-process TTL cache backing the Result Cache, geo-IP cache, and
//! AI-response cache. Concurrent reads and writes are lock-free thanks to
//! `dashmap`; expiry is cooperative — entries are skipped on read once
//! stale, and reclaimed in bulk by a periodic janitor sweep rather than
//! individually on every access.

use crate::types::CacheEntry;
use dashmap::DashMap;
use std::hash::Hash;
use std::time::Duration;

/// Point-in-time counters surfaced at `GET /api/cache/stats`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

pub struct TtlCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    default_ttl: Duration,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
    evictions: std::sync::atomic::AtomicU64,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            hits: std::sync::atomic::AtomicU64::new(0),
            misses: std::sync::atomic::AtomicU64::new(0),
            evictions: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Returns a live value and bumps hit/miss counters. An expired entry is
    /// treated as a miss but is left in place for the janitor to collect.
    pub fn get(&self, key: &K) -> Option<V> {
        use std::sync::atomic::Ordering;

        match self.entries.get(key) {
            Some(entry) if !entry.is_expired_at(chrono::Utc::now()) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.data.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    /// Drops every entry expired as of `now`. Called on a fixed interval by
    /// the orchestrator's background janitor task, not on the request path.
    pub fn sweep(&self, now: chrono::DateTime<chrono::Utc>) -> usize {
        use std::sync::atomic::Ordering;

        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let reclaimed = before - self.entries.len();
        self.evictions.fetch_add(reclaimed as u64, Ordering::Relaxed);
        reclaimed
    }

    pub fn stats(&self) -> CacheStats {
        use std::sync::atomic::Ordering;

        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Snapshot of live keys, in arbitrary map-iteration order. Used by the
    /// cache-stats endpoint; not suitable for anything order-sensitive.
    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn hit_then_miss_after_expiry() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(3600));
        cache.set_with_ttl("k".to_string(), 1, Duration::from_millis(0));

        // Expired entries aren't pruned by get(), only counted as misses.
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get(&"k".to_string()), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn live_entry_is_a_hit() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(3600));
        cache.set("k".to_string(), 7);
        assert_eq!(cache.get(&"k".to_string()), Some(7));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn sweep_reclaims_expired_entries_only() {
        let cache: TtlCache<String, u32> = TtlCache::new(Duration::from_secs(3600));
        cache.set_with_ttl("stale".to_string(), 1, Duration::from_millis(0));
        cache.set("fresh".to_string(), 2);

        std::thread::sleep(Duration::from_millis(5));
        let reclaimed = cache.sweep(chrono::Utc::now());

        assert_eq!(reclaimed, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"fresh".to_string()), Some(2));
    }
}
