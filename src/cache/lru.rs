//! LRU Memory Tier
//!
//! Bounded, recency-ordered cache. A monotonically increasing tick stamps
//! each access; a `BTreeMap` keyed by tick keeps the recency order so the
//! least recently used entry is always the first one.
//!
//! `get` reorders entries, so reads take the same exclusive lock as writes.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use super::entry::CacheEntry;
use super::policy::{MemoryPolicy, MemoryTier};

struct Slot {
    entry: CacheEntry,
    tick: u64,
}

#[derive(Default)]
struct LruState {
    entries: HashMap<String, Slot>,
    /// tick -> key, oldest first
    order: BTreeMap<u64, String>,
    next_tick: u64,
}

impl LruState {
    fn take(&mut self, key: &str) -> Option<CacheEntry> {
        let slot = self.entries.remove(key)?;
        self.order.remove(&slot.tick);
        Some(slot.entry)
    }

    fn push_most_recent(&mut self, key: String, entry: CacheEntry) {
        let tick = self.next_tick;
        self.next_tick += 1;
        self.order.insert(tick, key.clone());
        self.entries.insert(key, Slot { entry, tick });
    }
}

/// LRU cache - evicts the least recently used entry
pub struct LruCache {
    state: Mutex<LruState>,
    max_size: usize,
    evictions: AtomicU64,
}

impl LruCache {
    /// Create a new LRU cache holding at most `max_size` entries (minimum 1)
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(LruState::default()),
            max_size: max_size.max(1),
            evictions: AtomicU64::new(0),
        }
    }

    /// Keys from least to most recently used
    pub fn keys_by_recency(&self) -> Vec<String> {
        self.state.lock().order.values().cloned().collect()
    }
}

impl MemoryTier for LruCache {
    fn policy(&self) -> MemoryPolicy {
        MemoryPolicy::Lru
    }

    fn get(&self, key: &str) -> Option<Bytes> {
        let mut state = self.state.lock();
        let mut entry = state.take(key)?;

        if entry.is_expired() {
            trace!(key, "lru entry expired");
            return None;
        }

        entry.touch();
        let value = entry.value().clone();
        state.push_most_recent(key.to_string(), entry);
        Some(value)
    }

    fn set(&self, key: String, entry: CacheEntry) {
        let mut state = self.state.lock();
        state.take(&key);
        state.push_most_recent(key, entry);

        if state.entries.len() > self.max_size {
            if let Some((_, oldest)) = state.order.pop_first() {
                state.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                trace!(key = %oldest, "lru evicted");
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        self.state.lock().take(key).is_some()
    }

    fn contains(&self, key: &str) -> bool {
        self.state
            .lock()
            .entries
            .get(key)
            .is_some_and(|slot| !slot.entry.is_expired())
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.order.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.state.lock().entries.keys().cloned().collect()
    }

    fn purge_expired(&self) -> usize {
        let mut state = self.state.lock();
        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, slot)| slot.entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.take(key);
        }
        expired.len()
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn capacity(&self) -> usize {
        self.max_size
    }

    fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::Utc;

    fn put(cache: &LruCache, key: &str) {
        cache.set(key.to_string(), CacheEntry::new(key, key.to_uppercase(), None));
    }

    #[test]
    fn test_put_get() {
        let cache = LruCache::new(3);
        put(&cache, "a");

        assert_eq!(cache.get("a").unwrap().as_ref(), b"A");
        assert!(cache.get("missing").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_oldest_insert() {
        let cache = LruCache::new(3);
        for key in ["a", "b", "c", "d"] {
            put(&cache, key);
        }

        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("d").unwrap().as_ref(), b"D");
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.evictions(), 1);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = LruCache::new(3);
        for key in ["a", "b", "c"] {
            put(&cache, key);
        }

        cache.get("a");
        put(&cache, "d");

        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn test_recency_order() {
        let cache = LruCache::new(5);
        for key in ["a", "b", "c"] {
            put(&cache, key);
        }
        cache.get("a");
        cache.get("b");

        assert_eq!(cache.keys_by_recency(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_overwrite_moves_to_most_recent() {
        let cache = LruCache::new(3);
        for key in ["a", "b", "c"] {
            put(&cache, key);
        }

        cache.set("a".into(), CacheEntry::new("a", "A2", None));
        put(&cache, "d");

        assert_eq!(cache.len(), 3);
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").unwrap().as_ref(), b"A2");
        assert_eq!(cache.evictions(), 1);
    }

    #[test]
    fn test_expired_entry_is_dropped_on_get() {
        let cache = LruCache::new(3);
        let stale = CacheEntry::with_created_at(
            "old",
            "v",
            Some(Duration::from_secs(1)),
            Utc::now() - chrono::Duration::seconds(10),
        );
        cache.set("old".into(), stale);
        assert_eq!(cache.len(), 1);
        assert!(!cache.contains("old"));

        assert!(cache.get("old").is_none());
        assert_eq!(cache.len(), 0);
        assert!(cache.keys_by_recency().is_empty());
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = LruCache::new(3);
        put(&cache, "a");
        put(&cache, "b");

        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        assert_eq!(cache.keys(), vec!["b".to_string()]);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.keys_by_recency().is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = LruCache::new(4);
        put(&cache, "live");
        cache.set(
            "dead".into(),
            CacheEntry::with_created_at(
                "dead",
                "v",
                Some(Duration::from_millis(1)),
                Utc::now() - chrono::Duration::seconds(1),
            ),
        );

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.keys(), vec!["live".to_string()]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache = LruCache::new(0);
        assert_eq!(cache.capacity(), 1);
        put(&cache, "a");
        put(&cache, "b");
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("b"));
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(LruCache::new(64));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("k-{}-{}", t, i % 100);
                        cache.set(key.clone(), CacheEntry::new(key.clone(), vec![i as u8], None));
                        cache.get(&key);
                        assert!(cache.len() <= 64);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 64);
        assert_eq!(cache.keys_by_recency().len(), 64);
    }
}
