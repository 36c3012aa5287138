//! LFU Memory Tier
//!
//! Bounded cache that evicts the entry with the lowest access count. The
//! victim is found with a linear scan; ties go to the entry accessed least
//! recently.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use super::entry::CacheEntry;
use super::policy::{MemoryPolicy, MemoryTier};

/// LFU cache - evicts the least frequently used entry
pub struct LfuCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    max_size: usize,
    evictions: AtomicU64,
}

impl LfuCache {
    /// Create a new LFU cache holding at most `max_size` entries (minimum 1)
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_size: max_size.max(1),
            evictions: AtomicU64::new(0),
        }
    }

    /// Access count of a held entry
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.entries.lock().get(key).map(CacheEntry::access_count)
    }

    fn evict_one(&self, entries: &mut HashMap<String, CacheEntry>) {
        let victim = entries
            .iter()
            .min_by_key(|(_, entry)| (entry.access_count(), entry.accessed_at()))
            .map(|(key, _)| key.clone());

        if let Some(victim) = victim {
            entries.remove(&victim);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(key = %victim, "lfu evicted");
        }
    }
}

impl MemoryTier for LfuCache {
    fn policy(&self) -> MemoryPolicy {
        MemoryPolicy::Lfu
    }

    fn get(&self, key: &str) -> Option<Bytes> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(key)?;

        if entry.is_expired() {
            entries.remove(key);
            trace!(key, "lfu entry expired");
            return None;
        }

        entry.touch();
        Some(entry.value().clone())
    }

    fn set(&self, key: String, entry: CacheEntry) {
        let mut entries = self.entries.lock();

        // Make room before inserting so a fresh entry is never its own victim
        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            self.evict_one(&mut entries);
        }
        entries.insert(key, entry);
    }

    fn delete(&self, key: &str) -> bool {
        self.entries.lock().remove(key).is_some()
    }

    fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
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

    fn put(cache: &LfuCache, key: &str) {
        cache.set(key.to_string(), CacheEntry::new(key, key.to_uppercase(), None));
    }

    #[test]
    fn test_put_get_counts_frequency() {
        let cache = LfuCache::new(3);
        put(&cache, "a");
        assert_eq!(cache.frequency("a"), Some(0));

        cache.get("a");
        cache.get("a");
        assert_eq!(cache.frequency("a"), Some(2));
        assert_eq!(cache.get("a").unwrap().as_ref(), b"A");
    }

    #[test]
    fn test_evicts_least_frequent() {
        let cache = LfuCache::new(3);
        for key in ["a", "b", "c"] {
            put(&cache, key);
        }

        cache.get("a");
        cache.get("a");
        cache.get("b");
        put(&cache, "d");

        assert_eq!(cache.len(), 3);
        assert!(!cache.contains("c"));
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_some());
        assert!(cache.get("d").is_some());
        assert_eq!(cache.evictions(), 1);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = LfuCache::new(2);
        put(&cache, "a");
        put(&cache, "b");

        cache.set("a".into(), CacheEntry::new("a", "A2", None));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.evictions(), 0);
        assert_eq!(cache.get("a").unwrap().as_ref(), b"A2");
    }

    #[test]
    fn test_expired_entry_removed_on_get() {
        let cache = LfuCache::new(3);
        cache.set(
            "old".into(),
            CacheEntry::with_created_at(
                "old",
                "v",
                Some(Duration::from_secs(1)),
                Utc::now() - chrono::Duration::seconds(5),
            ),
        );

        assert!(cache.get("old").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_delete_clear_keys() {
        let cache = LfuCache::new(3);
        put(&cache, "a");
        put(&cache, "b");

        assert!(cache.delete("b"));
        assert!(!cache.delete("b"));
        assert_eq!(cache.keys(), vec!["a".to_string()]);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let cache = LfuCache::new(4);
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
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(LfuCache::new(32));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..300 {
                        let key = format!("k-{}-{}", t, i % 50);
                        cache.set(key.clone(), CacheEntry::new(key.clone(), vec![1u8], None));
                        cache.get(&key);
                        assert!(cache.len() <= 32);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 32);
    }
}
