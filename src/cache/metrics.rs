//! Cache Metrics Collection
//!
//! Hit/miss and mutation counters for the cache manager.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cache metrics collector
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
    invalidations: AtomicU64,
    promotions: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_memory_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disk_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidations(&self, count: u64) {
        self.invalidations.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn promotions(&self) -> u64 {
        self.promotions.load(Ordering::Relaxed)
    }

    /// Zero every counter
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.memory_hits,
            &self.disk_hits,
            &self.sets,
            &self.deletes,
            &self.invalidations,
            &self.promotions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Take a snapshot of the counters together with tier sizes
    pub fn snapshot(&self, memory_size: usize, disk_size: usize) -> CacheStatistics {
        let hits = self.hits();
        let misses = self.misses();
        let total_requests = hits + misses;

        CacheStatistics {
            total_requests,
            hits,
            misses,
            hit_rate_percent: hit_rate_percent(hits, misses),
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            promotions: self.promotions(),
            memory_size,
            disk_size,
        }
    }
}

/// `hits / (hits + misses) * 100`, or 0 with no requests
pub fn hit_rate_percent(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64 * 100.0
    }
}

/// Point-in-time cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate_percent: f64,
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub sets: u64,
    pub deletes: u64,
    pub invalidations: u64,
    /// Disk hits copied into the memory tier
    pub promotions: u64,
    /// Entries in the memory tier
    pub memory_size: usize,
    /// Record files in the disk tier (0 when disabled)
    pub disk_size: usize,
}

// =============================================================================
// Tests
// =============================================================================
