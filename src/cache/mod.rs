//! Two-Tier Cache System
//!
//! A bounded memory tier (LRU or LFU) in front of a size-bounded,
//! persistent disk tier, unified behind [`CacheManager`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Cache Manager                         │
//! │        (promotion, TTL, pattern invalidation, stats)         │
//! ├──────────────────────────────┬───────────────────────────────┤
//! │  Memory Tier                 │  Disk Tier (optional)         │
//! │  ┌────────────────────────┐  │  ┌─────────────────────────┐  │
//! │  │ LruCache  |  LfuCache  │  │  │ one record file per key │  │
//! │  │ max_size entries       │  │  │ max_size_bytes budget   │  │
//! │  └────────────────────────┘  │  └─────────────────────────┘  │
//! │             ▲                │               │               │
//! │             └──── promotion on disk hit ─────┘               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - One lock per tier instance, never exposed; no manager-level lock
//! - Cross-tier operations are not atomic; the cache is never authoritative
//! - Disk failures degrade to misses and dropped writes

mod disk;
mod entry;
mod lfu;
mod lru;
mod manager;
mod metrics;
mod policy;
mod proptest;

pub use disk::{DiskCache, ENTRY_EXTENSION};
pub use entry::CacheEntry;
pub use lfu::LfuCache;
pub use lru::LruCache;
pub use manager::{default_cache_dir, CacheConfig, CacheManager, CacheResult, CacheTier};
pub use metrics::{hit_rate_percent, CacheMetrics, CacheStatistics};
pub use policy::{MemoryPolicy, MemoryTier};

/// Default memory tier capacity (entries)
pub const DEFAULT_MEMORY_SIZE: usize = 1000;

/// Default disk tier budget (megabytes)
pub const DEFAULT_DISK_SIZE_MB: u64 = 100;

// =============================================================================
// Tests
// =============================================================================
