//! tiercache - Two-Tier Memory/Disk Cache
//!
//! An in-process cache with an interchangeable LRU or LFU memory tier layered
//! in front of a size-bounded, persistent disk tier. A single manager handles
//! promotion of disk hits, TTL expiry, glob-based bulk invalidation, and
//! hit/miss statistics.
//!
//! # Architecture
//!
//! ```text
//! get:  Memory ──miss──▶ Disk ──hit──▶ promote into Memory
//! set:  Memory + Disk (unless memory_only)
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Cache tiers and the cache manager
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use tiercache::{CacheConfig, CacheManager, MemoryPolicy};
//!
//! let cache = CacheManager::with_config(CacheConfig {
//!     memory_policy: MemoryPolicy::Lfu,
//!     memory_size: 500,
//!     ..Default::default()
//! })?;
//!
//! cache.set("user:1", "alice", Some(Duration::from_secs(60)), false);
//! assert_eq!(cache.get("user:1").as_deref(), Some(&b"alice"[..]));
//!
//! cache.invalidate_pattern("user:*")?;
//! # Ok::<(), tiercache::Error>(())
//! ```

pub mod cache;
pub mod error;

// Re-export commonly used types
pub use cache::{
    CacheConfig, CacheEntry, CacheManager, CacheResult, CacheStatistics, CacheTier, DiskCache,
    LfuCache, LruCache, MemoryPolicy, MemoryTier,
};
pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
