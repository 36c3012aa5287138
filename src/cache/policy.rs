//! Memory Tier Policies
//!
//! The memory tier is one of two interchangeable eviction strategies chosen
//! once at construction time.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::entry::CacheEntry;
use super::lfu::LfuCache;
use super::lru::LruCache;
use crate::error::{Error, Result};

/// Bounded in-process cache tier
///
/// Implementations own their own lock; every method is safe to call from
/// any thread.
pub trait MemoryTier: Send + Sync {
    /// Policy this tier evicts by
    fn policy(&self) -> MemoryPolicy;

    /// Get a live value, recording the access
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Insert or replace an entry, evicting if over capacity
    fn set(&self, key: String, entry: CacheEntry);

    /// Remove an entry; returns true if it was present
    fn delete(&self, key: &str) -> bool;

    /// Check for a live entry without recording an access
    fn contains(&self, key: &str) -> bool;

    /// Remove every entry
    fn clear(&self);

    /// Keys currently held (including not-yet-detected expired entries)
    fn keys(&self) -> Vec<String>;

    /// Drop every expired entry; returns how many were removed
    fn purge_expired(&self) -> usize;

    /// Number of entries held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries
    fn capacity(&self) -> usize;

    /// Entries evicted to satisfy the capacity bound
    fn evictions(&self) -> u64;
}

/// Memory tier eviction policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MemoryPolicy {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used
    Lfu,
}

impl MemoryPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryPolicy::Lru => "lru",
            MemoryPolicy::Lfu => "lfu",
        }
    }

    /// Build a memory tier with this policy
    pub fn build(self, capacity: usize) -> Box<dyn MemoryTier> {
        match self {
            MemoryPolicy::Lru => Box::new(LruCache::new(capacity)),
            MemoryPolicy::Lfu => Box::new(LfuCache::new(capacity)),
        }
    }
}

impl fmt::Display for MemoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(MemoryPolicy::Lru),
            "lfu" => Ok(MemoryPolicy::Lfu),
            other => Err(Error::Config(format!(
                "unknown memory policy '{}' (expected 'lru' or 'lfu')",
                other
            ))),
        }
    }
}

impl TryFrom<String> for MemoryPolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MemoryPolicy> for String {
    fn from(policy: MemoryPolicy) -> Self {
        policy.as_str().to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
