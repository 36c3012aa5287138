//! Cache Manager - Unified Two-Tier Cache
//!
//! Composes one memory tier (LRU or LFU) with an optional disk tier.
//! Reads fall through memory to disk and promote disk hits into memory.
//!
//! There is no manager-level lock. Each tier locks itself, so a `get` that
//! misses memory and then reads disk may interleave with a concurrent `set`.
//! Such a read can be stale but never corrupt.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::disk::DiskCache;
use super::entry::CacheEntry;
use super::metrics::{CacheMetrics, CacheStatistics};
use super::policy::{MemoryPolicy, MemoryTier};
use super::{DEFAULT_DISK_SIZE_MB, DEFAULT_MEMORY_SIZE};
use crate::error::{Error, Result};

/// Cache tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// In-process memory tier
    Memory,
    /// Persistent disk tier
    Disk,
    /// Both tiers (only meaningful for `clear`)
    All,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTier::Memory => write!(f, "memory"),
            CacheTier::Disk => write!(f, "disk"),
            CacheTier::All => write!(f, "all"),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Memory tier eviction policy
    pub memory_policy: MemoryPolicy,
    /// Maximum entries in the memory tier
    pub memory_size: usize,
    /// Disk tier budget in megabytes
    pub disk_size_mb: u64,
    /// Disk tier directory (per-user cache directory when unset)
    pub cache_dir: Option<PathBuf>,
    /// Enable the disk tier
    pub enable_disk: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_policy: MemoryPolicy::Lru,
            memory_size: DEFAULT_MEMORY_SIZE,
            disk_size_mb: DEFAULT_DISK_SIZE_MB,
            cache_dir: None,
            enable_disk: true,
        }
    }
}

impl CacheConfig {
    /// Parse a YAML configuration document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("invalid cache configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject sizes the tiers cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.memory_size == 0 {
            return Err(Error::Config("memory_size must be at least 1".to_string()));
        }
        if self.enable_disk && self.disk_size_mb == 0 {
            return Err(Error::Config("disk_size_mb must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Directory the disk tier uses
    pub fn resolved_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// Per-user cache directory, falling back to the system temp dir
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tiercache")
}

/// Cache lookup result
#[derive(Debug, Clone)]
pub struct CacheResult {
    /// The cached value
    pub value: Bytes,
    /// Which tier served the value
    pub tier: CacheTier,
    /// Lookup latency
    pub latency: Duration,
}

/// Unified cache manager
pub struct CacheManager {
    memory: Box<dyn MemoryTier>,
    disk: Option<DiskCache>,
    config: CacheConfig,
    metrics: CacheMetrics,
}

impl CacheManager {
    /// Create a new cache manager with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(CacheConfig::default())
    }

    /// Create a new cache manager with custom configuration
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let memory = config.memory_policy.build(config.memory_size);
        let disk = if config.enable_disk {
            Some(DiskCache::new(
                config.resolved_cache_dir(),
                config.disk_size_mb,
            )?)
        } else {
            None
        };

        info!(
            policy = %config.memory_policy,
            memory_size = config.memory_size,
            disk_dir = ?disk.as_ref().map(|d| d.cache_dir().display().to_string()),
            disk_size_mb = config.disk_size_mb,
            "cache manager initialized"
        );

        Ok(Self {
            memory,
            disk,
            config,
            metrics: CacheMetrics::new(),
        })
    }

    /// Get a value, searching memory then disk
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.lookup(key).map(|result| result.value)
    }

    /// Like [`get`](Self::get), also reporting the serving tier
    pub fn lookup(&self, key: &str) -> Option<CacheResult> {
        let start = Instant::now();

        if let Some(value) = self.memory.get(key) {
            self.metrics.record_memory_hit();
            return Some(CacheResult {
                value,
                tier: CacheTier::Memory,
                latency: start.elapsed(),
            });
        }

        if let Some(disk) = &self.disk {
            if let Some(entry) = disk.get(key) {
                self.metrics.record_disk_hit();

                // Memory only; the record is already on disk
                let value = entry.value().clone();
                self.memory.set(key.to_string(), entry);
                self.metrics.record_promotion();
                debug!(key, "promoted disk hit to memory");

                return Some(CacheResult {
                    value,
                    tier: CacheTier::Disk,
                    latency: start.elapsed(),
                });
            }
        }

        self.metrics.record_miss();
        None
    }

    /// Store a value in memory and, unless `memory_only`, on disk
    pub fn set(
        &self,
        key: &str,
        value: impl Into<Bytes>,
        ttl: Option<Duration>,
        memory_only: bool,
    ) {
        let entry = CacheEntry::new(key, value, ttl);

        if !memory_only {
            if let Some(disk) = &self.disk {
                disk.set(key, &entry);
            }
        }
        self.memory.set(key.to_string(), entry);
        self.metrics.record_set();
    }

    /// Remove a key from every tier; true if any tier held it
    pub fn delete(&self, key: &str) -> bool {
        let in_memory = self.memory.delete(key);
        let on_disk = self.disk.as_ref().is_some_and(|disk| disk.delete(key));

        let deleted = in_memory || on_disk;
        if deleted {
            self.metrics.record_delete();
        }
        deleted
    }

    /// Check if any tier holds a live value, without recording an access
    pub fn exists(&self, key: &str) -> bool {
        if self.memory.contains(key) {
            return true;
        }
        self.disk.as_ref().is_some_and(|disk| disk.contains(key))
    }

    /// Remove every key matching a glob pattern from both tiers
    ///
    /// Enumerating disk keys decodes every record file.
    pub fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let matcher = glob::Pattern::new(pattern).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut keys: BTreeSet<String> = self.memory.keys().into_iter().collect();
        if let Some(disk) = &self.disk {
            keys.extend(disk.keys());
        }

        let mut removed = 0;
        for key in keys.iter().filter(|key| matcher.matches(key)) {
            let in_memory = self.memory.delete(key);
            let on_disk = self.disk.as_ref().is_some_and(|disk| disk.delete(key));
            if in_memory || on_disk {
                removed += 1;
            }
        }

        self.metrics.record_invalidations(removed as u64);
        debug!(pattern, removed, "pattern invalidation");
        Ok(removed)
    }

    /// Clear the requested tier(s); statistics are kept
    pub fn clear(&self, tier: CacheTier) {
        if matches!(tier, CacheTier::Memory | CacheTier::All) {
            self.memory.clear();
        }
        if matches!(tier, CacheTier::Disk | CacheTier::All) {
            if let Some(disk) = &self.disk {
                disk.clear();
            }
        }
        info!(%tier, "cache cleared");
    }

    /// Drop expired entries from every tier; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let memory = self.memory.purge_expired();
        let disk = self.disk.as_ref().map_or(0, DiskCache::purge_expired);
        debug!(memory, disk, "purged expired entries");
        memory + disk
    }

    /// Get statistics snapshot
    pub fn get_statistics(&self) -> CacheStatistics {
        let disk_size = self.disk.as_ref().map_or(0, DiskCache::len);
        self.metrics.snapshot(self.memory.len(), disk_size)
    }

    /// Zero all counters; cached data is untouched
    pub fn reset_statistics(&self) {
        self.metrics.reset();
        info!("cache statistics reset");
    }

    /// Get reference to the memory tier
    pub fn memory(&self) -> &dyn MemoryTier {
        self.memory.as_ref()
    }

    /// Get reference to the disk tier
    pub fn disk(&self) -> Option<&DiskCache> {
        self.disk.as_ref()
    }

    /// Get configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("memory_policy", &self.memory.policy())
            .field("memory_size", &self.memory.len())
            .field("disk", &self.disk)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
