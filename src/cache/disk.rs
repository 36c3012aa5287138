//! Disk Tier - Persistent, Size-Bounded Cache
//!
//! One file per key under the cache directory, named by a stable hash of
//! the key. There is no index file: the directory listing is the index.
//!
//! # Design
//!
//! - Records are written to a temporary file and renamed into place
//! - Before each write, the oldest files (by modification time) are removed
//!   until the new record fits the byte budget
//! - A record larger than the whole budget is still written
//! - Reads never rewrite files; access metadata on disk stays as written
//! - Every filesystem or decode failure is logged and turned into a miss or
//!   a dropped write

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::entry::{fx_hash, CacheEntry};
use crate::error::Result;

/// File extension of persisted records
pub const ENTRY_EXTENSION: &str = "cache";

/// Extension used while a record is being written
const TEMP_EXTENSION: &str = "tmp";

/// Bytes per megabyte of disk budget
const BYTES_PER_MB: u64 = 1024 * 1024;

struct DiskFile {
    path: PathBuf,
    len: u64,
    modified: SystemTime,
}

/// Disk cache - persistent file-backed tier
pub struct DiskCache {
    cache_dir: PathBuf,
    max_size_bytes: u64,
    /// Serializes all filesystem access so the byte budget holds
    lock: Mutex<()>,
    evictions: AtomicU64,
}

impl DiskCache {
    /// Create a disk cache with a budget in megabytes
    pub fn new(cache_dir: impl Into<PathBuf>, max_size_mb: u64) -> Result<Self> {
        Self::with_max_bytes(cache_dir, max_size_mb.saturating_mul(BYTES_PER_MB))
    }

    /// Create a disk cache with a budget in bytes
    pub fn with_max_bytes(cache_dir: impl Into<PathBuf>, max_size_bytes: u64) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        debug!(
            dir = %cache_dir.display(),
            max_size_bytes,
            "disk cache ready"
        );

        Ok(Self {
            cache_dir,
            max_size_bytes,
            lock: Mutex::new(()),
            evictions: AtomicU64::new(0),
        })
    }

    /// Get cache directory
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get byte budget
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Path of the file holding `key`
    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{:016x}.{}", fx_hash(key.as_bytes()), ENTRY_EXTENSION))
    }

    /// Get a live entry, removing it if expired
    ///
    /// The returned copy is touched; the file is not rewritten.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        match self.try_get(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "disk cache read failed");
                None
            }
        }
    }

    fn try_get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let _guard = self.lock.lock();
        let path = self.entry_path(key);

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut entry = CacheEntry::decode(&data)?;
        if entry.key() != key {
            debug!(key, stored = entry.key(), "disk cache hash collision");
            return Ok(None);
        }

        if entry.is_expired() {
            trace!(key, "disk entry expired");
            remove_if_present(&path)?;
            return Ok(None);
        }

        entry.touch();
        Ok(Some(entry))
    }

    /// Check for a live record without touching or removing it
    pub fn contains(&self, key: &str) -> bool {
        let _guard = self.lock.lock();
        match read_entry(&self.entry_path(key)) {
            Ok(entry) => entry.key() == key && !entry.is_expired(),
            Err(_) => false,
        }
    }

    /// Persist an entry; failures are logged and the write is dropped
    pub fn set(&self, key: &str, entry: &CacheEntry) {
        if let Err(e) = self.try_set(key, entry) {
            warn!(key, error = %e, "disk cache write dropped");
        }
    }

    fn try_set(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let record = entry.encode()?;

        let _guard = self.lock.lock();
        let path = self.entry_path(key);
        self.make_room(&path, record.len() as u64)?;
        write_atomic(&path, &record)?;
        Ok(())
    }

    /// Remove oldest files until `incoming` more bytes fit the budget
    ///
    /// The file at `target` is about to be replaced, so it does not count.
    fn make_room(&self, target: &Path, incoming: u64) -> Result<()> {
        let mut files = self.scan()?;
        files.retain(|file| file.path != target);

        let mut total: u64 = files.iter().map(|file| file.len).sum();
        if total.saturating_add(incoming) <= self.max_size_bytes {
            return Ok(());
        }

        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

        for file in files {
            if total.saturating_add(incoming) <= self.max_size_bytes {
                break;
            }
            match remove_if_present(&file.path) {
                Ok(_) => {
                    total -= file.len;
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    trace!(path = %file.path.display(), bytes = file.len, "disk evicted");
                }
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "disk eviction failed");
                }
            }
        }

        if incoming > self.max_size_bytes {
            debug!(
                bytes = incoming,
                budget = self.max_size_bytes,
                "record exceeds disk budget, writing anyway"
            );
        }
        Ok(())
    }

    /// Remove an entry; returns true if a file was removed
    pub fn delete(&self, key: &str) -> bool {
        let _guard = self.lock.lock();
        match remove_if_present(&self.entry_path(key)) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(key, error = %e, "disk cache delete failed");
                false
            }
        }
    }

    /// Remove every entry; returns how many files were removed
    pub fn clear(&self) -> usize {
        let _guard = self.lock.lock();
        let mut removed = 0;
        for file in self.scan_or_warn() {
            match remove_if_present(&file.path) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!(path = %file.path.display(), error = %e, "disk clear failed"),
            }
        }
        removed
    }

    /// Recover the original keys by decoding every file
    ///
    /// Reads the whole directory; meant for invalidation and diagnostics.
    pub fn keys(&self) -> Vec<String> {
        let _guard = self.lock.lock();
        self.scan_or_warn()
            .into_iter()
            .filter_map(|file| match read_entry(&file.path) {
                Ok(entry) => Some(entry.key().to_string()),
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "skipping unreadable record");
                    None
                }
            })
            .collect()
    }

    /// Delete every expired record; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let _guard = self.lock.lock();
        let mut removed = 0;
        for file in self.scan_or_warn() {
            let expired = match read_entry(&file.path) {
                Ok(entry) => entry.is_expired(),
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "skipping unreadable record");
                    false
                }
            };
            if expired && matches!(remove_if_present(&file.path), Ok(true)) {
                removed += 1;
            }
        }
        removed
    }

    /// Number of record files (expiry is not checked)
    pub fn len(&self) -> usize {
        let _guard = self.lock.lock();
        self.scan_or_warn().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes of record files
    pub fn total_bytes(&self) -> u64 {
        let _guard = self.lock.lock();
        self.scan_or_warn().iter().map(|file| file.len).sum()
    }

    /// Files removed to satisfy the byte budget
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    fn scan(&self) -> Result<Vec<DiskFile>> {
        let mut files = Vec::new();
        for dir_entry in fs::read_dir(&self.cache_dir)? {
            let Ok(dir_entry) = dir_entry else { continue };
            let path = dir_entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            // Files removed between listing and stat are skipped
            let Ok(metadata) = dir_entry.metadata() else { continue };
            if !metadata.is_file() {
                continue;
            }
            files.push(DiskFile {
                path,
                len: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(files)
    }

    fn scan_or_warn(&self) -> Vec<DiskFile> {
        self.scan().unwrap_or_else(|e| {
            warn!(dir = %self.cache_dir.display(), error = %e, "disk cache scan failed");
            Vec::new()
        })
    }
}

impl std::fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskCache")
            .field("cache_dir", &self.cache_dir)
            .field("max_size_bytes", &self.max_size_bytes)
            .field("evictions", &self.evictions())
            .finish()
    }
}

fn read_entry(path: &Path) -> Result<CacheEntry> {
    let data = fs::read(path)?;
    CacheEntry::decode(&data)
}

fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension(TEMP_EXTENSION);
    if let Err(e) = fs::write(&tmp, data).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
