//! Cache Entry Types
//!
//! A cached value together with its access and expiry metadata, plus the
//! versioned binary record the disk tier persists it as.
//!
//! # Record Layout
//!
//! All integers are big-endian.
//!
//! ```text
//! "TCE1" | version:u8 | key_len:u32 | key | created_us:i64 | accessed_us:i64
//!        | access_count:u64 | has_ttl:u8 [ttl_us:u64]
//!        | has_expiry:u8 [expires_us:i64] | value_len:u64 | value
//! ```

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Record magic
const RECORD_MAGIC: &[u8; 4] = b"TCE1";

/// Current record version
const RECORD_VERSION: u8 = 1;

/// Bytes of a record that do not depend on key, value or optional fields
const RECORD_FIXED_LEN: usize = 4 + 1 + 4 + 8 + 8 + 8 + 1 + 1 + 8;

/// Fast non-cryptographic hash (FxHash algorithm)
///
/// Stable across runs and platforms, so it can name files on disk.
#[inline]
pub(crate) fn fx_hash(bytes: &[u8]) -> u64 {
    const SEED: u64 = 0x517cc1b727220a95;
    let mut hash = SEED;
    for &byte in bytes {
        hash = hash.rotate_left(5) ^ (byte as u64);
        hash = hash.wrapping_mul(SEED);
    }
    hash
}

/// Cache entry containing a value and its metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    key: String,
    value: Bytes,
    created_at: DateTime<Utc>,
    accessed_at: DateTime<Utc>,
    access_count: u64,
    ttl: Option<Duration>,
    /// Derived from `created_at + ttl`; `None` iff `ttl` is `None`
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Create a new entry stamped with the current time
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>, ttl: Option<Duration>) -> Self {
        Self::with_created_at(key, value, ttl, Utc::now())
    }

    /// Create an entry with an explicit creation time
    pub fn with_created_at(
        key: impl Into<String>,
        value: impl Into<Bytes>,
        ttl: Option<Duration>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let expires_at = ttl.map(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|delta| created_at.checked_add_signed(delta))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        });

        Self {
            key: key.into(),
            value: value.into(),
            created_at,
            accessed_at: created_at,
            access_count: 0,
            ttl,
            expires_at,
        }
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get value (zero-copy)
    #[inline]
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn accessed_at(&self) -> DateTime<Utc> {
        self.accessed_at
    }

    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    #[inline]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    #[inline]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Check if the entry has expired
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against a given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    /// Record an access
    pub fn touch(&mut self) {
        self.accessed_at = Utc::now();
        self.access_count = self.access_count.saturating_add(1);
    }

    /// Size of the persisted record in bytes, or 0 if it cannot be encoded
    pub fn size_bytes(&self) -> u64 {
        if self.key.len() > u32::MAX as usize {
            return 0;
        }
        let optional = if self.ttl.is_some() { 8 } else { 0 }
            + if self.expires_at.is_some() { 8 } else { 0 };
        (RECORD_FIXED_LEN + self.key.len() + optional + self.value.len()) as u64
    }

    /// Encode the entry into its on-disk record
    pub fn encode(&self) -> Result<Bytes> {
        let key_len = u32::try_from(self.key.len()).map_err(|_| {
            Error::Serialization(format!("key too long: {} bytes", self.key.len()))
        })?;

        let mut buf = BytesMut::with_capacity(self.size_bytes() as usize);
        buf.put_slice(RECORD_MAGIC);
        buf.put_u8(RECORD_VERSION);
        buf.put_u32(key_len);
        buf.put_slice(self.key.as_bytes());
        buf.put_i64(self.created_at.timestamp_micros());
        buf.put_i64(self.accessed_at.timestamp_micros());
        buf.put_u64(self.access_count);

        match self.ttl {
            Some(ttl) => {
                buf.put_u8(1);
                buf.put_u64(u64::try_from(ttl.as_micros()).unwrap_or(u64::MAX));
            }
            None => buf.put_u8(0),
        }

        match self.expires_at {
            Some(expires_at) => {
                buf.put_u8(1);
                buf.put_i64(expires_at.timestamp_micros());
            }
            None => buf.put_u8(0),
        }

        buf.put_u64(self.value.len() as u64);
        buf.put_slice(&self.value);

        Ok(buf.freeze())
    }

    /// Decode an entry from its on-disk record
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buf = data;

        ensure_remaining(buf, 5, "header")?;
        if &buf[..4] != RECORD_MAGIC {
            return Err(Error::Serialization("bad record magic".to_string()));
        }
        buf.advance(4);
        let version = buf.get_u8();
        if version != RECORD_VERSION {
            return Err(Error::Serialization(format!(
                "unsupported record version {}",
                version
            )));
        }

        ensure_remaining(buf, 4, "key length")?;
        let key_len = buf.get_u32() as usize;
        ensure_remaining(buf, key_len, "key")?;
        let key = std::str::from_utf8(&buf[..key_len])
            .map_err(|e| Error::Serialization(format!("key is not UTF-8: {}", e)))?
            .to_string();
        buf.advance(key_len);

        ensure_remaining(buf, 8 + 8 + 8 + 1, "metadata")?;
        let created_at = timestamp(buf.get_i64(), "created_at")?;
        let accessed_at = timestamp(buf.get_i64(), "accessed_at")?;
        let access_count = buf.get_u64();

        let ttl = if buf.get_u8() != 0 {
            ensure_remaining(buf, 8, "ttl")?;
            Some(Duration::from_micros(buf.get_u64()))
        } else {
            None
        };

        ensure_remaining(buf, 1, "expiry flag")?;
        let expires_at = if buf.get_u8() != 0 {
            ensure_remaining(buf, 8, "expires_at")?;
            Some(timestamp(buf.get_i64(), "expires_at")?)
        } else {
            None
        };

        ensure_remaining(buf, 8, "value length")?;
        let value_len = usize::try_from(buf.get_u64())
            .map_err(|_| Error::Serialization("value length overflows usize".to_string()))?;
        ensure_remaining(buf, value_len, "value")?;
        let value = Bytes::copy_from_slice(&buf[..value_len]);
        buf.advance(value_len);

        if buf.has_remaining() {
            return Err(Error::Serialization(format!(
                "{} trailing bytes after record",
                buf.remaining()
            )));
        }

        Ok(Self {
            key,
            value,
            created_at,
            accessed_at,
            access_count,
            ttl,
            expires_at,
        })
    }
}

fn ensure_remaining(buf: &[u8], needed: usize, field: &str) -> Result<()> {
    if buf.len() < needed {
        return Err(Error::Serialization(format!(
            "truncated record while reading {}",
            field
        )));
    }
    Ok(())
}

fn timestamp(micros: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| Error::Serialization(format!("{} out of range: {}", field, micros)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("user:1", "alice", None);
        assert_eq!(entry.key(), "user:1");
        assert_eq!(entry.value().as_ref(), b"alice");
        assert_eq!(entry.access_count(), 0);
        assert_eq!(entry.created_at(), entry.accessed_at());
        assert!(entry.ttl().is_none());
        assert!(entry.expires_at().is_none());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_expires_at_derived_from_ttl() {
        let created = Utc::now();
        let entry = CacheEntry::with_created_at("k", "v", Some(Duration::from_secs(60)), created);
        assert_eq!(
            entry.expires_at(),
            Some(created + chrono::Duration::seconds(60))
        );
    }

    #[test]
    fn test_ttl_boundary() {
        let created = Utc::now();
        let entry = CacheEntry::with_created_at("k", "v", Some(Duration::from_secs(10)), created);
        let epsilon = chrono::Duration::milliseconds(1);
        let deadline = created + chrono::Duration::seconds(10);

        assert!(!entry.is_expired_at(deadline - epsilon));
        assert!(!entry.is_expired_at(deadline));
        assert!(entry.is_expired_at(deadline + epsilon));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new("k", "v", Some(Duration::from_secs(u64::MAX)));
        assert!(entry.expires_at().is_some());
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_touch() {
        let mut entry = CacheEntry::new("k", "v", None);
        let before = entry.accessed_at();

        entry.touch();
        entry.touch();

        assert_eq!(entry.access_count(), 2);
        assert!(entry.accessed_at() >= before);
        assert_eq!(entry.created_at(), before);
    }

    #[test]
    fn test_size_bytes_matches_encoding() {
        let plain = CacheEntry::new("key", vec![7u8; 100], None);
        assert_eq!(plain.size_bytes(), plain.encode().unwrap().len() as u64);

        let with_ttl = CacheEntry::new("key", vec![7u8; 100], Some(Duration::from_secs(5)));
        assert_eq!(with_ttl.size_bytes(), with_ttl.encode().unwrap().len() as u64);
        assert_eq!(with_ttl.size_bytes(), plain.size_bytes() + 16);
    }

    #[test]
    fn test_record_preserves_metadata() {
        let mut entry = CacheEntry::new("session:42", "payload", Some(Duration::from_secs(300)));
        entry.touch();
        entry.touch();
        entry.touch();

        let decoded = CacheEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(decoded.key(), "session:42");
        assert_eq!(decoded.value(), entry.value());
        assert_eq!(decoded.access_count(), 3);
        assert_eq!(decoded.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(
            decoded.created_at().timestamp_micros(),
            entry.created_at().timestamp_micros()
        );
        assert_eq!(
            decoded.expires_at().map(|t| t.timestamp_micros()),
            entry.expires_at().map(|t| t.timestamp_micros())
        );
    }

    #[test]
    fn test_record_header_layout() {
        let entry = CacheEntry::new("ab", "", None);
        let record = entry.encode().unwrap();
        assert_eq!(&record[..4], b"TCE1");
        assert_eq!(record[4], RECORD_VERSION);
        assert_eq!(&record[5..9], &2u32.to_be_bytes());
        assert_eq!(&record[9..11], b"ab");
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let err = CacheEntry::decode(b"NOPE\x01rest").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_decode_rejects_truncated_record() {
        let record = CacheEntry::new("key", "some value", None).encode().unwrap();
        for cut in [0, 3, 8, 12, record.len() - 1] {
            let err = CacheEntry::decode(&record[..cut]).unwrap_err();
            assert!(matches!(err, Error::Serialization(_)), "cut at {}", cut);
        }
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut record = CacheEntry::new("key", "v", None).encode().unwrap().to_vec();
        record.push(0);
        assert!(CacheEntry::decode(&record).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut record = CacheEntry::new("key", "v", None).encode().unwrap().to_vec();
        record[4] = 99;
        let err = CacheEntry::decode(&record).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn test_fx_hash_is_stable() {
        assert_eq!(fx_hash(b"user:1"), fx_hash(b"user:1"));
        assert_ne!(fx_hash(b"user:1"), fx_hash(b"user:2"));
        assert_eq!(fx_hash(b""), 0x517cc1b727220a95);
    }
}
