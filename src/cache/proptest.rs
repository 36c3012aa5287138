//! Property-Based Tests for the Cache Tiers
//!
//! # Test Properties
//!
//! 1. **Capacity**: memory tiers never hold more than `max_size` entries
//! 2. **Disk Budget**: on-disk bytes stay within budget when every record fits
//! 3. **Hit Rate**: reported hit rate always equals `hits / (hits + misses) * 100`
//! 4. **Latest Write Wins**: a key read right after a set returns that value

#![cfg(test)]

use proptest::prelude::*;
use tempfile::TempDir;

use super::disk::DiskCache;
use super::entry::CacheEntry;
use super::manager::{CacheConfig, CacheManager};
use super::policy::MemoryPolicy;

// =============================================================================
// Property Strategies
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Set(u8),
    Get(u8),
    Delete(u8),
}

/// Operations over a small key space so that hits, overwrites and evictions
/// all happen.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..16).prop_map(Op::Set),
        4 => (0u8..16).prop_map(Op::Get),
        1 => (0u8..16).prop_map(Op::Delete),
    ]
}

fn policy_strategy() -> impl Strategy<Value = MemoryPolicy> {
    prop_oneof![Just(MemoryPolicy::Lru), Just(MemoryPolicy::Lfu)]
}

fn key(id: u8) -> String {
    format!("key-{}", id)
}

// =============================================================================
// Memory Tier Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: size() <= max_size after every mutating call.
    #[test]
    fn prop_memory_capacity_bound(
        policy in policy_strategy(),
        max_size in 1usize..8,
        ops in prop::collection::vec(op_strategy(), 1..200),
    ) {
        let tier = policy.build(max_size);
        for op in ops {
            match op {
                Op::Set(id) => tier.set(key(id), CacheEntry::new(key(id), vec![id], None)),
                Op::Get(id) => { tier.get(&key(id)); }
                Op::Delete(id) => { tier.delete(&key(id)); }
            }
            prop_assert!(tier.len() <= max_size);
        }
    }

    /// Property: a set is immediately visible to the next get.
    #[test]
    fn prop_memory_latest_write_wins(
        policy in policy_strategy(),
        writes in prop::collection::vec((0u8..8, any::<u8>()), 1..50),
    ) {
        let tier = policy.build(4);
        for (id, value) in writes {
            tier.set(key(id), CacheEntry::new(key(id), vec![value], None));
            let got = tier.get(&key(id));
            prop_assert_eq!(got.as_deref(), Some(&[value][..]));
        }
    }
}

// =============================================================================
// Disk Tier Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: total on-disk bytes <= budget after every set, as long as
    /// no single record exceeds the budget.
    #[test]
    fn prop_disk_size_bound(
        sizes in prop::collection::vec((0u8..12, 0usize..600), 1..30),
    ) {
        let tmp = TempDir::new().unwrap();
        let disk = DiskCache::with_max_bytes(tmp.path(), 2048).unwrap();

        for (id, len) in sizes {
            let entry = CacheEntry::new(key(id), vec![0u8; len], None);
            prop_assume!(entry.size_bytes() <= disk.max_size_bytes());
            disk.set(&key(id), &entry);
            prop_assert!(disk.total_bytes() <= disk.max_size_bytes());
        }
    }
}

// =============================================================================
// Manager Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: hit_rate_percent == hits / (hits + misses) * 100.
    #[test]
    fn prop_hit_rate_formula(
        policy in policy_strategy(),
        ops in prop::collection::vec(op_strategy(), 0..100),
    ) {
        let manager = CacheManager::with_config(CacheConfig {
            memory_policy: policy,
            memory_size: 4,
            enable_disk: false,
            ..Default::default()
        }).unwrap();

        let mut expected_sets = 0u64;
        for op in ops {
            match op {
                Op::Set(id) => {
                    manager.set(&key(id), vec![id], None, false);
                    expected_sets += 1;
                }
                Op::Get(id) => { manager.get(&key(id)); }
                Op::Delete(id) => { manager.delete(&key(id)); }
            }
        }

        let stats = manager.get_statistics();
        prop_assert_eq!(stats.total_requests, stats.hits + stats.misses);
        prop_assert_eq!(stats.hits, stats.memory_hits + stats.disk_hits);
        prop_assert_eq!(stats.sets, expected_sets);
        let expected = if stats.total_requests == 0 {
            0.0
        } else {
            stats.hits as f64 / (stats.hits + stats.misses) as f64 * 100.0
        };
        prop_assert_eq!(stats.hit_rate_percent, expected);
    }
}
