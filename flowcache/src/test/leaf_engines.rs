use serde_json::json;
use crate::cache::{
    Cache, FullAssociativeFifoCache, FullAssociativeLfuCache, FullAssociativeLruCache,
    FullAssociativeRandomCache, FullAssociativeTreePlruCache, GenericCache,
};
use crate::error::{CacheError, ConfigError};
use super::{tcp_key, udp_key};

fn leaf_caches(size: usize) -> Vec<GenericCache> {
    vec![
        FullAssociativeFifoCache::fifo(size).unwrap().into(),
        FullAssociativeLruCache::lru(size).unwrap().into(),
        FullAssociativeLfuCache::lfu(size).unwrap().into(),
        FullAssociativeRandomCache::random(size, 7).unwrap().into(),
        FullAssociativeTreePlruCache::tree_plru(size).unwrap().into(),
    ]
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(matches!(FullAssociativeFifoCache::fifo(0), Err(ConfigError::ZeroCapacity)));
    assert!(matches!(FullAssociativeLruCache::lru(0), Err(ConfigError::ZeroCapacity)));
    assert!(matches!(FullAssociativeLfuCache::lfu(0), Err(ConfigError::ZeroCapacity)));
    assert!(matches!(FullAssociativeRandomCache::random(0, 1), Err(ConfigError::ZeroCapacity)));
}

#[test]
fn evictions_start_once_full() {
    for mut cache in leaf_caches(8) {
        for n in 0..8 {
            assert!(cache.insert(tcp_key(n)).is_empty(), "{} evicted before it was full", cache.describe());
        }
        assert_eq!(cache.resident_count(), 8);
        for n in 8..20 {
            let evicted = cache.insert(tcp_key(n));
            assert_eq!(evicted.len(), 1, "{}", cache.describe());
            assert!(!cache.probe(&evicted[0], false));
            assert!(cache.probe(&tcp_key(n), false));
            assert_eq!(cache.resident_count(), 8);
        }
    }
}

#[test]
fn reinserting_a_resident_key_changes_nothing() {
    for mut cache in leaf_caches(8) {
        cache.insert(tcp_key(1));
        cache.insert(tcp_key(2));
        assert!(cache.insert(tcp_key(1)).is_empty());
        assert_eq!(cache.resident_count(), 2);
    }
    let mut cache = FullAssociativeLruCache::lru(4).unwrap();
    cache.insert(tcp_key(1));
    let slot = cache.slot_of(&tcp_key(1));
    cache.insert(tcp_key(1));
    assert_eq!(cache.slot_of(&tcp_key(1)), slot);
    assert_eq!(cache.references(&tcp_key(1)), Some(1));
}

#[test]
fn probe_without_update_is_read_only() {
    let mut cache = FullAssociativeLruCache::lru(4).unwrap();
    for n in 1..=4 {
        cache.insert(tcp_key(n));
    }
    assert!(cache.probe(&tcp_key(1), false));
    assert!(!cache.probe(&tcp_key(9), false));
    assert_eq!(cache.references(&tcp_key(1)), Some(0));
    // Key 1 is still the least recently used
    assert_eq!(cache.insert(tcp_key(5)), vec![tcp_key(1)]);
}

#[test]
fn fifo_ignores_hits() {
    let mut cache = FullAssociativeFifoCache::fifo(4).unwrap();
    for n in 1..=4 {
        cache.insert(tcp_key(n));
    }
    for _ in 0..3 {
        assert!(cache.probe(&tcp_key(1), true));
    }
    assert_eq!(cache.references(&tcp_key(1)), Some(3));
    assert_eq!(cache.insert(tcp_key(5)), vec![tcp_key(1)]);
    assert_eq!(cache.insert(tcp_key(6)), vec![tcp_key(2)]);
}

#[test]
fn lru_evicts_least_recently_used() {
    let mut cache = FullAssociativeLruCache::lru(4).unwrap();
    for n in 1..=4 {
        cache.insert(tcp_key(n));
    }
    assert!(cache.probe(&tcp_key(1), true));
    assert_eq!(cache.insert(tcp_key(5)), vec![tcp_key(2)]);
    assert!(cache.probe(&tcp_key(3), true));
    assert_eq!(cache.insert(tcp_key(6)), vec![tcp_key(4)]);
    assert_eq!(cache.insert(tcp_key(7)), vec![tcp_key(1)]);
}

#[test]
fn lfu_protects_frequently_used() {
    let mut cache = FullAssociativeLfuCache::lfu(4).unwrap();
    for n in 1..=4 {
        cache.insert(tcp_key(n));
    }
    for (n, hits) in [(1, 3), (2, 2), (3, 1)] {
        for _ in 0..hits {
            cache.probe(&tcp_key(n), true);
        }
    }
    assert_eq!(cache.insert(tcp_key(5)), vec![tcp_key(4)]);
    // The newcomer has no hits yet, so it is the next to go
    assert_eq!(cache.insert(tcp_key(6)), vec![tcp_key(5)]);
    cache.probe(&tcp_key(6), true);
    cache.probe(&tcp_key(6), true);
    // Key 3 (one hit) now has the fewest
    assert_eq!(cache.insert(tcp_key(7)), vec![tcp_key(3)]);
    assert!(cache.contains(&tcp_key(1)));
}

#[test]
fn lfu_evicts_oldest_unused_first() {
    let mut cache = FullAssociativeLfuCache::lfu(3).unwrap();
    for n in 1..=3 {
        cache.insert(tcp_key(n));
    }
    cache.probe(&tcp_key(1), true);
    assert_eq!(cache.insert(tcp_key(4)), vec![tcp_key(2)]);
    assert_eq!(cache.insert(tcp_key(5)), vec![tcp_key(3)]);
    assert_eq!(cache.insert(tcp_key(6)), vec![tcp_key(4)]);
}

#[test]
fn random_is_reproducible_by_seed() {
    let run = |seed: u64| {
        let mut cache = FullAssociativeRandomCache::random(4, seed).unwrap();
        (0..64).flat_map(|n| cache.insert(tcp_key(n % 12))).collect::<Vec<_>>()
    };
    assert_eq!(run(3), run(3));

    let mut cache = FullAssociativeRandomCache::random(4, 3).unwrap();
    assert_eq!(cache.policy().seed(), 3);
    let first = (0..16).flat_map(|n| cache.insert(tcp_key(n))).collect::<Vec<_>>();
    cache.clear();
    let second = (0..16).flat_map(|n| cache.insert(tcp_key(n))).collect::<Vec<_>>();
    assert_eq!(first, second);
}

#[test]
fn invalidated_slot_is_reused_first() {
    for mut cache in leaf_caches(8) {
        for n in 0..8 {
            cache.insert(tcp_key(n));
        }
        assert_eq!(cache.invalidate(&tcp_key(3)), Ok(()));
        assert!(!cache.probe(&tcp_key(3), true));
        assert_eq!(cache.resident_count(), 7);
        assert!(cache.insert(udp_key(0)).is_empty(), "{} evicted instead of reusing the free slot", cache.describe());
        assert_eq!(cache.resident_count(), 8);
    }
}

#[test]
fn invalidating_an_absent_key_fails() {
    for mut cache in leaf_caches(8) {
        cache.insert(tcp_key(1));
        assert_eq!(cache.invalidate(&tcp_key(2)), Err(CacheError::NotCached(tcp_key(2))));
        assert!(cache.supports_invalidate());
        assert_eq!(cache.resident_count(), 1);
    }
}

#[test]
fn clear_empties_the_cache() {
    for mut cache in leaf_caches(8) {
        for n in 0..12 {
            cache.insert(tcp_key(n));
        }
        cache.clear();
        assert_eq!(cache.resident_count(), 0);
        assert!(!cache.probe(&tcp_key(11), false));
        for n in 0..8 {
            assert!(cache.insert(udp_key(n)).is_empty());
        }
    }
}

#[test]
fn describe_and_parameters() {
    let names = leaf_caches(8).iter().map(Cache::describe).collect::<Vec<_>>();
    assert_eq!(names, vec![
        "FullAssociativeFIFOCache",
        "FullAssociativeLRUCache",
        "FullAssociativeLFUCache",
        "FullAssociativeRandomCache",
        "FullAssociativeTreePLRUCache",
    ]);
    let cache = FullAssociativeLruCache::lru(16).unwrap();
    assert_eq!(cache.parameters(), json!({"Type": "FullAssociativeLRUCache", "Size": 16}));
    assert_eq!(serde_json::from_str::<serde_json::Value>(&cache.parameter_string()).unwrap(), cache.parameters());
    assert_eq!(cache.stat_string(), "");
}
