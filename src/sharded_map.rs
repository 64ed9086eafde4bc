//! A sharded, concurrent k-mer frequency table.
//!
//! Each shard is an independently mutex-guarded `FxHashMap`. Threads
//! routing to different shards never contend for the same lock, which is
//! what lets insertion throughput scale with core count.

use crate::errors::{MetaDbgError, Result};
use crate::kmer::canonical;
use fxhash::FxHashMap;
use std::sync::Mutex;

/// Reserved value marking a branching k-mer. Strictly less than any
/// attainable (non-negative) count, so a banned entry always fails a
/// `> tau` neighbor test.
pub const BAN_MARKER: i64 = i64::MIN;

/// Conservative per-entry memory estimate (8B key, 8B value, hashbrown
/// control-byte and load-factor overhead). Not a measured figure; Rust
/// does not expose an allocator-level introspection of `FxHashMap`, so
/// `with_budget` treats this as an approximation.
const ENTRY_COST_BYTES: usize = 32;

const MIN_SHARD_CAPACITY: usize = 1024;

#[inline]
fn mix(mut x: u64) -> u64 {
    // splitmix64 finalizer
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

pub struct ShardedMap {
    shards: Vec<Mutex<FxHashMap<u64, i64>>>,
    shard_mask: usize,
    k: usize,
    max_shard_capacity: usize,
}

impl ShardedMap {
    /// Build a table with a fixed shard count (rounded up to the next
    /// power of two, floor of one). Intended for tests; production
    /// callers should prefer [`ShardedMap::with_budget`].
    pub fn new(shards: usize, k: usize) -> Self {
        let n = shards.max(1).next_power_of_two();
        Self {
            shards: (0..n).map(|_| Mutex::new(FxHashMap::default())).collect(),
            shard_mask: n - 1,
            k,
            max_shard_capacity: usize::MAX,
        }
    }

    /// Size a table from a memory budget and worker count. Shard count is
    /// the next power of two at or above `workers * 4`; per-shard
    /// capacity keeps total occupancy below 0.5 load factor for the
    /// budget, with a floor so tiny budgets still function.
    pub fn with_budget(memory_budget_bytes: usize, workers: usize, k: usize) -> Self {
        let n = (workers.max(1) * 4).next_power_of_two();
        let per_shard_budget = (memory_budget_bytes / n).max(1);
        let capacity = (per_shard_budget / ENTRY_COST_BYTES).max(MIN_SHARD_CAPACITY);

        let map = Self::new(n, k);
        for shard in &map.shards {
            shard.lock().unwrap().reserve(capacity / 2);
        }
        Self {
            max_shard_capacity: capacity,
            ..map
        }
    }

    /// Build a table pre-populated with `keys`, each set to value zero.
    /// Used by the feature-vector builder to seed a table with a set of
    /// connected-component k-mers before projecting a sample onto it.
    pub fn seeded(keys: impl IntoIterator<Item = u64>, shards: usize, k: usize) -> Self {
        let map = Self::new(shards, k);
        for key in keys {
            map.set(key, 0);
        }
        map
    }

    #[inline]
    fn shard_index(&self, canon: u64) -> usize {
        (mix(canon) as usize) & self.shard_mask
    }

    /// Atomically add `delta` to the entry for `canonical(key)`, inserting
    /// with value `delta` if absent. Saturates at `u32::MAX`. Returns
    /// `CapacityExhausted` if inserting a new key would cross the shard's
    /// capacity ceiling.
    pub fn insert(&self, key: u64, delta: i64) -> Result<()> {
        let canon = canonical(key, self.k);
        let idx = self.shard_index(canon);
        let mut shard = self.shards[idx].lock().unwrap();
        match shard.get_mut(&canon) {
            Some(v) if *v == BAN_MARKER => {
                // banned entries stay banned; the branch was already cut
            }
            Some(v) => {
                *v = (*v).saturating_add(delta).min(u32::MAX as i64);
            }
            None => {
                if shard.len() >= self.max_shard_capacity {
                    return Err(MetaDbgError::CapacityExhausted { shard: idx });
                }
                shard.insert(canon, delta.min(u32::MAX as i64));
            }
        }
        Ok(())
    }

    /// Convenience for the common case of incrementing by one.
    pub fn insert_one(&self, key: u64) -> Result<()> {
        self.insert(key, 1)
    }

    /// Current value for `key`, canonicalized; zero if absent.
    pub fn get(&self, key: u64) -> i64 {
        let canon = canonical(key, self.k);
        let idx = self.shard_index(canon);
        *self.shards[idx].lock().unwrap().get(&canon).unwrap_or(&0)
    }

    /// Overwrite the entry for `key`, present or not.
    pub fn set(&self, key: u64, value: i64) {
        let canon = canonical(key, self.k);
        let idx = self.shard_index(canon);
        self.shards[idx].lock().unwrap().insert(canon, value);
    }

    /// Whether `key` is present in the table (regardless of value).
    pub fn contains(&self, key: u64) -> bool {
        let canon = canonical(key, self.k);
        let idx = self.shard_index(canon);
        self.shards[idx].lock().unwrap().contains_key(&canon)
    }

    /// Mark `key` as a banned (branching) k-mer.
    pub fn ban(&self, key: u64) {
        self.set(key, BAN_MARKER);
    }

    pub fn is_banned(&self, key: u64) -> bool {
        self.get(key) == BAN_MARKER
    }

    /// Set every entry's value to zero, keys preserved. Caller must
    /// ensure no other operation is in flight.
    pub fn reset_values(&self) {
        for shard in &self.shards {
            for v in shard.lock().unwrap().values_mut() {
                *v = 0;
            }
        }
    }

    /// Total live key count across shards.
    pub fn size(&self) -> u64 {
        self.shards.iter().map(|s| s.lock().unwrap().len() as u64).sum()
    }

    /// All (key, value) pairs currently stored, snapshotted shard by
    /// shard rather than holding every shard lock at once.
    pub fn entries(&self) -> impl Iterator<Item = (u64, i64)> + '_ {
        self.shards.iter().flat_map(|shard| {
            let snapshot: Vec<(u64, i64)> = shard
                .lock()
                .unwrap()
                .iter()
                .map(|(&k, &v)| (k, v))
                .collect();
            snapshot.into_iter()
        })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_accumulates_and_canonicalizes() {
        let table = ShardedMap::new(4, 3);
        let fwd = crate::kmer::encode(b"ACG", 3).unwrap();
        let rc = crate::kmer::reverse_complement(fwd, 3);

        table.insert_one(fwd).unwrap();
        table.insert_one(rc).unwrap();

        assert_eq!(table.get(fwd), 2);
        assert_eq!(table.get(rc), 2);
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn get_missing_key_is_zero() {
        let table = ShardedMap::new(4, 3);
        assert_eq!(table.get(0), 0);
    }

    #[test]
    fn set_overwrites_regardless_of_presence() {
        let table = ShardedMap::new(2, 3);
        table.set(5, 42);
        assert_eq!(table.get(5), 42);
        table.set(5, 7);
        assert_eq!(table.get(5), 7);
    }

    #[test]
    fn ban_marks_and_insert_does_not_resurrect() {
        let table = ShardedMap::new(2, 3);
        let key = crate::kmer::encode(b"ACG", 3).unwrap();
        table.insert_one(key).unwrap();
        table.ban(key);
        assert!(table.is_banned(key));
        table.insert_one(key).unwrap();
        assert!(table.is_banned(key));
    }

    #[test]
    fn reset_values_clears_counts_but_keeps_keys() {
        let table = ShardedMap::new(2, 3);
        let key = crate::kmer::encode(b"ACG", 3).unwrap();
        table.insert(key, 9).unwrap();
        table.reset_values();
        assert_eq!(table.get(key), 0);
        assert!(table.contains(key));
    }

    #[test]
    fn seeded_table_contains_only_seeded_keys() {
        let a = crate::kmer::encode(b"ACG", 3).unwrap();
        let b = crate::kmer::encode(b"CGT", 3).unwrap();
        let table = ShardedMap::seeded([a], 2, 3);
        assert!(table.contains(a));
        assert!(!table.contains(crate::kmer::canonical(b, 3)) || crate::kmer::canonical(b, 3) == crate::kmer::canonical(a, 3));
    }

    #[test]
    fn capacity_exhausted_when_shard_is_full() {
        let table = ShardedMap::new(1, 8);
        // force a tiny ceiling so the second distinct key overflows it
        let table = ShardedMap {
            max_shard_capacity: 1,
            ..table
        };
        let a = crate::kmer::encode(b"AAAAAAAA", 8).unwrap();
        let b = crate::kmer::encode(b"CCCCCCCC", 8).unwrap();
        table.insert_one(a).unwrap();
        assert!(matches!(
            table.insert_one(b),
            Err(MetaDbgError::CapacityExhausted { .. })
        ));
    }

    #[test]
    fn concurrent_inserts_land_in_consistent_shards() {
        use std::sync::Arc;
        use std::thread;

        let table = Arc::new(ShardedMap::new(8, 4));
        let mut handles = Vec::new();
        for t in 0..8u64 {
            let table = Arc::clone(&table);
            handles.push(thread::spawn(move || {
                for i in 0..200u64 {
                    table.insert_one((t * 1000 + i) & crate::kmer::mask(4)).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let total: i64 = table.entries().map(|(_, v)| v).sum();
        assert_eq!(total, 8 * 200);
    }
}
