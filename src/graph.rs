//! De Bruijn graph primitives: neighbor probes, uniqueness tests, and the
//! branching-k-mer ban pass.

use crate::kmer::{canonical, shift_left, shift_right};
use crate::sharded_map::ShardedMap;
use rayon::prelude::*;
use smallvec::SmallVec;

/// Bases `b` such that the k-mer obtained by appending `b` on the right
/// has a count above `tau`.
pub fn right_neighbors(t: &ShardedMap, x: u64, k: usize, tau: i64) -> SmallVec<[u8; 4]> {
    let mut out = SmallVec::new();
    for b in 0..4u64 {
        let next = shift_right(x, k, b);
        if t.get(canonical(next, k)) > tau {
            out.push(b as u8);
        }
    }
    out
}

/// Bases `b` such that the k-mer obtained by prepending `b` on the left
/// has a count above `tau`.
pub fn left_neighbors(t: &ShardedMap, x: u64, k: usize, tau: i64) -> SmallVec<[u8; 4]> {
    let mut out = SmallVec::new();
    for b in 0..4u64 {
        let next = shift_left(x, k, b);
        if t.get(canonical(next, k)) > tau {
            out.push(b as u8);
        }
    }
    out
}

pub fn unique_right(t: &ShardedMap, x: u64, k: usize, tau: i64) -> Option<u8> {
    let neighbors = right_neighbors(t, x, k, tau);
    if neighbors.len() == 1 {
        Some(neighbors[0])
    } else {
        None
    }
}

pub fn unique_left(t: &ShardedMap, x: u64, k: usize, tau: i64) -> Option<u8> {
    let neighbors = left_neighbors(t, x, k, tau);
    if neighbors.len() == 1 {
        Some(neighbors[0])
    } else {
        None
    }
}

/// Mark every k-mer with two or more right- or left-neighbors above `tau`
/// with the ban marker, in one parallel pass over the table. Idempotent:
/// a banned entry's own value can never be probed above `tau`, so it is
/// never itself found to have >= 2 neighbors on a second pass, and banning
/// an already-banned key is a no-op.
pub fn ban_branching_kmers(t: &ShardedMap, k: usize, tau: i64) {
    let keys: Vec<u64> = t.entries().map(|(key, _)| key).collect();
    keys.par_iter().for_each(|&x| {
        if t.is_banned(x) {
            return;
        }
        let branches_right = right_neighbors(t, x, k, tau).len() >= 2;
        let branches_left = left_neighbors(t, x, k, tau).len() >= 2;
        if branches_right || branches_left {
            t.ban(x);
        }
    });
}
