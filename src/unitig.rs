//! Unitig traversal engine: emits maximal non-branching paths (unitigs)
//! from a frequency-filtered, branch-banned table, each exactly once
//! across the forward/reverse-complement symmetry.

use crate::graph::{unique_left, unique_right};
use crate::kmer::{base_to_ascii, canonical, decode, reverse_complement, shift_right};
use crate::sharded_map::ShardedMap;
use fxhash::FxHashSet;
use rayon::prelude::*;
use std::sync::Mutex;

/// A unitig: its DNA string and the aggregate statistics of its
/// constituent k-mer counts.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRecord {
    pub sequence: String,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
    /// `sum / (length - k + 1)`.
    pub weight: f64,
}

/// `x` is a left end when it has a unique right neighbor but no unique
/// left neighbor. Only non-banned, above-threshold candidates reach
/// this check (see [`traverse`]'s key filter), so a banned k-mer is
/// never itself considered for left-end-ness.
fn is_left_end(t: &ShardedMap, x: u64, k: usize, tau: i64) -> bool {
    unique_right(t, x, k, tau).is_some() && unique_left(t, x, k, tau).is_none()
}

fn emit_from_start(
    t: &ShardedMap,
    start: u64,
    k: usize,
    tau: i64,
    len_threshold: usize,
    used: &Mutex<FxHashSet<u64>>,
) -> Option<SequenceRecord> {
    let mut current = start;
    let mut counts = vec![t.get(current)];
    let mut dna = decode(start, k).into_bytes();

    loop {
        let b = match unique_right(t, current, k, tau) {
            Some(b) => b,
            None => break,
        };
        let next = shift_right(current, k, b as u64);
        if unique_left(t, next, k, tau).is_none() {
            break;
        }
        current = next;
        counts.push(t.get(current));
        dna.push(base_to_ascii(b as u64));
    }

    let start_canon = canonical(start, k);
    let end_canon = canonical(current, k);

    if start_canon > end_canon {
        return None;
    }
    if start_canon == end_canon {
        let mut guard = used.lock().unwrap();
        if guard.contains(&start_canon) {
            return None;
        }
        guard.insert(start_canon);
    }

    if dna.len() < len_threshold {
        return None;
    }

    let sum: i64 = counts.iter().sum();
    let min = *counts.iter().min().unwrap();
    let max = *counts.iter().max().unwrap();
    let windows = (dna.len() - k + 1) as f64;

    Some(SequenceRecord {
        sequence: String::from_utf8(dna).expect("2-bit decode always yields ASCII"),
        sum,
        min,
        max,
        weight: sum as f64 / windows,
    })
}

/// Emit every maximal non-branching path at or above `len_threshold`.
/// `table` must already have had [`crate::graph::ban_branching_kmers`]
/// run over it; `tau` is the same threshold used for that ban pass (and
/// for the neighbor probes here).
///
/// No ordering among emitted unitigs is promised. Candidate keys are
/// collected once up front and scanned in parallel, mirroring the ban
/// pass's own collect-then-`par_iter` shape; the only shared mutable
/// state is the `used` set that serializes palindrome deduplication.
pub fn traverse(t: &ShardedMap, k: usize, tau: i64, len_threshold: usize) -> Vec<SequenceRecord> {
    let used: Mutex<FxHashSet<u64>> = Mutex::new(FxHashSet::default());

    let candidates: Vec<u64> = t
        .entries()
        .filter(|&(_, v)| v > tau)
        .map(|(key, _)| key)
        .collect();

    candidates
        .par_iter()
        .flat_map_iter(|&canon| {
            let rc = reverse_complement(canon, k);
            [canon, rc]
                .into_iter()
                .filter(|&orientation| is_left_end(t, orientation, k, tau))
                .collect::<Vec<_>>()
        })
        .filter_map(|start| emit_from_start(t, start, k, tau, len_threshold, &used))
        .collect()
}
