//! Feature-vector builder: projects a new sample onto pre-computed
//! connected components of the unitig graph and emits a normalized
//! presence/abundance vector.
//!
//! The table built here is read-only by the time [`project_components`]
//! runs (§5); the seeding and sample-application steps are the only
//! writers, and they never run concurrently with projection.

use crate::errors::Result;
use crate::ingest::raw_kmers;
use crate::kmer::canonical;
use crate::sharded_map::ShardedMap;
use fxhash::FxHashMap;
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Build a table seeded with every k-mer across all components, value
/// zero. Shard count mirrors [`ShardedMap::with_budget`]'s sizing input
/// for consistency, but a small fixed count is fine for the component
/// k-mer population, which is typically far smaller than the full read
/// set this crate otherwise ingests.
pub fn seed_table(components: &[Vec<u64>], workers: usize, k: usize) -> ShardedMap {
    let shard_count = (workers.max(1) * 4).next_power_of_two();
    ShardedMap::seeded(
        components.iter().flatten().copied(),
        shard_count,
        k,
    )
}

/// Stream `reads`, tally each read's canonical k-mers in a scratch map,
/// then `set` the table's value for every seeded key that was observed.
/// Keys outside the seeded component set are never inserted — this is
/// presence-and-count against the pre-seeded population, not
/// insert-if-absent.
pub fn apply_read_sample<I>(table: &ShardedMap, reads: I, k: usize) -> Result<()>
where
    I: Iterator<Item = io::Result<Vec<u8>>>,
{
    let mut counts: FxHashMap<u64, i64> = FxHashMap::default();
    for read in reads {
        let seq = read?;
        if seq.len() < k {
            continue;
        }
        for code in raw_kmers(&seq, k) {
            *counts.entry(canonical(code, k)).or_insert(0) += 1;
        }
    }
    for (key, count) in counts {
        if table.contains(key) {
            table.set(key, count);
        }
    }
    Ok(())
}

/// A `(key: u64, count: u16)` k-mer count file, little-endian, as
/// described in the external-interfaces section.
pub fn read_kmer_counts(path: &Path) -> Result<Vec<(u64, u16)>> {
    let mut r = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    loop {
        let mut key_buf = [0u8; 8];
        match r.read_exact(&mut key_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let mut count_buf = [0u8; 2];
        r.read_exact(&mut count_buf)?;
        out.push((u64::from_le_bytes(key_buf), u16::from_le_bytes(count_buf)));
    }
    Ok(out)
}

/// Apply `(key, count)` pairs from a k-mer count file to the seeded
/// table, same presence-and-count semantics as [`apply_read_sample`].
/// Returns `total_kmers = sum(count)`, used as the normalizer.
pub fn apply_kmer_count_sample(table: &ShardedMap, pairs: &[(u64, u16)]) -> u64 {
    let mut total = 0u64;
    for &(key, count) in pairs {
        total += count as u64;
        if table.contains(key) {
            table.set(key, count as i64);
        }
    }
    total
}

/// For each component, in parallel across worker-sized contiguous
/// slices, sum the table values above `tau` and divide by `normalizer`.
/// Component order in the output matches `components`'s order exactly.
pub fn project_components(
    table: &ShardedMap,
    components: &[Vec<u64>],
    tau: i64,
    normalizer: f64,
    workers: usize,
) -> Vec<f64> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .expect("building the projection thread pool");

    pool.install(|| {
        components
            .par_iter()
            .map(|component| {
                let sum: i64 = component
                    .iter()
                    .map(|&x| table.get(x))
                    .filter(|&v| v > tau)
                    .sum();
                sum as f64 / normalizer
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kmer::encode;

    #[test]
    fn worked_feature_vector_example() {
        // C1 = {ACG, CGT}, C2 = {GTA, TAC}; reads "ACGTAC" twice.
        // At tau=0, v = [4, 4] before normalization; N=8 -> [0.5, 0.5].
        let k = 3;
        let c1 = vec![
            crate::kmer::canonical(encode(b"ACG", k).unwrap(), k),
            crate::kmer::canonical(encode(b"CGT", k).unwrap(), k),
        ];
        let c2 = vec![
            crate::kmer::canonical(encode(b"GTA", k).unwrap(), k),
            crate::kmer::canonical(encode(b"TAC", k).unwrap(), k),
        ];
        let components = vec![c1, c2];

        let table = seed_table(&components, 2, k);
        let reads: Vec<io::Result<Vec<u8>>> =
            vec![Ok(b"ACGTAC".to_vec()), Ok(b"ACGTAC".to_vec())];
        apply_read_sample(&table, reads.into_iter(), k).unwrap();

        let v = project_components(&table, &components, 0, 8.0, 2);
        assert_eq!(v, vec![0.5, 0.5]);
    }

    #[test]
    fn keys_outside_seeded_components_are_ignored() {
        let k = 3;
        let seeded_key = crate::kmer::canonical(encode(b"ACG", k).unwrap(), k);
        let other_key = crate::kmer::canonical(encode(b"TTT", k).unwrap(), k);
        let components = vec![vec![seeded_key]];
        let table = seed_table(&components, 1, k);

        let pairs = vec![(seeded_key, 5u16), (other_key, 99u16)];
        let total = apply_kmer_count_sample(&table, &pairs);
        assert_eq!(total, 104);
        assert!(!table.contains(other_key));
        assert_eq!(table.get(seeded_key), 5);
    }

    #[test]
    fn threshold_excludes_low_counts_from_projection() {
        let k = 3;
        let key = crate::kmer::canonical(encode(b"ACG", k).unwrap(), k);
        let components = vec![vec![key]];
        let table = seed_table(&components, 1, k);
        table.set(key, 1);

        assert_eq!(project_components(&table, &components, 1, 1.0, 1), vec![0.0]);
        assert_eq!(project_components(&table, &components, 0, 1.0, 1), vec![1.0]);
    }

    #[test]
    fn kmer_count_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.kmers");
        {
            use std::io::Write;
            let mut f = std::fs::File::create(&path).unwrap();
            f.write_all(&7u64.to_le_bytes()).unwrap();
            f.write_all(&3u16.to_le_bytes()).unwrap();
            f.write_all(&9u64.to_le_bytes()).unwrap();
            f.write_all(&11u16.to_le_bytes()).unwrap();
        }
        let pairs = read_kmer_counts(&path).unwrap();
        assert_eq!(pairs, vec![(7u64, 3u16), (9u64, 11u16)]);
    }
}
