//! Reader-to-k-mer pipeline: feeds a stream of DNA reads through the k-mer
//! codec into a shared [`ShardedMap`].
//!
//! Reads are pulled into fixed-size batches and handed to a `rayon` thread
//! pool; each worker slides a window across its reads, skipping over any
//! window that spans a non-ACGT base and resuming at the next valid one. A
//! read shorter than `k` contributes nothing.

use crate::errors::Result;
use crate::kmer::{canonical, mask, try_base};
use crate::sharded_map::ShardedMap;
use rayon::prelude::*;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Reads are pulled off the source in batches of this size by default (see
/// §4.3 of the design doc); a batch is the unit of work handed to the pool.
pub const DEFAULT_BATCH_SIZE: usize = 32_768;

#[derive(Debug, Default)]
pub struct IngestStats {
    pub reads_seen: u64,
    pub reads_too_short: u64,
    pub kmers_inserted: u64,
}

/// Every valid length-`k` window of `seq`, as raw (non-canonical) 2-bit
/// codes, in left-to-right order. A window spanning an N or other
/// non-ACGT byte is skipped; the scan resumes as soon as `k` consecutive
/// valid bases have been seen again.
pub(crate) fn raw_kmers(seq: &[u8], k: usize) -> impl Iterator<Item = u64> + '_ {
    let m = mask(k);
    let mut code = 0u64;
    let mut valid_run = 0usize;
    seq.iter().filter_map(move |&b| match try_base(b) {
        Some(v) => {
            code = ((code << 2) | v as u64) & m;
            valid_run += 1;
            if valid_run >= k {
                Some(code)
            } else {
                None
            }
        }
        None => {
            valid_run = 0;
            None
        }
    })
}

/// Insert every canonical k-mer of `seq` into `table`. Returns the number
/// of k-mers inserted (not distinct keys — repeats within the read count
/// individually, matching `insert`'s per-occurrence semantics).
fn ingest_read(table: &ShardedMap, seq: &[u8], k: usize) -> Result<u64> {
    let mut inserted = 0u64;
    for code in raw_kmers(seq, k) {
        table.insert_one(canonical(code, k))?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Drive `reads` through the codec into `table`, `k` bases at a time,
/// using a `rayon` pool sized to `workers`. Reads are pulled in batches of
/// `batch_size`; a shared stop flag is checked between batches so a caller
/// can request cooperative cancellation (e.g. from a `Ctrl-C` handler).
///
/// On the first worker error, the stop flag is set, in-flight reads in the
/// current batch finish, and the error is returned; no further batches are
/// pulled from the source.
pub fn ingest_reads<I>(
    reads: I,
    table: &ShardedMap,
    k: usize,
    workers: usize,
    batch_size: usize,
    stop: &AtomicBool,
) -> Result<IngestStats>
where
    I: Iterator<Item = io::Result<Vec<u8>>>,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .expect("building the ingest thread pool");

    let reads_seen = AtomicU64::new(0);
    let reads_too_short = AtomicU64::new(0);
    let kmers_inserted = AtomicU64::new(0);

    let mut batch: Vec<Vec<u8>> = Vec::with_capacity(batch_size);
    let mut reads = reads.peekable();
    let mut first_err = None;

    'batches: loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        batch.clear();
        while batch.len() < batch_size {
            match reads.next() {
                Some(Ok(seq)) => batch.push(seq),
                Some(Err(e)) => {
                    log::warn!("skipping unreadable read record: {e}");
                }
                None => break,
            }
        }
        if batch.is_empty() {
            break 'batches;
        }

        let result = pool.install(|| {
            batch.par_iter().try_for_each(|seq| -> Result<()> {
                if stop.load(Ordering::Relaxed) {
                    return Ok(());
                }
                reads_seen.fetch_add(1, Ordering::Relaxed);
                if seq.len() < k {
                    reads_too_short.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                let n = ingest_read(table, seq, k)?;
                kmers_inserted.fetch_add(n, Ordering::Relaxed);
                Ok(())
            })
        });

        if let Err(e) = result {
            stop.store(true, Ordering::Relaxed);
            first_err = Some(e);
            break 'batches;
        }

        if reads.peek().is_none() {
            break 'batches;
        }
    }

    if let Some(e) = first_err {
        return Err(e);
    }

    Ok(IngestStats {
        reads_seen: reads_seen.load(Ordering::Relaxed),
        reads_too_short: reads_too_short.load(Ordering::Relaxed),
        kmers_inserted: kmers_inserted.load(Ordering::Relaxed),
    })
}
