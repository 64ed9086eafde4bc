//! High-level pipeline drivers wiring the individual components together.
//! A thin CLI shell (or any other embedder) calls these instead of
//! re-assembling C2 through C8 by hand.

use crate::components::read_components_file;
use crate::config::RunConfig;
use crate::errors::{MetaDbgError, Result};
use crate::features::{apply_kmer_count_sample, apply_read_sample, project_components, read_kmer_counts, seed_table};
use crate::graph::ban_branching_kmers;
use crate::ingest::ingest_reads;
use crate::reads::open_reads;
use crate::sharded_map::ShardedMap;
use crate::threshold::{build_histogram, DEFAULT_STAT_LEN};
use crate::unitig::{traverse, SequenceRecord};
use std::path::Path;
use std::sync::atomic::AtomicBool;

/// Everything produced by the unitig-construction half of the pipeline
/// (C3 through C5), plus the histogram and chosen tau that C6/C10 need
/// for the `distribution` output.
pub struct UnitigRun {
    pub records: Vec<SequenceRecord>,
    pub histogram: Vec<u64>,
    pub tau: i64,
}

/// Ingest every reads file in `config.reads` into a fresh table, pick a
/// threshold per `config.threshold_mode()`, ban branching k-mers, and
/// emit unitigs at or above `config.sequence_len`.
///
/// Returns `EmptyResult` if no reads file yielded a single k-mer.
pub fn run_unitig_construction(config: &RunConfig) -> Result<UnitigRun> {
    config.validate()?;
    let k = config.k as usize;
    let table = ShardedMap::with_budget(config.max_size, config.workers, k);
    let stop = AtomicBool::new(false);

    let mut any_kmers = false;
    for path in &config.reads {
        let source = open_reads(path)?;
        let stats = ingest_reads(source, &table, k, config.workers, config.batch_size, &stop)?;
        any_kmers |= stats.kmers_inserted > 0;
    }
    if !any_kmers {
        return Err(MetaDbgError::EmptyResult(
            "no reads yielded a single k-mer".into(),
        ));
    }

    let histogram = build_histogram(&table, DEFAULT_STAT_LEN);
    let tau = config.threshold_mode().select(&histogram);
    log::info!("selected tau = {tau}");

    ban_branching_kmers(&table, k, tau);
    let records = traverse(&table, k, tau, config.sequence_len);

    Ok(UnitigRun {
        records,
        histogram,
        tau,
    })
}

/// A table seeded once from a components file and reused across every
/// sample in a run. §3/§5 call for the table to be reset in place
/// (`reset_values`, keys preserved) between samples rather than rebuilt
/// from scratch each time; this struct is the thing that makes that
/// reuse possible for a caller projecting more than one sample.
pub struct FeatureProjector {
    table: ShardedMap,
    components: Vec<Vec<u64>>,
    k: usize,
    workers: usize,
    threshold: i64,
}

impl FeatureProjector {
    /// Parse `config.components_file` and seed a table from it once.
    pub fn new(config: &RunConfig) -> Result<Self> {
        config.validate()?;
        let k = config.k as usize;
        let components_path = config.components_file.as_deref().ok_or_else(|| {
            MetaDbgError::InvalidInput("no components-file configured".into())
        })?;
        let components = read_components_file(components_path)?;
        if components.is_empty() {
            return Err(MetaDbgError::EmptyResult(
                "components file contains no components".into(),
            ));
        }
        let table = seed_table(&components, config.workers, k);

        Ok(Self {
            table,
            components,
            k,
            workers: config.workers,
            threshold: config.threshold,
        })
    }

    /// Project one sample (a reads file or a k-mer count file, dispatched
    /// by extension — `.binq`/`.fq`/`.fastq`/`.fa`/`.fasta`/`.fna`(`.gz`)
    /// are reads, anything else is treated as a k-mer count file) onto
    /// the seeded components.
    ///
    /// Resets the table's values in place before applying the sample, so
    /// repeated calls never see a previous sample's counts and the table
    /// itself is never rebuilt.
    pub fn project_sample(&self, sample_path: &Path) -> Result<Vec<f64>> {
        self.table.reset_values();

        let normalizer = if is_kmer_count_file(sample_path) {
            let pairs = read_kmer_counts(sample_path)?;
            apply_kmer_count_sample(&self.table, &pairs) as f64
        } else {
            let source = open_reads(sample_path)?;
            apply_read_sample(&self.table, source, self.k)?;
            1.0
        };

        Ok(project_components(
            &self.table,
            &self.components,
            self.threshold,
            normalizer,
            self.workers,
        ))
    }
}

/// Project a single sample onto `config.components_file`'s connected
/// components. A thin convenience wrapper over [`FeatureProjector`] for
/// callers with exactly one sample; a caller projecting several samples
/// should build one `FeatureProjector` and call `project_sample` on it
/// per sample instead, so the components file is parsed once and the
/// table is reset rather than rebuilt between samples.
pub fn run_feature_vector(config: &RunConfig, sample_path: &Path) -> Result<Vec<f64>> {
    FeatureProjector::new(config)?.project_sample(sample_path)
}

/// A sample is a k-mer count file when its extension doesn't match any
/// of the recognized reads formats, mirroring `open_reads`'s own
/// extension dispatch without paying for opening the file twice.
fn is_kmer_count_file(path: &Path) -> bool {
    let name = path.to_string_lossy().to_lowercase();
    let stem = name.strip_suffix(".gz").unwrap_or(&name);
    !(stem.ends_with(".binq")
        || stem.ends_with(".fq")
        || stem.ends_with(".fastq")
        || stem.ends_with(".fa")
        || stem.ends_with(".fasta")
        || stem.ends_with(".fna"))
}
