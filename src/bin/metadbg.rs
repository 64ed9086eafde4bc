//! Thin CLI shell wiring `RunConfig` to the library pipeline. Owns the
//! progress-reporting and process-exit concerns the library itself does
//! not: argument parsing, a progress bar around the long-running stages,
//! and turning a library `Result` into a process exit code.

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use metadbg::config::RunConfig;
use metadbg::output::{write_distribution, write_fasta, write_seq_info, write_vector};
use metadbg::pipeline::{run_unitig_construction, FeatureProjector};
use std::fs::{create_dir_all, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

/// Build De Bruijn graph unitigs from short reads, or project a sample
/// onto pre-computed connected components as a feature vector.
#[derive(Parser)]
#[command(
    name = "metadbg",
    about = "De Bruijn graph construction and unitig traversal for metagenome assembly",
    version
)]
#[clap(group = ArgGroup::new("threshold_mode").args(&["bad_frequency", "bottom_cut_percent"]).multiple(false))]
struct Cli {
    /// K-mer length [1, 31] [integer]
    #[clap(short = 'k', long, required = true, help_heading = "Core")]
    k: u8,

    /// Output directory for results [path]
    #[clap(short = 'o', long, required = true, help_heading = "Core")]
    output_dir: PathBuf,

    /// Number of worker threads (defaults to available processors) [integer]
    #[clap(short = 't', long, help_heading = "Core")]
    workers: Option<usize>,

    /// Soft memory cap for the k-mer table, in bytes [integer]
    #[clap(long, default_value_t = 1usize << 30, help_heading = "Core")]
    max_size: usize,

    /// Minimum unitig length to emit [integer]
    #[clap(long = "sequence-len", default_value_t = 0, help_heading = "Unitigs")]
    sequence_len: usize,

    /// Absolute erroneous-k-mer cutoff (mutually exclusive with bottom-cut-percent) [integer]
    #[clap(long = "maximal-bad-frequency", group = "threshold_mode", help_heading = "Unitigs")]
    bad_frequency: Option<i64>,

    /// Percentile erroneous-k-mer cutoff [0, 100] [integer]
    #[clap(long = "bottom-cut-percent", group = "threshold_mode", help_heading = "Unitigs")]
    bottom_cut_percent: Option<u8>,

    /// Reads files (FASTQ/FASTA/BINQ) to ingest [path ...]
    #[clap(long, help_heading = "Input")]
    reads: Vec<PathBuf>,

    /// K-mer count files to project as feature-vector samples [path ...]
    #[clap(long, help_heading = "Input")]
    kmers: Vec<PathBuf>,

    /// Connected-components binary file; presence switches this run from
    /// unitig construction to feature-vector projection [path]
    #[clap(long = "components-file", help_heading = "Feature vectors")]
    components_file: Option<PathBuf>,

    /// Tau used by the feature-vector builder [integer]
    #[clap(long, default_value_t = 0, help_heading = "Feature vectors")]
    threshold: i64,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        let defaults = RunConfig::default();
        RunConfig {
            k: self.k,
            sequence_len: self.sequence_len,
            bad_frequency: self.bad_frequency,
            bottom_cut_percent: self.bottom_cut_percent,
            max_size: self.max_size,
            threshold: self.threshold,
            reads: self.reads,
            kmers: self.kmers,
            components_file: self.components_file,
            workers: self.workers.unwrap_or(defaults.workers),
            ..defaults
        }
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let output_dir = cli.output_dir.clone();
    let components_file = cli.components_file.clone();
    let samples: Vec<PathBuf> = cli.reads.iter().chain(cli.kmers.iter()).cloned().collect();
    let config = cli.into_config();
    config.validate().context("validating configuration")?;

    create_dir_all(&output_dir).context("creating output directory")?;

    if components_file.is_some() {
        run_feature_vectors(&config, &samples, &output_dir)?;
    } else {
        run_unitigs(&config, &output_dir)?;
    }

    log::info!("elapsed time: {:.2?}", start_time.elapsed());
    Ok(())
}

fn run_unitigs(config: &RunConfig, output_dir: &PathBuf) -> Result<()> {
    if config.reads.is_empty() {
        bail!("unitig construction requires at least one --reads file");
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}").unwrap());
    pb.set_message("ingesting reads and constructing unitigs");
    pb.enable_steady_tick(std::time::Duration::from_millis(120));

    let run = run_unitig_construction(config).context("constructing unitigs")?;
    pb.finish_with_message(format!("emitted {} unitigs", run.records.len()));

    write_fasta(
        BufWriter::new(File::create(output_dir.join("sequences.fasta")).context("creating sequences.fasta")?),
        &run.records,
    )
    .context("writing sequences.fasta")?;
    write_distribution(
        BufWriter::new(File::create(output_dir.join("distribution")).context("creating distribution")?),
        &run.histogram,
    )
    .context("writing distribution")?;
    write_seq_info(
        BufWriter::new(File::create(output_dir.join("seq-info")).context("creating seq-info")?),
        &run.records,
    )
    .context("writing seq-info")?;

    Ok(())
}

fn run_feature_vectors(config: &RunConfig, samples: &[PathBuf], output_dir: &PathBuf) -> Result<()> {
    if samples.is_empty() {
        bail!("feature-vector projection requires at least one --reads or --kmers sample");
    }
    let vectors_dir = output_dir.join("vectors");
    create_dir_all(&vectors_dir).context("creating vectors directory")?;

    let pb = ProgressBar::new(samples.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("       {bar:40} {pos}/{len} [{elapsed_precise}] {msg}")
            .unwrap(),
    );

    let projector = FeatureProjector::new(config).context("seeding component table")?;
    for sample in samples {
        let vector = projector
            .project_sample(sample)
            .with_context(|| format!("projecting sample {}", sample.display()))?;
        let stem = sample
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sample".to_string());
        let out_path = vectors_dir.join(format!("{stem}.txt"));
        write_vector(
            BufWriter::new(File::create(&out_path).context("creating vector output file")?),
            &vector,
        )
        .context("writing feature vector")?;
        pb.inc(1);
    }
    pb.finish_with_message("| finished projecting samples");
    Ok(())
}
