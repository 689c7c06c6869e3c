use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use indelign::io::bam::{BamExtractor, BamRealignmentWriter, FaidxReference};
use indelign::io::{IoError, ReferenceProvider, SliceReference};
use indelign::{pipeline, RealignerConfig};

#[derive(Parser, Debug)]
#[command(name = "indelign", about = "Indel realignment around candidate sites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Realign reads from an indexed, coordinate-sorted BAM.
    Realign {
        /// Input BAM (must have a .bai index).
        bam: PathBuf,
        /// Reference FASTA (must have a .fai index).
        reference: PathBuf,
        /// Output BAM path.
        #[arg(long, short)]
        out: PathBuf,
        /// Chromosomes to process (default: every reference sequence).
        #[arg(long = "chrom")]
        chromosomes: Vec<String>,
        /// Genomic block length for candidate batching.
        #[arg(long, default_value_t = 1000)]
        block_size: u32,
        /// Largest accepted realignment position shift.
        #[arg(long, default_value_t = 250)]
        max_realign_shift: u32,
        /// Minimum support/coverage frequency for a realignment target.
        #[arg(long, default_value_t = 0.05)]
        min_alt_frequency: f32,
        /// Worker threads (0 = automatic).
        #[arg(long, default_value_t = 0)]
        threads: usize,
        /// Count duplicate reads as evidence and realign them.
        #[arg(long)]
        include_duplicates: bool,
        /// Drop duplicate reads from the output entirely.
        #[arg(long)]
        remove_duplicates: bool,
        /// Leave realigned reads unclipped instead of re-imposing the
        /// original soft-clip boundaries.
        #[arg(long)]
        no_remask_softclips: bool,
        /// Re-mask only originally-N bases when re-imposing soft clips.
        #[arg(long)]
        remask_ns_only: bool,
        /// Emit edge insertions of accepted realignments as soft clips.
        #[arg(long)]
        mask_partial_insertion: bool,
        /// Never raise mapping quality 0, even on a perfect realignment.
        #[arg(long)]
        no_rescoring_mapq_zero: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Realign {
            bam,
            reference,
            out,
            chromosomes,
            block_size,
            max_realign_shift,
            min_alt_frequency,
            threads,
            include_duplicates,
            remove_duplicates,
            no_remask_softclips,
            remask_ns_only,
            mask_partial_insertion,
            no_rescoring_mapq_zero,
        } => {
            let config = RealignerConfig {
                block_size,
                max_realign_shift,
                min_alt_frequency,
                max_threads: threads,
                include_duplicates,
                skip_and_remove_duplicates: remove_duplicates,
                remask_softclips: !no_remask_softclips,
                remask_ns_only,
                mask_partial_insertion,
                allow_rescoring_orig_zero: !no_rescoring_mapq_zero,
                ..RealignerConfig::default()
            };
            run_realign(bam, reference, out, chromosomes, config)
        }
    }
}

fn run_realign(
    bam: PathBuf,
    reference_path: PathBuf,
    out: PathBuf,
    chromosomes: Vec<String>,
    config: RealignerConfig,
) -> Result<()> {
    let reference = FaidxReference::from_path(&reference_path).with_context(|| {
        format!(
            "failed to open indexed FASTA {}",
            reference_path.display()
        )
    })?;

    let chromosomes: Vec<Arc<str>> = if chromosomes.is_empty() {
        reference.chromosome_names()
    } else {
        chromosomes.into_iter().map(Arc::from).collect()
    };

    // The faidx handle is not shareable across workers; load the selected
    // chromosome sequences up front instead. A chromosome that fails to
    // load is reported by its own worker, not here.
    let mut preloaded = SliceReference::new();
    for chrom in &chromosomes {
        match reference.chromosome(chrom) {
            Ok(bases) => preloaded = preloaded.with_chromosome(Arc::clone(chrom), &bases),
            Err(error) => eprintln!("{chrom}\twill fail\t{error}"),
        }
    }

    let writer = BamRealignmentWriter::from_paths(&out, &bam)
        .with_context(|| format!("failed to create output BAM {}", out.display()))?;
    let writer = Mutex::new(writer);

    let make_cursors = |_chrom: &str| -> Result<(BamExtractor, BamExtractor), IoError> {
        Ok((
            BamExtractor::from_path(&bam)?,
            BamExtractor::from_path(&bam)?,
        ))
    };

    let outcomes = pipeline::realign_chromosomes(
        &chromosomes,
        &config,
        &preloaded,
        &make_cursors,
        &writer,
    )
    .context("realignment pipeline failed")?;

    let mut failed = 0usize;
    for (chrom, outcome) in &outcomes {
        match outcome {
            Ok(stats) => println!(
                "{chrom}\tprocessed={}\trealigned={}\tskipped={}\tcandidates={}",
                stats.reads_processed,
                stats.reads_realigned,
                stats.reads_skipped,
                stats.candidates_accepted
            ),
            Err(error) => {
                failed += 1;
                eprintln!("{chrom}\tFAILED\t{error}");
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} chromosome(s) failed");
    }
    Ok(())
}
