//! Multi-chromosome fan-out over a bounded worker pool.
//!
//! Chromosomes are independent pipelines sharing no mutable state beyond
//! the output writer; one chromosome's failure is surfaced as a failed unit
//! of work without touching its siblings.

use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use thiserror::Error;
use tracing::warn;

use crate::chromosome::{ChromosomeError, ChromosomeRealigner, RealignmentStats};
use crate::io::{AlignmentExtractor, IoError, RealignmentWriter, ReferenceProvider};
use crate::reads::{CigarIndelFinder, ReadRecord};
use crate::{ConfigError, RealignerConfig};

/// Errors raised by the pipeline scaffolding itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Writer lifecycle failure outside any single chromosome.
    #[error("writer failure: {0}")]
    Writer(#[from] IoError),
    /// The worker pool could not be constructed.
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Outcome of one chromosome's worker.
pub type ChromosomeOutcome = (Arc<str>, Result<RealignmentStats, ChromosomeError>);

struct SharedWriter<'a, W>(&'a Mutex<W>);

impl<W: RealignmentWriter> SharedWriter<'_, W> {
    fn with<T>(
        &mut self,
        apply: impl FnOnce(&mut W) -> Result<T, IoError>,
    ) -> Result<T, IoError> {
        let mut guard = self.0.lock().map_err(|_| IoError::WriterPoisoned)?;
        apply(&mut guard)
    }
}

impl<W: RealignmentWriter> RealignmentWriter for SharedWriter<'_, W> {
    fn initialize(&mut self) -> Result<(), IoError> {
        self.with(|writer| writer.initialize())
    }

    fn write_read(&mut self, read: &ReadRecord, was_remapped: bool) -> Result<(), IoError> {
        self.with(|writer| writer.write_read(read, was_remapped))
    }

    fn flush_chromosome(&mut self) -> Result<(), IoError> {
        self.with(|writer| writer.flush_chromosome())
    }

    fn finish(&mut self) -> Result<(), IoError> {
        self.with(|writer| writer.finish())
    }
}

/// Realign every chromosome over a bounded rayon pool.
///
/// `make_cursors` opens the two independent extractor cursors one
/// chromosome worker needs. The writer is initialized once up front and
/// finished once at the end; each worker flushes its own chromosome
/// boundary. Failed chromosomes are reported in the outcome list, not
/// propagated.
pub fn realign_chromosomes<E, W, R, M>(
    chromosomes: &[Arc<str>],
    config: &RealignerConfig,
    reference: &R,
    make_cursors: &M,
    writer: &Mutex<W>,
) -> Result<Vec<ChromosomeOutcome>, PipelineError>
where
    E: AlignmentExtractor + Send,
    W: RealignmentWriter + Send,
    R: ReferenceProvider + Sync,
    M: Fn(&str) -> Result<(E, E), IoError> + Sync,
{
    config.validate()?;

    {
        let mut guard = writer.lock().map_err(|_| IoError::WriterPoisoned)?;
        guard.initialize()?;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_threads)
        .build()?;

    let outcomes: Vec<ChromosomeOutcome> = pool.install(|| {
        chromosomes
            .par_iter()
            .map(|chrom| {
                let outcome = run_chromosome(chrom, config, reference, make_cursors, writer);
                if let Err(error) = &outcome {
                    warn!(chrom = %chrom, %error, "chromosome worker failed");
                }
                (Arc::clone(chrom), outcome)
            })
            .collect()
    });

    {
        let mut guard = writer.lock().map_err(|_| IoError::WriterPoisoned)?;
        guard.finish()?;
    }
    Ok(outcomes)
}

fn run_chromosome<E, W, R, M>(
    chrom: &Arc<str>,
    config: &RealignerConfig,
    reference: &R,
    make_cursors: &M,
    writer: &Mutex<W>,
) -> Result<RealignmentStats, ChromosomeError>
where
    E: AlignmentExtractor + Send,
    W: RealignmentWriter + Send,
    R: ReferenceProvider + Sync,
    M: Fn(&str) -> Result<(E, E), IoError> + Sync,
{
    let bases = reference.chromosome(chrom).map_err(|error| match error {
        IoError::UnknownChromosome(name) => ChromosomeError::MissingReference(name),
        other => ChromosomeError::Io(other),
    })?;
    let (mut candidate_cursor, mut realign_cursor) = make_cursors(chrom)?;
    let mut shared = SharedWriter(writer);
    let orchestrator =
        ChromosomeRealigner::new(Arc::clone(chrom), config.clone(), CigarIndelFinder::new());
    orchestrator.process(
        &mut candidate_cursor,
        &mut realign_cursor,
        &bases,
        &mut shared,
    )
}
