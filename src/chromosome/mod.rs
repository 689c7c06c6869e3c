//! Per-chromosome orchestration: extract candidates, call targets, realign
//! each read, write every read exactly once.
//!
//! The loop is a strictly sequential state machine over fixed-size genomic
//! blocks. Two independent cursors walk the same sorted stream: the
//! candidate cursor runs ahead harvesting indels into the state manager,
//! and the realign cursor trails two blocks behind so every candidate a
//! read could reach has already been observed and target-called.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::align::{
    construct_cigar, mismatch_map, prefix_reference_consumed_through, softclip_cigar,
    summarize_alignment, CigarOpKind,
};
use crate::candidates::{AlleleCountSource, IndelRanker, IndelTargetCaller};
use crate::io::{AlignmentExtractor, IoError, RealignmentWriter};
use crate::reads::{IndelFinder, ReadRecord};
use crate::realign::{ReadRealigner, RealignmentResult};
use crate::state::RealignStateManager;
use crate::RealignerConfig;

/// Failures that abort one chromosome's pipeline.
#[derive(Debug, Error)]
pub enum ChromosomeError {
    /// Extractor or writer failure.
    #[error("I/O failure: {0}")]
    Io(#[from] IoError),
    /// The reference window does not cover the chromosome.
    #[error("chromosome {0:?} missing from the reference")]
    MissingReference(String),
}

/// Counters reported once per chromosome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RealignmentStats {
    /// Reads handed to the per-read policy.
    pub reads_processed: u64,
    /// Reads accepted with a new alignment.
    pub reads_realigned: u64,
    /// Reads passed through unchanged by the skip policy.
    pub reads_skipped: u64,
    /// Duplicate reads dropped from the output entirely.
    pub duplicates_dropped: u64,
    /// Candidate observations harvested from the extraction pass.
    pub candidates_observed: u64,
    /// Distinct candidates accepted by the target caller.
    pub candidates_accepted: u64,
}

/// Read depth per block, used as the target caller's denominator.
#[derive(Debug, Default)]
pub struct BlockCoverage {
    block_size: u32,
    counts: BTreeMap<u32, u32>,
}

impl BlockCoverage {
    /// Empty tracker for the given block size.
    pub fn new(block_size: u32) -> Self {
        Self {
            block_size: block_size.max(1),
            counts: BTreeMap::new(),
        }
    }

    /// Count one read toward every block it overlaps.
    pub fn observe(&mut self, read: &ReadRecord) {
        let first = read.pos / self.block_size;
        let last = read.end().saturating_sub(1).max(read.pos) / self.block_size;
        for index in first..=last {
            *self.counts.entry(index).or_insert(0) += 1;
        }
    }
}

impl AlleleCountSource for BlockCoverage {
    fn coverage_at(&self, _chrom: &str, position: u32) -> u32 {
        let index = position.saturating_sub(1) / self.block_size;
        self.counts.get(&index).copied().unwrap_or(0)
    }
}

/// Orchestration state machine for one chromosome.
#[derive(Debug)]
pub struct ChromosomeRealigner<F: IndelFinder> {
    chrom: Arc<str>,
    config: RealignerConfig,
    state: RealignStateManager,
    realigner: ReadRealigner,
    target_caller: IndelTargetCaller,
    finder: F,
    coverage: BlockCoverage,
    stats: RealignmentStats,
    accepted_keys: HashSet<String>,
    pending: Option<ReadRecord>,
    current_block: Option<u32>,
}

impl<F: IndelFinder> ChromosomeRealigner<F> {
    /// Build an orchestrator for one chromosome.
    pub fn new(chrom: impl Into<Arc<str>>, config: RealignerConfig, finder: F) -> Self {
        let block_size = config.block_size;
        Self {
            chrom: chrom.into(),
            realigner: ReadRealigner::new(
                config.anchor_lookaround,
                config.max_indels_per_combination,
            ),
            target_caller: IndelTargetCaller::new(config.min_alt_frequency),
            state: RealignStateManager::new(block_size),
            coverage: BlockCoverage::new(block_size),
            finder,
            config,
            stats: RealignmentStats::default(),
            accepted_keys: HashSet::new(),
            pending: None,
            current_block: None,
        }
    }

    /// Drive both cursors to exhaustion and report the chromosome's stats.
    ///
    /// Every read from the realign cursor is written exactly once (unless
    /// dropped under skip-and-remove-duplicates); the writer's chromosome
    /// flush hook fires before returning.
    pub fn process<E: AlignmentExtractor, W: RealignmentWriter>(
        mut self,
        candidate_cursor: &mut E,
        realign_cursor: &mut E,
        reference: &[u8],
        writer: &mut W,
    ) -> Result<RealignmentStats, ChromosomeError> {
        candidate_cursor.jump(&self.chrom, 0)?;
        realign_cursor.jump(&self.chrom, 0)?;

        loop {
            match candidate_cursor.next_alignment()? {
                Some(read) => {
                    let block = read.pos / self.config.block_size;
                    if self.current_block.is_some_and(|current| block > current) {
                        let watermark = read.pos.saturating_sub(self.config.block_size);
                        self.run_block(Some(watermark), realign_cursor, reference, writer)?;
                    }
                    self.current_block = Some(self.current_block.unwrap_or(block).max(block));
                    self.extract(&read, reference);
                }
                None => {
                    self.run_block(None, realign_cursor, reference, writer)?;
                    break;
                }
            }
        }

        writer.flush_chromosome()?;
        info!(
            chrom = %self.chrom,
            processed = self.stats.reads_processed,
            realigned = self.stats.reads_realigned,
            skipped = self.stats.reads_skipped,
            "chromosome realignment complete"
        );
        Ok(self.stats)
    }

    /// Candidate harvesting policy: mapq-0 and secondary reads contribute
    /// no candidates; duplicates are excluded from evidence unless
    /// configured in; secondary/supplementary records never add coverage.
    fn extract(&mut self, read: &ReadRecord, reference: &[u8]) {
        if !read.flags.is_mapped
            || read.flags.is_secondary
            || read.flags.is_supplementary
            || (read.flags.is_duplicate && !self.config.include_duplicates)
        {
            return;
        }
        self.coverage.observe(read);
        if read.mapq == 0 {
            return;
        }
        let indels = self.finder.find(read, reference);
        if !indels.is_empty() {
            self.stats.candidates_observed += indels.len() as u64;
            self.state.add_candidates(&indels);
        }
    }

    fn run_block<E: AlignmentExtractor, W: RealignmentWriter>(
        &mut self,
        watermark: Option<u32>,
        realign_cursor: &mut E,
        reference: &[u8],
        writer: &mut W,
    ) -> Result<(), ChromosomeError> {
        let Some(batch) = self.state.get_candidates_to_process(watermark) else {
            return Ok(());
        };
        let groups = self.state.get_candidate_groups(watermark);
        let accepted = self.target_caller.call(&batch.candidates, &self.coverage);
        for indel in &accepted {
            if self.accepted_keys.insert(indel.canonical_key()) {
                self.stats.candidates_accepted += 1;
            }
        }
        let ranker = IndelRanker::from_observations(&batch.candidates);

        // Realign one block behind the candidate boundary so reads can
        // still reach candidates in the retained block ahead of them.
        let boundary = if batch.flush {
            None
        } else {
            Some(batch.cleared_through.saturating_sub(self.config.block_size))
        };

        loop {
            let read = match self.pending.take() {
                Some(read) => read,
                None => match realign_cursor.next_alignment()? {
                    Some(read) => read,
                    None => break,
                },
            };
            if let Some(boundary) = boundary {
                if read.pos >= boundary {
                    self.pending = Some(read);
                    break;
                }
            }
            self.process_read(read, &accepted, &groups, &ranker, reference, writer)?;
        }

        self.state.done_processing(&batch);
        Ok(())
    }

    /// Per-read accept/reject policy.
    fn process_read<W: RealignmentWriter>(
        &mut self,
        read: ReadRecord,
        accepted: &[crate::candidates::CandidateIndel],
        groups: &crate::candidates::CoexistenceGroups,
        ranker: &IndelRanker,
        reference: &[u8],
        writer: &mut W,
    ) -> Result<(), ChromosomeError> {
        self.stats.reads_processed += 1;

        let skip = !read.flags.is_mapped
            || read.flags.is_secondary
            || read.flags.is_supplementary
            || read.flags.has_supplementary_tag
            || (read.flags.is_duplicate && !self.config.include_duplicates);
        if skip {
            if read.flags.is_duplicate && self.config.skip_and_remove_duplicates {
                self.stats.duplicates_dropped += 1;
                return Ok(());
            }
            self.stats.reads_skipped += 1;
            writer.write_read(&read, false)?;
            return Ok(());
        }

        let result = self
            .realigner
            .realign(&read, accepted, reference, ranker, groups);
        let Some(result) = result else {
            writer.write_read(&read, false)?;
            return Ok(());
        };

        let shift = (result.position as i64 - read.pos as i64).unsigned_abs();
        if shift > self.config.max_realign_shift as u64 {
            debug!(read = %read.name, shift, "rejected: shift exceeds limit");
            writer.write_read(&read, false)?;
            return Ok(());
        }
        if result.position == read.pos && result.cigar == read.cigar {
            // A result identical to the original alignment is not a
            // realignment.
            writer.write_read(&read, false)?;
            return Ok(());
        }

        let realigned = self.apply(&read, &result, reference);
        writer.write_read(&realigned, true)?;
        self.stats.reads_realigned += 1;
        Ok(())
    }

    /// Materialize an accepted result: position/CIGAR, optional soft-clip
    /// re-masking, NM recomputation, mapping-quality rescoring.
    fn apply(
        &self,
        original: &ReadRecord,
        result: &RealignmentResult,
        reference: &[u8],
    ) -> ReadRecord {
        let mut read = original.clone();
        read.apply_realignment(result);

        if self.config.remask_softclips {
            if let Some(mismatches) =
                mismatch_map(&read.sequence, &result.position_map, reference)
            {
                let clipped = softclip_cigar(
                    &result.cigar,
                    &mismatches,
                    original.prefix_softclip_len(),
                    original.suffix_softclip_len(),
                    self.config.remask_ns_only,
                    original.n_prefix_len(),
                    original.n_suffix_len(),
                );
                let lead_clip = clipped
                    .iter()
                    .take_while(|op| op.kind == CigarOpKind::SoftClip)
                    .map(|op| op.len)
                    .sum();
                read.pos =
                    result.position + prefix_reference_consumed_through(&result.cigar, lead_clip);
                read.cigar = clipped;
            }
        } else if self.config.mask_partial_insertion {
            // Edge insertions consume no reference, so the position holds.
            read.cigar = construct_cigar(&result.position_map, true);
        }

        // NM reflects the final alignment; soft-clipped bases do not count.
        read.edit_distance = match summarize_alignment(
            &read.sequence,
            &read.cigar,
            read.pos,
            reference,
        ) {
            Some(summary) => Some(summary.num_mismatches + summary.num_indel_bases),
            None => Some(result.num_mismatches + result.num_indel_bases),
        };

        if result.num_mismatches == 0 {
            let rescored = match original.mapq {
                0 => self.config.allow_rescoring_orig_zero.then_some(40),
                quality if quality <= 20 => Some(40),
                _ => None,
            };
            if let Some(quality) = rescored {
                read.mapq = quality;
            }
        }
        read
    }
}
