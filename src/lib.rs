//! # Indel realignment engine
//!
//! Re-aligns short sequencing reads around candidate insertion/deletion
//! sites so that downstream variant calling sees one consistent,
//! minimal-mismatch representation of each indel instead of many
//! slightly-different aligner guesses.
//!
//! ## Pipeline shape
//!
//! 1. **Candidate extraction**: a cursor streams the sorted reads, and the
//!    indels their CIGARs assert accumulate in fixed-size genomic blocks.
//! 2. **Target calling**: once a block clears, candidates meeting a
//!    support-frequency cutoff become realignment targets.
//! 3. **Per-read realignment**: a trailing cursor revisits each read and
//!    tries target combinations (bounded by empirically observed
//!    coexistence groups) against the local reference.
//! 4. **Write**: every read is handed to the writer exactly once, tagged
//!    with whether it was remapped.
//!
//! ## Usage Example
//!
//! ```ignore
//! use indelign::{pipeline, RealignerConfig};
//!
//! let config = RealignerConfig::default();
//! let outcomes = pipeline::realign_chromosomes(
//!     &chromosomes, &config, &reference, &open_cursors, &writer,
//! )?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

// Core modules - leaves first
pub mod align;      // Sequence/CIGAR utilities
pub mod candidates; // Candidate indels, coexistence, ranking, target calling
pub mod reads;      // Read records and candidate discovery
pub mod realign;    // Single-read realignment engine
pub mod state;      // Windowed candidate state manager
pub mod chromosome; // Per-chromosome orchestration
pub mod io;         // Extractor/writer/reference seams and adapters
pub mod pipeline;   // Bounded multi-chromosome fan-out

// Re-exports for convenience
pub use align::{AlignmentSummary, CigarOp, CigarOpKind, MismatchKind};
pub use candidates::{CandidateIndel, CoexistenceGroups, IndelKind, IndelRanker, ObservedIndel};
pub use chromosome::{ChromosomeRealigner, RealignmentStats};
pub use reads::{CigarIndelFinder, ReadFlags, ReadRecord};
pub use realign::{ReadRealigner, RealignmentResult};
pub use state::RealignStateManager;

use thiserror::Error;

/// Configuration parameters for a realignment run.
#[derive(Debug, Clone)]
pub struct RealignerConfig {
    /// Genomic block length used for batching candidate state (bases).
    pub block_size: u32,

    /// Largest accepted distance between a read's original and realigned
    /// positions.
    pub max_realign_shift: u32,

    /// Largest candidate combination attempted per read (at most 3).
    pub max_indels_per_combination: usize,

    /// Extra reference bases considered around a read's anchored extent.
    pub anchor_lookaround: u32,

    /// Minimum support / local-coverage frequency for a candidate to
    /// become a realignment target.
    pub min_alt_frequency: f32,

    /// Re-impose original soft-clip boundaries on accepted realignments.
    pub remask_softclips: bool,

    /// Use the N-only masking policy when re-imposing soft clips.
    pub remask_ns_only: bool,

    /// Emit edge insertions of accepted realignments as soft clips.
    pub mask_partial_insertion: bool,

    /// Allow raising mapping quality 0 to 40 on a zero-mismatch result.
    pub allow_rescoring_orig_zero: bool,

    /// Count duplicate reads as evidence and realign them.
    pub include_duplicates: bool,

    /// Drop duplicate reads from the output entirely.
    pub skip_and_remove_duplicates: bool,

    /// Worker pool size for chromosome fan-out; 0 picks the rayon default.
    pub max_threads: usize,
}

impl Default for RealignerConfig {
    fn default() -> Self {
        Self {
            block_size: state::DEFAULT_BLOCK_SIZE,
            max_realign_shift: 250,
            max_indels_per_combination: candidates::MAX_GROUP_SIZE,
            anchor_lookaround: 10,
            min_alt_frequency: 0.05,
            remask_softclips: true,
            remask_ns_only: false,
            mask_partial_insertion: false,
            allow_rescoring_orig_zero: true,
            include_duplicates: false,
            skip_and_remove_duplicates: false,
            max_threads: 0,
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Block size of zero cannot batch anything.
    #[error("block size must be positive")]
    ZeroBlockSize,
    /// Combination size outside `1..=3`.
    #[error(
        "max indels per combination must be in 1..={max}, got {got}",
        max = candidates::MAX_GROUP_SIZE
    )]
    BadCombinationSize {
        /// Configured value.
        got: usize,
    },
    /// Frequency cutoff outside `[0, 1]`.
    #[error("min alt frequency must be within [0, 1], got {0}")]
    BadFrequency(f32),
}

impl RealignerConfig {
    /// Validate parameter ranges before a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.max_indels_per_combination == 0
            || self.max_indels_per_combination > candidates::MAX_GROUP_SIZE
        {
            return Err(ConfigError::BadCombinationSize {
                got: self.max_indels_per_combination,
            });
        }
        if !(0.0..=1.0).contains(&self.min_alt_frequency) {
            return Err(ConfigError::BadFrequency(self.min_alt_frequency));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RealignerConfig::default().validate().is_ok());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let config = RealignerConfig {
            block_size: 0,
            ..RealignerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RealignerConfig {
            max_indels_per_combination: 5,
            ..RealignerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RealignerConfig {
            min_alt_frequency: 1.5,
            ..RealignerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
