//! Aligned read records as consumed and mutated by the realignment core.

use std::sync::Arc;

use crate::align::{
    position_map_from_cigar, reference_span, summarize_alignment, AlignmentSummary, CigarOp,
    CigarOpKind,
};
use crate::realign::RealignmentResult;

/// SAM-style flag subset relevant to realignment policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadFlags {
    /// Read is aligned to the reference.
    pub is_mapped: bool,
    /// Secondary alignment.
    pub is_secondary: bool,
    /// Supplementary alignment.
    pub is_supplementary: bool,
    /// PCR/optical duplicate.
    pub is_duplicate: bool,
    /// Properly paired.
    pub is_proper_pair: bool,
    /// Carries a supplementary-alignment (`SA`) tag.
    pub has_supplementary_tag: bool,
}

/// One aligned read.
///
/// A successful realignment mutates position, CIGAR, mapping quality and
/// the NM value in place through [`ReadRecord::apply_realignment`];
/// otherwise the record is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRecord {
    /// Query template name.
    pub name: String,
    /// Reference contig/chromosome name.
    pub chrom: Arc<str>,
    /// 0-based leftmost reference coordinate.
    pub pos: u32,
    /// Mapping quality (Phred-scaled).
    pub mapq: u8,
    /// CIGAR describing the alignment.
    pub cigar: Vec<CigarOp>,
    /// Read sequence stored as uppercase ASCII.
    pub sequence: Vec<u8>,
    /// Per-base quality scores in Phred space.
    pub qualities: Vec<u8>,
    /// Flag subset used by realignment policy.
    pub flags: ReadFlags,
    /// Edit distance (`NM`) tag value, when present.
    pub edit_distance: Option<u32>,
}

impl ReadRecord {
    /// Construct a mapped, primary read record.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        chrom: impl Into<Arc<str>>,
        pos: u32,
        mapq: u8,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Vec<u8>>,
        qualities: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            chrom: chrom.into(),
            pos,
            mapq,
            cigar,
            sequence: sequence.into(),
            qualities: qualities.into(),
            flags: ReadFlags {
                is_mapped: true,
                ..ReadFlags::default()
            },
            edit_distance: None,
        }
    }

    /// Read length.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the record carries no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Half-open end coordinate on the reference.
    pub fn end(&self) -> u32 {
        self.pos + reference_span(&self.cigar)
    }

    /// Leading soft-clipped bases.
    pub fn prefix_softclip_len(&self) -> u32 {
        self.cigar
            .iter()
            .skip_while(|op| op.kind == CigarOpKind::HardClip)
            .take_while(|op| op.kind == CigarOpKind::SoftClip)
            .map(|op| op.len)
            .sum()
    }

    /// Trailing soft-clipped bases.
    pub fn suffix_softclip_len(&self) -> u32 {
        self.cigar
            .iter()
            .rev()
            .skip_while(|op| op.kind == CigarOpKind::HardClip)
            .take_while(|op| op.kind == CigarOpKind::SoftClip)
            .map(|op| op.len)
            .sum()
    }

    /// Leading run of `N` bases.
    pub fn n_prefix_len(&self) -> u32 {
        self.sequence
            .iter()
            .take_while(|&&b| b == b'N' || b == b'n')
            .count() as u32
    }

    /// Trailing run of `N` bases.
    pub fn n_suffix_len(&self) -> u32 {
        self.sequence
            .iter()
            .rev()
            .take_while(|&&b| b == b'N' || b == b'n')
            .count() as u32
    }

    /// Position map implied by the current alignment (1-based entries).
    pub fn position_map(&self) -> Vec<i64> {
        position_map_from_cigar(&self.cigar, self.pos)
    }

    /// Score the current alignment against the reference.
    pub fn summarize(&self, reference: &[u8]) -> Option<AlignmentSummary> {
        summarize_alignment(&self.sequence, &self.cigar, self.pos, reference)
    }

    /// Overwrite position and CIGAR from an accepted realignment.
    ///
    /// Mapping quality and the NM value are rescored separately by the
    /// orchestrator's policy step.
    pub fn apply_realignment(&mut self, result: &RealignmentResult) {
        self.pos = result.position;
        self.cigar = result.cigar.clone();
    }
}
