//! Whole-alignment scoring: mismatch/indel/clip counts and edge anchors.

use crate::align::cigar::{reference_span, CigarOp, CigarOpKind, UNMAPPED};

/// Aggregate description of how well an alignment fits the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlignmentSummary {
    /// Mismatching bases over match operations (Ns excluded).
    pub num_mismatches: u32,
    /// Indel runs; each inserted or deleted run counts once.
    pub num_indels: u32,
    /// Total inserted plus deleted bases.
    pub num_indel_bases: u32,
    /// Soft-clipped bases.
    pub num_softclips: u32,
    /// Soft-clipped bases that are not `N`.
    pub num_non_n_softclips: u32,
    /// Longest perfect match run touching either read edge. A read that is
    /// not anchored on at least one edge reports 0.
    pub anchor_length: u32,
}

fn is_n(base: u8) -> bool {
    base == b'N' || base == b'n'
}

/// Score an alignment described by `(sequence, cigar, position)` against the
/// reference. `position` is 0-based. Returns `None` when a match operation
/// runs off the reference.
pub fn summarize_alignment(
    sequence: &[u8],
    cigar: &[CigarOp],
    position: u32,
    reference: &[u8],
) -> Option<AlignmentSummary> {
    let mut summary = AlignmentSummary::default();
    // Per-read-base flags for anchor computation: true only for perfectly
    // matching bases inside match operations.
    let mut matched = vec![false; sequence.len()];

    let mut read_off = 0usize;
    let mut ref_idx = position as usize;
    for op in cigar {
        match op.kind {
            CigarOpKind::Match | CigarOpKind::SeqMatch | CigarOpKind::SeqMismatch => {
                for _ in 0..op.len {
                    let base = *sequence.get(read_off)?;
                    if ref_idx >= reference.len() {
                        return None;
                    }
                    let ref_base = reference[ref_idx];
                    if base.eq_ignore_ascii_case(&ref_base) {
                        matched[read_off] = true;
                    } else if !is_n(base) && !is_n(ref_base) {
                        summary.num_mismatches += 1;
                    }
                    read_off += 1;
                    ref_idx += 1;
                }
            }
            CigarOpKind::Insertion => {
                summary.num_indels += 1;
                summary.num_indel_bases += op.len;
                read_off += op.len as usize;
            }
            CigarOpKind::Deletion | CigarOpKind::RefSkip => {
                summary.num_indels += 1;
                summary.num_indel_bases += op.len;
                ref_idx += op.len as usize;
            }
            CigarOpKind::SoftClip => {
                summary.num_softclips += op.len;
                for _ in 0..op.len {
                    if !is_n(*sequence.get(read_off)?) {
                        summary.num_non_n_softclips += 1;
                    }
                    read_off += 1;
                }
            }
            CigarOpKind::HardClip => {}
        }
    }

    let left_anchor = matched.iter().take_while(|&&m| m).count() as u32;
    let right_anchor = matched.iter().rev().take_while(|&&m| m).count() as u32;
    summary.anchor_length = left_anchor.max(right_anchor);
    Some(summary)
}

/// Soft-clip- and N-run-compensated coordinate of the first (`from_left`)
/// or last anchored base, 0-based.
///
/// Soft-clipped bases are treated as if they had been aligned, so the
/// coordinate can fall ahead of the alignment start; leading/trailing `N`
/// runs can never anchor and are stepped over.
pub fn adjusted_position(sequence: &[u8], cigar: &[CigarOp], position: u32, from_left: bool) -> i64 {
    let prefix_clip: u32 = cigar
        .iter()
        .skip_while(|op| op.kind == CigarOpKind::HardClip)
        .take_while(|op| op.kind == CigarOpKind::SoftClip)
        .map(|op| op.len)
        .sum();
    let suffix_clip: u32 = cigar
        .iter()
        .rev()
        .skip_while(|op| op.kind == CigarOpKind::HardClip)
        .take_while(|op| op.kind == CigarOpKind::SoftClip)
        .map(|op| op.len)
        .sum();
    let n_prefix = sequence.iter().take_while(|&&b| is_n(b)).count() as i64;
    let n_suffix = sequence.iter().rev().take_while(|&&b| is_n(b)).count() as i64;

    if from_left {
        position as i64 - prefix_clip as i64 + n_prefix
    } else {
        position as i64 + reference_span(cigar) as i64 - 1 + suffix_clip as i64 - n_suffix
    }
}

/// Sanity check for a position map: the map must cover the read, contain at
/// least one mapped coordinate, and carry only 1-based coordinates or the
/// unmapped sentinel.
pub fn is_valid_map(position_map: &[i64], read_seq: &[u8]) -> bool {
    if position_map.len() != read_seq.len() {
        return false;
    }
    if position_map.iter().all(|&p| p == UNMAPPED) {
        return false;
    }
    position_map.iter().all(|&p| p == UNMAPPED || p >= 1)
}
