//! Scored realignment outcomes and the comparator that picks between them.

use crate::align::CigarOp;
use crate::candidates::{CandidateIndel, IndelRanker};

/// A candidate re-alignment for one read.
///
/// `None` in the surrounding `Option` means "no valid realignment".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealignmentResult {
    /// Candidate new 0-based position.
    pub position: u32,
    /// Candidate new CIGAR covering the whole read (no soft clips).
    pub cigar: Vec<CigarOp>,
    /// Mismatching mapped bases (Ns excluded).
    pub num_mismatches: u32,
    /// Indel events; each inserted/deleted run counts once, not per base.
    pub num_indels: u32,
    /// Total inserted plus deleted bases, for NM recomputation.
    pub num_indel_bases: u32,
    /// Position map backing the CIGAR (1-based entries).
    pub position_map: Vec<i64>,
    /// Candidate combination this hypothesis applied.
    pub indels: Vec<CandidateIndel>,
}

/// Whether `challenger` beats `incumbent`.
///
/// Fewer mismatches is strictly better; ties break on fewer indel events,
/// then on the ranker's priority over each side's best indel. Remaining
/// ties retain the incumbent, so the first-found hypothesis under the
/// deterministic enumeration order wins.
pub fn challenger_wins(
    challenger: &RealignmentResult,
    incumbent: &RealignmentResult,
    ranker: &IndelRanker,
) -> bool {
    if challenger.num_mismatches != incumbent.num_mismatches {
        return challenger.num_mismatches < incumbent.num_mismatches;
    }
    if challenger.num_indels != incumbent.num_indels {
        return challenger.num_indels < incumbent.num_indels;
    }
    let challenger_refs: Vec<&CandidateIndel> = challenger.indels.iter().collect();
    let incumbent_refs: Vec<&CandidateIndel> = incumbent.indels.iter().collect();
    match (ranker.top(&challenger_refs), ranker.top(&incumbent_refs)) {
        (Some(a), Some(b)) => ranker.compare(a, b) == std::cmp::Ordering::Less,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::parse_cigar;

    fn result(num_mismatches: u32, num_indels: u32, indel_pos: u32) -> RealignmentResult {
        RealignmentResult {
            position: 0,
            cigar: parse_cigar("10M").expect("valid cigar"),
            num_mismatches,
            num_indels,
            num_indel_bases: num_indels,
            position_map: (1..=10).collect(),
            indels: vec![CandidateIndel::new("chr1", indel_pos, "A", "AT")],
        }
    }

    #[test]
    fn fewer_mismatches_strictly_wins() {
        let ranker = IndelRanker::Canonical;
        assert!(challenger_wins(&result(0, 3, 5), &result(1, 1, 5), &ranker));
        assert!(!challenger_wins(&result(2, 0, 5), &result(1, 1, 5), &ranker));
    }

    #[test]
    fn equal_mismatches_fall_back_to_indel_events() {
        let ranker = IndelRanker::Canonical;
        assert!(challenger_wins(&result(1, 1, 5), &result(1, 2, 5), &ranker));
    }

    #[test]
    fn full_tie_retains_the_incumbent() {
        let ranker = IndelRanker::Canonical;
        assert!(!challenger_wins(&result(1, 1, 5), &result(1, 1, 5), &ranker));
    }

    #[test]
    fn ranker_resolves_score_ties() {
        let ranker = IndelRanker::Canonical;
        // Same score; the challenger's indel ranks earlier canonically.
        assert!(challenger_wins(&result(1, 1, 3), &result(1, 1, 5), &ranker));
    }
}
