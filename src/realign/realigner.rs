//! The single-read realigner: tries candidate indel combinations against a
//! local reference window and keeps the best-scoring hypothesis.
//!
//! Each combination is expanded into an alternate haplotype (the reference
//! with the combination's alleles substituted), the read is placed on that
//! haplotype by direct base matching over every placement that spans all of
//! the combination's indel sites, and the winning placement is translated
//! back into a reference position map. The untouched original alignment is
//! the implicit zero-indel baseline every hypothesis must beat.

use tracing::trace;

use crate::align::{
    construct_cigar, edit_distance, is_valid_map, num_mismatches, CigarOpKind, UNMAPPED,
};
use crate::candidates::{CandidateIndel, CoexistenceGroups, IndelKind, IndelRanker};
use crate::reads::ReadRecord;
use crate::realign::{challenger_wins, RealignmentResult};

/// Single-read realignment engine.
#[derive(Debug, Clone, Copy)]
pub struct ReadRealigner {
    /// Extra reference bases considered around the read's anchored extent
    /// when selecting reachable candidates.
    pub lookaround: u32,
    /// Largest candidate combination attempted.
    pub max_indels_per_combination: usize,
}

impl Default for ReadRealigner {
    fn default() -> Self {
        Self {
            lookaround: 10,
            max_indels_per_combination: 3,
        }
    }
}

struct AppliedIndel<'a> {
    indel: &'a CandidateIndel,
    /// Haplotype index of the anchor base.
    anchor: usize,
}

impl ReadRealigner {
    /// Create a realigner with the given look-around.
    pub fn new(lookaround: u32, max_indels_per_combination: usize) -> Self {
        Self {
            lookaround,
            max_indels_per_combination,
        }
    }

    /// Try candidate indel combinations and return the best improvement, or
    /// `None` when the read is best left untouched.
    pub fn realign(
        &self,
        read: &ReadRecord,
        candidates: &[CandidateIndel],
        reference: &[u8],
        ranker: &IndelRanker,
        groups: &CoexistenceGroups,
    ) -> Option<RealignmentResult> {
        if read.is_empty() || candidates.is_empty() {
            return None;
        }

        let selected = self.select_candidates(read, candidates, reference);
        if selected.is_empty() {
            return None;
        }

        let mut best: Option<RealignmentResult> = None;
        let max_size = self.max_indels_per_combination.min(selected.len());
        for size in (1..=max_size).rev() {
            for combination in combinations(&selected, size) {
                if size >= 2 {
                    let coexistent = combination.iter().enumerate().all(|(i, a)| {
                        combination[i + 1..]
                            .iter()
                            .all(|b| CandidateIndel::can_coexist(a, b))
                    });
                    if !coexistent || !groups.allows(&combination) {
                        continue;
                    }
                }
                if let Some(result) = self.try_combination(read, &combination, reference) {
                    best = match best {
                        Some(current) if !challenger_wins(&result, &current, ranker) => {
                            Some(current)
                        }
                        _ => Some(result),
                    };
                }
            }
        }

        let best = best?;
        // A hypothesis must strictly beat the untouched alignment; this also
        // discards combinations that cancel out into a spuriously "perfect"
        // copy of an alignment the read never had.
        if let Some(baseline) = read.summarize(reference) {
            let improves = best.num_mismatches < baseline.num_mismatches
                || (best.num_mismatches == baseline.num_mismatches
                    && best.num_indels < baseline.num_indels);
            if !improves {
                trace!(read = %read.name, "realignment does not beat baseline");
                return None;
            }
        }
        Some(best)
    }

    /// Restrict candidates to those reachable from the read's anchored
    /// extent, excluding any whose anchor falls in a leading/trailing run of
    /// `N` bases in the read or the reference.
    fn select_candidates<'a>(
        &self,
        read: &ReadRecord,
        candidates: &'a [CandidateIndel],
        reference: &[u8],
    ) -> Vec<&'a CandidateIndel> {
        let left = crate::align::adjusted_position(&read.sequence, &read.cigar, read.pos, true);
        let right = crate::align::adjusted_position(&read.sequence, &read.cigar, read.pos, false);
        let low = left - self.lookaround as i64;
        let high = right + self.lookaround as i64;

        let n_prefix = read.n_prefix_len() as i64;
        let n_suffix = read.n_suffix_len() as i64;
        let read_len = read.len() as i64;
        let unclipped_start = left - n_prefix;

        let ref_n_prefix = reference
            .iter()
            .take_while(|&&b| b == b'N' || b == b'n')
            .count();
        let ref_n_suffix = reference
            .iter()
            .rev()
            .take_while(|&&b| b == b'N' || b == b'n')
            .count();

        let mut selected: Vec<&CandidateIndel> = candidates
            .iter()
            .filter(|candidate| {
                let anchor0 = candidate.position as i64 - 1;
                let end0 = candidate.end() as i64 - 1;
                if end0 < low || anchor0 > high {
                    return false;
                }
                if (anchor0 as usize) < ref_n_prefix
                    || anchor0 as usize >= reference.len().saturating_sub(ref_n_suffix)
                {
                    return false;
                }
                // Anchor projected into read coordinates: never realign
                // against the read's own ambiguous edges.
                let read_offset = anchor0 - unclipped_start;
                if (0..n_prefix).contains(&read_offset) {
                    return false;
                }
                if (read_len - n_suffix..read_len).contains(&read_offset) {
                    return false;
                }
                true
            })
            .collect();

        selected.sort_by(|a, b| a.cmp_canonical(b));
        selected.dedup_by(|a, b| a.cmp_canonical(b) == std::cmp::Ordering::Equal);
        selected
    }

    /// Score one combination; `None` when the read cannot span it or the
    /// hypothesis is structurally invalid.
    fn try_combination(
        &self,
        read: &ReadRecord,
        combination: &[&CandidateIndel],
        reference: &[u8],
    ) -> Option<RealignmentResult> {
        let read_len = read.len();
        let left = crate::align::adjusted_position(&read.sequence, &read.cigar, read.pos, true);

        let combo_start = combination.first()?.position as i64 - 1;
        let combo_end = combination.last()?.end() as i64 - 1;
        let pad = read_len as i64 + self.lookaround as i64;
        let window_start = (left.min(combo_start) - pad).max(0) as usize;
        let window_end = ((left + read_len as i64).max(combo_end + 1) + pad)
            .min(reference.len() as i64) as usize;
        if window_start >= window_end {
            return None;
        }

        let (haplotype, hap_to_ref, applied) =
            build_haplotype(reference, window_start, window_end, combination)?;
        if haplotype.len() < read_len {
            return None;
        }

        // Placements must span every indel site of the combination.
        let mut min_anchor = usize::MAX;
        let mut max_reach = 0usize;
        for entry in &applied {
            let reach = match entry.indel.kind {
                IndelKind::Insertion => entry.anchor + entry.indel.length() as usize,
                IndelKind::Deletion => entry.anchor + 1,
            };
            min_anchor = min_anchor.min(entry.anchor);
            max_reach = max_reach.max(reach);
        }
        if max_reach >= haplotype.len() {
            return None;
        }
        let offset_low = (max_reach + 1).saturating_sub(read_len);
        let offset_high = min_anchor.min(haplotype.len() - read_len);
        if offset_low > offset_high {
            return None;
        }

        let mut best_offset = None;
        let mut best_mismatches = u32::MAX;
        for offset in offset_low..=offset_high {
            let window = &haplotype[offset..offset + read_len];
            let mismatches = num_mismatches(&read.sequence, window, false)?;
            if mismatches < best_mismatches {
                best_mismatches = mismatches;
                best_offset = Some(offset);
            }
        }
        let offset = best_offset?;

        // An insertion whose inserted bases all disagree with the read is
        // not evidence of that insertion.
        for entry in &applied {
            if entry.indel.kind != IndelKind::Insertion {
                continue;
            }
            let inserted = &entry.indel.alternate.as_bytes()[1..];
            let supported = inserted.iter().enumerate().any(|(k, &base)| {
                let read_idx = entry.anchor + 1 + k - offset;
                read.sequence
                    .get(read_idx)
                    .is_some_and(|&b| b.eq_ignore_ascii_case(&base))
            });
            if !supported {
                return None;
            }
        }

        let position_map: Vec<i64> = (0..read_len).map(|i| hap_to_ref[offset + i]).collect();
        if !is_valid_map(&position_map, &read.sequence) {
            return None;
        }

        let cigar = construct_cigar(&position_map, false);
        let num_indels = cigar
            .iter()
            .filter(|op| matches!(op.kind, CigarOpKind::Insertion | CigarOpKind::Deletion))
            .count() as u32;
        let num_indel_bases = cigar
            .iter()
            .filter(|op| matches!(op.kind, CigarOpKind::Insertion | CigarOpKind::Deletion))
            .map(|op| op.len)
            .sum();
        let num_mismatches = edit_distance(&read.sequence, &position_map, reference)?;
        let position = (*position_map.iter().find(|&&p| p != UNMAPPED)? - 1) as u32;

        Some(RealignmentResult {
            position,
            cigar,
            num_mismatches,
            num_indels,
            num_indel_bases,
            position_map,
            indels: combination.iter().map(|&c| c.clone()).collect(),
        })
    }
}

/// Substitute the combination's alleles into `reference[start..end)`.
///
/// Returns the haplotype bases, a per-base map back to 1-based reference
/// coordinates ([`UNMAPPED`] for inserted bases), and the haplotype anchor
/// index of each applied indel. Candidates must be canonically sorted and
/// pairwise coexistent.
fn build_haplotype<'a>(
    reference: &[u8],
    start: usize,
    end: usize,
    combination: &[&'a CandidateIndel],
) -> Option<(Vec<u8>, Vec<i64>, Vec<AppliedIndel<'a>>)> {
    let mut haplotype = Vec::with_capacity(end - start + 16);
    let mut hap_to_ref = Vec::with_capacity(end - start + 16);
    let mut applied = Vec::with_capacity(combination.len());

    let mut pending = combination.iter().peekable();
    let mut ref_idx = start;
    while ref_idx < end {
        haplotype.push(reference[ref_idx]);
        hap_to_ref.push(ref_idx as i64 + 1);

        if let Some(&candidate) = pending.next_if(|c| c.position as usize == ref_idx + 1) {
            applied.push(AppliedIndel {
                indel: candidate,
                anchor: haplotype.len() - 1,
            });
            match candidate.kind {
                IndelKind::Insertion => {
                    for &base in &candidate.alternate.as_bytes()[1..] {
                        haplotype.push(base);
                        hap_to_ref.push(UNMAPPED);
                    }
                }
                IndelKind::Deletion => {
                    ref_idx += candidate.length() as usize;
                }
            }
        }
        ref_idx += 1;
    }

    // Every indel in the combination has to land inside the window.
    if applied.len() != combination.len() {
        return None;
    }
    Some((haplotype, hap_to_ref, applied))
}

/// All `size`-element combinations, preserving input order.
fn combinations<'a>(
    items: &[&'a CandidateIndel],
    size: usize,
) -> Vec<Vec<&'a CandidateIndel>> {
    let mut out = Vec::new();
    let mut scratch: Vec<&CandidateIndel> = Vec::with_capacity(size);
    fn recurse<'a>(
        items: &[&'a CandidateIndel],
        size: usize,
        from: usize,
        scratch: &mut Vec<&'a CandidateIndel>,
        out: &mut Vec<Vec<&'a CandidateIndel>>,
    ) {
        if scratch.len() == size {
            out.push(scratch.clone());
            return;
        }
        let needed = size - scratch.len();
        for index in from..=items.len().saturating_sub(needed) {
            scratch.push(items[index]);
            recurse(items, size, index + 1, scratch, out);
            scratch.pop();
        }
    }
    if size >= 1 && size <= items.len() {
        recurse(items, size, 0, &mut scratch, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{cigar_string, parse_cigar};

    const REFERENCE: &[u8] = b"ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";

    fn read(pos: u32, cigar: &str, sequence: &[u8]) -> ReadRecord {
        ReadRecord::new(
            "r",
            "chr1",
            pos,
            30,
            parse_cigar(cigar).expect("valid cigar"),
            sequence.to_vec(),
            vec![30; sequence.len()],
        )
    }

    #[test]
    fn realigns_read_across_candidate_insertion() {
        // Insertion of TATATA after the C at 1-based position 10.
        let insertion = CandidateIndel::new("chr1", 10, "C", "CTATATA");
        let r = read(5, "5S5M5I5M", b"ACGTACGTACTATATAATAC");
        let realigner = ReadRealigner::default();
        let result = realigner
            .realign(
                &r,
                &[insertion],
                REFERENCE,
                &IndelRanker::Canonical,
                &CoexistenceGroups::new(),
            )
            .expect("the insertion explains the read");
        assert_eq!(result.position, 0);
        assert_eq!(cigar_string(&result.cigar), "10M6I4M");
        assert_eq!(result.num_indels, 1);
        assert_eq!(result.num_mismatches, 1);
    }

    #[test]
    fn candidate_order_does_not_change_the_outcome() {
        let a = CandidateIndel::new("chr1", 10, "C", "CTATATA");
        let b = CandidateIndel::new("chr1", 14, "T", "TGG");
        let r = read(5, "5S5M5I5M", b"ACGTACGTACTATATAATAC");
        let realigner = ReadRealigner::default();
        let forward = realigner.realign(
            &r,
            &[a.clone(), b.clone()],
            REFERENCE,
            &IndelRanker::Canonical,
            &CoexistenceGroups::new(),
        );
        let reversed = realigner.realign(
            &r,
            &[b, a],
            REFERENCE,
            &IndelRanker::Canonical,
            &CoexistenceGroups::new(),
        );
        assert_eq!(forward, reversed);
        assert!(forward.is_some());
    }

    #[test]
    fn ungated_pairs_realign_with_one_indel_only() {
        let reference = b"AAAACCCCGGGGTTTTAAAACCCCGGGGTTTT";
        // The read carries both insertions, but its aligner guess squashed
        // them into a mismatch-heavy 20M; the pair was never observed
        // together, so only single-indel hypotheses are allowed.
        let first = CandidateIndel::new("chr1", 8, "C", "CTT");
        let second = CandidateIndel::new("chr1", 16, "T", "TGG");
        let r = read(4, "20M", b"CCCCTTGGGGTTTTGGAAAA");
        let realigner = ReadRealigner::default();
        let gated = realigner
            .realign(
                &r,
                &[first.clone(), second.clone()],
                reference,
                &IndelRanker::Canonical,
                &CoexistenceGroups::new(),
            )
            .expect("a single indel still improves on the squashed alignment");
        assert_eq!(gated.indels.len(), 1, "pair was never observed together");
        assert!(gated.num_mismatches > 0);

        let mut groups = CoexistenceGroups::new();
        groups.insert(vec![first.canonical_key(), second.canonical_key()]);
        let allowed = realigner
            .realign(
                &r,
                &[first, second],
                reference,
                &IndelRanker::Canonical,
                &groups,
            )
            .expect("pair is recorded and explains the read");
        assert_eq!(allowed.indels.len(), 2);
        assert_eq!(allowed.num_mismatches, 0);
    }

    #[test]
    fn candidates_in_n_runs_are_never_applied() {
        let insertion = CandidateIndel::new("chr1", 10, "C", "CTATATA");
        // Same read as the insertion scenario, but its first ten bases are N:
        // the candidate anchor projects into the read's leading N run.
        let r = read(5, "5S5M5I5M", b"NNNNNNNNNNTATATAATAC");
        let realigner = ReadRealigner::default();
        assert!(realigner
            .realign(
                &r,
                &[insertion],
                REFERENCE,
                &IndelRanker::Canonical,
                &CoexistenceGroups::new(),
            )
            .is_none());
    }

    #[test]
    fn already_optimal_read_returns_none() {
        let insertion = CandidateIndel::new("chr1", 10, "C", "CTATATA");
        // Read agrees with the reference exactly as aligned.
        let r = read(4, "12M", b"ACGTACGTACGT");
        let realigner = ReadRealigner::default();
        assert!(realigner
            .realign(
                &r,
                &[insertion],
                REFERENCE,
                &IndelRanker::Canonical,
                &CoexistenceGroups::new(),
            )
            .is_none());
    }

    #[test]
    fn realigns_read_across_candidate_deletion() {
        let reference = b"AAAACCCCGGGGTTTTAAAACCCCGGGGTTTT";
        // Deletion of GGGG anchored at the C at 1-based position 8.
        let deletion = CandidateIndel::new("chr1", 8, "CGGGG", "C");
        let r = read(0, "20M", b"AAAACCCCTTTTAAAACCCC");
        let realigner = ReadRealigner::default();
        let result = realigner
            .realign(
                &r,
                &[deletion],
                reference,
                &IndelRanker::Canonical,
                &CoexistenceGroups::new(),
            )
            .expect("the deletion explains the read");
        assert_eq!(result.position, 0);
        assert_eq!(cigar_string(&result.cigar), "8M4D12M");
        assert_eq!(result.num_mismatches, 0);
        assert_eq!(result.num_indels, 1);
        assert_eq!(result.num_indel_bases, 4);
    }

    #[test]
    fn unsupported_insertion_bases_reject_the_combination() {
        // Read matches the plain reference; the inserted allele shares no
        // bases with the read where the insertion would sit.
        let reference = b"AAAACCCCAAAACCCCAAAA";
        let insertion = CandidateIndel::new("chr1", 8, "C", "CGGG");
        let r = read(0, "12M", b"AAAACCCCAAAA");
        let realigner = ReadRealigner::default();
        assert!(realigner
            .realign(
                &r,
                &[insertion],
                reference,
                &IndelRanker::Canonical,
                &CoexistenceGroups::new(),
            )
            .is_none());
    }
}
