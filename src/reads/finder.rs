//! Candidate discovery from a single read's CIGAR.
//!
//! The realignment core never invents indels; this collaborator reports the
//! insertions and deletions a read's alignment already asserts, as
//! anchor-base-first allele pairs.

use crate::align::CigarOpKind;
use crate::candidates::CandidateIndel;
use crate::reads::ReadRecord;

/// Source of candidate indels implied by a read's alignment.
pub trait IndelFinder {
    /// Candidates asserted by the read's CIGAR, in read order.
    fn find(&self, read: &ReadRecord, reference: &[u8]) -> Vec<CandidateIndel>;
}

/// Finder that walks I/D runs in the CIGAR.
#[derive(Debug, Clone, Copy, Default)]
pub struct CigarIndelFinder;

impl CigarIndelFinder {
    /// Create a new finder.
    pub fn new() -> Self {
        Self
    }
}

impl IndelFinder for CigarIndelFinder {
    fn find(&self, read: &ReadRecord, reference: &[u8]) -> Vec<CandidateIndel> {
        let mut candidates = Vec::new();
        let mut ref_idx = read.pos as usize; // 0-based
        let mut read_off = 0usize;
        let mut seen_match = false;

        for op in &read.cigar {
            match op.kind {
                CigarOpKind::Match | CigarOpKind::SeqMatch | CigarOpKind::SeqMismatch => {
                    ref_idx += op.len as usize;
                    read_off += op.len as usize;
                    seen_match = true;
                }
                CigarOpKind::Insertion => {
                    // Needs an anchored base on the left and the inserted
                    // bases present in the read.
                    if seen_match && ref_idx > 0 && ref_idx <= reference.len() {
                        let anchor = reference[ref_idx - 1];
                        let inserted = &read.sequence[read_off..read_off + op.len as usize];
                        let mut alternate = String::with_capacity(1 + inserted.len());
                        alternate.push(anchor as char);
                        alternate.push_str(&String::from_utf8_lossy(inserted));
                        candidates.push(CandidateIndel::new(
                            read.chrom.clone(),
                            ref_idx as u32,
                            (anchor as char).to_string(),
                            alternate,
                        ));
                    }
                    read_off += op.len as usize;
                }
                CigarOpKind::Deletion => {
                    let end = ref_idx + op.len as usize;
                    if seen_match && ref_idx > 0 && end <= reference.len() {
                        let anchor = reference[ref_idx - 1];
                        let deleted = &reference[ref_idx..end];
                        let mut ref_allele = String::with_capacity(1 + deleted.len());
                        ref_allele.push(anchor as char);
                        ref_allele.push_str(&String::from_utf8_lossy(deleted));
                        candidates.push(CandidateIndel::new(
                            read.chrom.clone(),
                            ref_idx as u32,
                            ref_allele,
                            (anchor as char).to_string(),
                        ));
                    }
                    ref_idx = end;
                }
                CigarOpKind::RefSkip => {
                    ref_idx += op.len as usize;
                }
                CigarOpKind::SoftClip => {
                    read_off += op.len as usize;
                }
                CigarOpKind::HardClip => {}
            }
        }
        candidates
    }
}
