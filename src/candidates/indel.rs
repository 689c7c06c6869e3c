//! Candidate indel records and their canonical ordering/coexistence rules.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Whether a candidate adds or removes reference bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndelKind {
    /// Bases present in the read but not the reference.
    Insertion,
    /// Reference bases absent from the read.
    Deletion,
}

impl IndelKind {
    fn code(self) -> char {
        match self {
            IndelKind::Insertion => 'I',
            IndelKind::Deletion => 'D',
        }
    }
}

/// A candidate insertion or deletion harvested from read alignments.
///
/// Immutable once created. Alleles follow VCF conventions: the first base of
/// both alleles is the shared anchor base at `position` (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateIndel {
    /// Reference contig/chromosome name.
    pub chrom: Arc<str>,
    /// 1-based reference position of the anchor base.
    pub position: u32,
    /// Reference allele, anchor base first.
    pub reference: String,
    /// Alternate allele, anchor base first.
    pub alternate: String,
    /// Insertion or deletion.
    pub kind: IndelKind,
}

impl CandidateIndel {
    /// Construct a candidate; the kind is inferred from the allele lengths.
    pub fn new(
        chrom: impl Into<Arc<str>>,
        position: u32,
        reference: impl Into<String>,
        alternate: impl Into<String>,
    ) -> Self {
        let reference = reference.into();
        let alternate = alternate.into();
        let kind = if alternate.len() > reference.len() {
            IndelKind::Insertion
        } else {
            IndelKind::Deletion
        };
        Self {
            chrom: chrom.into(),
            position,
            reference,
            alternate,
            kind,
        }
    }

    /// Number of inserted or deleted bases.
    pub fn length(&self) -> u32 {
        self.reference.len().abs_diff(self.alternate.len()) as u32
    }

    /// Last reference position the candidate touches (1-based).
    pub fn end(&self) -> u32 {
        match self.kind {
            IndelKind::Insertion => self.position,
            IndelKind::Deletion => self.position + self.length(),
        }
    }

    /// Deleted reference positions as an inclusive 1-based range.
    pub fn deleted_span(&self) -> Option<(u32, u32)> {
        match self.kind {
            IndelKind::Insertion => None,
            IndelKind::Deletion => Some((self.position + 1, self.position + self.length())),
        }
    }

    /// Canonical string identity used for grouping and coexistence keys.
    pub fn canonical_key(&self) -> String {
        format!(
            "{}:{}:{}>{}:{}",
            self.chrom,
            self.position,
            self.reference,
            self.alternate,
            self.kind.code()
        )
    }

    /// Canonical ordering: position ascending, insertions before deletions
    /// at the same position, then alleles lexically.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| match (self.kind, other.kind) {
                (IndelKind::Insertion, IndelKind::Deletion) => Ordering::Less,
                (IndelKind::Deletion, IndelKind::Insertion) => Ordering::Greater,
                _ => Ordering::Equal,
            })
            .then_with(|| self.reference.cmp(&other.reference))
            .then_with(|| self.alternate.cmp(&other.alternate))
    }

    /// Whether two candidates may be applied to the same read.
    ///
    /// Forbidden: identical start positions, overlapping deleted spans, and
    /// an insertion anchored inside another candidate's deleted span.
    pub fn can_coexist(a: &Self, b: &Self) -> bool {
        if a.position == b.position {
            return false;
        }
        if let (Some((a_start, a_end)), Some((b_start, b_end))) =
            (a.deleted_span(), b.deleted_span())
        {
            if a_start <= b_end && b_start <= a_end {
                return false;
            }
        }
        let anchored_inside = |ins: &Self, del: &Self| match del.deleted_span() {
            Some((start, end)) => {
                ins.kind == IndelKind::Insertion && ins.position >= start && ins.position <= end
            }
            None => false,
        };
        !(anchored_inside(a, b) || anchored_inside(b, a))
    }
}

impl fmt::Display for CandidateIndel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_key())
    }
}

impl PartialOrd for CandidateIndel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CandidateIndel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.chrom
            .cmp(&other.chrom)
            .then_with(|| self.cmp_canonical(other))
    }
}

/// A candidate together with the number of reads observed carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedIndel {
    /// The candidate itself.
    pub indel: CandidateIndel,
    /// Reads that reported this candidate.
    pub support: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ins(pos: u32, bases: &str) -> CandidateIndel {
        CandidateIndel::new("chr1", pos, "A", format!("A{bases}"))
    }

    fn del(pos: u32, len: u32) -> CandidateIndel {
        let reference: String = std::iter::once('A').chain((0..len).map(|_| 'C')).collect();
        CandidateIndel::new("chr1", pos, reference, "A")
    }

    #[test]
    fn kind_is_inferred_from_allele_lengths() {
        assert_eq!(ins(10, "TT").kind, IndelKind::Insertion);
        assert_eq!(del(10, 3).kind, IndelKind::Deletion);
    }

    #[test]
    fn canonical_order_puts_insertions_first() {
        let mut indels = vec![del(10, 2), ins(10, "T"), ins(5, "G")];
        indels.sort_by(CandidateIndel::cmp_canonical);
        assert_eq!(indels[0].position, 5);
        assert_eq!(indels[1].kind, IndelKind::Insertion);
        assert_eq!(indels[2].kind, IndelKind::Deletion);
    }

    #[test]
    fn same_position_cannot_coexist() {
        assert!(!CandidateIndel::can_coexist(&ins(10, "T"), &del(10, 2)));
    }

    #[test]
    fn overlapping_deletions_cannot_coexist() {
        assert!(!CandidateIndel::can_coexist(&del(10, 5), &del(13, 4)));
        assert!(CandidateIndel::can_coexist(&del(10, 2), &del(13, 4)));
    }

    #[test]
    fn insertion_inside_deleted_span_cannot_coexist() {
        assert!(!CandidateIndel::can_coexist(&ins(12, "T"), &del(10, 5)));
        assert!(CandidateIndel::can_coexist(&ins(20, "T"), &del(10, 5)));
    }
}
