//! Per-base comparison of a mapped read against the reference.

use crate::align::cigar::UNMAPPED;

/// Classification of one read base against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    /// Base agrees with the reference.
    Match,
    /// Base disagrees with the reference.
    Mismatch,
    /// Read or reference base is `N` at this position.
    NMismatch,
    /// Base consumes no reference (insertion or clip).
    Unmapped,
}

fn is_n(base: u8) -> bool {
    base == b'N' || base == b'n'
}

/// Classify every read base against the reference through a position map.
///
/// Returns `None` when any mapped coordinate falls outside the reference;
/// callers treat that as "not comparable" rather than an error.
pub fn mismatch_map(
    read_seq: &[u8],
    position_map: &[i64],
    reference: &[u8],
) -> Option<Vec<MismatchKind>> {
    if read_seq.len() != position_map.len() {
        return None;
    }
    let mut kinds = Vec::with_capacity(read_seq.len());
    for (&base, &coordinate) in read_seq.iter().zip(position_map) {
        if coordinate == UNMAPPED {
            kinds.push(MismatchKind::Unmapped);
            continue;
        }
        if coordinate < 1 || coordinate as usize > reference.len() {
            return None;
        }
        let ref_base = reference[(coordinate - 1) as usize];
        let kind = if base.eq_ignore_ascii_case(&ref_base) {
            MismatchKind::Match
        } else if is_n(base) || is_n(ref_base) {
            MismatchKind::NMismatch
        } else {
            MismatchKind::Mismatch
        };
        kinds.push(kind);
    }
    Some(kinds)
}

/// Mismatch count over mapped positions only; Ns never count.
///
/// `None` under the same out-of-bounds condition as [`mismatch_map`].
pub fn edit_distance(read_seq: &[u8], position_map: &[i64], reference: &[u8]) -> Option<u32> {
    let kinds = mismatch_map(read_seq, position_map, reference)?;
    Some(
        kinds
            .iter()
            .filter(|kind| **kind == MismatchKind::Mismatch)
            .count() as u32,
    )
}

/// Positionwise mismatch count between two equal-length sequences.
///
/// Returns `None` if the lengths differ. By default a base of `N` in either
/// sequence does not count as a mismatch.
pub fn num_mismatches(a: &[u8], b: &[u8], count_n_as_mismatch: bool) -> Option<u32> {
    if a.len() != b.len() {
        return None;
    }
    let mut mismatches = 0u32;
    for (&x, &y) in a.iter().zip(b) {
        if x.eq_ignore_ascii_case(&y) {
            continue;
        }
        if !count_n_as_mismatch && (is_n(x) || is_n(y)) {
            continue;
        }
        mismatches += 1;
    }
    Some(mismatches)
}
