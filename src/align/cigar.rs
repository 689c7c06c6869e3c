//! CIGAR construction and soft-clip handling.
//!
//! Alignments are manipulated internally as *position maps*: one 1-based
//! reference coordinate per read base, in read order, with [`UNMAPPED`]
//! marking bases that consume no reference (insertions and soft clips).
//! The functions here translate between that representation and compact
//! CIGAR operation lists, and re-impose soft-clip boundaries onto
//! realigned alignments that cover the whole read.

use std::fmt;

use thiserror::Error;

use crate::align::mismatch::MismatchKind;

/// Sentinel for read bases with no reference coordinate.
pub const UNMAPPED: i64 = -1;

/// CIGAR operation kinds in the `(\d+[MIDSHN=X])+` grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOpKind {
    /// Consuming match/mismatch.
    Match,
    /// Insertion relative to the reference.
    Insertion,
    /// Deletion relative to the reference.
    Deletion,
    /// Soft clipping (sequence present in read only).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read).
    HardClip,
    /// Skipped reference region.
    RefSkip,
    /// Sequence match (`=`).
    SeqMatch,
    /// Sequence mismatch (`X`).
    SeqMismatch,
}

impl CigarOpKind {
    /// Single-character code used by the textual CIGAR grammar.
    pub fn code(self) -> char {
        match self {
            CigarOpKind::Match => 'M',
            CigarOpKind::Insertion => 'I',
            CigarOpKind::Deletion => 'D',
            CigarOpKind::SoftClip => 'S',
            CigarOpKind::HardClip => 'H',
            CigarOpKind::RefSkip => 'N',
            CigarOpKind::SeqMatch => '=',
            CigarOpKind::SeqMismatch => 'X',
        }
    }

    /// Parse a single operation code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'M' => Some(CigarOpKind::Match),
            'I' => Some(CigarOpKind::Insertion),
            'D' => Some(CigarOpKind::Deletion),
            'S' => Some(CigarOpKind::SoftClip),
            'H' => Some(CigarOpKind::HardClip),
            'N' => Some(CigarOpKind::RefSkip),
            '=' => Some(CigarOpKind::SeqMatch),
            'X' => Some(CigarOpKind::SeqMismatch),
            _ => None,
        }
    }

    /// Whether the operation consumes read bases.
    pub fn consumes_read(self) -> bool {
        matches!(
            self,
            CigarOpKind::Match
                | CigarOpKind::Insertion
                | CigarOpKind::SoftClip
                | CigarOpKind::SeqMatch
                | CigarOpKind::SeqMismatch
        )
    }

    /// Whether the operation consumes reference bases.
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            CigarOpKind::Match
                | CigarOpKind::Deletion
                | CigarOpKind::RefSkip
                | CigarOpKind::SeqMatch
                | CigarOpKind::SeqMismatch
        )
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.code())
    }
}

/// Errors from parsing textual CIGAR strings.
#[derive(Debug, Error)]
pub enum CigarError {
    /// Operation code outside the `MIDSHN=X` alphabet.
    #[error("invalid CIGAR operation code '{0}'")]
    InvalidOpCode(char),
    /// An operation length of zero is not representable.
    #[error("zero-length CIGAR operation at offset {0}")]
    ZeroLength(usize),
    /// Trailing digits with no operation code, or an empty string.
    #[error("malformed CIGAR text {0:?}")]
    Malformed(String),
}

/// Render operations in the textual `(\d+[MIDSHN=X])+` grammar.
pub fn cigar_string(ops: &[CigarOp]) -> String {
    let mut out = String::with_capacity(ops.len() * 3);
    for op in ops {
        out.push_str(&op.len.to_string());
        out.push(op.kind.code());
    }
    out
}

/// Parse a textual CIGAR string.
pub fn parse_cigar(text: &str) -> Result<Vec<CigarOp>, CigarError> {
    if text.is_empty() {
        return Err(CigarError::Malformed(text.to_string()));
    }
    let mut ops = Vec::new();
    let mut len: u32 = 0;
    let mut have_digits = false;
    for (offset, ch) in text.char_indices() {
        if let Some(digit) = ch.to_digit(10) {
            len = len * 10 + digit;
            have_digits = true;
        } else {
            let kind = CigarOpKind::from_code(ch).ok_or(CigarError::InvalidOpCode(ch))?;
            if !have_digits || len == 0 {
                return Err(CigarError::ZeroLength(offset));
            }
            ops.push(CigarOp::new(kind, len));
            len = 0;
            have_digits = false;
        }
    }
    if have_digits {
        return Err(CigarError::Malformed(text.to_string()));
    }
    Ok(ops)
}

/// Total read bases consumed by the operations.
pub fn read_consuming_len(ops: &[CigarOp]) -> u32 {
    ops.iter()
        .filter(|op| op.kind.consumes_read())
        .map(|op| op.len)
        .sum()
}

/// Total reference bases consumed by the operations.
pub fn reference_span(ops: &[CigarOp]) -> u32 {
    ops.iter()
        .filter(|op| op.kind.consumes_reference())
        .map(|op| op.len)
        .sum()
}

/// Merge adjacent same-kind operations and drop zero-length ones.
pub fn compress_cigar(ops: Vec<CigarOp>) -> Vec<CigarOp> {
    let mut out: Vec<CigarOp> = Vec::with_capacity(ops.len());
    for op in ops {
        if op.len == 0 {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.kind == op.kind => last.len += op.len,
            _ => out.push(op),
        }
    }
    out
}

fn push_run(ops: &mut Vec<CigarOp>, kind: CigarOpKind, len: u32) {
    if len == 0 {
        return;
    }
    match ops.last_mut() {
        Some(last) if last.kind == kind => last.len += len,
        _ => ops.push(CigarOp::new(kind, len)),
    }
}

/// Build a CIGAR from a position map.
///
/// Consecutive mapped coordinates with delta `+1` collapse into Match runs;
/// [`UNMAPPED`] entries become Insertion runs; a positional gap `g > 1`
/// between mapped entries emits a Deletion run of length `g - 1`. With
/// `edge_insertions_as_softclip` set, an insertion run touching either end
/// of the read is emitted as a Soft-clip instead; interior insertion runs
/// are unaffected.
pub fn construct_cigar(position_map: &[i64], edge_insertions_as_softclip: bool) -> Vec<CigarOp> {
    let mut ops: Vec<CigarOp> = Vec::new();
    let mut last_mapped: Option<i64> = None;

    for &coordinate in position_map {
        if coordinate == UNMAPPED {
            push_run(&mut ops, CigarOpKind::Insertion, 1);
            continue;
        }
        if let Some(previous) = last_mapped {
            let gap = coordinate - previous;
            if gap > 1 {
                push_run(&mut ops, CigarOpKind::Deletion, (gap - 1) as u32);
            }
        }
        push_run(&mut ops, CigarOpKind::Match, 1);
        last_mapped = Some(coordinate);
    }

    if edge_insertions_as_softclip {
        if let Some(first) = ops.first_mut() {
            if first.kind == CigarOpKind::Insertion {
                first.kind = CigarOpKind::SoftClip;
            }
        }
        if let Some(last) = ops.last_mut() {
            if last.kind == CigarOpKind::Insertion {
                last.kind = CigarOpKind::SoftClip;
            }
        }
    }

    ops
}

/// Rebuild the position map implied by a CIGAR.
///
/// `start_position` is the 0-based reference coordinate of the first
/// reference-consuming operation; map entries come out 1-based, with
/// soft-clipped and inserted bases as [`UNMAPPED`].
pub fn position_map_from_cigar(ops: &[CigarOp], start_position: u32) -> Vec<i64> {
    let mut map = Vec::with_capacity(read_consuming_len(ops) as usize);
    let mut reference = start_position as i64 + 1;
    for op in ops {
        match op.kind {
            CigarOpKind::Match | CigarOpKind::SeqMatch | CigarOpKind::SeqMismatch => {
                for _ in 0..op.len {
                    map.push(reference);
                    reference += 1;
                }
            }
            CigarOpKind::Insertion | CigarOpKind::SoftClip => {
                for _ in 0..op.len {
                    map.push(UNMAPPED);
                }
            }
            CigarOpKind::Deletion | CigarOpKind::RefSkip => {
                reference += op.len as i64;
            }
            CigarOpKind::HardClip => {}
        }
    }
    map
}

/// Reference bases consumed while walking the first `read_bases` read bases
/// of `ops`, counting deletion runs encountered before the walk completes.
///
/// Used to shift an alignment's start coordinate after its leading bases
/// have been re-masked into a soft clip.
pub fn prefix_reference_consumed_through(ops: &[CigarOp], read_bases: u32) -> u32 {
    let mut consumed = 0u32;
    let mut reference = 0u32;
    for op in ops {
        if consumed >= read_bases {
            break;
        }
        match op.kind {
            CigarOpKind::Match | CigarOpKind::SeqMatch | CigarOpKind::SeqMismatch => {
                let take = op.len.min(read_bases - consumed);
                consumed += take;
                reference += take;
            }
            CigarOpKind::Insertion | CigarOpKind::SoftClip => {
                consumed += op.len.min(read_bases - consumed);
            }
            CigarOpKind::Deletion | CigarOpKind::RefSkip => {
                reference += op.len;
            }
            CigarOpKind::HardClip => {}
        }
    }
    reference
}

/// Read offset of the first indel boundary, walking from the left edge.
///
/// An insertion boundary is the offset of its first base; a deletion
/// boundary is the junction offset between its flanking bases.
fn first_indel_boundary_from_left(ops: &[CigarOp]) -> Option<u32> {
    let mut offset = 0u32;
    for op in ops {
        match op.kind {
            CigarOpKind::Insertion | CigarOpKind::Deletion | CigarOpKind::RefSkip => {
                return Some(offset);
            }
            _ => {
                if op.kind.consumes_read() {
                    offset += op.len;
                }
            }
        }
    }
    None
}

/// Read offset of the first indel boundary counted from the right edge.
fn first_indel_boundary_from_right(ops: &[CigarOp]) -> Option<u32> {
    let mut offset = 0u32;
    for op in ops.iter().rev() {
        match op.kind {
            CigarOpKind::Insertion | CigarOpKind::Deletion | CigarOpKind::RefSkip => {
                return Some(offset);
            }
            _ => {
                if op.kind.consumes_read() {
                    offset += op.len;
                }
            }
        }
    }
    None
}

/// Convert the first `prefix` and last `suffix` read bases into soft clips.
///
/// Deletion runs encountered inside a clipped region vanish (they consume no
/// read bases and are no longer part of the aligned span). Output is
/// compressed and read-length preserving.
fn clip_read_bases(raw: &[CigarOp], prefix: u32, suffix: u32) -> Vec<CigarOp> {
    let total = read_consuming_len(raw);
    let prefix = prefix.min(total);
    let suffix = suffix.min(total - prefix);

    let mut ops: Vec<CigarOp> = Vec::with_capacity(raw.len() + 2);
    if prefix > 0 {
        ops.push(CigarOp::new(CigarOpKind::SoftClip, prefix));
    }

    let keep_until = total - suffix;
    let mut consumed = 0u32;
    for op in raw {
        if !op.kind.consumes_read() {
            // Deletions survive only while fully inside the kept interval.
            if consumed >= prefix && consumed < keep_until {
                ops.push(*op);
            }
            continue;
        }
        let op_start = consumed;
        let op_end = consumed + op.len;
        consumed = op_end;

        let kept_start = op_start.max(prefix);
        let kept_end = op_end.min(keep_until);
        if kept_end > kept_start {
            ops.push(CigarOp::new(op.kind, kept_end - kept_start));
        }
    }

    if suffix > 0 {
        ops.push(CigarOp::new(CigarOpKind::SoftClip, suffix));
    }
    compress_cigar(ops)
}

/// Re-impose original soft-clip boundaries onto a realigned CIGAR.
///
/// `raw` is the realigned CIGAR, which has no soft clips because
/// realignment re-maps the whole read; `mismatches` classifies each read
/// base of that alignment. In the default mode, each edge consumes bases
/// into the clip up to the original clip length but stops at the first
/// matching base, so mismatching edge bases are re-masked while matching
/// ones shorten the clip. With `mask_ns_only`, masking instead tracks the
/// original N-prefix/N-suffix lengths exactly, truncating where a new
/// indel boundary lands inside the masked region.
pub fn softclip_cigar(
    raw: &[CigarOp],
    mismatches: &[MismatchKind],
    orig_prefix_clip: u32,
    orig_suffix_clip: u32,
    mask_ns_only: bool,
    prefix_ns: u32,
    suffix_ns: u32,
) -> Vec<CigarOp> {
    let read_len = read_consuming_len(raw);

    let prefix = if mask_ns_only {
        let mut len = prefix_ns.min(read_len);
        if let Some(boundary) = first_indel_boundary_from_left(raw) {
            if boundary < len {
                len = boundary;
            }
        }
        len
    } else {
        let limit = orig_prefix_clip.min(read_len);
        let mut len = 0u32;
        while len < limit {
            if mismatches[len as usize] == MismatchKind::Match {
                break;
            }
            len += 1;
        }
        len
    };

    let suffix = if mask_ns_only {
        let mut len = suffix_ns.min(read_len - prefix);
        if let Some(boundary) = first_indel_boundary_from_right(raw) {
            if boundary < len {
                len = boundary;
            }
        }
        len
    } else {
        let limit = orig_suffix_clip.min(read_len - prefix);
        let mut len = 0u32;
        while len < limit {
            let index = (read_len - 1 - len) as usize;
            if mismatches[index] == MismatchKind::Match {
                break;
            }
            len += 1;
        }
        len
    };

    clip_read_bases(raw, prefix, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(ops: &[CigarOp]) -> String {
        cigar_string(ops)
    }

    #[test]
    fn construct_collapses_contiguous_matches() {
        let map = vec![5, 6, 7, 8];
        assert_eq!(kinds(&construct_cigar(&map, false)), "4M");
    }

    #[test]
    fn construct_emits_insertion_and_deletion_runs() {
        // 2M 2I 2M, then a 3-base gap => 2D before the final match run.
        let map = vec![10, 11, UNMAPPED, UNMAPPED, 12, 13, 16, 17];
        assert_eq!(kinds(&construct_cigar(&map, false)), "2M2I2M2D2M");
    }

    #[test]
    fn construct_masks_edge_insertions_when_requested() {
        let map = vec![UNMAPPED, UNMAPPED, 4, 5, 6, UNMAPPED];
        assert_eq!(kinds(&construct_cigar(&map, false)), "2I3M1I");
        assert_eq!(kinds(&construct_cigar(&map, true)), "2S3M1S");
    }

    #[test]
    fn position_map_round_trips_through_cigar() {
        let map = vec![UNMAPPED, UNMAPPED, 4, 5, UNMAPPED, 6, 9, 10];
        for softclip_mode in [false, true] {
            let cigar = construct_cigar(&map, softclip_mode);
            let rebuilt = position_map_from_cigar(&cigar, 3);
            assert_eq!(rebuilt, map, "mode {softclip_mode}");
        }
    }

    #[test]
    fn cigar_text_round_trips() {
        let text = "3S10M2I4M1D7M2H";
        let ops = parse_cigar(text).expect("grammar should parse");
        assert_eq!(cigar_string(&ops), text);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_cigar("").is_err());
        assert!(parse_cigar("10").is_err());
        assert!(parse_cigar("10Q").is_err());
        assert!(parse_cigar("0M").is_err());
    }

    #[test]
    fn softclip_stops_at_first_matching_base() {
        use MismatchKind::*;
        // Realigned 8M whose first two bases mismatch: only those two are
        // re-masked even though the original clip was 4 bases.
        let raw = vec![CigarOp::new(CigarOpKind::Match, 8)];
        let mm = vec![
            Mismatch, Mismatch, Match, Match, Match, Match, Match, Match,
        ];
        let clipped = softclip_cigar(&raw, &mm, 4, 0, false, 0, 0);
        assert_eq!(kinds(&clipped), "2S6M");
    }

    #[test]
    fn softclip_n_mask_truncates_at_indel_boundary() {
        use MismatchKind::*;
        // 3M2I3M with a 4-base original N prefix: the clip must stop at the
        // insertion boundary (offset 3) instead of cutting into the run.
        let raw = vec![
            CigarOp::new(CigarOpKind::Match, 3),
            CigarOp::new(CigarOpKind::Insertion, 2),
            CigarOp::new(CigarOpKind::Match, 3),
        ];
        let mm = vec![Match, Match, Match, Unmapped, Unmapped, Match, Match, Match];
        let clipped = softclip_cigar(&raw, &mm, 0, 0, true, 4, 0);
        assert_eq!(kinds(&clipped), "3S2I3M");
    }

    #[test]
    fn clip_preserves_read_consuming_length() {
        let raw = vec![
            CigarOp::new(CigarOpKind::Match, 5),
            CigarOp::new(CigarOpKind::Deletion, 2),
            CigarOp::new(CigarOpKind::Match, 5),
        ];
        let clipped = clip_read_bases(&raw, 6, 2);
        assert_eq!(read_consuming_len(&clipped), read_consuming_len(&raw));
        // The deletion sits inside the clipped prefix and disappears.
        assert_eq!(kinds(&clipped), "6S2M2S");
    }

    #[test]
    fn prefix_reference_shift_counts_interior_deletions() {
        let raw = vec![
            CigarOp::new(CigarOpKind::Match, 4),
            CigarOp::new(CigarOpKind::Deletion, 3),
            CigarOp::new(CigarOpKind::Match, 6),
        ];
        assert_eq!(prefix_reference_consumed_through(&raw, 0), 0);
        assert_eq!(prefix_reference_consumed_through(&raw, 4), 4);
        assert_eq!(prefix_reference_consumed_through(&raw, 5), 8);
    }
}
