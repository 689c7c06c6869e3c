//! Pure sequence/CIGAR utilities shared by the realigner and orchestrator.
//!
//! Everything in this module is stateless: position-map/CIGAR translation,
//! per-base mismatch classification, and whole-alignment scoring.

mod cigar;
mod mismatch;
mod summary;

pub use cigar::{
    cigar_string, compress_cigar, construct_cigar, parse_cigar, position_map_from_cigar,
    prefix_reference_consumed_through, read_consuming_len, reference_span, softclip_cigar,
    CigarError, CigarOp, CigarOpKind, UNMAPPED,
};
pub use mismatch::{edit_distance, mismatch_map, num_mismatches, MismatchKind};
pub use summary::{adjusted_position, is_valid_map, summarize_alignment, AlignmentSummary};
