use std::sync::Arc;

use indelign::align::parse_cigar;
use indelign::chromosome::RealignmentStats;
use indelign::io::{CollectingWriter, VecExtractor};
use indelign::reads::CigarIndelFinder;
use indelign::{ChromosomeRealigner, ReadRecord, RealignerConfig};

/// Reference used by the insertion scenarios: an ACGT repeat.
#[allow(dead_code)]
pub const ACGT_REFERENCE: &[u8] = b"ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";

#[allow(dead_code)]
pub fn build_read(name: &str, pos: u32, cigar: &str, sequence: &[u8]) -> ReadRecord {
    ReadRecord::new(
        name,
        "chr1",
        pos,
        30,
        parse_cigar(cigar).expect("test cigar is valid"),
        sequence.to_vec(),
        vec![30; sequence.len()],
    )
}

/// Run one chromosome end to end over in-memory reads.
///
/// The same read list feeds both cursors, mirroring the two passes over a
/// real file.
#[allow(dead_code)]
pub fn run_chromosome(
    config: RealignerConfig,
    reference: &[u8],
    reads: Vec<ReadRecord>,
) -> (CollectingWriter, RealignmentStats) {
    let mut candidate_cursor = VecExtractor::new(reads.clone());
    let mut realign_cursor = VecExtractor::new(reads);
    let mut writer = CollectingWriter::new();
    let orchestrator =
        ChromosomeRealigner::new(Arc::from("chr1"), config, CigarIndelFinder::new());
    let stats = orchestrator
        .process(
            &mut candidate_cursor,
            &mut realign_cursor,
            reference,
            &mut writer,
        )
        .expect("in-memory pipeline cannot fail");
    (writer, stats)
}
