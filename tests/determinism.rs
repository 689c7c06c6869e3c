mod common;

use common::{build_read, ACGT_REFERENCE};
use indelign::candidates::{CandidateIndel, CoexistenceGroups, IndelRanker, ObservedIndel};
use indelign::realign::ReadRealigner;

#[test]
fn candidate_order_never_changes_the_chosen_result() {
    let candidates = vec![
        CandidateIndel::new("chr1", 10, "C", "CTATATA"),
        CandidateIndel::new("chr1", 14, "T", "TAA"),
        CandidateIndel::new("chr1", 7, "G", "GC"),
    ];
    let read = build_read("r", 5, "5S5M5I5M", b"ACGTACGTACTATATAATAC");
    let realigner = ReadRealigner::default();
    let groups = CoexistenceGroups::new();

    let reference_result = realigner.realign(
        &read,
        &candidates,
        ACGT_REFERENCE,
        &IndelRanker::Canonical,
        &groups,
    );
    assert!(reference_result.is_some());

    let mut reversed = candidates.clone();
    reversed.reverse();
    let mut rotated = candidates.clone();
    rotated.rotate_left(1);

    for permutation in [reversed, rotated] {
        let result = realigner.realign(
            &read,
            &permutation,
            ACGT_REFERENCE,
            &IndelRanker::Canonical,
            &groups,
        );
        assert_eq!(result, reference_result);
    }
}

const HOMOPOLYMER_REFERENCE: &[u8] = b"AAAAAAAAAACCCCCCCCCC";

/// Two equivalent insertions in a homopolymer produce tied scores; the tie
/// must resolve deterministically to the canonically first candidate.
#[test]
fn score_ties_resolve_to_the_canonical_candidate() {
    let early = CandidateIndel::new("chr1", 5, "A", "AA");
    let late = CandidateIndel::new("chr1", 9, "A", "AA");
    let read = build_read("r", 0, "20M", b"AAAAAAAAAAACCCCCCCCC");
    let realigner = ReadRealigner::default();

    let result = realigner
        .realign(
            &read,
            &[late.clone(), early.clone()],
            HOMOPOLYMER_REFERENCE,
            &IndelRanker::Canonical,
            &CoexistenceGroups::new(),
        )
        .expect("the extra A realigns as an insertion");
    assert_eq!(result.num_mismatches, 0);
    assert_eq!(result.indels.len(), 1);
    assert_eq!(result.indels[0].position, 5);
}

/// The injected ranker breaks otherwise-tied scores.
#[test]
fn support_ranker_overrides_canonical_tie_break() {
    let early = CandidateIndel::new("chr1", 5, "A", "AA");
    let late = CandidateIndel::new("chr1", 9, "A", "AA");
    let read = build_read("r", 0, "20M", b"AAAAAAAAAAACCCCCCCCC");
    let realigner = ReadRealigner::default();

    let ranker = IndelRanker::from_observations(&[
        ObservedIndel {
            indel: early.clone(),
            support: 1,
        },
        ObservedIndel {
            indel: late.clone(),
            support: 9,
        },
    ]);

    let result = realigner
        .realign(
            &read,
            &[early, late],
            HOMOPOLYMER_REFERENCE,
            &ranker,
            &CoexistenceGroups::new(),
        )
        .expect("the extra A realigns as an insertion");
    assert_eq!(result.indels[0].position, 9);
}

/// Repeated invocations are bit-for-bit stable.
#[test]
fn repeated_realignment_is_stable() {
    let candidates = vec![
        CandidateIndel::new("chr1", 10, "C", "CTATATA"),
        CandidateIndel::new("chr1", 7, "G", "GC"),
    ];
    let read = build_read("r", 5, "5S5M5I5M", b"ACGTACGTACTATATAATAC");
    let realigner = ReadRealigner::default();
    let groups = CoexistenceGroups::new();

    let first = realigner.realign(
        &read,
        &candidates,
        ACGT_REFERENCE,
        &IndelRanker::Canonical,
        &groups,
    );
    for _ in 0..10 {
        let again = realigner.realign(
            &read,
            &candidates,
            ACGT_REFERENCE,
            &IndelRanker::Canonical,
            &groups,
        );
        assert_eq!(again, first);
    }
}
