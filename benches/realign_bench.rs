//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indelign::align::{construct_cigar, parse_cigar, position_map_from_cigar};
use indelign::candidates::{CandidateIndel, CoexistenceGroups, IndelRanker};
use indelign::realign::ReadRealigner;
use indelign::ReadRecord;

const REFERENCE: &[u8] = b"ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";

fn benchmark_realign(c: &mut Criterion) {
    let read = ReadRecord::new(
        "bench",
        "chr1",
        5,
        30,
        parse_cigar("5S5M5I5M").expect("valid cigar"),
        b"ACGTACGTACTATATAATAC".to_vec(),
        vec![30; 20],
    );
    let candidates = vec![
        CandidateIndel::new("chr1", 10, "C", "CTATATA"),
        CandidateIndel::new("chr1", 14, "T", "TAA"),
        CandidateIndel::new("chr1", 7, "G", "GC"),
    ];
    let realigner = ReadRealigner::default();
    let groups = CoexistenceGroups::new();

    c.bench_function("realign_three_candidates", |b| {
        b.iter(|| {
            black_box(realigner.realign(
                black_box(&read),
                black_box(&candidates),
                REFERENCE,
                &IndelRanker::Canonical,
                &groups,
            ))
        });
    });
}

fn benchmark_cigar_round_trip(c: &mut Criterion) {
    let cigar = parse_cigar("10M6I4M").expect("valid cigar");
    let map = position_map_from_cigar(&cigar, 0);

    c.bench_function("construct_cigar", |b| {
        b.iter(|| black_box(construct_cigar(black_box(&map), true)));
    });
}

criterion_group!(benches, benchmark_realign, benchmark_cigar_round_trip);
criterion_main!(benches);
