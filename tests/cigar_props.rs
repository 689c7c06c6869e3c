use indelign::align::{
    construct_cigar, position_map_from_cigar, read_consuming_len, softclip_cigar, CigarOpKind,
    MismatchKind, UNMAPPED,
};
use proptest::prelude::*;

/// Position maps with 1-based, strictly increasing mapped coordinates and
/// arbitrary unmapped stretches.
fn position_maps() -> impl Strategy<Value = Vec<i64>> {
    (
        1i64..50,
        proptest::collection::vec((any::<bool>(), 1i64..5), 1..48),
    )
        .prop_map(|(start, steps)| {
            let mut map = Vec::with_capacity(steps.len());
            let mut coordinate = start;
            for (mapped, gap) in steps {
                if mapped {
                    coordinate += gap;
                    map.push(coordinate);
                } else {
                    map.push(UNMAPPED);
                }
            }
            map
        })
        .prop_filter("map must contain a mapped base", |map| {
            map.iter().any(|&p| p != UNMAPPED)
        })
}

proptest! {
    #[test]
    fn construct_cigar_round_trips(map in position_maps(), softclip_mode in any::<bool>()) {
        let cigar = construct_cigar(&map, softclip_mode);

        prop_assert!(cigar.iter().all(|op| op.len > 0), "no zero-length operations");
        prop_assert_eq!(read_consuming_len(&cigar) as usize, map.len());

        let start = map.iter().find(|&&p| p != UNMAPPED).expect("filtered") - 1;
        let rebuilt = position_map_from_cigar(&cigar, start as u32);
        prop_assert_eq!(rebuilt, map);
    }

    #[test]
    fn softclip_reapplication_keeps_cigars_valid(
        map in position_maps(),
        prefix in 0u32..30,
        suffix in 0u32..30,
        mask_ns_only in any::<bool>(),
        prefix_ns in 0u32..30,
        suffix_ns in 0u32..30,
        match_pattern in proptest::collection::vec(any::<bool>(), 48),
    ) {
        let raw = construct_cigar(&map, false);
        let mismatches: Vec<MismatchKind> = map
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                if p == UNMAPPED {
                    MismatchKind::Unmapped
                } else if match_pattern[i % match_pattern.len()] {
                    MismatchKind::Match
                } else {
                    MismatchKind::Mismatch
                }
            })
            .collect();

        let clipped = softclip_cigar(
            &raw,
            &mismatches,
            prefix,
            suffix,
            mask_ns_only,
            prefix_ns,
            suffix_ns,
        );

        prop_assert!(clipped.iter().all(|op| op.len > 0));
        prop_assert_eq!(read_consuming_len(&clipped), read_consuming_len(&raw));
        // Soft clips may only touch the edges.
        let interior = &clipped[..];
        for (index, op) in interior.iter().enumerate() {
            if op.kind == CigarOpKind::SoftClip {
                prop_assert!(
                    index == 0 || index == interior.len() - 1,
                    "interior soft clip at {}",
                    index
                );
            }
        }
    }
}
