use xctopo_core::count::count_distinct;
use xctopo_core::encode::encode_packed;
use xctopo_core::types::{LocalityKey, RawCoordinate, Tier, TopologySpan};

use proptest::prelude::*;

fn key(rack_col: u32, rack_row: u32, chassis: u32, blade: u32, nic: u32) -> LocalityKey {
    encode_packed(&RawCoordinate {
        rack_col,
        rack_row,
        chassis,
        blade,
        nic,
    })
}

#[test]
fn empty_input_counts_zero() {
    for tier in Tier::ALL {
        assert_eq!(count_distinct(&[], tier), 0);
    }
}

#[test]
fn identical_projection_counts_one() {
    // Same group and chassis, different blades and nodes.
    let keys = [key(0, 0, 1, 0, 0), key(0, 0, 1, 5, 2), key(1, 0, 0, 9, 3)];
    assert_eq!(count_distinct(&keys[..2], Tier::Group), 1);
    assert_eq!(count_distinct(&keys[..2], Tier::Chassis), 1);
    assert_eq!(count_distinct(&keys[..2], Tier::Blade), 2);
    assert_eq!(count_distinct(&keys, Tier::Group), 1);
}

#[test]
fn same_chassis_number_in_two_groups_counts_twice() {
    let keys = [key(0, 0, 1, 3, 0), key(2, 0, 1, 3, 0)];
    assert_eq!(count_distinct(&keys, Tier::Group), 2);
    assert_eq!(count_distinct(&keys, Tier::Chassis), 2);
    assert_eq!(count_distinct(&keys, Tier::Blade), 2);
}

#[test]
fn span_summarizes_every_tier() {
    let keys = [
        key(0, 0, 0, 0, 0),
        key(0, 0, 0, 0, 1),
        key(0, 0, 0, 1, 0),
        key(1, 0, 0, 1, 0),
        key(4, 0, 2, 7, 3),
    ];
    let span = TopologySpan::from_keys(&keys);
    assert_eq!(
        span,
        TopologySpan {
            groups: 2,
            chassis: 3,
            blades: 4,
            nodes: 5,
        }
    );
    assert_eq!(span.get(Tier::Chassis), 3);
}

#[test]
fn span_lookup_by_tier_matches_direct_count() {
    let keys = [
        key(0, 0, 0, 0, 0),
        key(2, 0, 1, 3, 2),
        key(3, 0, 1, 3, 2),
        key(3, 1, 2, 9, 1),
    ];
    let span = TopologySpan::from_keys(&keys);
    let per_tier: Vec<(Tier, usize)> = Tier::ALL.iter().map(|t| (*t, span.get(*t))).collect();
    let direct: Vec<(Tier, usize)> = Tier::ALL
        .iter()
        .map(|t| (*t, count_distinct(&keys, *t)))
        .collect();
    assert_eq!(per_tier, direct);
}

proptest! {
    #[test]
    fn count_matches_distinct_projection_in_any_order(
        raw in proptest::collection::vec(0u32..(1 << 18), 0..64),
        rotate in 0usize..64,
    ) {
        let mut keys: Vec<LocalityKey> = raw.iter().copied().map(LocalityKey).collect();
        for tier in Tier::ALL {
            let mut expected: Vec<u32> = keys.iter().map(|k| k.masked(tier)).collect();
            expected.sort_unstable();
            expected.dedup();

            let forward = count_distinct(&keys, tier);
            keys.reverse();
            let reversed = count_distinct(&keys, tier);
            if !keys.is_empty() {
                let len = keys.len();
                keys.rotate_left(rotate % len);
            }
            let rotated = count_distinct(&keys, tier);

            prop_assert_eq!(forward, expected.len());
            prop_assert_eq!(reversed, forward);
            prop_assert_eq!(rotated, forward);
        }
    }
}
