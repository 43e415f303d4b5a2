use xctopo_core::types::{
    ConfigFlag, GroupBit, GroupSet, RangeError, RawCoordinate, Tier, FLAG_CAPACITY,
};

#[test]
fn group_bit_ordinal_requires_single_bit() {
    assert_eq!(GroupBit::from_bits(1 << 4).ordinal(), Some(4));
    assert_eq!(GroupBit::from_bits(0).ordinal(), None);
    let both = GroupBit::from_bits(1).union(GroupBit::from_bits(1 << 8));
    assert_eq!(both.bits(), 0x101);
    assert_eq!(both.ordinal(), None);
}

#[test]
fn group_bit_drops_bits_outside_field() {
    assert!(GroupBit::from_bits(1 << 9).is_empty());
}

#[test]
fn tier_masks_are_cumulative_from_group() {
    assert_eq!(Tier::Group.mask(), 0x1ff << 9);
    assert_eq!(Tier::Chassis.mask(), (0x1ff << 9) | (0x7 << 6));
    assert_eq!(Tier::Blade.mask(), (0x1ff << 9) | (0x7 << 6) | (0xf << 2));
    assert_eq!(Tier::Node.mask(), 0x3ffff);
    for pair in Tier::ALL.windows(2) {
        assert_eq!(pair[0].mask() & pair[1].mask(), pair[0].mask());
    }
}

#[test]
fn range_check_names_first_offender() {
    let coord = RawCoordinate {
        rack_col: 0,
        rack_row: 0,
        chassis: 1,
        blade: 16,
        nic: 9,
    };
    assert_eq!(
        coord.check_ranges(),
        Err(RangeError::OutOfRange {
            field: "blade",
            value: 16,
            max: 15,
        })
    );
}

#[test]
fn config_flag_truncates_on_char_boundary() {
    let value = format!("{}é", "a".repeat(FLAG_CAPACITY - 2));
    let flag = ConfigFlag::new(value);
    assert_eq!(flag.as_str().len(), FLAG_CAPACITY - 2);
    assert!(flag.as_str().chars().all(|c| c == 'a'));
}

#[test]
fn group_set_rejects_ids_past_capacity() {
    let mut set = GroupSet::default();
    assert!(set.insert(0));
    assert!(set.insert(66));
    assert!(!set.insert(128));
    assert_eq!(set.len(), 2);
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![0, 66]);
    assert_eq!(GroupSet::single(200), None);
}
