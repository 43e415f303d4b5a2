use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest chassis number inside one cabinet on an XC40.
pub const MAX_RAW_CHASSIS: u32 = 2;
/// Highest blade (slot) number inside one chassis.
pub const MAX_BLADE: u32 = 15;
/// Highest NIC number on one blade (four nodes share an Aries router).
pub const MAX_NIC: u32 = 3;

/// Node location as read from the canonical name `c<col>-<row>c<chassis>s<blade>n<nic>`.
///
/// No range checks are applied on construction; see [`RawCoordinate::check_ranges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawCoordinate {
    pub rack_col: u32,
    pub rack_row: u32,
    pub chassis: u32,
    pub blade: u32,
    pub nic: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("{field} = {value} exceeds topology maximum {max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

impl RawCoordinate {
    /// Bounds check against the XC40 cabinet layout. Encoders never call this; out-of-range
    /// fields are truncated by the packed encoder instead.
    pub fn check_ranges(&self) -> Result<(), RangeError> {
        let checks = [
            ("chassis", self.chassis, MAX_RAW_CHASSIS),
            ("blade", self.blade, MAX_BLADE),
            ("nic", self.nic, MAX_NIC),
        ];
        for (field, value, max) in checks {
            if value > max {
                return Err(RangeError::OutOfRange { field, value, max });
            }
        }
        Ok(())
    }
}

impl fmt::Display for RawCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "c{}-{}c{}s{}n{}",
            self.rack_col, self.rack_row, self.chassis, self.blade, self.nic
        )
    }
}

// Packed key layout, least significant first.
pub const NODE_SHIFT: u32 = 0;
pub const BLADE_SHIFT: u32 = 2;
pub const CHASSIS_SHIFT: u32 = 6;
pub const GROUP_SHIFT: u32 = 9;

pub const NODE_FIELD: u32 = 0x3;
pub const BLADE_FIELD: u32 = 0xf;
pub const CHASSIS_FIELD: u32 = 0x7;
pub const GROUP_FIELD: u32 = 0x1ff;

/// One level of the network hierarchy.
///
/// Masks are anchored at the group field: counting at `Chassis` distinguishes the same chassis
/// number in two different groups, and so on down to `Node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Group,
    Chassis,
    Blade,
    Node,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Group, Tier::Chassis, Tier::Blade, Tier::Node];

    pub const fn mask(self) -> u32 {
        let group = GROUP_FIELD << GROUP_SHIFT;
        let chassis = CHASSIS_FIELD << CHASSIS_SHIFT;
        let blade = BLADE_FIELD << BLADE_SHIFT;
        let node = NODE_FIELD << NODE_SHIFT;
        match self {
            Tier::Group => group,
            Tier::Chassis => group | chassis,
            Tier::Blade => group | chassis | blade,
            Tier::Node => group | chassis | blade | node,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Tier::Group => "group",
            Tier::Chassis => "chassis",
            Tier::Blade => "blade",
            Tier::Node => "node",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One-hot group tag carried in the packed key.
///
/// The value is a membership bit, not an ID: OR-ing tags from several keys yields the set of
/// groups they cover. Use [`GroupBit::ordinal`] to get the group index back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupBit(u16);

impl GroupBit {
    /// Keeps only the bits that fit the 9-bit group field.
    pub const fn from_bits(bits: u32) -> Self {
        GroupBit((bits & GROUP_FIELD) as u16)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True when the group shift fell outside the field and nothing was tagged.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Bit position of the tag, if exactly one bit is set.
    pub fn ordinal(self) -> Option<u32> {
        if self.0.count_ones() == 1 {
            Some(self.0.trailing_zeros())
        } else {
            None
        }
    }

    pub const fn union(self, other: GroupBit) -> GroupBit {
        GroupBit(self.0 | other.0)
    }
}

/// Packed locality key: `group(9, one-hot) | chassis(3) | blade(4) | node(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalityKey(pub u32);

impl LocalityKey {
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn node(self) -> u32 {
        (self.0 >> NODE_SHIFT) & NODE_FIELD
    }

    pub const fn blade(self) -> u32 {
        (self.0 >> BLADE_SHIFT) & BLADE_FIELD
    }

    /// Chassis index within the group (0-5), already adjusted by rack-column parity.
    pub const fn chassis(self) -> u32 {
        (self.0 >> CHASSIS_SHIFT) & CHASSIS_FIELD
    }

    pub const fn group(self) -> GroupBit {
        GroupBit::from_bits(self.0 >> GROUP_SHIFT)
    }

    pub const fn masked(self, tier: Tier) -> u32 {
        self.0 & tier.mask()
    }
}

impl fmt::LowerHex for LocalityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Dense hierarchical IDs produced by the linear encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinearLocality {
    pub group: u32,
    pub chassis: u32,
    pub blade: u32,
    pub nic: u32,
    pub uniq_chassis: u32,
    pub uniq_blade: u32,
    pub uniq_node: u32,
}

/// Size of the fixed, NUL-padded flag payload exchanged by collectives.
pub const FLAG_CAPACITY: usize = 64;

/// Short configuration value such as a cluster mode (`quad`) or memory mode (`cache`).
///
/// Always fits [`FLAG_CAPACITY`] with a terminating NUL, so at most 63 bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigFlag(String);

impl ConfigFlag {
    /// Truncates on a char boundary so the value fits the wire payload.
    pub fn new(value: impl Into<String>) -> Self {
        let mut value = value.into();
        if value.len() >= FLAG_CAPACITY {
            let mut end = FLAG_CAPACITY - 1;
            while !value.is_char_boundary(end) {
                end -= 1;
            }
            value.truncate(end);
        }
        ConfigFlag(value)
    }

    pub fn empty() -> Self {
        ConfigFlag(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ConfigFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How many distinct units of each tier a set of keys touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySpan {
    pub groups: usize,
    pub chassis: usize,
    pub blades: usize,
    pub nodes: usize,
}

/// Set of linear group IDs below 128, as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupSet(pub u128);

impl GroupSet {
    pub const CAPACITY: u32 = u128::BITS;

    pub fn single(group: u32) -> Option<Self> {
        1u128.checked_shl(group).map(GroupSet)
    }

    /// Returns false if `group` does not fit the set.
    pub fn insert(&mut self, group: u32) -> bool {
        match 1u128.checked_shl(group) {
            Some(bit) => {
                self.0 |= bit;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, group: u32) -> bool {
        1u128
            .checked_shl(group)
            .map(|bit| self.0 & bit != 0)
            .unwrap_or(false)
    }

    pub fn union(self, other: GroupSet) -> GroupSet {
        GroupSet(self.0 | other.0)
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..Self::CAPACITY).filter(move |g| self.contains(*g))
    }
}

/// Outcome of an agreement check, as broadcast by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Agree,
    Disagree,
}

impl Verdict {
    pub fn from_agreement(agree: bool) -> Self {
        if agree {
            Verdict::Agree
        } else {
            Verdict::Disagree
        }
    }

    pub fn is_agree(self) -> bool {
        self == Verdict::Agree
    }
}
