//! Locality encoders.
//!
//! Two independent schemes describe the same physical hierarchy with different arithmetic and
//! different rack-to-group mappings. Their outputs are not comparable; pick one per analysis.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{
    GroupBit, LinearLocality, LocalityKey, RawCoordinate, BLADE_FIELD, BLADE_SHIFT, CHASSIS_FIELD,
    CHASSIS_SHIFT, GROUP_FIELD, GROUP_SHIFT, NODE_FIELD, NODE_SHIFT,
};

/// Chassis per cabinet; odd rack columns hold chassis 3-5 of their group.
const CHASSIS_PER_CABINET: u32 = 3;
/// Chassis per group in the linear scheme (two cabinets).
const CHASSIS_PER_GROUP: u32 = 6;
const BLADES_PER_CHASSIS: u32 = 16;
const NICS_PER_BLADE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    PackedBitField,
    LinearHierarchy,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::PackedBitField => f.write_str("packed_bit_field"),
            Scheme::LinearHierarchy => f.write_str("linear_hierarchy"),
        }
    }
}

/// A locality encoding scheme. Implementations are pure and total.
pub trait LocalityEncoding {
    type Output;

    const SCHEME: Scheme;

    fn encode(&self, coord: &RawCoordinate) -> Self::Output;
}

/// One-hot group tag plus parity-adjusted chassis, packed into a single `u32`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedBitField;

/// Dense group/chassis/blade/node IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearHierarchy;

impl LocalityEncoding for PackedBitField {
    type Output = LocalityKey;

    const SCHEME: Scheme = Scheme::PackedBitField;

    fn encode(&self, coord: &RawCoordinate) -> LocalityKey {
        encode_packed(coord)
    }
}

impl LocalityEncoding for LinearHierarchy {
    type Output = LinearLocality;

    const SCHEME: Scheme = Scheme::LinearHierarchy;

    fn encode(&self, coord: &RawCoordinate) -> LinearLocality {
        encode_linear(coord)
    }
}

/// `1 << floor((rack_col + rack_row * 12) / 2)`, empty when the position is past 31.
pub fn group_bit(coord: &RawCoordinate) -> GroupBit {
    let position = coord
        .rack_col
        .wrapping_add(coord.rack_row.wrapping_mul(12))
        / 2;
    GroupBit::from_bits(1u32.checked_shl(position).unwrap_or(0))
}

/// Packs a coordinate into a [`LocalityKey`]. Fields wider than their slot are truncated.
pub fn encode_packed(coord: &RawCoordinate) -> LocalityKey {
    let group = u32::from(group_bit(coord).bits());
    let chassis = coord
        .chassis
        .wrapping_add(CHASSIS_PER_CABINET * (coord.rack_col & 0x1));

    LocalityKey(
        ((group & GROUP_FIELD) << GROUP_SHIFT)
            | ((chassis & CHASSIS_FIELD) << CHASSIS_SHIFT)
            | ((coord.blade & BLADE_FIELD) << BLADE_SHIFT)
            | ((coord.nic & NODE_FIELD) << NODE_SHIFT),
    )
}

/// Dense IDs: `group = rack_row / 2 + rack_col * 6`, `chassis = (rack_row % 2) * 3 + chassis`,
/// then globally unique chassis/blade/node numbers derived from them.
pub fn encode_linear(coord: &RawCoordinate) -> LinearLocality {
    let group = (coord.rack_row / 2).wrapping_add(coord.rack_col.wrapping_mul(CHASSIS_PER_GROUP));
    let chassis = (coord.rack_row % 2)
        .wrapping_mul(CHASSIS_PER_CABINET)
        .wrapping_add(coord.chassis);

    let uniq_chassis = group.wrapping_mul(CHASSIS_PER_GROUP).wrapping_add(chassis);
    let uniq_blade = uniq_chassis
        .wrapping_mul(BLADES_PER_CHASSIS)
        .wrapping_add(coord.blade);
    let uniq_node = uniq_blade.wrapping_mul(NICS_PER_BLADE).wrapping_add(coord.nic);

    LinearLocality {
        group,
        chassis,
        blade: coord.blade,
        nic: coord.nic,
        uniq_chassis,
        uniq_blade,
        uniq_node,
    }
}
