use crate::types::{LocalityKey, Tier, TopologySpan};

/// Number of distinct `key & tier.mask()` values in `keys`.
///
/// Projects, sorts, then counts the positions where the value changes. Independent of input
/// order; an empty slice counts 0.
pub fn count_distinct(keys: &[LocalityKey], tier: Tier) -> usize {
    let mask = tier.mask();
    let mut projected: Vec<u32> = keys.iter().map(|key| key.raw() & mask).collect();
    projected.sort_unstable();

    let mut count = 0;
    let mut last = None;
    for value in projected {
        if last != Some(value) {
            count += 1;
            last = Some(value);
        }
    }
    count
}

impl TopologySpan {
    pub fn from_keys(keys: &[LocalityKey]) -> Self {
        TopologySpan {
            groups: count_distinct(keys, Tier::Group),
            chassis: count_distinct(keys, Tier::Chassis),
            blades: count_distinct(keys, Tier::Blade),
            nodes: count_distinct(keys, Tier::Node),
        }
    }

    pub fn get(&self, tier: Tier) -> usize {
        match tier {
            Tier::Group => self.groups,
            Tier::Chassis => self.chassis,
            Tier::Blade => self.blades,
            Tier::Node => self.nodes,
        }
    }
}
