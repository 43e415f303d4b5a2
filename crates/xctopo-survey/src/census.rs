//! Group census over the linear encoding: which interconnect groups does the job touch?

use tracing::{debug, warn};

use xctopo_comm::{BlockingCollective, Rank, ReduceOp};
use xctopo_core::encode::{LinearHierarchy, LocalityEncoding};
use xctopo_core::types::{GroupSet, LinearLocality, RawCoordinate};
use xctopo_wire::{ToWire, TryToCore};

use crate::SurveyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensusOutcome {
    pub rank: Rank,
    pub linear: LinearLocality,
    /// False when this rank's group ID does not fit a [`GroupSet`] and was left out.
    pub counted: bool,
    /// Union of every rank's group, on the coordinator only.
    pub groups: Option<GroupSet>,
}

/// Each rank contributes `1 << group` and a bitwise-OR reduction lands the union at the
/// coordinator. One collective: reduce (OR).
pub fn run_census<C>(comm: &mut C, coordinate: &RawCoordinate) -> Result<CensusOutcome, SurveyError>
where
    C: BlockingCollective + ?Sized,
{
    let rank = comm.rank();
    let linear = LinearHierarchy.encode(coordinate);
    debug!(
        rank,
        group = linear.group,
        chassis = linear.chassis,
        uniq_chassis = linear.uniq_chassis,
        uniq_blade = linear.uniq_blade,
        uniq_node = linear.uniq_node,
        "linear locality"
    );

    let mut local = GroupSet::default();
    let counted = local.insert(linear.group);
    if !counted {
        warn!(
            rank,
            group = linear.group,
            capacity = GroupSet::CAPACITY,
            "group id outside census range, not counted"
        );
    }

    let reduced = comm.reduce(&local.to_wire(), ReduceOp::BitOr)?;
    let groups: Option<GroupSet> = reduced
        .map(|bytes| bytes[..].try_to_core())
        .transpose()?;

    Ok(CensusOutcome {
        rank,
        linear,
        counted,
        groups,
    })
}
