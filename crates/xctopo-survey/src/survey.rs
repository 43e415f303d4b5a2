use serde::Serialize;
use tracing::{debug, info};

use xctopo_comm::{BlockingCollective, Rank};
use xctopo_core::types::{ConfigFlag, LocalityKey, Tier, TopologySpan};
use xctopo_wire::{ToWire, TryToCore};

use crate::consensus::{check_agreement, Agreement};
use crate::probe::LocalProbe;
use crate::SurveyError;

/// Result of one flag's agreement round, as seen by this rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagCheck {
    pub name: String,
    pub local: ConfigFlag,
    pub agreement: Agreement,
}

/// What the coordinator reports after a survey round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurveySummary {
    pub world_size: usize,
    pub cluster_mode: ConfigFlag,
    pub cluster_mode_agreed: bool,
    pub memory_mode: ConfigFlag,
    pub memory_mode_agreed: bool,
    pub span: TopologySpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyOutcome {
    pub rank: Rank,
    pub key: LocalityKey,
    pub cluster: FlagCheck,
    pub memory: FlagCheck,
    /// Present on the coordinator only.
    pub summary: Option<SurveySummary>,
}

/// Runs the full survey round for this rank.
///
/// Collectives, in order: gather (keys), then one agreement round for the cluster-mode flag and
/// one for the memory-mode flag. The coordinator then counts the distinct units the gathered keys
/// span.
pub fn run_survey<C>(comm: &mut C, probe: &LocalProbe) -> Result<SurveyOutcome, SurveyError>
where
    C: BlockingCollective + ?Sized,
{
    let rank = comm.rank();
    let world_size = comm.size();

    let gathered = comm.gather(&probe.key.to_wire())?;
    let keys = gathered
        .map(|gathered| {
            gathered
                .iter()
                .map(|(_, bytes)| bytes.try_to_core())
                .collect::<Result<Vec<LocalityKey>, _>>()
        })
        .transpose()?;
    debug!(rank, gathered = keys.as_ref().map(Vec::len), "locality keys gathered");

    let cluster = FlagCheck {
        name: probe.flags.cluster.clone(),
        local: probe.cluster_mode.clone(),
        agreement: check_agreement(comm, &probe.flags.cluster, &probe.cluster_mode)?,
    };
    let memory = FlagCheck {
        name: probe.flags.memory.clone(),
        local: probe.memory_mode.clone(),
        agreement: check_agreement(comm, &probe.flags.memory, &probe.memory_mode)?,
    };

    let summary = keys.map(|keys| {
        let span = TopologySpan::from_keys(&keys);
        for tier in Tier::ALL {
            info!(rank, world_size, tier = %tier, count = span.get(tier), "distinct units");
        }
        SurveySummary {
            world_size,
            cluster_mode: probe.cluster_mode.clone(),
            cluster_mode_agreed: cluster.agreement.is_agree(),
            memory_mode: probe.memory_mode.clone(),
            memory_mode_agreed: memory.agreement.is_agree(),
            span,
        }
    });

    Ok(SurveyOutcome {
        rank,
        key: probe.key,
        cluster,
        memory,
        summary,
    })
}
