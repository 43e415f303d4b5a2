//! Cluster-wide agreement check for one configuration flag.
//!
//! Two phases: cheap bitwise AND and OR reductions tell the coordinator whether any rank holds a
//! different value, and only on disagreement does every rank pay for a full gather so the
//! coordinator can name each rank's value. All payloads are equal exactly when their AND and their
//! OR both equal the coordinator's own payload, so an empty value on the coordinator cannot mask a
//! peer's non-empty one.

use serde::Serialize;
use tracing::{debug, warn};

use xctopo_comm::{BlockingCollective, Rank, ReduceOp};
use xctopo_core::types::{ConfigFlag, Verdict};
use xctopo_wire::{FlagPayload, ToCore, ToWire, TryToCore, VERDICT_WIDTH};

use crate::SurveyError;

/// One rank's value as seen by the coordinator after a disagreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankValue {
    pub rank: Rank,
    pub value: ConfigFlag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Agreement {
    Agree,
    /// `reports` holds every rank's value at the coordinator and is `None` elsewhere.
    Disagree { reports: Option<Vec<RankValue>> },
}

impl Agreement {
    pub fn verdict(&self) -> Verdict {
        match self {
            Agreement::Agree => Verdict::Agree,
            Agreement::Disagree { .. } => Verdict::Disagree,
        }
    }

    pub fn is_agree(&self) -> bool {
        self.verdict().is_agree()
    }

    pub fn reports(&self) -> Option<&[RankValue]> {
        match self {
            Agreement::Disagree {
                reports: Some(reports),
            } => Some(reports),
            _ => None,
        }
    }
}

/// Runs one agreement round for `local`. Every rank must call this with the same `name`, in the
/// same order relative to other collectives.
///
/// Collectives: reduce (AND), reduce (OR), broadcast (verdict), then gather on disagreement only.
pub fn check_agreement<C>(
    comm: &mut C,
    name: &str,
    local: &ConfigFlag,
) -> Result<Agreement, SurveyError>
where
    C: BlockingCollective + ?Sized,
{
    let payload: FlagPayload = local.to_wire();

    let all_set = comm.reduce(payload.as_bytes(), ReduceOp::BitAnd)?;
    let any_set = comm.reduce(payload.as_bytes(), ReduceOp::BitOr)?;
    let mut verdict = [0u8; VERDICT_WIDTH];
    if let (Some(all_set), Some(any_set)) = (all_set, any_set) {
        let all_set = FlagPayload::from_slice(&all_set)?;
        let any_set = FlagPayload::from_slice(&any_set)?;
        let agree = all_set == payload && any_set == payload;
        if !agree {
            warn!(
                flag = name,
                local = %local,
                and_reduced = %all_set.to_core(),
                or_reduced = %any_set.to_core(),
                "flag differs across ranks"
            );
        }
        verdict = Verdict::from_agreement(agree).to_wire();
    }

    comm.broadcast(&mut verdict)?;
    let verdict: Verdict = verdict[..].try_to_core()?;
    debug!(rank = comm.rank(), flag = name, ?verdict, "agreement verdict");
    if verdict.is_agree() {
        return Ok(Agreement::Agree);
    }

    let gathered = comm.gather(payload.as_bytes())?;
    let reports = gathered
        .map(|gathered| {
            gathered
                .iter()
                .map(|(rank, bytes)| {
                    FlagPayload::from_slice(bytes).map(|payload| RankValue {
                        rank,
                        value: payload.to_core(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    Ok(Agreement::Disagree { reports })
}
