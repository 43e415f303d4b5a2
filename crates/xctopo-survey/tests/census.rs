use anyhow::Result;

use xctopo_comm::local::run_local;
use xctopo_comm::{BlockingCollective, ROOT};
use xctopo_core::types::{GroupSet, RawCoordinate};
use xctopo_survey::census::{run_census, CensusOutcome};
use xctopo_survey::report::write_census;

fn census(cnames: &[&str]) -> Result<Vec<CensusOutcome>> {
    let coords = cnames
        .iter()
        .map(|c| c.parse())
        .collect::<Result<Vec<RawCoordinate>, _>>()?;
    run_local(coords.len(), |mut comm| -> Result<CensusOutcome> {
        let coord = coords[comm.rank()];
        Ok(run_census(&mut comm, &coord)?)
    })
    .into_iter()
    .collect()
}

#[test]
fn coordinator_receives_union_of_groups() -> Result<()> {
    // Linear groups 0, 1, 6 and 0 again.
    let outcomes = census(&["c0-0c0s0n0", "c0-3c1s2n1", "c1-0c0s0n0", "c0-1c2s15n3"])?;

    let groups = outcomes[ROOT]
        .groups
        .ok_or_else(|| anyhow::anyhow!("coordinator produced no census"))?;
    assert_eq!(groups, GroupSet(0b100_0011));
    assert_eq!(groups.iter().collect::<Vec<_>>(), vec![0, 1, 6]);
    assert!(outcomes[1..].iter().all(|o| o.groups.is_none()));
    assert!(outcomes.iter().all(|o| o.counted));

    let mut out = Vec::new();
    write_census(&mut out, &groups)?;
    assert_eq!(String::from_utf8(out)?, "results = 67\ngroups 0,1,6\n");
    Ok(())
}

#[test]
fn out_of_range_group_is_flagged_not_counted() -> Result<()> {
    // c25-0 lands in linear group 150.
    let outcomes = census(&["c0-0c0s0n0", "c25-0c0s0n0"])?;
    assert_eq!(outcomes[1].linear.group, 150);
    assert!(!outcomes[1].counted);
    assert_eq!(outcomes[ROOT].groups, Some(GroupSet(1)));
    Ok(())
}
