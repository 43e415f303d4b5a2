//! Console lines printed by the survey binaries.

use std::fmt;
use std::io::{self, Write};

use xctopo_comm::Rank;
use xctopo_core::types::{GroupSet, LocalityKey, Tier};

use crate::consensus::RankValue;
use crate::survey::{FlagCheck, SurveySummary};

/// `rank:<r> netloc:<key> netloc:0x<key masked to the blade tier>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankLine {
    pub rank: Rank,
    pub key: LocalityKey,
}

impl fmt::Display for RankLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rank:{} netloc:{:x} netloc:{:#x}",
            self.rank,
            self.key,
            self.key.masked(Tier::Blade)
        )
    }
}

/// Header printed by the coordinator when a flag differs across ranks.
pub fn mismatch_header(flag: &str, cluster_flag: &str, memory_flag: &str) -> String {
    if flag == cluster_flag {
        "Cluster Mode mismatch!".to_string()
    } else if flag == memory_flag {
        "Memory Mode mismatch!".to_string()
    } else {
        format!("{flag} mismatch!")
    }
}

pub fn write_rank_values<W: Write + ?Sized>(
    out: &mut W,
    values: &[RankValue],
) -> io::Result<()> {
    for RankValue { rank, value } in values {
        writeln!(out, "\t{rank:04}\t{value}")?;
    }
    Ok(())
}

/// Writes the mismatch block for `check` if this rank holds the per-rank report.
pub fn write_flag_check<W: Write + ?Sized>(
    out: &mut W,
    check: &FlagCheck,
    cluster_flag: &str,
    memory_flag: &str,
) -> io::Result<()> {
    if let Some(values) = check.agreement.reports() {
        writeln!(out, "{}", mismatch_header(&check.name, cluster_flag, memory_flag))?;
        write_rank_values(out, values)?;
    }
    Ok(())
}

impl fmt::Display for SurveySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cluster_mode {}\tmemory_mode {}\tgroups {}\tchassis {}\tblades {}",
            self.cluster_mode,
            self.memory_mode,
            self.span.groups,
            self.span.chassis,
            self.span.blades
        )
    }
}

pub fn write_summary<W: Write + ?Sized>(
    out: &mut W,
    summary: &SurveySummary,
    json: bool,
) -> io::Result<()> {
    if json {
        serde_json::to_writer(&mut *out, summary)?;
        writeln!(out)
    } else {
        writeln!(out, "{summary}")
    }
}

/// `<rank>: <path> = <record>`, the raw canonical name as read.
pub fn write_record_echo<W: Write + ?Sized>(
    out: &mut W,
    rank: Rank,
    path: &std::path::Path,
    record: &str,
) -> io::Result<()> {
    writeln!(out, "{rank}: {} = {}", path.display(), record.trim())
}

pub fn write_census<W: Write + ?Sized>(out: &mut W, groups: &GroupSet) -> io::Result<()> {
    writeln!(out, "results = {}", groups.0)?;
    let list: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
    writeln!(out, "groups {}", list.join(","))
}
