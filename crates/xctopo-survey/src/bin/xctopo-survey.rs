#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, info_span};

use xctopo_survey::cli::{drive_world, InputArgs, RuntimeArgs};
use xctopo_survey::probe::LocalProbe;
use xctopo_survey::report::{write_flag_check, write_summary, RankLine};
use xctopo_survey::survey::run_survey;

#[derive(Debug, Parser)]
#[command(name = "xctopo-survey")]
/// Reports where every rank sits in the interconnect, checks that the node configuration flags
/// agree, and counts the groups, chassis and blades the job spans.
struct Args {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    runtime: RuntimeArgs,

    /// Print the coordinator summary as JSON.
    #[arg(long, env = "XCTOPO_JSON", default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    xctopo_observe::logging::init_tracing();
    let args = Args::parse();

    // Everything that can fail locally happens before the first collective.
    let probe = LocalProbe::load(&args.input.sources(), args.input.flag_names())
        .context("probing local node")?;
    info!(cname = %probe.coordinate, key = format_args!("{:#x}", probe.key), "local probe");

    let cluster_flag = args.input.cluster_flag.as_str();
    let memory_flag = args.input.memory_flag.as_str();
    drive_world(&args.runtime, |comm, out| {
        let rank = comm.rank();
        let _span = info_span!("survey", rank, world_size = comm.size()).entered();

        writeln!(out, "{}", RankLine { rank, key: probe.key })?;
        let outcome = run_survey(comm, &probe).context("survey round")?;

        write_flag_check(out, &outcome.cluster, cluster_flag, memory_flag)?;
        write_flag_check(out, &outcome.memory, cluster_flag, memory_flag)?;
        if let Some(summary) = &outcome.summary {
            write_summary(out, summary, args.json)?;
        }
        Ok(())
    })
}
