#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info_span;

use xctopo_core::cname::{parse_cname, DEFAULT_CNAME_PATH};
use xctopo_survey::census::run_census;
use xctopo_survey::cli::{drive_world, RuntimeArgs};
use xctopo_survey::probe::{read_cname_text, SetupError};
use xctopo_survey::report::{write_census, write_record_echo};

#[derive(Debug, Parser)]
#[command(name = "xctopo-groups")]
/// Echoes every rank's canonical name and reports the set of interconnect groups the job covers.
struct Args {
    #[arg(long, env = "XCTOPO_CNAME_PATH", default_value = DEFAULT_CNAME_PATH)]
    cname_path: PathBuf,

    #[command(flatten)]
    runtime: RuntimeArgs,
}

fn main() -> Result<()> {
    xctopo_observe::logging::init_tracing();
    let args = Args::parse();

    let record = read_cname_text(&args.cname_path)?;
    let coordinate = parse_cname(&record)
        .map_err(|source| SetupError::Parse {
            path: args.cname_path.clone(),
            source,
        })
        .context("probing local node")?;

    drive_world(&args.runtime, |comm, out| {
        let rank = comm.rank();
        let _span = info_span!("census", rank, world_size = comm.size()).entered();

        write_record_echo(out, rank, &args.cname_path, &record)?;
        let outcome = run_census(comm, &coordinate).context("group census")?;
        if let Some(groups) = &outcome.groups {
            write_census(out, groups)?;
        }
        Ok(())
    })
}
