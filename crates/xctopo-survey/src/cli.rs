//! Command-line arguments shared by the xctopo binaries, and the helper that drives a per-rank
//! closure over whichever collective world they select.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use xctopo_comm::local::run_local;
use xctopo_comm::tcp::{self, TcpConfig};
use xctopo_comm::{BlockingCollective, Rank};
use xctopo_core::cname::DEFAULT_CNAME_PATH;
use xctopo_core::hwinfo::{CLUSTER_MODE_FLAG, DEFAULT_HWINFO_PATH, MEMORY_MODE_FLAG};

use crate::probe::{FlagNames, ProbeSources, SetupError};

#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Canonical name record of this node.
    #[arg(long, env = "XCTOPO_CNAME_PATH", default_value = DEFAULT_CNAME_PATH)]
    pub cname_path: PathBuf,

    /// System description blob holding the per-node configuration flags.
    #[arg(long, env = "XCTOPO_HWINFO_PATH", default_value = DEFAULT_HWINFO_PATH)]
    pub hwinfo_path: PathBuf,

    #[arg(long, env = "XCTOPO_CLUSTER_FLAG", default_value = CLUSTER_MODE_FLAG)]
    pub cluster_flag: String,

    #[arg(long, env = "XCTOPO_MEMORY_FLAG", default_value = MEMORY_MODE_FLAG)]
    pub memory_flag: String,
}

impl InputArgs {
    pub fn sources(&self) -> ProbeSources {
        ProbeSources {
            cname_path: self.cname_path.clone(),
            hwinfo_path: self.hwinfo_path.clone(),
        }
    }

    pub fn flag_names(&self) -> FlagNames {
        FlagNames {
            cluster: self.cluster_flag.clone(),
            memory: self.memory_flag.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, env = "XCTOPO_RANK", default_value_t = 0)]
    pub rank: Rank,

    #[arg(long, env = "XCTOPO_WORLD_SIZE", default_value_t = 1)]
    pub world_size: usize,

    /// Address rank 0 listens on and every other rank connects to.
    #[arg(long, env = "XCTOPO_COORD_ADDR", default_value = "127.0.0.1:50061")]
    pub coord_addr: String,

    /// Bound on connection setup. Collectives themselves never time out.
    #[arg(long, env = "XCTOPO_CONNECT_TIMEOUT_MS", default_value_t = 30_000)]
    pub connect_timeout_ms: u64,

    /// Run this many ranks as threads of this process instead of joining a TCP world.
    ///
    /// Every rank reads the same input files.
    #[arg(long, env = "XCTOPO_LOCAL_RANKS")]
    pub local_ranks: Option<usize>,
}

impl RuntimeArgs {
    pub fn tcp_config(&self) -> TcpConfig {
        TcpConfig {
            rank: self.rank,
            size: self.world_size,
            coord_addr: self.coord_addr.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}

/// Runs `per_rank` for every rank this process drives.
///
/// Over TCP that is one rank writing straight to stdout. With `--local-ranks` each rank writes
/// into its own buffer, and the buffers are flushed to stdout in rank order once every rank has
/// finished.
pub fn drive_world<F>(runtime: &RuntimeArgs, per_rank: F) -> Result<()>
where
    F: Fn(&mut dyn BlockingCollective, &mut dyn Write) -> Result<()> + Sync,
{
    let mut stdout = std::io::stdout().lock();

    let Some(ranks) = runtime.local_ranks else {
        let config = runtime.tcp_config();
        let mut comm = tcp::connect(&config)
            .map_err(SetupError::Runtime)
            .with_context(|| format!("joining world as rank {} of {}", config.rank, config.size))?;
        info!(rank = config.rank, world_size = config.size, "collective runtime ready");
        per_rank(&mut comm, &mut stdout)?;
        comm.metrics().emit(comm.rank(), comm.size());
        return Ok(());
    };

    anyhow::ensure!(ranks > 0, "--local-ranks must be at least 1");
    info!(world_size = ranks, "running in-process world");
    let outputs = run_local(ranks, |mut comm| {
        let mut buf = Vec::new();
        let result = per_rank(&mut comm, &mut buf);
        comm.metrics().emit(comm.rank(), comm.size());
        (buf, result)
    });

    let mut first_error = None;
    for (rank, (buf, result)) in outputs.into_iter().enumerate() {
        stdout.write_all(&buf)?;
        if let Err(err) = result {
            first_error.get_or_insert(err.context(format!("rank {rank}")));
        }
    }
    stdout.flush()?;
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
