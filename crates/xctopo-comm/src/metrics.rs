use xctopo_observe::metrics::{Counter, DurationAgg, ScopedTimer};

use crate::frame::OpCode;
use crate::Rank;

/// Per-rank accounting of collective calls and the time spent blocked in them.
#[derive(Debug, Default)]
pub struct CollectiveMetrics {
    pub gather_total: Counter,
    pub broadcast_total: Counter,
    pub reduce_total: Counter,
    pub payload_bytes_total: Counter,
    pub blocked: DurationAgg,
}

impl CollectiveMetrics {
    /// Counts one call of `op`; the returned timer charges the blocked time when dropped.
    pub fn begin(&self, op: OpCode, payload_len: usize) -> ScopedTimer<'_> {
        match op {
            OpCode::Gather => self.gather_total.inc(),
            OpCode::Broadcast => self.broadcast_total.inc(),
            OpCode::Reduce => self.reduce_total.inc(),
            OpCode::Hello => {}
        }
        self.payload_bytes_total.inc_by(payload_len as u64);
        ScopedTimer::new(&self.blocked)
    }

    pub fn emit(&self, rank: Rank, world_size: usize) {
        let blocked = self.blocked.snapshot();
        tracing::info!(
            target: "xctopo_metrics",
            rank,
            world_size,
            gather_total = self.gather_total.get(),
            broadcast_total = self.broadcast_total.get(),
            reduce_total = self.reduce_total.get(),
            payload_bytes_total = self.payload_bytes_total.get(),
            blocked_total_ns = blocked.total_ns,
            blocked_max_ns = blocked.max_ns,
            blocked_avg_ns = blocked.avg_ns(),
            "metrics"
        );
    }
}
