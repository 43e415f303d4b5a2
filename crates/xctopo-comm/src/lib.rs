#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

//! Blocking collectives over a star of ranks.
//!
//! Rank 0 is the coordinator. Every collective must be called by every rank, in the same order,
//! with payloads of the same length; a rank that never arrives blocks the others forever. There
//! are no timeouts on collectives.

pub mod frame;
pub mod local;
pub mod metrics;
pub mod star;
pub mod tcp;

use std::time::Duration;

use thiserror::Error;

pub use crate::frame::OpCode;
pub use crate::metrics::CollectiveMetrics;

pub type Rank = usize;

/// The coordinator rank.
pub const ROOT: Rank = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    BitAnd,
    BitOr,
}

impl ReduceOp {
    /// Folds `other` into `acc` byte by byte. Both slices have the same length.
    pub fn fold(self, acc: &mut [u8], other: &[u8]) {
        for (a, b) in acc.iter_mut().zip(other) {
            match self {
                ReduceOp::BitAnd => *a &= *b,
                ReduceOp::BitOr => *a |= *b,
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CollectiveError {
    #[error("rank {rank} is outside a world of size {size}")]
    InvalidWorld { rank: Rank, size: usize },
    #[error("rank {rank} disconnected")]
    Disconnected { rank: Rank },
    #[error("no link to rank {rank}")]
    NoLink { rank: Rank },
    #[error("rank {rank} sent {actual:?} while {expected:?} was expected")]
    OpMismatch {
        rank: Rank,
        expected: OpCode,
        actual: OpCode,
    },
    #[error("rank {rank} sent {actual} payload bytes, expected {expected}")]
    PayloadLength {
        rank: Rank,
        expected: usize,
        actual: usize,
    },
    #[error("unknown op code {0:#04x}")]
    UnknownOp(u8),
    #[error("frame of {0} bytes exceeds the frame limit")]
    FrameTooLarge(usize),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("timed out after {timeout:?} with {missing} peer(s) missing")]
    Timeout { timeout: Duration, missing: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Payloads gathered at the coordinator, one fixed-size chunk per rank.
///
/// Owned by the coordinator for the duration of one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gathered {
    chunk_len: usize,
    ranks: usize,
    data: Vec<u8>,
}

impl Gathered {
    pub(crate) fn with_capacity(chunk_len: usize, ranks: usize) -> Self {
        Self {
            chunk_len,
            ranks: 0,
            data: Vec::with_capacity(chunk_len.saturating_mul(ranks)),
        }
    }

    pub(crate) fn push(&mut self, chunk: &[u8]) {
        debug_assert_eq!(chunk.len(), self.chunk_len);
        self.data.extend_from_slice(chunk);
        self.ranks += 1;
    }

    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    pub fn len(&self) -> usize {
        self.ranks
    }

    pub fn is_empty(&self) -> bool {
        self.ranks == 0
    }

    pub fn get(&self, rank: Rank) -> Option<&[u8]> {
        if rank >= self.ranks {
            return None;
        }
        let start = rank * self.chunk_len;
        self.data.get(start..start + self.chunk_len)
    }

    /// `(rank, payload)` in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (Rank, &[u8])> + '_ {
        (0..self.ranks).filter_map(move |rank| self.get(rank).map(|chunk| (rank, chunk)))
    }
}

/// Synchronous collective primitives.
///
/// Each call blocks the calling rank until the collective has completed from its point of view.
/// Callers must finish every local check that can fail before entering the first collective, so
/// that no rank bails out while the others wait.
pub trait BlockingCollective {
    fn rank(&self) -> Rank;

    fn size(&self) -> usize;

    fn is_root(&self) -> bool {
        self.rank() == ROOT
    }

    /// Every rank contributes `send`; the coordinator receives all payloads in rank order,
    /// everyone else receives `None`.
    fn gather(&mut self, send: &[u8]) -> Result<Option<Gathered>, CollectiveError>;

    /// Copies the coordinator's `buf` into `buf` on every other rank.
    fn broadcast(&mut self, buf: &mut [u8]) -> Result<(), CollectiveError>;

    /// Combines every rank's `send` with `op`; the result lands at the coordinator only.
    fn reduce(&mut self, send: &[u8], op: ReduceOp) -> Result<Option<Vec<u8>>, CollectiveError>;

    fn metrics(&self) -> &CollectiveMetrics;
}
