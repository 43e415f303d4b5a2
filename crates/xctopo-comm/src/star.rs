//! Collectives over a star: every peer talks only to the coordinator.

use tracing::trace;

use crate::frame::{Frame, OpCode};
use crate::{
    BlockingCollective, CollectiveError, CollectiveMetrics, Gathered, Rank, ReduceOp, ROOT,
};

/// Point-to-point link between the coordinator and its peers.
///
/// Frames between one pair of ranks arrive in the order they were sent.
pub trait Transport {
    fn send(&mut self, to: Rank, frame: Frame) -> Result<(), CollectiveError>;

    fn recv(&mut self, from: Rank) -> Result<Frame, CollectiveError>;
}

/// A [`BlockingCollective`] built from a [`Transport`].
#[derive(Debug)]
pub struct Star<T> {
    rank: Rank,
    size: usize,
    transport: T,
    metrics: CollectiveMetrics,
}

impl<T: Transport> Star<T> {
    pub fn new(rank: Rank, size: usize, transport: T) -> Result<Self, CollectiveError> {
        if rank >= size {
            return Err(CollectiveError::InvalidWorld { rank, size });
        }
        Ok(Self::from_parts(rank, size, transport))
    }

    pub(crate) fn from_parts(rank: Rank, size: usize, transport: T) -> Self {
        Self {
            rank,
            size,
            transport,
            metrics: CollectiveMetrics::default(),
        }
    }
}

fn recv_expect<T: Transport>(
    transport: &mut T,
    from: Rank,
    op: OpCode,
    len: usize,
) -> Result<Vec<u8>, CollectiveError> {
    let frame = transport.recv(from)?;
    if frame.op != op {
        return Err(CollectiveError::OpMismatch {
            rank: from,
            expected: op,
            actual: frame.op,
        });
    }
    if frame.payload.len() != len {
        return Err(CollectiveError::PayloadLength {
            rank: from,
            expected: len,
            actual: frame.payload.len(),
        });
    }
    Ok(frame.payload)
}

impl<T: Transport> BlockingCollective for Star<T> {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn gather(&mut self, send: &[u8]) -> Result<Option<Gathered>, CollectiveError> {
        let _timer = self.metrics.begin(OpCode::Gather, send.len());
        trace!(rank = self.rank, len = send.len(), "gather");

        if self.rank != ROOT {
            self.transport
                .send(ROOT, Frame::new(OpCode::Gather, send))?;
            return Ok(None);
        }

        let mut gathered = Gathered::with_capacity(send.len(), self.size);
        gathered.push(send);
        for peer in 1..self.size {
            let payload = recv_expect(&mut self.transport, peer, OpCode::Gather, send.len())?;
            gathered.push(&payload);
        }
        Ok(Some(gathered))
    }

    fn broadcast(&mut self, buf: &mut [u8]) -> Result<(), CollectiveError> {
        let _timer = self.metrics.begin(OpCode::Broadcast, buf.len());
        trace!(rank = self.rank, len = buf.len(), "broadcast");

        if self.rank == ROOT {
            for peer in 1..self.size {
                self.transport
                    .send(peer, Frame::new(OpCode::Broadcast, &*buf))?;
            }
            return Ok(());
        }

        let payload = recv_expect(&mut self.transport, ROOT, OpCode::Broadcast, buf.len())?;
        buf.copy_from_slice(&payload);
        Ok(())
    }

    fn reduce(&mut self, send: &[u8], op: ReduceOp) -> Result<Option<Vec<u8>>, CollectiveError> {
        let _timer = self.metrics.begin(OpCode::Reduce, send.len());
        trace!(rank = self.rank, len = send.len(), ?op, "reduce");

        if self.rank != ROOT {
            self.transport
                .send(ROOT, Frame::new(OpCode::Reduce, send))?;
            return Ok(None);
        }

        let mut acc = send.to_vec();
        for peer in 1..self.size {
            let payload = recv_expect(&mut self.transport, peer, OpCode::Reduce, send.len())?;
            op.fold(&mut acc, &payload);
        }
        Ok(Some(acc))
    }

    fn metrics(&self) -> &CollectiveMetrics {
        &self.metrics
    }
}
