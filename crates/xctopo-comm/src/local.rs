//! In-process world: one thread per rank, channels for links.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::frame::Frame;
use crate::star::{Star, Transport};
use crate::{CollectiveError, Rank, ROOT};

#[derive(Debug)]
pub struct LocalTransport {
    outbox: Vec<Option<UnboundedSender<Frame>>>,
    inbox: Vec<Option<UnboundedReceiver<Frame>>>,
}

impl Transport for LocalTransport {
    fn send(&mut self, to: Rank, frame: Frame) -> Result<(), CollectiveError> {
        let link = self
            .outbox
            .get(to)
            .and_then(Option::as_ref)
            .ok_or(CollectiveError::NoLink { rank: to })?;
        link.send(frame)
            .map_err(|_| CollectiveError::Disconnected { rank: to })
    }

    fn recv(&mut self, from: Rank) -> Result<Frame, CollectiveError> {
        let link = self
            .inbox
            .get_mut(from)
            .and_then(Option::as_mut)
            .ok_or(CollectiveError::NoLink { rank: from })?;
        link.blocking_recv()
            .ok_or(CollectiveError::Disconnected { rank: from })
    }
}

pub type LocalComm = Star<LocalTransport>;

/// Builds `size` connected ranks, indexed by rank.
///
/// Each handle must be driven from its own thread; `blocking_recv` must not run inside an
/// async runtime.
pub fn local_world(size: usize) -> Vec<LocalComm> {
    let mut transports: Vec<LocalTransport> = (0..size)
        .map(|_| LocalTransport {
            outbox: (0..size).map(|_| None).collect(),
            inbox: (0..size).map(|_| None).collect(),
        })
        .collect();

    for peer in 1..size {
        let (to_peer, from_root) = unbounded_channel();
        let (to_root, from_peer) = unbounded_channel();
        transports[ROOT].outbox[peer] = Some(to_peer);
        transports[ROOT].inbox[peer] = Some(from_peer);
        transports[peer].outbox[ROOT] = Some(to_root);
        transports[peer].inbox[ROOT] = Some(from_root);
    }

    transports
        .into_iter()
        .enumerate()
        .map(|(rank, transport)| Star::from_parts(rank, size, transport))
        .collect()
}

/// Runs `f` once per rank on its own scoped thread and returns the results in rank order.
///
/// A panicking rank drops its links, so the others fail with `Disconnected` instead of
/// hanging; the panic is then resumed on the caller.
pub fn run_local<R, F>(size: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(LocalComm) -> R + Sync,
{
    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = local_world(size)
            .into_iter()
            .map(|comm| scope.spawn(move || f(comm)))
            .collect();

        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}
