//! Multi-process world over TCP.
//!
//! The coordinator listens on a known address; each peer connects, announces its rank and the
//! world size, and then exchanges frames with the coordinator only. I/O runs on a private
//! current-thread tokio runtime and every call blocks on it.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::frame::{read_frame, write_frame, Frame};
use crate::star::{Star, Transport};
use crate::{CollectiveError, Rank, ROOT};

const CONNECT_RETRY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct TcpConfig {
    pub rank: Rank,
    pub size: usize,
    /// Address the coordinator listens on and peers connect to.
    pub coord_addr: String,
    /// Bound on connection setup only; collectives never time out.
    pub connect_timeout: Duration,
}

#[derive(Debug)]
pub struct TcpTransport {
    runtime: Runtime,
    links: Vec<Option<TcpStream>>,
}

pub type TcpComm = Star<TcpTransport>;

fn runtime() -> Result<Runtime, CollectiveError> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn eof_as_disconnect(err: CollectiveError, rank: Rank) -> CollectiveError {
    match err {
        CollectiveError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            CollectiveError::Disconnected { rank }
        }
        other => other,
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, to: Rank, frame: Frame) -> Result<(), CollectiveError> {
        let stream = self
            .links
            .get_mut(to)
            .and_then(Option::as_mut)
            .ok_or(CollectiveError::NoLink { rank: to })?;
        self.runtime
            .block_on(write_frame(stream, &frame))
            .map_err(|err| eof_as_disconnect(err, to))
    }

    fn recv(&mut self, from: Rank) -> Result<Frame, CollectiveError> {
        let stream = self
            .links
            .get_mut(from)
            .and_then(Option::as_mut)
            .ok_or(CollectiveError::NoLink { rank: from })?;
        self.runtime
            .block_on(read_frame(stream))
            .map_err(|err| eof_as_disconnect(err, from))
    }
}

/// Coordinator side of connection setup, split so the bound address can be read before peers
/// are accepted (useful when binding port 0).
pub struct Rendezvous {
    runtime: Runtime,
    listener: TcpListener,
    size: usize,
    timeout: Duration,
}

impl Rendezvous {
    pub fn bind(addr: &str, size: usize, timeout: Duration) -> Result<Self, CollectiveError> {
        let runtime = runtime()?;
        let listener = runtime.block_on(TcpListener::bind(addr))?;
        Ok(Self {
            runtime,
            listener,
            size,
            timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, CollectiveError> {
        Ok(self.listener.local_addr()?)
    }

    /// Waits for all `size - 1` peers to connect and introduce themselves.
    pub fn accept(self) -> Result<TcpComm, CollectiveError> {
        let Rendezvous {
            runtime,
            listener,
            size,
            timeout,
        } = self;

        let links = runtime.block_on(accept_peers(&listener, size, timeout))?;
        info!(rank = ROOT, world_size = size, "all peers connected");
        Star::new(ROOT, size, TcpTransport { runtime, links })
    }
}

async fn accept_peers(
    listener: &TcpListener,
    size: usize,
    timeout: Duration,
) -> Result<Vec<Option<TcpStream>>, CollectiveError> {
    let mut links: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();
    let deadline = Instant::now() + timeout;
    let mut missing = size.saturating_sub(1);

    while missing > 0 {
        let accepted = tokio::time::timeout_at(deadline, async {
            let (mut stream, addr) = listener.accept().await?;
            let hello = read_frame(&mut stream).await?;
            Ok::<_, CollectiveError>((stream, addr, hello))
        })
        .await
        .map_err(|_| CollectiveError::Timeout { timeout, missing })??;

        let (stream, addr, hello) = accepted;
        let (rank, peer_size) = hello.parse_hello()?;
        let rank = rank as usize;
        if peer_size as usize != size {
            return Err(CollectiveError::Handshake(format!(
                "peer {addr} (rank {rank}) expects world size {peer_size}, coordinator has {size}"
            )));
        }
        if rank == ROOT || rank >= size {
            return Err(CollectiveError::Handshake(format!(
                "peer {addr} announced invalid rank {rank} for world size {size}"
            )));
        }
        if links[rank].is_some() {
            return Err(CollectiveError::Handshake(format!(
                "rank {rank} connected twice (second from {addr})"
            )));
        }

        stream.set_nodelay(true)?;
        debug!(rank, %addr, "peer connected");
        links[rank] = Some(stream);
        missing -= 1;
    }

    Ok(links)
}

/// Peer side of connection setup: retries until the coordinator accepts or `timeout` expires.
pub fn join(
    addr: &str,
    rank: Rank,
    size: usize,
    timeout: Duration,
) -> Result<TcpComm, CollectiveError> {
    if rank == ROOT || rank >= size {
        return Err(CollectiveError::InvalidWorld { rank, size });
    }
    let runtime = runtime()?;
    let stream = runtime.block_on(async {
        let deadline = Instant::now() + timeout;
        let mut stream = loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => break stream,
                Err(err) if Instant::now() + CONNECT_RETRY < deadline => {
                    debug!(rank, addr, error = %err, "coordinator not reachable yet");
                    tokio::time::sleep(CONNECT_RETRY).await;
                }
                Err(_) => return Err(CollectiveError::Timeout { timeout, missing: 1 }),
            }
        };
        stream.set_nodelay(true)?;
        write_frame(&mut stream, &Frame::hello(rank as u32, size as u32)).await?;
        Ok::<_, CollectiveError>(stream)
    })?;

    let mut links: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();
    links[ROOT] = Some(stream);
    debug!(rank, world_size = size, addr, "joined coordinator");
    Star::new(rank, size, TcpTransport { runtime, links })
}

/// Sets up this process's rank. A world of one needs no sockets.
pub fn connect(config: &TcpConfig) -> Result<TcpComm, CollectiveError> {
    if config.rank >= config.size {
        return Err(CollectiveError::InvalidWorld {
            rank: config.rank,
            size: config.size,
        });
    }
    if config.size == 1 {
        let links = vec![None];
        return Star::new(
            ROOT,
            1,
            TcpTransport {
                runtime: runtime()?,
                links,
            },
        );
    }
    if config.rank == ROOT {
        Rendezvous::bind(&config.coord_addr, config.size, config.connect_timeout)?.accept()
    } else {
        join(
            &config.coord_addr,
            config.rank,
            config.size,
            config.connect_timeout,
        )
    }
}
