use std::time::Duration;

use xctopo_comm::tcp::{connect, join, Rendezvous, TcpConfig};
use xctopo_comm::{BlockingCollective, CollectiveError, ReduceOp, ROOT};

const TIMEOUT: Duration = Duration::from_secs(10);

#[test]
fn loopback_world_runs_collectives() -> anyhow::Result<()> {
    let size = 3;
    let rendezvous = Rendezvous::bind("127.0.0.1:0", size, TIMEOUT)?;
    let addr = rendezvous.local_addr()?.to_string();

    let peers: Vec<_> = (1..size)
        .map(|rank| {
            let addr = addr.clone();
            std::thread::spawn(move || -> Result<_, CollectiveError> {
                let mut comm = join(&addr, rank, size, TIMEOUT)?;
                let gathered = comm.gather(&[rank as u8; 2])?;
                let reduced = comm.reduce(&[1 << rank], ReduceOp::BitOr)?;
                let mut buf = [0u8; 3];
                comm.broadcast(&mut buf)?;
                Ok((gathered.is_none(), reduced.is_none(), buf))
            })
        })
        .collect();

    let mut root = rendezvous.accept()?;
    assert_eq!(root.rank(), ROOT);
    let gathered = root.gather(&[0u8; 2])?.expect("root receives the gather");
    let reduced = root.reduce(&[1], ReduceOp::BitOr)?;
    let mut buf = *b"abc";
    root.broadcast(&mut buf)?;

    let chunks: Vec<Vec<u8>> = gathered.iter().map(|(_, c)| c.to_vec()).collect();
    assert_eq!(chunks, vec![vec![0, 0], vec![1, 1], vec![2, 2]]);
    assert_eq!(reduced, Some(vec![0b111]));

    for peer in peers {
        let (no_gather, no_reduce, buf) = peer.join().expect("peer thread")?;
        assert!(no_gather);
        assert!(no_reduce);
        assert_eq!(&buf, b"abc");
    }
    Ok(())
}

#[test]
fn single_rank_world_needs_no_socket() -> anyhow::Result<()> {
    let mut comm = connect(&TcpConfig {
        rank: 0,
        size: 1,
        // Never bound when the world has one rank.
        coord_addr: "256.0.0.1:1".to_string(),
        connect_timeout: TIMEOUT,
    })?;
    let gathered = comm.gather(b"k")?.expect("root receives the gather");
    assert_eq!(gathered.len(), 1);
    Ok(())
}

#[test]
fn rank_outside_world_is_rejected() {
    let err = connect(&TcpConfig {
        rank: 4,
        size: 4,
        coord_addr: "127.0.0.1:0".to_string(),
        connect_timeout: TIMEOUT,
    })
    .unwrap_err();
    assert!(matches!(
        err,
        CollectiveError::InvalidWorld { rank: 4, size: 4 }
    ));
}

#[test]
fn world_size_disagreement_fails_handshake() -> anyhow::Result<()> {
    let rendezvous = Rendezvous::bind("127.0.0.1:0", 2, TIMEOUT)?;
    let addr = rendezvous.local_addr()?.to_string();

    let peer = std::thread::spawn(move || join(&addr, 1, 3, TIMEOUT).map(|_| ()));
    let err = rendezvous.accept().unwrap_err();
    assert!(matches!(err, CollectiveError::Handshake(_)));
    let _ = peer.join();
    Ok(())
}

#[test]
fn missing_peers_time_out_during_setup() -> anyhow::Result<()> {
    let rendezvous = Rendezvous::bind("127.0.0.1:0", 2, Duration::from_millis(50))?;
    let err = rendezvous.accept().unwrap_err();
    assert!(matches!(err, CollectiveError::Timeout { missing: 1, .. }));
    Ok(())
}

#[test]
fn peer_drop_surfaces_as_disconnect() -> anyhow::Result<()> {
    let rendezvous = Rendezvous::bind("127.0.0.1:0", 2, TIMEOUT)?;
    let addr = rendezvous.local_addr()?.to_string();

    let peer = std::thread::spawn(move || join(&addr, 1, 2, TIMEOUT).map(drop));
    let mut root = rendezvous.accept()?;
    peer.join().expect("peer thread")?;

    let err = root.gather(&[0]).unwrap_err();
    assert!(matches!(err, CollectiveError::Disconnected { rank: 1 }));
    Ok(())
}
