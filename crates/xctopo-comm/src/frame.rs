//! Length-prefixed frames: `op: u8 | len: u32 (big endian) | payload`.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::CollectiveError;

/// Upper bound on a single payload; collectives only move small fixed-size records.
pub const MAX_FRAME_LEN: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Hello = 1,
    Gather = 2,
    Broadcast = 3,
    Reduce = 4,
}

impl TryFrom<u8> for OpCode {
    type Error = CollectiveError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OpCode::Hello),
            2 => Ok(OpCode::Gather),
            3 => Ok(OpCode::Broadcast),
            4 => Ok(OpCode::Reduce),
            other => Err(CollectiveError::UnknownOp(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub op: OpCode,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(op: OpCode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            op,
            payload: payload.into(),
        }
    }

    /// Handshake sent by a peer right after connecting.
    pub fn hello(rank: u32, size: u32) -> Self {
        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(&rank.to_be_bytes());
        payload.extend_from_slice(&size.to_be_bytes());
        Self::new(OpCode::Hello, payload)
    }

    /// `(rank, size)` from a hello frame.
    pub fn parse_hello(&self) -> Result<(u32, u32), CollectiveError> {
        if self.op != OpCode::Hello {
            return Err(CollectiveError::Handshake(format!(
                "expected Hello, got {:?}",
                self.op
            )));
        }
        let bytes: [u8; 8] = self.payload.as_slice().try_into().map_err(|_| {
            CollectiveError::Handshake(format!(
                "hello payload must be 8 bytes, got {}",
                self.payload.len()
            ))
        })?;
        let [r0, r1, r2, r3, s0, s1, s2, s3] = bytes;
        Ok((
            u32::from_be_bytes([r0, r1, r2, r3]),
            u32::from_be_bytes([s0, s1, s2, s3]),
        ))
    }
}

pub async fn write_frame<W>(w: &mut W, frame: &Frame) -> Result<(), CollectiveError>
where
    W: AsyncWrite + Unpin,
{
    if frame.payload.len() > MAX_FRAME_LEN {
        return Err(CollectiveError::FrameTooLarge(frame.payload.len()));
    }
    w.write_u8(frame.op as u8).await?;
    w.write_u32(frame.payload.len() as u32).await?;
    w.write_all(&frame.payload).await?;
    w.flush().await?;
    Ok(())
}

pub async fn read_frame<R>(r: &mut R) -> Result<Frame, CollectiveError>
where
    R: AsyncRead + Unpin,
{
    let op = OpCode::try_from(r.read_u8().await?)?;
    let len = r.read_u32().await? as usize;
    if len > MAX_FRAME_LEN {
        return Err(CollectiveError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload).await?;
    Ok(Frame { op, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_survives_duplex() -> anyhow::Result<()> {
        let (mut a, mut b) = tokio::io::duplex(256);
        let sent = Frame::new(OpCode::Gather, vec![1, 2, 3]);
        write_frame(&mut a, &sent).await?;
        let got = read_frame(&mut b).await?;
        assert_eq!(got, sent);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_op_is_rejected() -> anyhow::Result<()> {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&[0x7f, 0, 0, 0, 0]).await?;
        let err = read_frame(&mut b).await.unwrap_err();
        assert!(matches!(err, CollectiveError::UnknownOp(0x7f)));
        Ok(())
    }

    #[tokio::test]
    async fn oversized_length_is_rejected_before_allocating() -> anyhow::Result<()> {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&[OpCode::Reduce as u8]).await?;
        a.write_u32(u32::MAX).await?;
        let err = read_frame(&mut b).await.unwrap_err();
        assert!(matches!(err, CollectiveError::FrameTooLarge(_)));
        Ok(())
    }

    #[test]
    fn hello_roundtrip() {
        let frame = Frame::hello(3, 8);
        assert_eq!(frame.parse_hello().unwrap(), (3, 8));
        let bad = Frame::new(OpCode::Gather, vec![0; 8]);
        assert!(bad.parse_hello().is_err());
    }
}
