#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

//! Fixed-size byte payloads exchanged by collectives.
//!
//! Every rank contributes the same number of bytes to a collective, so each core type has one
//! fixed wire width.

use thiserror::Error;
use xctopo_core::types::{self as core, FLAG_CAPACITY};

pub const KEY_WIDTH: usize = 4;
pub const VERDICT_WIDTH: usize = 1;
pub const GROUP_SET_WIDTH: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("{what} payload must be {expected} bytes, got {actual}")]
    PayloadLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid verdict byte {0:#04x}")]
    InvalidVerdict(u8),
}

fn exact<const N: usize>(what: &'static str, bytes: &[u8]) -> Result<[u8; N], ConvertError> {
    bytes.try_into().map_err(|_| ConvertError::PayloadLength {
        what,
        expected: N,
        actual: bytes.len(),
    })
}

pub trait ToWire<T> {
    fn to_wire(&self) -> T;
}

pub trait ToCore<T> {
    fn to_core(&self) -> T;
}

pub trait TryToCore<T> {
    type Error;
    fn try_to_core(&self) -> Result<T, Self::Error>;
}

/// A flag value, NUL-padded to [`FLAG_CAPACITY`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagPayload(pub [u8; FLAG_CAPACITY]);

impl FlagPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ConvertError> {
        exact("flag", bytes).map(FlagPayload)
    }
}

impl ToWire<FlagPayload> for core::ConfigFlag {
    fn to_wire(&self) -> FlagPayload {
        let mut buf = [0u8; FLAG_CAPACITY];
        let bytes = self.as_str().as_bytes();
        // ConfigFlag guarantees room for the terminating NUL.
        let len = bytes.len().min(FLAG_CAPACITY - 1);
        buf[..len].copy_from_slice(&bytes[..len]);
        FlagPayload(buf)
    }
}

impl ToCore<core::ConfigFlag> for FlagPayload {
    /// Reads up to the first NUL. Bytes that are not UTF-8 (e.g. the result of an AND
    /// reduction over differing values) are replaced rather than rejected.
    fn to_core(&self) -> core::ConfigFlag {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(FLAG_CAPACITY);
        core::ConfigFlag::new(String::from_utf8_lossy(&self.0[..end]).into_owned())
    }
}

impl ToWire<[u8; KEY_WIDTH]> for core::LocalityKey {
    fn to_wire(&self) -> [u8; KEY_WIDTH] {
        self.raw().to_le_bytes()
    }
}

impl TryToCore<core::LocalityKey> for [u8] {
    type Error = ConvertError;

    fn try_to_core(&self) -> Result<core::LocalityKey, Self::Error> {
        exact("locality key", self).map(|b| core::LocalityKey(u32::from_le_bytes(b)))
    }
}

impl ToWire<[u8; VERDICT_WIDTH]> for core::Verdict {
    fn to_wire(&self) -> [u8; VERDICT_WIDTH] {
        match self {
            core::Verdict::Agree => [1],
            core::Verdict::Disagree => [0],
        }
    }
}

impl TryToCore<core::Verdict> for [u8] {
    type Error = ConvertError;

    fn try_to_core(&self) -> Result<core::Verdict, Self::Error> {
        match exact::<VERDICT_WIDTH>("verdict", self)? {
            [1] => Ok(core::Verdict::Agree),
            [0] => Ok(core::Verdict::Disagree),
            [other] => Err(ConvertError::InvalidVerdict(other)),
        }
    }
}

impl ToWire<[u8; GROUP_SET_WIDTH]> for core::GroupSet {
    fn to_wire(&self) -> [u8; GROUP_SET_WIDTH] {
        self.0.to_le_bytes()
    }
}

impl TryToCore<core::GroupSet> for [u8] {
    type Error = ConvertError;

    fn try_to_core(&self) -> Result<core::GroupSet, Self::Error> {
        exact("group set", self).map(|b| core::GroupSet(u128::from_le_bytes(b)))
    }
}
