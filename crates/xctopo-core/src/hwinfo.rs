//! Lookup of per-node configuration flags in the Cray system description blob.
//!
//! The blob holds entries of the form `<flag>[<index>]=<value>`, for example
//! `numa_cfg[2]=quad` (cluster mode) or `mcdram_cfg[2]=cache` (memory mode).

use regex::Regex;
use thiserror::Error;

use crate::types::ConfigFlag;

pub const DEFAULT_HWINFO_PATH: &str = "/.hwinfo.cray";
pub const CLUSTER_MODE_FLAG: &str = "numa_cfg";
pub const MEMORY_MODE_FLAG: &str = "mcdram_cfg";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HwInfoError {
    #[error("flag key {key:?} not found in system description")]
    FlagNotFound { key: String },
    #[error("flag key {key:?} does not compile to a pattern: {reason}")]
    Pattern { key: String, reason: String },
}

/// System description text, held in memory for the lifetime of one probe.
#[derive(Debug, Clone, Default)]
pub struct HwInfo {
    text: String,
}

impl HwInfo {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// `numa_cfg` + 2 → `numa_cfg[2]=`.
    pub fn flag_key(name: &str, index: u32) -> String {
        format!("{name}[{index}]=")
    }

    /// Value following the first occurrence of `<name>[<index>]=`.
    ///
    /// Leading blanks are skipped; the value ends at whitespace, `;`, `,` or the end of the blob
    /// and is cut to fit the flag payload.
    pub fn lookup(&self, name: &str, index: u32) -> Result<ConfigFlag, HwInfoError> {
        let key = Self::flag_key(name, index);
        let pattern = Regex::new(&regex::escape(&key)).map_err(|err| HwInfoError::Pattern {
            key: key.clone(),
            reason: err.to_string(),
        })?;

        let found = pattern
            .find(&self.text)
            .ok_or(HwInfoError::FlagNotFound { key })?;

        let rest = self.text[found.end()..].trim_start_matches([' ', '\t']);
        let end = rest
            .find(|c: char| c.is_whitespace() || c == ';' || c == ',')
            .unwrap_or(rest.len());
        Ok(ConfigFlag::new(&rest[..end]))
    }

    /// Like [`HwInfo::lookup`], but a missing key yields the empty flag.
    ///
    /// An empty flag is a legitimate value for agreement checks; ranks that lack the key simply
    /// show up as disagreeing with ranks that have it.
    pub fn flag_or_empty(&self, name: &str, index: u32) -> ConfigFlag {
        match self.lookup(name, index) {
            Ok(flag) => flag,
            Err(err) => {
                tracing::debug!(flag = name, index, error = %err, "config flag unresolved");
                ConfigFlag::empty()
            }
        }
    }
}
