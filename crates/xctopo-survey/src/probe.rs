use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use xctopo_comm::CollectiveError;
use xctopo_core::cname::{parse_cname, CnameError, DEFAULT_CNAME_PATH};
use xctopo_core::encode::{LocalityEncoding, PackedBitField};
use xctopo_core::hwinfo::{HwInfo, CLUSTER_MODE_FLAG, DEFAULT_HWINFO_PATH, MEMORY_MODE_FLAG};
use xctopo_core::types::{ConfigFlag, LocalityKey, RawCoordinate};

/// Local failure before any collective. The process must exit without entering a round.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to read {what} from {}: {source}", path.display())]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: CnameError,
    },
    #[error("collective runtime setup failed: {0}")]
    Runtime(#[from] CollectiveError),
}

/// Names of the two flags checked for agreement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagNames {
    pub cluster: String,
    pub memory: String,
}

impl Default for FlagNames {
    fn default() -> Self {
        Self {
            cluster: CLUSTER_MODE_FLAG.to_string(),
            memory: MEMORY_MODE_FLAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSources {
    pub cname_path: PathBuf,
    pub hwinfo_path: PathBuf,
}

impl Default for ProbeSources {
    fn default() -> Self {
        Self {
            cname_path: PathBuf::from(DEFAULT_CNAME_PATH),
            hwinfo_path: PathBuf::from(DEFAULT_HWINFO_PATH),
        }
    }
}

/// Everything one rank knows about itself before the first collective.
///
/// Constructing a probe performs all local checks that can fail, so holding one means the rank
/// is safe to enter a survey round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalProbe {
    pub coordinate: RawCoordinate,
    pub key: LocalityKey,
    pub flags: FlagNames,
    pub cluster_mode: ConfigFlag,
    pub memory_mode: ConfigFlag,
}

impl LocalProbe {
    /// Builds a probe from already-read inputs. Flags are looked up at the node's NIC index.
    pub fn from_texts(cname: &str, hwinfo: &HwInfo, flags: FlagNames) -> Result<Self, CnameError> {
        let coordinate = parse_cname(cname)?;
        if let Err(err) = coordinate.check_ranges() {
            warn!(cname = %coordinate, error = %err, "coordinate outside XC40 layout, key fields will be truncated");
        }

        let key = PackedBitField.encode(&coordinate);
        let cluster_mode = hwinfo.flag_or_empty(&flags.cluster, coordinate.nic);
        let memory_mode = hwinfo.flag_or_empty(&flags.memory, coordinate.nic);
        debug!(
            cname = %coordinate,
            key = format_args!("{key:#x}"),
            cluster_mode = %cluster_mode,
            memory_mode = %memory_mode,
            "probe ready"
        );

        Ok(Self {
            coordinate,
            key,
            flags,
            cluster_mode,
            memory_mode,
        })
    }

    pub fn load(sources: &ProbeSources, flags: FlagNames) -> Result<Self, SetupError> {
        let cname = read_cname_text(&sources.cname_path)?;
        let hwinfo = read_hwinfo(&sources.hwinfo_path)?;
        Self::from_texts(&cname, &hwinfo, flags).map_err(|source| SetupError::Parse {
            path: sources.cname_path.clone(),
            source,
        })
    }
}

pub fn read_cname_text(path: &Path) -> Result<String, SetupError> {
    std::fs::read_to_string(path).map_err(|source| SetupError::Read {
        what: "canonical name",
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the whole system description blob; no caching between calls.
pub fn read_hwinfo(path: &Path) -> Result<HwInfo, SetupError> {
    std::fs::read(path)
        .map(|bytes| HwInfo::from_bytes(&bytes))
        .map_err(|source| SetupError::Read {
            what: "system description",
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(test_name: &str) -> anyhow::Result<PathBuf> {
        let mut root = std::env::temp_dir();
        let suffix = format!(
            "xctopo-survey-{}-{}-{}",
            test_name,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis()
        );
        root.push(suffix);
        std::fs::create_dir_all(&root)?;
        Ok(root)
    }

    #[test]
    fn flags_are_read_at_nic_index() {
        let hwinfo = HwInfo::new("numa_cfg[1]=snc2\nnuma_cfg[3]=quad\nmcdram_cfg[3]=flat\n");
        let probe = LocalProbe::from_texts("c0-0c0s4n3", &hwinfo, FlagNames::default()).unwrap();
        assert_eq!(probe.cluster_mode.as_str(), "quad");
        assert_eq!(probe.memory_mode.as_str(), "flat");
        assert_eq!(probe.key.node(), 3);
    }

    #[test]
    fn missing_flag_becomes_empty() {
        let probe =
            LocalProbe::from_texts("c0-0c0s4n0", &HwInfo::default(), FlagNames::default()).unwrap();
        assert!(probe.cluster_mode.is_empty());
        assert!(probe.memory_mode.is_empty());
    }

    #[test]
    fn load_reads_both_files() -> anyhow::Result<()> {
        let root = temp_root("load")?;
        let sources = ProbeSources {
            cname_path: root.join("cname"),
            hwinfo_path: root.join("hwinfo"),
        };
        std::fs::write(&sources.cname_path, "c1-0c2s15n3\n")?;
        std::fs::write(&sources.hwinfo_path, "numa_cfg[3]=quad;mcdram_cfg[3]=cache;")?;

        let probe = LocalProbe::load(&sources, FlagNames::default())?;
        assert_eq!(probe.key, LocalityKey(0x37f));
        assert_eq!(probe.cluster_mode.as_str(), "quad");
        assert_eq!(probe.memory_mode.as_str(), "cache");
        Ok(())
    }

    #[test]
    fn unreadable_cname_is_a_setup_error() -> anyhow::Result<()> {
        let root = temp_root("missing-cname")?;
        let sources = ProbeSources {
            cname_path: root.join("absent"),
            hwinfo_path: root.join("absent-too"),
        };
        let err = LocalProbe::load(&sources, FlagNames::default()).unwrap_err();
        assert!(matches!(err, SetupError::Read { what: "canonical name", .. }));
        Ok(())
    }

    #[test]
    fn malformed_cname_is_a_parse_error() -> anyhow::Result<()> {
        let root = temp_root("bad-cname")?;
        let sources = ProbeSources {
            cname_path: root.join("cname"),
            hwinfo_path: root.join("hwinfo"),
        };
        std::fs::write(&sources.cname_path, "nid00012\n")?;
        std::fs::write(&sources.hwinfo_path, "")?;

        let err = LocalProbe::load(&sources, FlagNames::default()).unwrap_err();
        assert!(matches!(err, SetupError::Parse { .. }));
        Ok(())
    }
}
