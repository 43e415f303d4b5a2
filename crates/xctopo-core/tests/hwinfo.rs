use anyhow::Result;

use xctopo_core::hwinfo::{HwInfo, HwInfoError, CLUSTER_MODE_FLAG, MEMORY_MODE_FLAG};
use xctopo_core::types::{ConfigFlag, FLAG_CAPACITY};

const BLOB: &str = "numa_cfg[2]=dual;mcdram_cfg[2]=cache;";

#[test]
fn extracts_value_after_key() -> Result<()> {
    let info = HwInfo::new(BLOB);
    assert_eq!(info.lookup(CLUSTER_MODE_FLAG, 2)?.as_str(), "dual");
    assert_eq!(info.lookup(MEMORY_MODE_FLAG, 2)?.as_str(), "cache");
    Ok(())
}

#[test]
fn missing_index_is_reported_and_defaults_to_empty() -> Result<()> {
    let info = HwInfo::new(BLOB);
    let err = info
        .lookup(CLUSTER_MODE_FLAG, 3)
        .err()
        .ok_or_else(|| anyhow::anyhow!("index 3 should be absent"))?;
    assert_eq!(
        err,
        HwInfoError::FlagNotFound {
            key: "numa_cfg[3]=".to_string()
        }
    );
    assert_eq!(info.flag_or_empty(CLUSTER_MODE_FLAG, 3), ConfigFlag::empty());
    Ok(())
}

#[test]
fn brackets_are_matched_literally() -> Result<()> {
    // Without escaping, `[2]` would be a character class matching "numa_cfg2=".
    let info = HwInfo::new("numa_cfg2=snc4\nnuma_cfg[2]=quad\n");
    assert_eq!(info.lookup(CLUSTER_MODE_FLAG, 2)?.as_str(), "quad");
    Ok(())
}

#[test]
fn first_occurrence_wins() -> Result<()> {
    let info = HwInfo::new("numa_cfg[0]=quad\nnuma_cfg[0]=snc2\n");
    assert_eq!(info.lookup(CLUSTER_MODE_FLAG, 0)?.as_str(), "quad");
    Ok(())
}

#[test]
fn value_stops_at_whitespace_and_skips_leading_blanks() -> Result<()> {
    let info = HwInfo::new("mcdram_cfg[1]=  flat rest\n");
    assert_eq!(info.lookup(MEMORY_MODE_FLAG, 1)?.as_str(), "flat");
    Ok(())
}

#[test]
fn empty_value_is_a_value() -> Result<()> {
    let info = HwInfo::new("numa_cfg[0]=\nmcdram_cfg[0]=cache\n");
    assert_eq!(info.lookup(CLUSTER_MODE_FLAG, 0), Ok(ConfigFlag::empty()));
    Ok(())
}

#[test]
fn long_value_is_cut_to_payload_capacity() -> Result<()> {
    let long = "x".repeat(200);
    let info = HwInfo::new(format!("numa_cfg[0]={long}"));
    let flag = info.lookup(CLUSTER_MODE_FLAG, 0)?;
    assert_eq!(flag.as_str().len(), FLAG_CAPACITY - 1);
    Ok(())
}

#[test]
fn from_bytes_tolerates_invalid_utf8() -> Result<()> {
    let mut bytes = b"\xff\xfe junk ".to_vec();
    bytes.extend_from_slice(BLOB.as_bytes());
    let info = HwInfo::from_bytes(&bytes);
    assert_eq!(info.lookup(CLUSTER_MODE_FLAG, 2)?.as_str(), "dual");
    Ok(())
}
