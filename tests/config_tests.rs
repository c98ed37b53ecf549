//! Configuration Tests
//!
//! Tests verify:
//! - Defaults are valid
//! - Builder overrides each field
//! - Validation rejects zero limits
//! - Derived paths and table limits

use std::path::PathBuf;

use strata::{BodyFormat, Config, StrataError};

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.body_format, BodyFormat::Json);
    assert_eq!(config.segment_dir(), PathBuf::from("./strata_data").join("segments"));
}

#[test]
fn test_builder_overrides() {
    let config = Config::builder()
        .data_dir("/tmp/strata")
        .block_max_rows(8)
        .segment_max_blocks(3)
        .kv_scan_limit(5)
        .body_format(BodyFormat::Bincode)
        .tenant_id(9)
        .build();

    assert_eq!(config.data_dir, PathBuf::from("/tmp/strata"));
    assert_eq!(config.kv_scan_limit, 5);
    assert_eq!(config.body_format, BodyFormat::Bincode);
    assert_eq!(config.tenant_id, 9);

    let conf = config.table_conf();
    assert_eq!(conf.block_max_rows, 8);
    assert_eq!(conf.segment_max_blocks, 3);
    assert_eq!(conf.segment_max_rows(), 24);
}

#[test]
fn test_validate_rejects_zero_limits() {
    for config in [
        Config::builder().block_max_rows(0).build(),
        Config::builder().segment_max_blocks(0).build(),
        Config::builder().kv_scan_limit(0).build(),
    ] {
        assert!(matches!(config.validate(), Err(StrataError::Config(_))));
    }
}
