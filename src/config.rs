//! Configuration for Strata
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{Result, StrataError};
use crate::metadata::TableConf;

/// Main configuration for a Strata instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── segments/        (unsorted .useg and sorted .sseg files)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Max rows a single block holds
    pub block_max_rows: u64,

    /// Blocks a segment holds before it may be upgraded to sorted
    pub segment_max_blocks: u64,

    // -------------------------------------------------------------------------
    // Catalog Configuration
    // -------------------------------------------------------------------------
    /// Page size for descriptor prefix scans
    pub kv_scan_limit: u64,

    /// Encoding of the opaque descriptor body
    pub body_format: BodyFormat,

    /// Tenant ID encoded at the front of every tuple key
    pub tenant_id: u64,
}

/// How descriptor bodies are marshaled into the value's last field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// Human-readable, tolerant of added fields
    #[default]
    Json,

    /// Compact binary
    Bincode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./strata_data"),
            block_max_rows: 4096,
            segment_max_blocks: 4,
            kv_scan_limit: 100,
            body_format: BodyFormat::Json,
            tenant_id: 0,
        }
    }
}

impl Config {
    const SEGMENT_DIR: &'static str = "segments";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Directory holding segment files
    pub fn segment_dir(&self) -> PathBuf {
        self.data_dir.join(Self::SEGMENT_DIR)
    }

    /// Layout limits copied into every table's metadata
    pub fn table_conf(&self) -> TableConf {
        TableConf {
            block_max_rows: self.block_max_rows,
            segment_max_blocks: self.segment_max_blocks,
        }
    }

    /// Reject settings the layout cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.block_max_rows == 0 {
            return Err(StrataError::Config("block_max_rows must be > 0".to_string()));
        }
        if self.segment_max_blocks == 0 {
            return Err(StrataError::Config(
                "segment_max_blocks must be > 0".to_string(),
            ));
        }
        if self.kv_scan_limit == 0 {
            return Err(StrataError::Config("kv_scan_limit must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the max rows per block
    pub fn block_max_rows(mut self, rows: u64) -> Self {
        self.config.block_max_rows = rows;
        self
    }

    /// Set the max blocks per segment
    pub fn segment_max_blocks(mut self, blocks: u64) -> Self {
        self.config.segment_max_blocks = blocks;
        self
    }

    /// Set the page size for prefix scans
    pub fn kv_scan_limit(mut self, limit: u64) -> Self {
        self.config.kv_scan_limit = limit;
        self
    }

    /// Set the descriptor body format
    pub fn body_format(mut self, format: BodyFormat) -> Self {
        self.config.body_format = format;
        self
    }

    /// Set the tenant ID
    pub fn tenant_id(mut self, id: u64) -> Self {
        self.config.tenant_id = id;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
