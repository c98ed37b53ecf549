//! Composite identifiers

use std::fmt;

/// Identifies a table, a segment within it, or a block within that segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CommonId {
    pub table_id: u64,
    pub segment_id: u64,
    pub block_id: u64,
}

impl CommonId {
    pub fn new(table_id: u64, segment_id: u64, block_id: u64) -> Self {
        Self {
            table_id,
            segment_id,
            block_id,
        }
    }

    /// Same ID with the block component cleared
    pub fn as_segment_id(&self) -> CommonId {
        CommonId {
            table_id: self.table_id,
            segment_id: self.segment_id,
            block_id: 0,
        }
    }

    pub fn as_block_id(&self) -> CommonId {
        *self
    }
}

impl fmt::Display for CommonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}:{}-{}>", self.table_id, self.segment_id, self.block_id)
    }
}
