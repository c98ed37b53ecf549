//! Table metadata

use std::sync::Arc;

use crate::codec::ValueType;

/// Layout limits of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableConf {
    pub block_max_rows: u64,
    pub segment_max_blocks: u64,
}

impl TableConf {
    /// Row count reported by a closed segment
    pub fn segment_max_rows(&self) -> u64 {
        self.block_max_rows * self.segment_max_blocks
    }
}

/// One column of a table schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub value_type: ValueType,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
        }
    }
}

#[derive(Debug)]
pub struct TableMeta {
    pub id: u64,
    pub name: String,
    pub schema: Vec<ColumnDef>,
    pub conf: TableConf,
}

impl TableMeta {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        schema: Vec<ColumnDef>,
        conf: TableConf,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            schema,
            conf,
        })
    }

    /// Position of a column in the schema
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.schema.len()
    }
}
