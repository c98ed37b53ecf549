//! Column block
//!
//! The slice of one block that holds a single column.

use std::sync::Arc;

use crate::common::{BlockType, RefCounted, RefHelper};
use crate::fs::SegmentFile;
use crate::index::BlockIndexHolder;
use crate::metadata::BlockMeta;

use super::Block;

#[derive(Debug)]
pub struct ColumnBlock {
    col_idx: usize,
    meta: Arc<BlockMeta>,
    segment_file: Arc<SegmentFile>,
    index_holder: Arc<BlockIndexHolder>,
    blk_type: BlockType,
    refs: RefHelper,
}

impl ColumnBlock {
    pub(crate) fn new(
        col_idx: usize,
        meta: Arc<BlockMeta>,
        blk_type: BlockType,
        segment_file: Arc<SegmentFile>,
        index_holder: Arc<BlockIndexHolder>,
    ) -> Arc<Self> {
        let col = Arc::new(Self {
            col_idx,
            meta,
            segment_file,
            index_holder,
            blk_type,
            refs: RefHelper::new(),
        });
        col.add_ref();
        col
    }

    pub fn get_id(&self) -> u64 {
        self.meta.id
    }

    pub fn get_meta(&self) -> &Arc<BlockMeta> {
        &self.meta
    }

    /// Atomic load: appenders may be adding rows concurrently
    pub fn get_row_count(&self) -> u64 {
        self.meta.count()
    }

    pub fn get_type(&self) -> BlockType {
        self.blk_type
    }

    pub fn get_index_holder(&self) -> &Arc<BlockIndexHolder> {
        &self.index_holder
    }

    pub fn get_col_idx(&self) -> usize {
        self.col_idx
    }

    pub fn get_segment_file(&self) -> &Arc<SegmentFile> {
        &self.segment_file
    }

    pub fn size(&self) -> u64 {
        self.meta.attr_size(self.col_idx)
    }

    /// Same column bound to an upgraded block: its metadata, type, file
    /// and index holder
    pub fn clone_with_upgrade(&self, host: &Block) -> Arc<ColumnBlock> {
        ColumnBlock::new(
            self.col_idx,
            Arc::clone(host.get_meta()),
            host.get_type(),
            Arc::clone(host.get_segment_file()),
            Arc::clone(host.get_index_holder()),
        )
    }
}

impl RefCounted for ColumnBlock {
    fn ref_helper(&self) -> &RefHelper {
        &self.refs
    }
}

impl std::fmt::Display for ColumnBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<ColumnBlock[{}.{}]>(Type={:?})(Refs={})",
            self.meta.id,
            self.col_idx,
            self.blk_type,
            self.ref_count()
        )
    }
}
