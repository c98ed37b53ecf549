//! Block
//!
//! Smallest versioned unit of a segment. A block belongs to exactly one
//! segment; upgrading it produces a new instance whose `prev_version`
//! keeps the replaced one reachable for inspection.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::common::{BlockType, RefCounted, RefHelper, SegmentType, SllNode};
use crate::error::{Result, StrataError};
use crate::fs::SegmentFile;
use crate::index::BlockIndexHolder;
use crate::metadata::BlockMeta;

use super::{ColumnBlock, Segment};

pub struct Block {
    refs: RefHelper,
    node: SllNode<Block>,
    host: Weak<Segment>,
    meta: Arc<BlockMeta>,
    blk_type: BlockType,
    segment_file: Arc<SegmentFile>,
    index_holder: Arc<BlockIndexHolder>,
    columns: Vec<Arc<ColumnBlock>>,
    /// Memory-only back link; carries no logical reference
    prev_version: RwLock<Option<Arc<Block>>>,
}

impl Block {
    /// Create a block bound to `host`. The returned block carries one
    /// reference owned by the caller.
    pub(crate) fn new(host: &Segment, meta: Arc<BlockMeta>) -> Result<Arc<Block>> {
        Self::check_host(host, &meta)?;
        let blk_type = match host.get_type() {
            SegmentType::SortedSeg => BlockType::PersistentSortedBlk,
            SegmentType::UnsortedSeg if meta.is_full() => BlockType::PersistentBlk,
            SegmentType::UnsortedSeg => BlockType::TransientBlk,
        };
        let mut blk = Self::bare(host, meta, blk_type);
        blk.columns = (0..blk.meta.table.column_count())
            .map(|idx| {
                ColumnBlock::new(
                    idx,
                    Arc::clone(&blk.meta),
                    blk_type,
                    Arc::clone(&blk.segment_file),
                    Arc::clone(&blk.index_holder),
                )
            })
            .collect();

        let blk = Arc::new(blk);
        blk.add_ref();
        tracing::debug!(block = %blk.meta.as_common_id(), blk_type = ?blk_type, "block created");
        Ok(blk)
    }

    /// New instance of this block bound to `host` and `meta`, one storage
    /// level up: persistent inside an unsorted segment, persistent-sorted
    /// inside a sorted one. The returned block carries one reference.
    pub fn clone_with_upgrade(&self, host: &Segment, meta: Arc<BlockMeta>) -> Result<Arc<Block>> {
        if meta.id != self.meta.id {
            return Err(StrataError::InvalidBlock(format!(
                "cannot upgrade block {} with metadata of block {}",
                self.meta.id, meta.id
            )));
        }
        Self::check_host(host, &meta)?;
        let blk_type = match host.get_type() {
            SegmentType::SortedSeg => BlockType::PersistentSortedBlk,
            SegmentType::UnsortedSeg => BlockType::PersistentBlk,
        };
        let mut blk = Self::bare(host, meta, blk_type);
        let columns = self
            .columns
            .iter()
            .map(|col| col.clone_with_upgrade(&blk))
            .collect();
        blk.columns = columns;

        let blk = Arc::new(blk);
        blk.add_ref();
        tracing::debug!(
            block = %blk.meta.as_common_id(),
            from = ?self.blk_type,
            to = ?blk_type,
            "block upgraded"
        );
        Ok(blk)
    }

    fn check_host(host: &Segment, meta: &BlockMeta) -> Result<()> {
        let seg_meta = host.get_meta();
        if meta.segment_id != seg_meta.id || meta.table.id != seg_meta.table.id {
            return Err(StrataError::InvalidBlock(format!(
                "block {} does not belong to segment {}",
                meta.as_common_id(),
                seg_meta.as_common_id()
            )));
        }
        Ok(())
    }

    /// Block without columns; takes its file and index-holder references
    fn bare(host: &Segment, meta: Arc<BlockMeta>, blk_type: BlockType) -> Block {
        let segment_file = Arc::clone(host.get_segment_file());
        segment_file.add_ref();
        let index_holder = host
            .get_index_holder()
            .register_block(meta.as_common_id(), blk_type);
        Block {
            refs: RefHelper::new(),
            node: SllNode::new(),
            host: host.weak(),
            meta,
            blk_type,
            segment_file,
            index_holder,
            columns: Vec::new(),
            prev_version: RwLock::new(None),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.meta.id
    }

    pub fn get_meta(&self) -> &Arc<BlockMeta> {
        &self.meta
    }

    pub fn get_type(&self) -> BlockType {
        self.blk_type
    }

    /// Atomic load: appenders may be adding rows concurrently
    pub fn get_row_count(&self) -> u64 {
        self.meta.count()
    }

    pub fn get_segment_file(&self) -> &Arc<SegmentFile> {
        &self.segment_file
    }

    pub fn get_index_holder(&self) -> &Arc<BlockIndexHolder> {
        &self.index_holder
    }

    /// Owning segment, if it is still alive
    pub fn host(&self) -> Option<Arc<Segment>> {
        self.host.upgrade()
    }

    pub fn columns(&self) -> &[Arc<ColumnBlock>] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&Arc<ColumnBlock>> {
        self.columns.get(idx)
    }

    /// Bytes held by column `attr`; zero for an unknown column
    pub fn size(&self, attr: &str) -> u64 {
        self.meta
            .table
            .column_index(attr)
            .and_then(|idx| self.columns.get(idx))
            .map(|col| col.size())
            .unwrap_or(0)
    }

    /// ID of the last fully applied log batch
    pub fn get_segmented_index(&self) -> Option<u64> {
        self.meta
            .log_index()
            .filter(|idx| idx.is_applied())
            .map(|idx| idx.id)
    }

    // =========================================================================
    // Adjacency and Versions
    // =========================================================================

    pub fn set_next(&self, next: Option<Arc<Block>>) {
        self.node.set_next(next)
    }

    pub fn get_next(&self) -> Option<Arc<Block>> {
        self.node.get_next()
    }

    pub(crate) fn take_next(&self) -> Option<Arc<Block>> {
        self.node.take_next()
    }

    pub fn set_prev_version(&self, prev: Option<Arc<Block>>) {
        *self.prev_version.write() = prev;
    }

    pub fn get_prev_version(&self) -> Option<Arc<Block>> {
        self.prev_version.read().clone()
    }

    /// Earlier versions of this block, most recent first
    pub fn versions(&self) -> Vec<Arc<Block>> {
        let mut out = Vec::new();
        let mut cur = self.get_prev_version();
        while let Some(blk) = cur {
            cur = blk.get_prev_version();
            out.push(blk);
        }
        out
    }
}

impl RefCounted for Block {
    fn ref_helper(&self) -> &RefHelper {
        &self.refs
    }

    fn on_zero(&self) {
        tracing::debug!(block = %self.meta.as_common_id(), "block released");
        for col in &self.columns {
            col.unref();
        }
        self.index_holder.unref();
        self.segment_file.unref();
        self.node.release_next();
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Block[{}]>(Type={:?})(Rows={})(Refs={})",
            self.meta.id,
            self.blk_type,
            self.get_row_count(),
            self.ref_count()
        )
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
