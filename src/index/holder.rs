//! Index holders

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{BlockType, CommonId, RefCounted, RefHelper, SegmentType};
use crate::fs::SegmentFile;

/// Options for a segment's indexes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Schema positions of indexed columns
    pub columns: Vec<usize>,
}

// =============================================================================
// Table
// =============================================================================

#[derive(Debug)]
pub struct TableIndexHolder {
    pub id: u64,
    segments: RwLock<HashMap<u64, Arc<SegmentIndexHolder>>>,
    refs: RefHelper,
}

impl TableIndexHolder {
    /// New holder with one reference owned by the caller
    pub fn new(id: u64) -> Arc<Self> {
        let holder = Arc::new(Self {
            id,
            segments: RwLock::new(HashMap::new()),
            refs: RefHelper::new(),
        });
        holder.add_ref();
        holder
    }

    /// Register the index holder of a segment. Registering an ID that is
    /// already mapped returns the existing holder.
    pub fn register_segment(
        &self,
        id: CommonId,
        seg_type: SegmentType,
        opts: Option<IndexOptions>,
    ) -> Arc<SegmentIndexHolder> {
        let mut segments = self.segments.write();
        if let Some(existing) = segments.get(&id.segment_id) {
            existing.add_ref();
            return Arc::clone(existing);
        }
        let holder = SegmentIndexHolder::new(id, seg_type, opts.unwrap_or_default());
        holder.add_ref();
        segments.insert(id.segment_id, Arc::clone(&holder));
        tracing::debug!(segment = %id, seg_type = ?seg_type, "segment index registered");
        holder
    }

    pub fn strong_ref_segment(&self, id: u64) -> Option<Arc<SegmentIndexHolder>> {
        let segments = self.segments.read();
        let holder = segments.get(&id)?;
        holder.add_ref();
        Some(Arc::clone(holder))
    }

    /// Replace the holder of segment `id` with a fresh one of `new_type`
    pub fn upgrade_segment(
        &self,
        id: u64,
        new_type: SegmentType,
    ) -> Option<Arc<SegmentIndexHolder>> {
        let (old, upgraded) = {
            let mut segments = self.segments.write();
            let old = segments.get(&id)?;
            if old.seg_type() == new_type {
                old.add_ref();
                return Some(Arc::clone(old));
            }
            let upgraded = SegmentIndexHolder::new(old.id, new_type, old.opts.clone());
            upgraded.add_ref();
            upgraded.add_ref();
            let old = segments.insert(id, Arc::clone(&upgraded));
            (old, upgraded)
        };
        if let Some(old) = old {
            old.unref();
        }
        tracing::debug!(segment = id, seg_type = ?new_type, "segment index upgraded");
        Some(upgraded)
    }

    pub fn drop_segment(&self, id: u64) {
        let removed = self.segments.write().remove(&id);
        if let Some(holder) = removed {
            holder.unref();
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.read().len()
    }
}

impl RefCounted for TableIndexHolder {
    fn ref_helper(&self) -> &RefHelper {
        &self.refs
    }

    fn on_zero(&self) {
        let segments: Vec<_> = self.segments.write().drain().map(|(_, h)| h).collect();
        for holder in segments {
            holder.unref();
        }
    }
}

// =============================================================================
// Segment
// =============================================================================

#[derive(Debug)]
pub struct SegmentIndexHolder {
    pub id: CommonId,
    seg_type: SegmentType,
    opts: IndexOptions,
    file: RwLock<Option<Arc<SegmentFile>>>,
    blocks: RwLock<HashMap<u64, Arc<BlockIndexHolder>>>,
    refs: RefHelper,
}

impl SegmentIndexHolder {
    fn new(id: CommonId, seg_type: SegmentType, opts: IndexOptions) -> Arc<Self> {
        Arc::new(Self {
            id: id.as_segment_id(),
            seg_type,
            opts,
            file: RwLock::new(None),
            blocks: RwLock::new(HashMap::new()),
            refs: RefHelper::new(),
        })
    }

    pub fn seg_type(&self) -> SegmentType {
        self.seg_type
    }

    pub fn options(&self) -> &IndexOptions {
        &self.opts
    }

    /// Bind the holder to the file its indexes are loaded from
    pub fn init(&self, file: &Arc<SegmentFile>) {
        file.add_ref();
        let old = self.file.write().replace(Arc::clone(file));
        if let Some(old) = old {
            old.unref();
        }
    }

    pub fn inited(&self) -> bool {
        self.file.read().is_some()
    }

    pub fn file(&self) -> Option<Arc<SegmentFile>> {
        self.file.read().clone()
    }

    /// Register the holder of a block, replacing any earlier one for the
    /// same block
    pub fn register_block(&self, id: CommonId, blk_type: BlockType) -> Arc<BlockIndexHolder> {
        let holder = Arc::new(BlockIndexHolder {
            id,
            blk_type,
            refs: RefHelper::new(),
        });
        holder.add_ref();
        holder.add_ref();
        let old = self.blocks.write().insert(id.block_id, Arc::clone(&holder));
        if let Some(old) = old {
            old.unref();
        }
        holder
    }

    pub fn strong_ref_block(&self, id: u64) -> Option<Arc<BlockIndexHolder>> {
        let blocks = self.blocks.read();
        let holder = blocks.get(&id)?;
        holder.add_ref();
        Some(Arc::clone(holder))
    }

    pub fn drop_block(&self, id: u64) {
        let removed = self.blocks.write().remove(&id);
        if let Some(holder) = removed {
            holder.unref();
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }
}

impl RefCounted for SegmentIndexHolder {
    fn ref_helper(&self) -> &RefHelper {
        &self.refs
    }

    fn on_zero(&self) {
        let blocks: Vec<_> = self.blocks.write().drain().map(|(_, h)| h).collect();
        for holder in blocks {
            holder.unref();
        }
        if let Some(file) = self.file.write().take() {
            file.unref();
        }
    }
}

// =============================================================================
// Block
// =============================================================================

#[derive(Debug)]
pub struct BlockIndexHolder {
    pub id: CommonId,
    blk_type: BlockType,
    refs: RefHelper,
}

impl BlockIndexHolder {
    pub fn blk_type(&self) -> BlockType {
        self.blk_type
    }
}

impl RefCounted for BlockIndexHolder {
    fn ref_helper(&self) -> &RefHelper {
        &self.refs
    }
}
