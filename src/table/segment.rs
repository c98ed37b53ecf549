//! Segment
//!
//! Ordered, growable collection of blocks. An unsorted segment accepts new
//! blocks and upgrades them one at a time; once every block is persistent
//! and the segment is full it can be cloned into a sorted segment, which
//! is immutable.
//!
//! ## Reference Accounting
//! ```text
//!   register_block:  creation ref (returned to caller)
//!                    + 1 for the owning sequence
//!                    + 1 for the predecessor's successor link (if any)
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::common::{BlockType, RefCounted, RefHelper, SegmentType, SllNode};
use crate::error::{Result, StrataError};
use crate::fs::{FileManager, SegmentFile};
use crate::index::SegmentIndexHolder;
use crate::metadata::{BlockMeta, DataState, LogIndex, SegmentMeta};

use super::{Block, TableData};

/// Everything guarded by the segment lock
#[derive(Default)]
struct SegmentTree {
    blocks: Vec<Arc<Block>>,
    /// Block ID → position in `blocks`
    helper: HashMap<u64, usize>,
    block_ids: Vec<u64>,
    /// Per-column sizes; filled once the segment is sorted
    attr_size: HashMap<String, u64>,
}

pub struct Segment {
    me: Weak<Segment>,
    refs: RefHelper,
    node: SllNode<Segment>,
    seg_type: SegmentType,
    tree: RwLock<SegmentTree>,
    /// Mirrors `tree.blocks.len()` for lock-free readers
    block_cnt: AtomicU32,
    meta: Arc<SegmentMeta>,
    index_holder: Arc<SegmentIndexHolder>,
    fs_mgr: Arc<dyn FileManager>,
    segment_file: Arc<SegmentFile>,
}

impl Segment {
    /// Create a segment bound to `host`. A segment whose metadata is
    /// already sorted resolves (or upgrades) its sorted file and loads
    /// every block listed in the metadata.
    ///
    /// The returned segment carries one reference owned by the caller.
    pub(crate) fn new(host: &TableData, meta: Arc<SegmentMeta>) -> Result<Arc<Segment>> {
        let seg_type = if meta.data_state() == DataState::Sorted {
            SegmentType::SortedSeg
        } else {
            SegmentType::UnsortedSeg
        };
        let seg_id = meta.as_common_id().as_segment_id();
        let fs_mgr = Arc::clone(host.get_fs_manager());

        let segment_file = match seg_type {
            SegmentType::UnsortedSeg => match fs_mgr.get_unsorted_file(&seg_id) {
                Some(file) => file,
                None => fs_mgr.register_unsorted_files(&seg_id)?,
            },
            SegmentType::SortedSeg => match fs_mgr.get_unsorted_file(&seg_id) {
                Some(_) => fs_mgr.upgrade_file(&seg_id).ok_or_else(|| {
                    StrataError::Storage(format!("cannot upgrade file of segment {}", seg_id))
                })?,
                None => match fs_mgr.get_sorted_file(&seg_id) {
                    Some(file) => file,
                    None => fs_mgr.register_sorted_files(&seg_id)?,
                },
            },
        };

        let index_holder = host
            .get_index_holder()
            .register_segment(seg_id, seg_type, None);
        index_holder.init(&segment_file);
        segment_file.add_ref();

        let seg = Arc::new_cyclic(|me| Segment {
            me: me.clone(),
            refs: RefHelper::new(),
            node: SllNode::new(),
            seg_type,
            tree: RwLock::new(SegmentTree::default()),
            block_cnt: AtomicU32::new(0),
            meta,
            index_holder,
            fs_mgr,
            segment_file,
        });
        seg.add_ref();
        tracing::debug!(segment = %seg_id, seg_type = ?seg_type, "segment created");

        if seg_type == SegmentType::SortedSeg {
            if let Err(err) = seg.load_blocks() {
                seg.unref();
                return Err(err);
            }
        }
        Ok(seg)
    }

    /// Bind every block listed in the metadata, in order
    fn load_blocks(&self) -> Result<()> {
        for id in self.meta.block_ids() {
            let blk_meta = self.meta.reference_block(id)?;
            let blk = self.append_block(blk_meta)?;
            blk.unref();
        }
        self.refresh_attr_size();
        Ok(())
    }

    pub(crate) fn weak(&self) -> Weak<Segment> {
        self.me.clone()
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Create a block for `meta` and append it after the current last
    /// block. The returned block carries a reference owned by the caller.
    pub fn register_block(&self, meta: Arc<BlockMeta>) -> Result<Arc<Block>> {
        if self.seg_type == SegmentType::SortedSeg {
            return Err(StrataError::SegmentImmutable(self.meta.id));
        }
        self.append_block(meta)
    }

    fn append_block(&self, meta: Arc<BlockMeta>) -> Result<Arc<Block>> {
        // Held across creation so two registrations of one ID cannot race
        let mut tree = self.tree.write();
        if tree.helper.contains_key(&meta.id) {
            return Err(StrataError::InvalidBlock(format!(
                "block {} already registered in segment {}",
                meta.id, self.meta.id
            )));
        }
        let blk = Block::new(self, meta)?;
        if let Some(last) = tree.blocks.last() {
            blk.add_ref();
            last.set_next(Some(Arc::clone(&blk)));
        }
        let pos = tree.blocks.len();
        tree.blocks.push(Arc::clone(&blk));
        tree.block_ids.push(blk.id());
        tree.helper.insert(blk.id(), pos);
        self.block_cnt.fetch_add(1, Ordering::AcqRel);
        blk.add_ref();
        tracing::debug!(block = %blk.get_meta().as_common_id(), pos, "block registered");
        Ok(blk)
    }

    /// Look up a block without taking a reference. The handle must not be
    /// kept past the caller's use of this segment.
    pub fn weak_ref_block(&self, id: u64) -> Option<Arc<Block>> {
        let tree = self.tree.read();
        let idx = *tree.helper.get(&id)?;
        tree.blocks.get(idx).cloned()
    }

    /// Look up a block and take a reference the caller must release
    pub fn strong_ref_block(&self, id: u64) -> Option<Arc<Block>> {
        let tree = self.tree.read();
        let idx = *tree.helper.get(&id)?;
        let blk = tree.blocks.get(idx)?;
        blk.add_ref();
        Some(Arc::clone(blk))
    }

    pub fn block_ids(&self) -> Vec<u64> {
        self.tree.read().block_ids.clone()
    }

    pub fn block_count(&self) -> u32 {
        self.block_cnt.load(Ordering::Acquire)
    }

    /// Block at position `idx`, read under a short-lived lock
    fn block_at(&self, idx: usize) -> Option<Arc<Block>> {
        self.tree.read().blocks.get(idx).cloned()
    }

    // =========================================================================
    // Upgrade
    // =========================================================================

    /// True once the segment holds its maximum number of blocks and every
    /// one of them is persistent
    pub fn can_upgrade(&self) -> bool {
        if self.seg_type == SegmentType::SortedSeg {
            return false;
        }
        let tree = self.tree.read();
        if (tree.blocks.len() as u64) < self.meta.table.conf.segment_max_blocks {
            return false;
        }
        tree.blocks
            .iter()
            .all(|blk| blk.get_type() == BlockType::PersistentBlk)
    }

    /// Build the sorted successor of this segment.
    ///
    /// The file is upgraded through the file manager and the index holder
    /// through the table's index holder; every block is cloned in order
    /// with its previous version pointing at the original. The returned
    /// segment carries one reference owned by the caller.
    ///
    /// # Panics
    /// If the segment is already sorted, or the file or index holder
    /// cannot be resolved. Callers must check `can_upgrade` and stop
    /// registering blocks first.
    pub fn clone_with_upgrade(
        &self,
        td: &TableData,
        meta: Arc<SegmentMeta>,
    ) -> Result<Arc<Segment>> {
        if self.seg_type != SegmentType::UnsortedSeg {
            tracing::error!(segment = self.meta.id, "upgrade of a sorted segment");
            panic!("logic error: segment {} is already sorted", self.meta.id);
        }
        let seg_id = self.meta.as_common_id().as_segment_id();

        let Some(mut index_holder) = td.get_index_holder().strong_ref_segment(self.meta.id) else {
            tracing::error!(segment = %seg_id, "no index holder for upgraded segment");
            panic!("logic error: segment {} has no index holder", seg_id);
        };
        let Some(segment_file) = self.fs_mgr.upgrade_file(&seg_id) else {
            tracing::error!(segment = %seg_id, "no unsorted file for upgraded segment");
            panic!("logic error: segment {} has no file to upgrade", seg_id);
        };
        if index_holder.seg_type() == SegmentType::UnsortedSeg {
            index_holder.unref();
            index_holder = match td
                .get_index_holder()
                .upgrade_segment(self.meta.id, SegmentType::SortedSeg)
            {
                Some(holder) => holder,
                None => {
                    tracing::error!(segment = %seg_id, "index holder vanished during upgrade");
                    panic!("logic error: segment {} index holder vanished", seg_id);
                }
            };
        }
        index_holder.init(&segment_file);

        if meta.data_state() < DataState::Sorted {
            meta.set_data_state(DataState::Sorted);
        }
        segment_file.add_ref();
        let cloned = Arc::new_cyclic(|me| Segment {
            me: me.clone(),
            refs: RefHelper::new(),
            node: SllNode::new(),
            seg_type: SegmentType::SortedSeg,
            tree: RwLock::new(SegmentTree::default()),
            block_cnt: AtomicU32::new(0),
            meta,
            index_holder,
            fs_mgr: Arc::clone(&self.fs_mgr),
            segment_file,
        });

        let originals = self.tree.read().blocks.clone();
        {
            let mut tree = cloned.tree.write();
            for blk in &originals {
                let blk_meta = match cloned.meta.reference_block(blk.id()) {
                    Ok(m) => m,
                    Err(err) => {
                        tracing::error!(
                            block = blk.id(),
                            error = %err,
                            "upgraded metadata lacks block"
                        );
                        panic!("logic error: {}", err);
                    }
                };
                let cur = match blk.clone_with_upgrade(&cloned, blk_meta) {
                    Ok(cur) => cur,
                    Err(err) => {
                        tracing::error!(block = blk.id(), error = %err, "block clone failed");
                        panic!("logic error: {}", err);
                    }
                };
                cur.set_prev_version(Some(Arc::clone(blk)));
                if let Some(prev) = tree.blocks.last() {
                    cur.add_ref();
                    prev.set_next(Some(Arc::clone(&cur)));
                }
                let pos = tree.blocks.len();
                tree.helper.insert(cur.id(), pos);
                tree.block_ids.push(cur.id());
                tree.blocks.push(cur);
                cloned.block_cnt.fetch_add(1, Ordering::AcqRel);
            }
        }
        cloned.refresh_attr_size();
        cloned.add_ref();

        tracing::info!(
            segment = %seg_id,
            blocks = cloned.block_count(),
            "segment upgraded to sorted"
        );
        Ok(cloned)
    }

    /// Replace one block of this unsorted segment by its upgraded version,
    /// keeping its position and successor. The old block stays reachable
    /// through the new block's previous version only.
    ///
    /// # Panics
    /// If the segment is sorted, or `meta` names a block this segment does
    /// not hold.
    pub fn upgrade_block(&self, meta: Arc<BlockMeta>) -> Result<Arc<Block>> {
        if self.seg_type != SegmentType::UnsortedSeg {
            tracing::error!(
                segment = self.meta.id,
                block = meta.id,
                "block upgrade in a sorted segment"
            );
            panic!("logic error: segment {} is sorted", self.meta.id);
        }
        if meta.segment_id != self.meta.id {
            tracing::error!(
                segment = self.meta.id,
                block = %meta.as_common_id(),
                "block upgrade in a foreign segment"
            );
            panic!(
                "logic error: block {} does not belong to segment {}",
                meta.as_common_id(),
                self.meta.id
            );
        }
        let (idx, old) = {
            let tree = self.tree.read();
            match tree.helper.get(&meta.id) {
                Some(&idx) => (idx, Arc::clone(&tree.blocks[idx])),
                None => {
                    tracing::error!(
                        segment = self.meta.id,
                        block = meta.id,
                        "upgrade of an unknown block"
                    );
                    panic!(
                        "logic error: block {} not found in segment {}",
                        meta.id, self.meta.id
                    );
                }
            }
        };

        let upgraded = old.clone_with_upgrade(self, meta)?;
        upgraded.set_next(old.take_next());
        upgraded.set_prev_version(Some(Arc::clone(&old)));
        {
            let mut tree = self.tree.write();
            tree.blocks[idx] = Arc::clone(&upgraded);
            if idx > 0 {
                upgraded.add_ref();
                tree.blocks[idx - 1].set_next(Some(Arc::clone(&upgraded)));
            }
        }
        upgraded.add_ref();
        old.unref();

        tracing::info!(
            block = %upgraded.get_meta().as_common_id(),
            blk_type = ?upgraded.get_type(),
            "block upgraded in place"
        );
        Ok(upgraded)
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    /// Highest applied log batch, scanning newest block first
    pub fn get_segmented_index(&self) -> Option<u64> {
        if self.seg_type == SegmentType::SortedSeg {
            let tree = self.tree.read();
            return tree.blocks.iter().rev().find_map(|blk| blk.get_segmented_index());
        }
        let cnt = self.block_count() as usize;
        (0..cnt)
            .rev()
            .filter_map(|idx| self.block_at(idx))
            .find_map(|blk| blk.get_segmented_index())
    }

    /// Latest log position recorded by any block, newest block first
    pub fn get_replay_index(&self) -> Option<LogIndex> {
        let tree = self.tree.read();
        tree.blocks.iter().rev().find_map(|blk| blk.get_meta().log_index())
    }

    /// Rows held. A closed or sorted segment reports its full capacity.
    pub fn get_row_count(&self) -> u64 {
        if self.meta.data_state() >= DataState::Closed {
            return self.meta.table.conf.segment_max_rows();
        }
        let tree = self.tree.read();
        tree.blocks.iter().map(|blk| blk.get_row_count()).sum()
    }

    /// Bytes held by column `attr`
    pub fn size(&self, attr: &str) -> u64 {
        if self.seg_type == SegmentType::SortedSeg {
            return self.tree.read().attr_size.get(attr).copied().unwrap_or(0);
        }
        let cnt = self.block_count() as usize;
        (0..cnt)
            .filter_map(|idx| self.block_at(idx))
            .map(|blk| blk.size(attr))
            .sum()
    }

    fn refresh_attr_size(&self) {
        let mut tree = self.tree.write();
        let sizes: HashMap<String, u64> = self
            .meta
            .table
            .schema
            .iter()
            .map(|col| {
                let total = tree.blocks.iter().map(|blk| blk.size(&col.name)).sum();
                (col.name.clone(), total)
            })
            .collect();
        tree.attr_size = sizes;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.meta.id
    }

    pub fn get_meta(&self) -> &Arc<SegmentMeta> {
        &self.meta
    }

    pub fn get_type(&self) -> SegmentType {
        self.seg_type
    }

    pub fn get_segment_file(&self) -> &Arc<SegmentFile> {
        &self.segment_file
    }

    pub fn get_index_holder(&self) -> &Arc<SegmentIndexHolder> {
        &self.index_holder
    }

    pub fn get_fs_manager(&self) -> &Arc<dyn FileManager> {
        &self.fs_mgr
    }

    pub fn set_next(&self, next: Option<Arc<Segment>>) {
        self.node.set_next(next)
    }

    pub fn get_next(&self) -> Option<Arc<Segment>> {
        self.node.get_next()
    }

    pub(crate) fn take_next(&self) -> Option<Arc<Segment>> {
        self.node.take_next()
    }

    fn close(&self) {
        let seg_id = self.meta.as_common_id().as_segment_id();
        self.index_holder.unref();
        let tree = std::mem::take(&mut *self.tree.write());
        self.block_cnt.store(0, Ordering::Release);
        for blk in tree.blocks {
            blk.unref();
        }
        self.node.release_next();
        self.segment_file.unref();
        match self.seg_type {
            SegmentType::UnsortedSeg => self.fs_mgr.unregister_unsorted_file(&seg_id),
            SegmentType::SortedSeg => self.fs_mgr.unregister_sorted_file(&seg_id),
        }
        tracing::debug!(segment = %seg_id, "segment closed");
    }
}

impl RefCounted for Segment {
    fn ref_helper(&self) -> &RefHelper {
        &self.refs
    }

    fn on_zero(&self) {
        self.close();
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.read();
        write!(
            f,
            "<Segment[{}]>(BlkCnt={})(Refs={})(IndexRefs={})",
            self.meta.id,
            self.block_count(),
            self.ref_count(),
            self.index_holder.ref_count()
        )?;
        for blk in &tree.blocks {
            write!(f, "\n\t{}", blk)?;
            let depth = blk.versions().len();
            for v in 0..=depth {
                write!(f, " V{}", v)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Segment[{}]>({:?})", self.meta.id, self.seg_type)
    }
}
