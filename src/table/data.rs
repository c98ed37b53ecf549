//! Table data
//!
//! Root of a table's layout: the ordered segments of one table, the
//! table-level index holder and the file manager every segment shares.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{RefCounted, RefHelper};
use crate::error::{Result, StrataError};
use crate::fs::FileManager;
use crate::index::TableIndexHolder;
use crate::metadata::{BlockMeta, SegmentMeta, TableMeta};

use super::{Block, Segment};

#[derive(Default)]
struct TableTree {
    segments: Vec<Arc<Segment>>,
    /// Segment ID → position in `segments`
    helper: HashMap<u64, usize>,
}

pub struct TableData {
    refs: RefHelper,
    meta: Arc<TableMeta>,
    fs_mgr: Arc<dyn FileManager>,
    index_holder: Arc<TableIndexHolder>,
    tree: RwLock<TableTree>,
}

impl TableData {
    /// Create the layout root for `meta`. Takes over one reference on
    /// `index_holder`; the returned table carries one reference owned by
    /// the caller.
    pub fn new(
        meta: Arc<TableMeta>,
        fs_mgr: Arc<dyn FileManager>,
        index_holder: Arc<TableIndexHolder>,
    ) -> Arc<TableData> {
        let td = Arc::new(TableData {
            refs: RefHelper::new(),
            meta,
            fs_mgr,
            index_holder,
            tree: RwLock::new(TableTree::default()),
        });
        td.add_ref();
        tracing::debug!(table = td.meta.id, name = %td.meta.name, "table data created");
        td
    }

    // =========================================================================
    // Segments
    // =========================================================================

    /// Create a segment for `meta` and link it after the current last
    /// segment. The returned segment carries a reference owned by the
    /// caller.
    pub fn register_segment(&self, meta: Arc<SegmentMeta>) -> Result<Arc<Segment>> {
        if meta.table.id != self.meta.id {
            return Err(StrataError::Storage(format!(
                "segment {} belongs to table {}, not {}",
                meta.id, meta.table.id, self.meta.id
            )));
        }
        let mut tree = self.tree.write();
        if tree.helper.contains_key(&meta.id) {
            return Err(StrataError::Storage(format!(
                "segment {} already registered in table {}",
                meta.id, self.meta.id
            )));
        }
        let seg_id = meta.id;
        let seg = match Segment::new(self, meta) {
            Ok(seg) => seg,
            Err(err) => {
                self.index_holder.drop_segment(seg_id);
                return Err(err);
            }
        };
        if let Some(last) = tree.segments.last() {
            seg.add_ref();
            last.set_next(Some(Arc::clone(&seg)));
        }
        let pos = tree.segments.len();
        tree.helper.insert(seg.id(), pos);
        tree.segments.push(Arc::clone(&seg));
        seg.add_ref();
        tracing::debug!(table = self.meta.id, segment = seg.id(), pos, "segment registered");
        Ok(seg)
    }

    pub fn weak_ref_segment(&self, id: u64) -> Option<Arc<Segment>> {
        let tree = self.tree.read();
        let idx = *tree.helper.get(&id)?;
        tree.segments.get(idx).cloned()
    }

    pub fn strong_ref_segment(&self, id: u64) -> Option<Arc<Segment>> {
        let tree = self.tree.read();
        let idx = *tree.helper.get(&id)?;
        let seg = tree.segments.get(idx)?;
        seg.add_ref();
        Some(Arc::clone(seg))
    }

    pub fn segment_ids(&self) -> Vec<u64> {
        self.tree.read().segments.iter().map(|s| s.id()).collect()
    }

    pub fn segment_count(&self) -> usize {
        self.tree.read().segments.len()
    }

    /// Register a block in the segment named by its metadata
    pub fn register_block(&self, meta: Arc<BlockMeta>) -> Result<Arc<Block>> {
        let seg = self.weak_ref_segment(meta.segment_id).ok_or_else(|| {
            StrataError::Storage(format!(
                "segment {} not found in table {}",
                meta.segment_id, self.meta.id
            ))
        })?;
        seg.register_block(meta)
    }

    // =========================================================================
    // Upgrade
    // =========================================================================

    /// Replace unsorted segment `id` by its sorted clone, in the same slot
    /// and chain position. The table's reference on the retired segment is
    /// released; the returned segment carries a reference owned by the
    /// caller.
    pub fn upgrade_segment(&self, id: u64, meta: Arc<SegmentMeta>) -> Result<Arc<Segment>> {
        let old = self.weak_ref_segment(id).ok_or_else(|| {
            StrataError::Storage(format!("segment {} not found in table {}", id, self.meta.id))
        })?;
        let upgraded = old.clone_with_upgrade(self, meta)?;
        {
            let mut tree = self.tree.write();
            let idx = match tree.helper.get(&id) {
                Some(&idx) => idx,
                None => {
                    tracing::error!(
                        table = self.meta.id,
                        segment = id,
                        "segment vanished during upgrade"
                    );
                    panic!("logic error: segment {} vanished during upgrade", id);
                }
            };
            upgraded.set_next(old.take_next());
            tree.segments[idx] = Arc::clone(&upgraded);
            if idx > 0 {
                upgraded.add_ref();
                tree.segments[idx - 1].set_next(Some(Arc::clone(&upgraded)));
            }
        }
        upgraded.add_ref();
        old.unref();
        tracing::info!(table = self.meta.id, segment = id, "segment replaced by sorted version");
        Ok(upgraded)
    }

    /// Upgrade one block in place inside its unsorted segment
    pub fn upgrade_block(&self, meta: Arc<BlockMeta>) -> Result<Arc<Block>> {
        let seg = self.weak_ref_segment(meta.segment_id).ok_or_else(|| {
            StrataError::Storage(format!(
                "segment {} not found in table {}",
                meta.segment_id, self.meta.id
            ))
        })?;
        seg.upgrade_block(meta)
    }

    // =========================================================================
    // Aggregates
    // =========================================================================

    pub fn get_row_count(&self) -> u64 {
        self.tree.read().segments.iter().map(|s| s.get_row_count()).sum()
    }

    pub fn size(&self, attr: &str) -> u64 {
        self.tree.read().segments.iter().map(|s| s.size(attr)).sum()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> u64 {
        self.meta.id
    }

    pub fn get_meta(&self) -> &Arc<TableMeta> {
        &self.meta
    }

    pub fn get_fs_manager(&self) -> &Arc<dyn FileManager> {
        &self.fs_mgr
    }

    pub fn get_index_holder(&self) -> &Arc<TableIndexHolder> {
        &self.index_holder
    }
}

impl RefCounted for TableData {
    fn ref_helper(&self) -> &RefHelper {
        &self.refs
    }

    fn on_zero(&self) {
        let segments = std::mem::take(&mut self.tree.write().segments);
        for seg in segments {
            seg.unref();
        }
        self.index_holder.unref();
        tracing::debug!(table = self.meta.id, "table data closed");
    }
}

impl fmt::Display for TableData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.read();
        write!(
            f,
            "<TableData[{}]>(SegCnt={})(Refs={})",
            self.meta.id,
            tree.segments.len(),
            self.ref_count()
        )?;
        for seg in &tree.segments {
            write!(f, "\n{}", seg)?;
        }
        Ok(())
    }
}
