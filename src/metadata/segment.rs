//! Segment metadata

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::CommonId;
use crate::error::{Result, StrataError};

use super::{BlockMeta, DataState, TableMeta};

#[derive(Debug)]
pub struct SegmentMeta {
    pub id: u64,
    pub table: Arc<TableMeta>,
    data_state: AtomicU8,
    blocks: RwLock<Vec<Arc<BlockMeta>>>,
}

impl SegmentMeta {
    pub fn new(table: Arc<TableMeta>, id: u64) -> Arc<Self> {
        Arc::new(Self {
            id,
            table,
            data_state: AtomicU8::new(DataState::Empty as u8),
            blocks: RwLock::new(Vec::new()),
        })
    }

    pub fn as_common_id(&self) -> CommonId {
        CommonId::new(self.table.id, self.id, 0)
    }

    /// Create metadata for a new block at the end of this segment
    pub fn create_block(&self, id: u64) -> Result<Arc<BlockMeta>> {
        let max = self.table.conf.segment_max_blocks as usize;
        let mut blocks = self.blocks.write();
        if blocks.len() >= max {
            return Err(StrataError::Storage(format!(
                "segment {} already holds {} blocks",
                self.id, max
            )));
        }
        if blocks.iter().any(|b| b.id == id) {
            return Err(StrataError::InvalidBlock(format!(
                "block {} already exists in segment {}",
                id, self.id
            )));
        }
        let meta = BlockMeta::new(Arc::clone(&self.table), self.id, id);
        blocks.push(Arc::clone(&meta));
        let state = if blocks.len() == max {
            DataState::Full
        } else {
            DataState::Partial
        };
        self.set_data_state(state);
        Ok(meta)
    }

    pub fn reference_block(&self, id: u64) -> Result<Arc<BlockMeta>> {
        self.blocks
            .read()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| {
                StrataError::InvalidBlock(format!("block {} not found in segment {}", id, self.id))
            })
    }

    pub fn block_ids(&self) -> Vec<u64> {
        self.blocks.read().iter().map(|b| b.id).collect()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn data_state(&self) -> DataState {
        DataState::from_u8(self.data_state.load(Ordering::Acquire))
    }

    pub fn set_data_state(&self, state: DataState) {
        self.data_state.store(state as u8, Ordering::Release);
    }

    /// Metadata for the sorted successor of this segment: same ID, every
    /// block copied in the `Full` state
    pub fn to_sorted(&self) -> Arc<SegmentMeta> {
        let blocks = self.blocks.read().iter().map(|b| b.upgraded()).collect();
        Arc::new(Self {
            id: self.id,
            table: Arc::clone(&self.table),
            data_state: AtomicU8::new(DataState::Sorted as u8),
            blocks: RwLock::new(blocks),
        })
    }
}
