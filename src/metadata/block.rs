//! Block metadata

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::CommonId;

use super::{DataState, TableMeta};

/// Position of a block's content in the replay log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogIndex {
    pub id: u64,
    pub start: u64,
    pub count: u64,
    pub capacity: u64,
}

impl LogIndex {
    /// Every row of the logged batch has been applied
    pub fn is_applied(&self) -> bool {
        self.start + self.count == self.capacity
    }
}

/// Metadata of one block.
///
/// Row count and per-column sizes are atomics: appenders update them while
/// readers aggregate without taking the segment lock.
#[derive(Debug)]
pub struct BlockMeta {
    pub id: u64,
    pub segment_id: u64,
    pub table: Arc<TableMeta>,
    count: AtomicU64,
    data_state: AtomicU8,
    attr_sizes: Vec<AtomicU64>,
    log_index: RwLock<Option<LogIndex>>,
}

impl BlockMeta {
    pub fn new(table: Arc<TableMeta>, segment_id: u64, id: u64) -> Arc<Self> {
        let attr_sizes = (0..table.column_count()).map(|_| AtomicU64::new(0)).collect();
        Arc::new(Self {
            id,
            segment_id,
            table,
            count: AtomicU64::new(0),
            data_state: AtomicU8::new(DataState::Empty as u8),
            attr_sizes,
            log_index: RwLock::new(None),
        })
    }

    pub fn as_common_id(&self) -> CommonId {
        CommonId::new(self.table.id, self.segment_id, self.id)
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Set the row count, clamped to the block capacity. Reaching capacity
    /// marks the block full.
    pub fn set_count(&self, count: u64) {
        let max = self.table.conf.block_max_rows;
        let count = count.min(max);
        self.count.store(count, Ordering::Release);
        self.refresh_state(count, max);
    }

    /// Append rows and return the new count
    pub fn add_rows(&self, rows: u64) -> u64 {
        let max = self.table.conf.block_max_rows;
        let prev = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + rows).min(max)))
            .unwrap_or_else(|c| c);
        let count = (prev + rows).min(max);
        self.refresh_state(count, max);
        count
    }

    fn refresh_state(&self, count: u64, max: u64) {
        let state = if count >= max {
            DataState::Full
        } else if count > 0 {
            DataState::Partial
        } else {
            DataState::Empty
        };
        self.data_state.store(state as u8, Ordering::Release);
    }

    pub fn data_state(&self) -> DataState {
        DataState::from_u8(self.data_state.load(Ordering::Acquire))
    }

    pub fn set_data_state(&self, state: DataState) {
        self.data_state.store(state as u8, Ordering::Release);
    }

    pub fn is_full(&self) -> bool {
        self.data_state() >= DataState::Full
    }

    /// Bytes held by column `idx`; zero for an unknown column
    pub fn attr_size(&self, idx: usize) -> u64 {
        self.attr_sizes
            .get(idx)
            .map(|s| s.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    pub fn set_attr_size(&self, idx: usize, size: u64) {
        if let Some(slot) = self.attr_sizes.get(idx) {
            slot.store(size, Ordering::Release);
        }
    }

    pub fn set_log_index(&self, index: LogIndex) {
        *self.log_index.write() = Some(index);
    }

    pub fn log_index(&self) -> Option<LogIndex> {
        *self.log_index.read()
    }

    /// Copy of this metadata in the `Full` state, used as the target of an
    /// upgrade
    pub fn upgraded(&self) -> Arc<BlockMeta> {
        let attr_sizes = self
            .attr_sizes
            .iter()
            .map(|s| AtomicU64::new(s.load(Ordering::Acquire)))
            .collect();
        Arc::new(Self {
            id: self.id,
            segment_id: self.segment_id,
            table: Arc::clone(&self.table),
            count: AtomicU64::new(self.count()),
            data_state: AtomicU8::new(DataState::Full as u8),
            attr_sizes,
            log_index: RwLock::new(self.log_index()),
        })
    }
}
