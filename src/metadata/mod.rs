//! Metadata Module
//!
//! Descriptive state for tables, segments and blocks. The layout layer
//! (`crate::table`) reads these; it never owns them exclusively.
//!
//! ## Data State Progression
//! ```text
//!   Block:    Empty → Partial → Full
//!   Segment:  Empty → Partial → Full → Closed → Sorted
//! ```

mod block;
mod segment;
mod table;

pub use block::{BlockMeta, LogIndex};
pub use segment::SegmentMeta;
pub use table::{ColumnDef, TableConf, TableMeta};

/// Lifecycle state shared by segment and block metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum DataState {
    Empty = 0,
    Partial = 1,
    Full = 2,
    Closed = 3,
    Sorted = 4,
}

impl DataState {
    pub(crate) fn from_u8(v: u8) -> DataState {
        match v {
            0 => DataState::Empty,
            1 => DataState::Partial,
            2 => DataState::Full,
            3 => DataState::Closed,
            _ => DataState::Sorted,
        }
    }
}
