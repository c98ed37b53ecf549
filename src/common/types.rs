//! Layout type tags

/// Whether a segment is still being appended to or has been sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentType {
    UnsortedSeg,
    SortedSeg,
}

/// Storage form of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockType {
    /// In memory, still accepting rows
    TransientBlk,
    /// Persisted inside an unsorted segment
    PersistentBlk,
    /// Persisted inside a sorted segment
    PersistentSortedBlk,
}

impl BlockType {
    /// Whether the block no longer accepts rows
    pub fn is_persistent(&self) -> bool {
        !matches!(self, BlockType::TransientBlk)
    }
}
