//! Index Holder Module
//!
//! Per-table, per-segment and per-block secondary index registries.
//!
//! ## Hierarchy
//! ```text
//!   TableIndexHolder
//!     └── SegmentIndexHolder (one per segment, replaced on upgrade)
//!           └── BlockIndexHolder (one per block, replaced on upgrade)
//! ```
//!
//! Each parent keeps one reference on every child it maps. Register,
//! strong-ref and upgrade calls return a child with an additional
//! reference owned by the caller.

mod holder;

pub use holder::{BlockIndexHolder, IndexOptions, SegmentIndexHolder, TableIndexHolder};
