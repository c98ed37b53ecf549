//! Table Layout Module
//!
//! In-memory layout of a table's storage: table → segment → block → column.
//!
//! ## Responsibilities
//! - Register segments and blocks in order, keeping an adjacency chain
//! - Answer row-count and size queries by delegating downward
//! - Upgrade blocks (transient → persistent) and segments
//!   (unsorted → sorted) without disturbing concurrent readers
//!
//! ## Structure
//! ```text
//!   TableData ──owns──▶ [Segment 0] ─next─▶ [Segment 1] ─next─▶ ...
//!                           │
//!                           └──owns──▶ [Block 0] ─next─▶ [Block 1] ─next─▶ ...
//!                                          │  ▲
//!                                          │  └─prev_version── (upgraded block)
//!                                          └──owns──▶ [ColumnBlock 0..n]
//! ```
//!
//! ## Upgrade Preconditions
//! Callers must not register blocks into a segment while it is being
//! upgraded. Upgrading a sorted segment, or a block the segment does not
//! hold, is a caller bug and panics.

mod block;
mod column;
mod data;
mod segment;

pub use block::Block;
pub use column::ColumnBlock;
pub use data::TableData;
pub use segment::Segment;
