//! Common Module
//!
//! Shared primitives used by every storage entity.
//!
//! ## Responsibilities
//! - Logical reference counting with a run-once zero callback
//! - Non-owning singly-linked adjacency between sibling entities
//! - Composite identifiers (table, segment, block)
//! - Segment and block type tags
//!
//! ## Ownership Model
//! ```text
//!   Arc<T>        memory ownership (who can still touch the value)
//!   RefHelper     logical lifecycle (when resources are released)
//!   SllNode<T>    ordering only: Weak<T> + one logical ref on the successor
//! ```

mod id;
mod refs;
mod sll;
mod types;

pub use id::CommonId;
pub use refs::{RefCounted, RefHelper, ZeroCallback};
pub use sll::SllNode;
pub use types::{BlockType, SegmentType};
