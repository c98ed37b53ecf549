//! # Strata
//!
//! Storage substrate for a columnar analytical store:
//! - Reference-counted table → segment → block layout with in-place
//!   upgrades (transient → persistent blocks, unsorted → sorted segments)
//! - Pluggable segment file management and index holders
//! - Order-preserving tuple codec
//! - Schema catalog (database and relation descriptors) over ordered KV
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────┐      ┌──────────────────────────────┐
//! │          TableData           │      │      DescriptorHandler       │
//! │  (segments, index holder)    │      │  (databases, relations, GC)  │
//! └──────────────┬───────────────┘      └──────────────┬───────────────┘
//!                │                                     │
//!                ▼                                     ▼
//!        ┌───────────────┐                     ┌───────────────┐
//!        │    Segment    │──▶ FileManager      │  Tuple Codec  │
//!        │  (RwLock)     │──▶ IndexHolder      └───────┬───────┘
//!        └───────┬───────┘                             │
//!                │                                     ▼
//!                ▼                             ┌───────────────┐
//!        ┌───────────────┐                     │   KvHandler   │
//!        │ Block/Column  │                     │  (ordered)    │
//!        └───────────────┘                     └───────────────┘
//! ```
//!
//! ## Ownership
//! `Arc` owns memory; `RefCounted` decides when an entity releases what it
//! holds. Successor links are weak and version links never count.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod codec;
pub mod common;
pub mod descriptor;
pub mod fs;
pub mod index;
pub mod kv;
pub mod metadata;
pub mod table;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{BodyFormat, Config};
pub use error::{Result, StrataError};

pub use common::{CommonId, RefCounted};
pub use descriptor::{DescriptorHandler, DescriptorHandlerImpl};
pub use fs::{DirFileManager, FileManager};
pub use kv::{KvHandler, MemKvHandler};
pub use table::{Block, Segment, TableData};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Strata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
