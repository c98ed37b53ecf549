//! File Manager Module
//!
//! Maps segment IDs to physical segment files.
//!
//! ## Responsibilities
//! - Register and look up unsorted/sorted segment files
//! - Upgrade an unsorted file into its sorted counterpart in place
//! - Discover sorted files left by a previous run
//!
//! ## File Naming
//! ```text
//! {segment_dir}/
//!   ├── {table}_{segment}.useg   (unsorted, still receiving blocks)
//!   └── {table}_{segment}.sseg   (sorted, immutable)
//! ```
//!
//! Every lookup hands out a weak handle: callers that keep the file take
//! their own reference with `add_ref`. The manager itself holds one
//! reference per registered file and gives it back on unregister/upgrade.

mod file;
mod manager;

use std::sync::Arc;

use crate::common::CommonId;
use crate::error::Result;

pub use file::SegmentFile;
pub use manager::DirFileManager;

/// Physical storage behind segments
pub trait FileManager: Send + Sync {
    fn get_unsorted_file(&self, id: &CommonId) -> Option<Arc<SegmentFile>>;

    fn register_unsorted_files(&self, id: &CommonId) -> Result<Arc<SegmentFile>>;

    fn get_sorted_file(&self, id: &CommonId) -> Option<Arc<SegmentFile>>;

    fn register_sorted_files(&self, id: &CommonId) -> Result<Arc<SegmentFile>>;

    /// Replace the unsorted file of `id` by a sorted one. `None` when no
    /// unsorted file is registered or the sorted file cannot be created.
    fn upgrade_file(&self, id: &CommonId) -> Option<Arc<SegmentFile>>;

    fn unregister_unsorted_file(&self, id: &CommonId);

    fn unregister_sorted_file(&self, id: &CommonId);
}
