//! Segment file handle

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::common::{CommonId, RefCounted, RefHelper, SegmentType};
use crate::error::Result;

/// Reference-counted handle on one segment file
#[derive(Debug)]
pub struct SegmentFile {
    id: CommonId,
    kind: SegmentType,
    path: PathBuf,
    /// Set once a sorted file has replaced this unsorted one
    superseded: AtomicBool,
    refs: RefHelper,
}

impl SegmentFile {
    /// Open the file at `path`, creating it if missing. The handle starts
    /// with no references.
    pub(crate) fn create(id: CommonId, kind: SegmentType, path: PathBuf) -> Result<Arc<Self>> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Arc::new(Self {
            id,
            kind,
            path,
            superseded: AtomicBool::new(false),
            refs: RefHelper::new(),
        }))
    }

    pub fn id(&self) -> CommonId {
        self.id
    }

    pub fn kind(&self) -> SegmentType {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size on disk in bytes
    pub fn size(&self) -> Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    pub fn is_superseded(&self) -> bool {
        self.superseded.load(Ordering::Acquire)
    }

    pub(crate) fn mark_superseded(&self) {
        self.superseded.store(true, Ordering::Release);
    }
}

impl RefCounted for SegmentFile {
    fn ref_helper(&self) -> &RefHelper {
        &self.refs
    }

    fn on_zero(&self) {
        tracing::debug!(file = %self.path.display(), "segment file released");
        if self.kind == SegmentType::UnsortedSeg && self.is_superseded() {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(
                    file = %self.path.display(),
                    error = %e,
                    "failed to remove superseded file"
                );
            }
        }
    }
}
