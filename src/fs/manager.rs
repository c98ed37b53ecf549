//! Directory-backed file manager
//!
//! Keeps every registered segment file of one directory in two maps,
//! unsorted and sorted, behind a single lock so an upgrade moves a file
//! between them atomically.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{CommonId, RefCounted, SegmentType};
use crate::error::Result;

use super::{FileManager, SegmentFile};

#[derive(Default)]
struct Files {
    unsorted: HashMap<CommonId, Arc<SegmentFile>>,
    sorted: HashMap<CommonId, Arc<SegmentFile>>,
}

/// File manager over one directory
///
/// ## Concurrency:
/// - `files`: Protected by RwLock (lookups share, registration is exclusive)
/// - All methods use `&self`
pub struct DirFileManager {
    /// Directory where segment files are stored
    dir: PathBuf,

    files: RwLock<Files>,
}

impl DirFileManager {
    const UNSORTED_EXT: &'static str = "useg";
    const SORTED_EXT: &'static str = "sseg";

    /// Open or create a file manager over `path`
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing segment files
    /// 3. Register each under its kind
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut files = Files::default();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if !file_path.is_file() {
                continue;
            }
            let Some((id, kind)) = Self::parse_segment_file(&file_path) else {
                continue;
            };
            let file = SegmentFile::create(id, kind, file_path)?;
            file.add_ref();
            match kind {
                SegmentType::UnsortedSeg => files.unsorted.insert(id, file),
                SegmentType::SortedSeg => files.sorted.insert(id, file),
            };
        }

        tracing::debug!(
            dir = %path.display(),
            unsorted = files.unsorted.len(),
            sorted = files.sorted.len(),
            "file manager opened"
        );

        Ok(Self {
            dir: path.to_path_buf(),
            files: RwLock::new(files),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// IDs of registered sorted files, ascending
    pub fn sorted_ids(&self) -> Vec<CommonId> {
        let mut ids: Vec<_> = self.files.read().sorted.keys().copied().collect();
        ids.sort();
        ids
    }

    /// IDs of registered unsorted files, ascending
    pub fn unsorted_ids(&self) -> Vec<CommonId> {
        let mut ids: Vec<_> = self.files.read().unsorted.keys().copied().collect();
        ids.sort();
        ids
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn file_path(&self, id: &CommonId, kind: SegmentType) -> PathBuf {
        let ext = match kind {
            SegmentType::UnsortedSeg => Self::UNSORTED_EXT,
            SegmentType::SortedSeg => Self::SORTED_EXT,
        };
        self.dir
            .join(format!("{:06}_{:06}.{}", id.table_id, id.segment_id, ext))
    }

    /// "000003_000042.sseg" → Some((<3:42-0>, SortedSeg))
    fn parse_segment_file(path: &Path) -> Option<(CommonId, SegmentType)> {
        let kind = match path.extension()?.to_str()? {
            Self::UNSORTED_EXT => SegmentType::UnsortedSeg,
            Self::SORTED_EXT => SegmentType::SortedSeg,
            _ => return None,
        };
        let stem = path.file_stem()?.to_string_lossy();
        let (table, segment) = stem.split_once('_')?;
        let id = CommonId::new(table.parse().ok()?, segment.parse().ok()?, 0);
        Some((id, kind))
    }

    fn register(&self, id: &CommonId, kind: SegmentType) -> Result<Arc<SegmentFile>> {
        let id = id.as_segment_id();
        let mut files = self.files.write();
        let map = match kind {
            SegmentType::UnsortedSeg => &mut files.unsorted,
            SegmentType::SortedSeg => &mut files.sorted,
        };
        if let Some(existing) = map.get(&id) {
            return Ok(Arc::clone(existing));
        }
        let file = SegmentFile::create(id, kind, self.file_path(&id, kind))?;
        file.add_ref();
        map.insert(id, Arc::clone(&file));
        tracing::debug!(segment = %id, kind = ?kind, "segment file registered");
        Ok(file)
    }

    /// Copy the unsorted file into place unless a sorted file is already
    /// on disk, which is opened as is
    fn materialize_sorted(
        &self,
        id: &CommonId,
        unsorted: &SegmentFile,
    ) -> Result<Arc<SegmentFile>> {
        let sorted_path = self.file_path(id, SegmentType::SortedSeg);
        if !sorted_path.exists() {
            fs::copy(unsorted.path(), &sorted_path)?;
        }
        SegmentFile::create(*id, SegmentType::SortedSeg, sorted_path)
    }

    fn unregister(&self, id: &CommonId, kind: SegmentType) {
        let id = id.as_segment_id();
        let removed = {
            let mut files = self.files.write();
            match kind {
                SegmentType::UnsortedSeg => files.unsorted.remove(&id),
                SegmentType::SortedSeg => files.sorted.remove(&id),
            }
        };
        if let Some(file) = removed {
            file.unref();
        }
    }
}

impl FileManager for DirFileManager {
    fn get_unsorted_file(&self, id: &CommonId) -> Option<Arc<SegmentFile>> {
        self.files.read().unsorted.get(&id.as_segment_id()).cloned()
    }

    fn register_unsorted_files(&self, id: &CommonId) -> Result<Arc<SegmentFile>> {
        self.register(id, SegmentType::UnsortedSeg)
    }

    fn get_sorted_file(&self, id: &CommonId) -> Option<Arc<SegmentFile>> {
        self.files.read().sorted.get(&id.as_segment_id()).cloned()
    }

    fn register_sorted_files(&self, id: &CommonId) -> Result<Arc<SegmentFile>> {
        self.register(id, SegmentType::SortedSeg)
    }

    fn upgrade_file(&self, id: &CommonId) -> Option<Arc<SegmentFile>> {
        let id = id.as_segment_id();
        let (unsorted, sorted) = {
            let mut files = self.files.write();
            let unsorted = files.unsorted.remove(&id)?;
            let sorted = match files.sorted.get(&id) {
                // Sorted file already discovered: it wins over the stale copy
                Some(existing) => Arc::clone(existing),
                None => match self.materialize_sorted(&id, &unsorted) {
                    Ok(file) => {
                        file.add_ref();
                        files.sorted.insert(id, Arc::clone(&file));
                        file
                    }
                    Err(e) => {
                        tracing::error!(
                            segment = %id,
                            error = %e,
                            "failed to materialize sorted file"
                        );
                        files.unsorted.insert(id, unsorted);
                        return None;
                    }
                },
            };
            (unsorted, sorted)
        };

        unsorted.mark_superseded();
        unsorted.unref();
        tracing::info!(segment = %id, "segment file upgraded");
        Some(sorted)
    }

    fn unregister_unsorted_file(&self, id: &CommonId) {
        self.unregister(id, SegmentType::UnsortedSeg)
    }

    fn unregister_sorted_file(&self, id: &CommonId) {
        self.unregister(id, SegmentType::SortedSeg)
    }
}
