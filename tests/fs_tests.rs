//! File Manager Tests
//!
//! Tests verify:
//! - Registration and lookup of unsorted/sorted files
//! - Upgrade moves a file from unsorted to sorted
//! - Upgrade after a restart keeps a sorted file already on disk
//! - Unregister releases the manager's reference
//! - Discovery of existing files on open
//! - Index holder registration and upgrade

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use strata::common::{BlockType, CommonId, RefCounted, SegmentType};
use strata::index::{IndexOptions, TableIndexHolder};
use strata::{DirFileManager, FileManager};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_storage() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("segments");
    (temp_dir, path)
}

fn seg(table_id: u64, segment_id: u64) -> CommonId {
    CommonId::new(table_id, segment_id, 0)
}

// =============================================================================
// Registration Tests
// =============================================================================

#[test]
fn test_open_creates_directory() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();

    assert!(path.is_dir());
    assert_eq!(mgr.dir(), path.as_path());
    assert!(mgr.sorted_ids().is_empty());
}

#[test]
fn test_register_unsorted_file() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();

    let file = mgr.register_unsorted_files(&seg(1, 2)).unwrap();

    assert_eq!(file.kind(), SegmentType::UnsortedSeg);
    assert_eq!(file.id(), seg(1, 2));
    assert!(file.path().ends_with("000001_000002.useg"));
    assert!(file.path().exists());
    assert_eq!(file.size().unwrap(), 0);
    assert_eq!(file.ref_count(), 1);
}

#[test]
fn test_register_uses_segment_part_of_id() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();

    let file = mgr.register_sorted_files(&CommonId::new(1, 2, 7)).unwrap();
    let found = mgr.get_sorted_file(&seg(1, 2)).unwrap();

    assert!(Arc::ptr_eq(&file, &found));
}

#[test]
fn test_register_twice_returns_same_file() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();

    let a = mgr.register_unsorted_files(&seg(1, 1)).unwrap();
    let b = mgr.register_unsorted_files(&seg(1, 1)).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.ref_count(), 1);
}

#[test]
fn test_lookup_by_kind() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();
    mgr.register_unsorted_files(&seg(1, 1)).unwrap();

    assert!(mgr.get_unsorted_file(&seg(1, 1)).is_some());
    assert!(mgr.get_sorted_file(&seg(1, 1)).is_none());
    assert!(mgr.get_unsorted_file(&seg(1, 2)).is_none());
}

// =============================================================================
// Upgrade Tests
// =============================================================================

#[test]
fn test_upgrade_file_moves_to_sorted() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();
    let unsorted = mgr.register_unsorted_files(&seg(1, 1)).unwrap();
    fs::write(unsorted.path(), b"rows").unwrap();

    let sorted = mgr.upgrade_file(&seg(1, 1)).unwrap();

    assert_eq!(sorted.kind(), SegmentType::SortedSeg);
    assert_eq!(sorted.size().unwrap(), 4);
    assert!(mgr.get_unsorted_file(&seg(1, 1)).is_none());
    assert!(Arc::ptr_eq(&mgr.get_sorted_file(&seg(1, 1)).unwrap(), &sorted));
    assert!(unsorted.is_superseded());
    // nothing else held the unsorted file
    assert!(!unsorted.path().exists());
}

#[test]
fn test_upgrade_keeps_held_unsorted_file() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();
    let unsorted = mgr.register_unsorted_files(&seg(1, 1)).unwrap();
    unsorted.add_ref();

    mgr.upgrade_file(&seg(1, 1)).unwrap();
    assert!(unsorted.path().exists());

    unsorted.unref();
    assert!(!unsorted.path().exists());
}

#[test]
fn test_upgrade_without_unsorted_file() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();

    assert!(mgr.upgrade_file(&seg(1, 1)).is_none());
}

// =============================================================================
// Unregister Tests
// =============================================================================

#[test]
fn test_unregister_releases_manager_ref() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();
    let file = mgr.register_sorted_files(&seg(2, 1)).unwrap();
    file.add_ref();

    mgr.unregister_sorted_file(&seg(2, 1));

    assert!(mgr.get_sorted_file(&seg(2, 1)).is_none());
    assert_eq!(file.ref_count(), 1);
    // sorted files are never deleted on release
    file.unref();
    assert!(file.path().exists());
}

#[test]
fn test_unregister_unknown_is_noop() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();

    mgr.unregister_unsorted_file(&seg(1, 1));
    mgr.unregister_sorted_file(&seg(1, 1));
}

// =============================================================================
// Discovery Tests
// =============================================================================

#[test]
fn test_open_discovers_existing_files() {
    let (_dir, path) = setup_temp_storage();
    {
        let mgr = DirFileManager::open(&path).unwrap();
        mgr.register_sorted_files(&seg(1, 3)).unwrap();
        mgr.register_sorted_files(&seg(1, 1)).unwrap();
        mgr.register_unsorted_files(&seg(2, 5)).unwrap();
    }
    fs::write(path.join("notes.txt"), b"ignored").unwrap();
    fs::write(path.join("bogus.sseg"), b"ignored").unwrap();

    let mgr = DirFileManager::open(&path).unwrap();

    assert_eq!(mgr.sorted_ids(), vec![seg(1, 1), seg(1, 3)]);
    assert_eq!(mgr.unsorted_ids(), vec![seg(2, 5)]);
    assert_eq!(mgr.get_sorted_file(&seg(1, 3)).unwrap().ref_count(), 1);
}

#[test]
fn test_upgrade_after_restart_keeps_discovered_sorted_file() {
    let (_dir, path) = setup_temp_storage();
    fs::create_dir_all(&path).unwrap();
    let sorted_path = path.join("000001_000001.sseg");
    let unsorted_path = path.join("000001_000001.useg");
    fs::write(&sorted_path, b"SORTED-DATA").unwrap();
    fs::write(&unsorted_path, b"stale-unsorted").unwrap();

    let mgr = DirFileManager::open(&path).unwrap();
    let discovered = mgr.get_sorted_file(&seg(1, 1)).unwrap();

    let sorted = mgr.upgrade_file(&seg(1, 1)).unwrap();

    assert!(Arc::ptr_eq(&sorted, &discovered));
    assert_eq!(discovered.ref_count(), 1);
    assert_eq!(fs::read(&sorted_path).unwrap(), b"SORTED-DATA");
    assert!(!unsorted_path.exists());
    assert!(mgr.unsorted_ids().is_empty());
    assert_eq!(mgr.sorted_ids(), vec![seg(1, 1)]);
}

#[test]
fn test_upgrade_opens_unregistered_sorted_file_as_is() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();
    let unsorted = mgr.register_unsorted_files(&seg(1, 2)).unwrap();
    fs::write(unsorted.path(), b"stale").unwrap();
    let sorted_path = path.join("000001_000002.sseg");
    fs::write(&sorted_path, b"already-sorted").unwrap();

    let sorted = mgr.upgrade_file(&seg(1, 2)).unwrap();

    assert_eq!(sorted.ref_count(), 1);
    assert_eq!(fs::read(&sorted_path).unwrap(), b"already-sorted");
}

// =============================================================================
// Index Holder Tests
// =============================================================================

#[test]
fn test_index_holder_register_segment() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();
    let file = mgr.register_unsorted_files(&seg(1, 1)).unwrap();
    let table = TableIndexHolder::new(1);
    let opts = IndexOptions { columns: vec![0, 2] };

    let holder = table.register_segment(seg(1, 1), SegmentType::UnsortedSeg, Some(opts.clone()));
    holder.init(&file);

    assert!(holder.inited());
    assert_eq!(holder.options(), &opts);
    assert_eq!(holder.ref_count(), 2);
    assert_eq!(file.ref_count(), 2);

    let again = table.register_segment(seg(1, 1), SegmentType::UnsortedSeg, None);
    assert!(Arc::ptr_eq(&holder, &again));
    assert_eq!(table.segment_count(), 1);
}

#[test]
fn test_index_holder_upgrade_segment() {
    let table = TableIndexHolder::new(1);
    let old = table.register_segment(seg(1, 1), SegmentType::UnsortedSeg, None);
    old.register_block(CommonId::new(1, 1, 1), BlockType::PersistentBlk).unref();

    let upgraded = table.upgrade_segment(1, SegmentType::SortedSeg).unwrap();

    assert_eq!(upgraded.seg_type(), SegmentType::SortedSeg);
    assert_eq!(upgraded.block_count(), 0);
    assert_eq!(old.ref_count(), 1);
    assert!(!Arc::ptr_eq(&old, &table.strong_ref_segment(1).unwrap()));
    assert!(table.upgrade_segment(9, SegmentType::SortedSeg).is_none());
}

#[test]
fn test_table_index_holder_release_cascades() {
    let (_dir, path) = setup_temp_storage();
    let mgr = DirFileManager::open(&path).unwrap();
    let file = mgr.register_unsorted_files(&seg(1, 1)).unwrap();
    let table = TableIndexHolder::new(1);
    let holder = table.register_segment(seg(1, 1), SegmentType::UnsortedSeg, None);
    holder.init(&file);
    let blk = holder.register_block(CommonId::new(1, 1, 1), BlockType::TransientBlk);
    holder.unref();
    blk.unref();

    table.unref();

    assert_eq!(holder.ref_count(), 0);
    assert_eq!(blk.ref_count(), 0);
    assert_eq!(file.ref_count(), 1);
}
