//! KV Handler Module
//!
//! Ordered key-value storage underneath the catalog.
//!
//! ## Responsibilities
//! - Point get/set/delete on byte keys
//! - Prefix scans in key order, one page at a time
//! - Per-type ID allocation
//!
//! ## Paging
//! `get_with_prefix(start, prefix_len, limit)` returns up to `limit` keys
//! `>= start` whose first `prefix_len` bytes equal `start[..prefix_len]`.
//! The next page starts at `successor_of_key(last_key)` with the same
//! `prefix_len`; an empty page ends the scan.

mod memory;

use crate::error::Result;

pub use memory::MemKvHandler;

/// Keys and values of one scan page, in key order
pub type KvPage = (Vec<Vec<u8>>, Vec<Vec<u8>>);

pub trait KvHandler: Send + Sync {
    /// Value of `key`, or `StrataError::KeyNotFound`
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Values of `keys` in the same order; `None` for absent keys
    fn get_batch(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Insert or overwrite
    fn set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    fn set_batch(&self, keys: Vec<Vec<u8>>, values: Vec<Vec<u8>>) -> Result<()>;

    /// Insert only if absent, else `StrataError::KeyExists`
    fn dedup_set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;

    /// Remove `key`; absent keys are not an error
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Remove every key starting with `prefix`
    fn delete_with_prefix(&self, prefix: &[u8]) -> Result<()>;

    fn get_with_prefix(&self, start: &[u8], prefix_len: usize, limit: u64) -> Result<KvPage>;

    /// Next ID for `type_name`, starting at 1
    fn next_id(&self, type_name: &str) -> Result<u64>;
}
