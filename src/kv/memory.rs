//! In-memory KV handler
//!
//! BTreeMap-based store with RwLock for concurrency. Keys stay ordered, so
//! prefix scans are plain range walks.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::{Result, StrataError};

use super::{KvHandler, KvPage};

pub struct MemKvHandler {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    /// Approximate bytes held (keys + values)
    size: AtomicUsize,
    id_counters: Mutex<HashMap<String, u64>>,
}

impl MemKvHandler {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
            size: AtomicUsize::new(0),
            id_counters: Mutex::new(HashMap::new()),
        }
    }

    /// Approximate size in bytes
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn insert_locked(&self, data: &mut BTreeMap<Vec<u8>, Vec<u8>>, key: Vec<u8>, value: Vec<u8>) {
        let key_len = key.len();
        self.size.fetch_add(key_len + value.len(), Ordering::Relaxed);
        if let Some(old) = data.insert(key, value) {
            self.size.fetch_sub(key_len + old.len(), Ordering::Relaxed);
        }
    }
}

impl Default for MemKvHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl KvHandler for MemKvHandler {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or(StrataError::KeyNotFound)
    }

    fn get_batch(&self, keys: &[Vec<u8>]) -> Result<Vec<Option<Vec<u8>>>> {
        let data = self.data.read();
        Ok(keys.iter().map(|k| data.get(k).cloned()).collect())
    }

    fn set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let mut data = self.data.write();
        self.insert_locked(&mut data, key, value);
        Ok(())
    }

    fn set_batch(&self, keys: Vec<Vec<u8>>, values: Vec<Vec<u8>>) -> Result<()> {
        if keys.len() != values.len() {
            return Err(StrataError::Kv(format!(
                "set_batch: {} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        let mut data = self.data.write();
        for (key, value) in keys.into_iter().zip(values) {
            self.insert_locked(&mut data, key, value);
        }
        Ok(())
    }

    fn dedup_set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let mut data = self.data.write();
        if data.contains_key(&key) {
            return Err(StrataError::KeyExists);
        }
        self.insert_locked(&mut data, key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        if let Some(old) = self.data.write().remove(key) {
            self.size.fetch_sub(key.len() + old.len(), Ordering::Relaxed);
        }
        Ok(())
    }

    fn delete_with_prefix(&self, prefix: &[u8]) -> Result<()> {
        let mut data = self.data.write();
        let doomed: Vec<Vec<u8>> = data
            .range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in doomed {
            if let Some(old) = data.remove(&key) {
                self.size.fetch_sub(key.len() + old.len(), Ordering::Relaxed);
            }
        }
        Ok(())
    }

    fn get_with_prefix(&self, start: &[u8], prefix_len: usize, limit: u64) -> Result<KvPage> {
        if prefix_len > start.len() {
            return Err(StrataError::Kv(format!(
                "prefix length {} exceeds start key length {}",
                prefix_len,
                start.len()
            )));
        }
        let prefix = &start[..prefix_len];
        let data = self.data.read();
        let (keys, values) = data
            .range::<[u8], _>((Bound::Included(start), Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(limit as usize)
            .map(|(k, v)| (k.clone(), v.clone()))
            .unzip();
        Ok((keys, values))
    }

    fn next_id(&self, type_name: &str) -> Result<u64> {
        let mut counters = self.id_counters.lock();
        let counter = counters.entry(type_name.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }
}
