//! In-memory backend.

use crate::db::{Database, KeyValueRead, KeyValueWrite, WriteBatch};
use crate::error::StorageError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered map guarded by a single reader-writer lock.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    data: RwLock<Table>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueRead for MemoryDatabase {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn scan(
        &self,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        Ok(scan_table(&self.data.read(), start, end, limit))
    }
}

impl KeyValueWrite for MemoryDatabase {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.data.get_mut().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StorageError> {
        self.data.get_mut().remove(key);
        Ok(())
    }
}

impl Database for MemoryDatabase {
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut data = self.data.write();
        apply_batch(&mut data, batch);
        Ok(())
    }
}

pub(crate) fn scan_table(
    table: &Table,
    start: &[u8],
    end: Option<&[u8]>,
    limit: usize,
) -> Vec<(Vec<u8>, Vec<u8>)> {
    if end.map_or(false, |end| end <= start) {
        return Vec::new();
    }
    let upper = match end {
        Some(end) => Bound::Excluded(end.to_vec()),
        None => Bound::Unbounded,
    };
    let iter = table
        .range::<Vec<u8>, _>((Bound::Included(start.to_vec()), upper))
        .map(|(k, v)| (k.clone(), v.clone()));
    if limit == 0 {
        iter.collect()
    } else {
        iter.take(limit).collect()
    }
}

pub(crate) fn apply_batch(table: &mut Table, batch: WriteBatch) {
    for (key, op) in batch.iter() {
        match op {
            Some(value) => {
                table.insert(key.clone(), value.clone());
            }
            None => {
                table.remove(key);
            }
        }
    }
}
