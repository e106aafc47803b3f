//! Storage contracts shared by every backend.

use crate::error::StorageError;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered read access to a key-value store.
pub trait KeyValueRead {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Ascending pairs with `start <= key < end`.
    ///
    /// `end = None` leaves the range unbounded; `limit = 0` returns every
    /// match.
    fn scan(
        &self,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError>;

    fn has(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}

/// Exclusive write access, used by single-writer paths and overlays.
pub trait KeyValueWrite: KeyValueRead {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StorageError>;
}

/// A shared, host-owned store.
///
/// `write_batch` must be atomic with respect to concurrent readers: a reader
/// sees either none or all of the batch.
pub trait Database: KeyValueRead + Send + Sync {
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError>;
}

/// Buffered writes, applied in key order. A later write to the same key
/// replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a value into the batch.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.ops.insert(key.to_vec(), Some(value.to_vec()));
    }

    /// Delete a value in the batch.
    pub fn delete(&mut self, key: &[u8]) {
        self.ops.insert(key.to_vec(), None);
    }

    /// `Some(None)` when the batch deletes `key`, `None` when it does not
    /// touch it.
    pub fn get(&self, key: &[u8]) -> Option<Option<&[u8]>> {
        self.ops.get(key).map(|v| v.as_deref())
    }

    /// Fold `other` on top of this batch.
    pub fn merge(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }

    /// Operations with keys in `[start, end)`.
    pub fn range<'a>(
        &'a self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> impl Iterator<Item = (&'a Vec<u8>, &'a Option<Vec<u8>>)> + 'a {
        let upper = match end {
            Some(end) => Bound::Excluded(end.to_vec()),
            None => Bound::Unbounded,
        };
        self.ops
            .range::<Vec<u8>, _>((Bound::Included(start.to_vec()), upper))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Option<Vec<u8>>)> {
        self.ops.iter()
    }

    /// Get the batch size.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if batch is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// True when `key` lies in `[start, end)`.
pub(crate) fn in_range(key: &[u8], start: &[u8], end: Option<&[u8]>) -> bool {
    key >= start && end.map_or(true, |end| key < end)
}
