//! Copy-on-write view over a read-only store.

use crate::db::{in_range, KeyValueRead, KeyValueWrite, WriteBatch};
use crate::error::StorageError;
use std::collections::BTreeMap;

/// Buffers writes in a [`WriteBatch`] while serving reads from the batch
/// first and the base second.
///
/// Overlays nest: an overlay over an overlay sees the writes of both, which is
/// how a block is simulated on top of undecided ancestors.
pub struct Overlay<'a, R: KeyValueRead + ?Sized> {
    base: &'a R,
    batch: WriteBatch,
}

impl<'a, R: KeyValueRead + ?Sized> Overlay<'a, R> {
    pub fn new(base: &'a R) -> Self {
        Self::with_batch(base, WriteBatch::new())
    }

    /// Start from pending writes that sit between `base` and this view.
    pub fn with_batch(base: &'a R, batch: WriteBatch) -> Self {
        Self { base, batch }
    }

    pub fn batch(&self) -> &WriteBatch {
        &self.batch
    }

    /// Consume the overlay, yielding the buffered writes.
    pub fn into_batch(self) -> WriteBatch {
        self.batch
    }
}

impl<R: KeyValueRead + ?Sized> KeyValueRead for Overlay<'_, R> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        match self.batch.get(key) {
            Some(pending) => Ok(pending.map(<[u8]>::to_vec)),
            None => self.base.get(key),
        }
    }

    fn scan(
        &self,
        start: &[u8],
        end: Option<&[u8]>,
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        if end.map_or(false, |end| end <= start) {
            return Ok(Vec::new());
        }

        // Each pending delete can hide at most one base row.
        let deletes = self
            .batch
            .range(start, end)
            .filter(|(_, op)| op.is_none())
            .count();
        let base_limit = if limit == 0 { 0 } else { limit + deletes };

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.scan(start, end, base_limit)?.into_iter().collect();
        for (key, op) in self.batch.range(start, end) {
            debug_assert!(in_range(key, start, end));
            match op {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }

        let rows = merged.into_iter();
        Ok(if limit == 0 {
            rows.collect()
        } else {
            rows.take(limit).collect()
        })
    }
}

impl<R: KeyValueRead + ?Sized> KeyValueWrite for Overlay<'_, R> {
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.batch.put(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StorageError> {
        self.batch.delete(key);
        Ok(())
    }
}
