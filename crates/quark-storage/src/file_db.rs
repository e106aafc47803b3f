//! JSON file backend.
//!
//! Keys and values are stored hex-encoded in a single `data.json` document.
//! Every batch rewrites the document, so this backend suits tests and small
//! local deployments.

use crate::db::{Database, KeyValueRead, WriteBatch};
use crate::error::StorageError;
use crate::memory::{apply_batch, scan_table};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_FILE: &str = "data.json";

pub struct FileDatabase {
    path: PathBuf,
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl FileDatabase {
    /// Open (or create) a database rooted at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(path)?;

        let data_file = path.join(DATA_FILE);
        let mut data = BTreeMap::new();
        if data_file.exists() {
            let content = fs::read_to_string(&data_file)?;
            let raw: BTreeMap<String, String> = serde_json::from_str(&content)?;
            for (key, value) in raw {
                data.insert(hex::decode(key)?, hex::decode(value)?);
            }
            tracing::debug!(entries = data.len(), path = %data_file.display(), "Loaded database");
        }

        Ok(Self {
            path: path.to_path_buf(),
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<(), StorageError> {
        let raw: BTreeMap<String, String> = data
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();
        let content = serde_json::to_string_pretty(&raw)?;

        // Atomic replace of the document.
        let tmp = self.path.join(format!("{DATA_FILE}.tmp"));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, self.path.join(DATA_FILE))?;
        Ok(())
    }
}

impl KeyValueRead for FileDatabase {
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

impl Database for FileDatabase {
    fn write_batch(&self, batch: WriteBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut data = self.data.write();
        let mut next = data.clone();
        apply_batch(&mut next, batch);
        // Readers keep seeing the old table until the file is on disk.
        self.persist(&next)?;
        *data = next;
        Ok(())
    }
}
