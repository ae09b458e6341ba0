use crate::error::Result;
use crate::types::ImageRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Per-run cache of parsed headers keyed by absolute path
///
/// Shared by reference across worker tasks. Entries are inserted once and
/// never invalidated; when two tasks parse the same file concurrently the
/// first insert wins and both get the same record.
#[derive(Debug, Default)]
pub struct HeaderCache {
    records: RwLock<HashMap<PathBuf, Arc<ImageRecord>>>,
}

impl HeaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached record for `path`, parsing the file on a miss
    ///
    /// Parse failures are not cached.
    pub fn get_or_parse(&self, path: &Path) -> Result<Arc<ImageRecord>> {
        let key = absolute(path);
        if let Some(record) = self.get(&key) {
            return Ok(record);
        }

        let record = Arc::new(ImageRecord::from_file(path)?);
        Ok(self.insert(key, record))
    }

    /// Cached record for `path`, if any
    pub fn get(&self, path: &Path) -> Option<Arc<ImageRecord>> {
        let key = absolute(path);
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(&key).cloned())
    }

    /// Inserts a record unless one is already present, returning the stored one
    pub fn insert(&self, path: PathBuf, record: Arc<ImageRecord>) -> Arc<ImageRecord> {
        let key = absolute(&path);
        match self.records.write() {
            Ok(mut records) => records.entry(key).or_insert(record).clone(),
            // poisoned: hand back the record uncached
            Err(_) => record,
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Absolute form of a path without touching the file system more than needed
pub fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
