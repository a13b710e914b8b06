//! services/client/src/adapters/file_storage.rs
//!
//! A `DurableStorage` adapter that keeps every key in a single JSON file.
//!
//! The file is re-read on every access so that changes made from outside the
//! process (including deleting the file) are always observed.

use habit_tracker_core::ports::{DurableStorage, PortError, PortResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file-backed implementation of the `DurableStorage` port.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Creates a new `FileStorage`. The file and its parent directory are created
    /// lazily on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Entries {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Entries::new(),
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable storage file {:?}: {}", self.path, e);
                Entries::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Entries::new(),
            Err(e) => {
                warn!("Failed to read storage file {:?}: {}", self.path, e);
                Entries::new()
            }
        }
    }

    fn write_entries(&self, entries: &Entries) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PortError::Storage(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(entries).map_err(|e| PortError::Storage(e.to_string()))?;

        // Write to a sibling file first so a crash never leaves half a file behind.
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, content).map_err(|e| PortError::Storage(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| PortError::Storage(e.to_string()))?;
        debug!("Storage file {:?} updated ({} keys)", self.path, entries.len());
        Ok(())
    }
}

//=========================================================================================
// `DurableStorage` Trait Implementation
//=========================================================================================

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock();
        self.read_entries().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries();
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn remove(&self, key: &str) -> PortResult<Option<String>> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries();
        let Some(previous) = entries.remove(key) else {
            return Ok(None);
        };
        self.write_entries(&entries)?;
        Ok(Some(previous))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habit_tracker_core::ports::keys;
    use tempfile::TempDir;

    #[test]
    fn values_survive_a_new_instance() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("storage.json");

        FileStorage::new(&path).set(keys::TOKEN, "abc").unwrap();
        let reopened = FileStorage::new(&path);

        assert_eq!(reopened.token().as_deref(), Some("abc"));
    }

    #[test]
    fn external_deletion_is_observed() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FileStorage::new(dir.path().join("storage.json"));
        storage.set(keys::TOKEN, "abc").unwrap();

        fs::remove_file(storage.path()).unwrap();

        assert_eq!(storage.token(), None);
        assert_eq!(storage.remove(keys::TOKEN).unwrap(), None);
    }

    #[test]
    fn failed_removal_is_an_error_and_keeps_the_value() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FileStorage::new(dir.path().join("storage.json"));
        storage.set(keys::TOKEN, "abc").unwrap();
        storage.set(keys::USER, "{}").unwrap();

        // A directory where the temp file goes makes every write fail.
        fs::create_dir(dir.path().join("storage.tmp")).unwrap();

        assert!(storage.remove(keys::TOKEN).is_err());
        assert!(storage.clear_session().is_err());
        assert_eq!(storage.token().as_deref(), Some("abc"));
    }

    #[test]
    fn corrupt_file_reads_as_empty_and_is_replaced_on_write() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("storage.json");
        fs::write(&path, "not json").unwrap();
        let storage = FileStorage::new(&path);

        assert_eq!(storage.get(keys::USER), None);
        storage.set(keys::USER, "{}").unwrap();
        assert_eq!(storage.get(keys::USER).as_deref(), Some("{}"));
    }
}
