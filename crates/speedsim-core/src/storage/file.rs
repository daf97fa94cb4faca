// ── JSON file backend ──
//
// All keys live in one JSON object on disk. Writes are read-modify-write
// of the whole file under a process-local lock. The new contents go to a
// temp file in the same directory which is then renamed over the old one,
// so a crash mid-write leaves the previous file intact.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::KeyValueStore;
use crate::error::CoreError;

type Entries = BTreeMap<String, String>;

/// Durable storage backed by a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (lazily) a store at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the entry map. A missing file is empty; a corrupt one is
    /// logged and treated as empty.
    fn read_entries(&self) -> Entries {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Entries::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "storage file unreadable");
                return Entries::new();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "storage file corrupt, ignoring");
            Entries::new()
        })
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), CoreError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|e| CoreError::storage(parent, e))?;

        let json = serde_json::to_string_pretty(entries).map_err(|e| CoreError::Encode {
            key: self.path.display().to_string(),
            source: e,
        })?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| CoreError::storage(parent, e))?;
        tmp.write_all(json.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CoreError::storage(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| CoreError::storage(&self.path, e.error))?;
        debug!(path = %self.path.display(), keys = entries.len(), "storage file written");
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut Entries)) -> Result<(), CoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| CoreError::Internal("storage lock poisoned".into()))?;
        let mut entries = self.read_entries();
        f(&mut entries);
        self.write_entries(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().ok()?;
        self.read_entries().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.modify(|entries| {
            entries.insert(key.to_owned(), value.to_owned());
        })
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.modify(|entries| {
            entries.remove(key);
        })
    }
}
