// ── Result history ──
//
// Append-only, most-recent-first. Persisted as one JSON array; a missing
// or malformed blob reads as an empty history.

use std::sync::Arc;

use tracing::{debug, warn};

use super::HISTORY_KEY;
use crate::error::CoreError;
use crate::model::TestResult;
use crate::storage::KeyValueStore;

/// Ordered store of completed results.
#[derive(Clone)]
pub struct ResultStore {
    storage: Arc<dyn KeyValueStore>,
}

impl ResultStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// All persisted results, newest first.
    pub fn load_all(&self) -> Vec<TestResult> {
        let Some(blob) = self.storage.get(HISTORY_KEY) else {
            return Vec::new();
        };

        match serde_json::from_str::<Option<Vec<TestResult>>>(&blob) {
            Ok(results) => results.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "history blob malformed, treating as empty");
                Vec::new()
            }
        }
    }

    /// The most recent result, if any.
    pub fn latest(&self) -> Option<TestResult> {
        self.load_all().into_iter().next()
    }

    /// Insert `result` at the head and persist the full list.
    pub fn append(&self, result: TestResult) -> Result<(), CoreError> {
        let mut history = self.load_all();
        history.insert(0, result);

        let blob = serde_json::to_string(&history).map_err(|e| CoreError::Encode {
            key: HISTORY_KEY.into(),
            source: e,
        })?;
        self.storage.set(HISTORY_KEY, &blob)?;
        debug!(entries = history.len(), "history appended");
        Ok(())
    }

    /// Remove every persisted result.
    pub fn clear(&self) -> Result<(), CoreError> {
        self.storage.remove(HISTORY_KEY)?;
        debug!("history cleared");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Local;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Server;
    use crate::model::result::Figures;
    use crate::storage::MemoryStore;

    fn result_with_id(id: i64) -> TestResult {
        let mut result = TestResult::capture(
            Figures {
                download: 50.0,
                upload: 10.0,
                ping: 12.0,
                jitter: 1.0,
            },
            Server::default_server(),
            Local::now(),
            None,
        );
        result.id = id;
        result
    }

    fn store() -> (Arc<MemoryStore>, ResultStore) {
        let backend = Arc::new(MemoryStore::new());
        let store = ResultStore::new(backend.clone());
        (backend, store)
    }

    #[test]
    fn empty_storage_loads_empty_history() {
        let (_, store) = store();
        assert!(store.load_all().is_empty());
        assert!(store.latest().is_none());
    }

    #[test]
    fn load_all_returns_reverse_insertion_order() {
        let (_, store) = store();
        for id in 1..=5 {
            store.append(result_with_id(id)).unwrap();
        }

        let ids: Vec<i64> = store.load_all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
        assert_eq!(store.latest().map(|r| r.id), Some(5));
    }

    #[test]
    fn clear_always_empties_history() {
        let (_, store) = store();
        store.clear().unwrap();
        assert!(store.load_all().is_empty());

        store.append(result_with_id(1)).unwrap();
        store.append(result_with_id(2)).unwrap();
        store.clear().unwrap();
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn malformed_blob_reads_as_empty() {
        let (backend, store) = store();
        backend.set(HISTORY_KEY, "[{\"id\": ").unwrap();
        assert!(store.load_all().is_empty());

        backend.set(HISTORY_KEY, "null").unwrap();
        assert!(store.load_all().is_empty());

        backend.set(HISTORY_KEY, "{\"id\": 1}").unwrap();
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn append_after_malformed_blob_starts_fresh() {
        let (backend, store) = store();
        backend.set(HISTORY_KEY, "garbage").unwrap();
        store.append(result_with_id(7)).unwrap();

        let history = store.load_all();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, 7);
    }
}
