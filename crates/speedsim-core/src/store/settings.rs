// ── Settings ──
//
// Two keys: selected server id and default connection mode. Each value
// falls back to its default independently when absent or unparseable.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{CONNECTION_MODE_KEY, HISTORY_KEY, SERVER_ID_KEY};
use crate::error::CoreError;
use crate::model::{ConnectionMode, Preferences, Server};
use crate::storage::KeyValueStore;

/// Typed access to the persisted preferences.
#[derive(Clone)]
pub struct SettingsStore {
    storage: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Current preferences with defaults substituted for bad values.
    ///
    /// A server id that parses but is not in the catalog also falls back.
    pub fn load(&self) -> Preferences {
        let defaults = Preferences::default();

        let selected_server_id = self
            .storage
            .get(SERVER_ID_KEY)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|id| Server::by_id(*id).is_some())
            .unwrap_or(defaults.selected_server_id);

        let default_connection_mode = self
            .storage
            .get(CONNECTION_MODE_KEY)
            .and_then(|raw| raw.trim().parse::<ConnectionMode>().ok())
            .unwrap_or(defaults.default_connection_mode);

        Preferences {
            selected_server_id,
            default_connection_mode,
        }
    }

    /// The catalog entry for the selected server id.
    pub fn selected_server(&self) -> Server {
        Server::by_id(self.load().selected_server_id).unwrap_or_default()
    }

    /// Persist both values, overwriting previous ones.
    pub fn save(&self, server_id: u32, mode: ConnectionMode) -> Result<(), CoreError> {
        if Server::by_id(server_id).is_none() {
            return Err(CoreError::ServerNotFound { id: server_id });
        }

        self.storage.set(SERVER_ID_KEY, &server_id.to_string())?;
        self.storage.set(CONNECTION_MODE_KEY, mode.as_ref())?;
        debug!(server_id, %mode, "settings saved");
        Ok(())
    }

    /// Factory reset: drop history and both settings keys.
    ///
    /// Three independent deletes. Every delete is attempted; the first
    /// failure is returned and nothing is rolled back.
    pub fn reset_all(&self) -> Result<(), CoreError> {
        let mut first_err = None;

        for key in [HISTORY_KEY, SERVER_ID_KEY, CONNECTION_MODE_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "reset: delete failed");
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => {
                debug!("all data reset");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Local;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::TestResult;
    use crate::model::result::Figures;
    use crate::storage::MemoryStore;
    use crate::store::ResultStore;

    fn stores() -> (Arc<MemoryStore>, SettingsStore, ResultStore) {
        let backend = Arc::new(MemoryStore::new());
        (
            backend.clone(),
            SettingsStore::new(backend.clone()),
            ResultStore::new(backend),
        )
    }

    fn sample_result() -> TestResult {
        TestResult::capture(
            Figures {
                download: 80.0,
                upload: 20.0,
                ping: 9.0,
                jitter: 0.4,
            },
            Server::default_server(),
            Local::now(),
            None,
        )
    }

    #[test]
    fn empty_storage_loads_defaults() {
        let (_, settings, _) = stores();
        assert_eq!(
            settings.load(),
            Preferences {
                selected_server_id: 1,
                default_connection_mode: ConnectionMode::Multi,
            }
        );
    }

    #[test]
    fn save_then_load_round_trips() {
        let (backend, settings, _) = stores();
        settings.save(3, ConnectionMode::Single).unwrap();

        assert_eq!(backend.get(SERVER_ID_KEY).as_deref(), Some("3"));
        assert_eq!(backend.get(CONNECTION_MODE_KEY).as_deref(), Some("single"));
        assert_eq!(settings.load().selected_server_id, 3);
        assert_eq!(settings.selected_server().name, "Interlink Data Center");
    }

    #[test]
    fn save_rejects_ids_outside_catalog() {
        let (backend, settings, _) = stores();
        let err = settings.save(9, ConnectionMode::Multi).unwrap_err();
        assert!(matches!(err, CoreError::ServerNotFound { id: 9 }));
        assert!(backend.get(SERVER_ID_KEY).is_none());
    }

    #[test]
    fn bad_values_fall_back_independently() {
        let (backend, settings, _) = stores();
        backend.set(SERVER_ID_KEY, "two").unwrap();
        backend.set(CONNECTION_MODE_KEY, "single").unwrap();
        let prefs = settings.load();
        assert_eq!(prefs.selected_server_id, 1);
        assert_eq!(prefs.default_connection_mode, ConnectionMode::Single);

        backend.set(SERVER_ID_KEY, "42").unwrap();
        backend.set(CONNECTION_MODE_KEY, "turbo").unwrap();
        assert_eq!(settings.load(), Preferences::default());
    }

    #[test]
    fn reset_all_clears_history_and_settings() {
        let (backend, settings, history) = stores();
        settings.save(4, ConnectionMode::Single).unwrap();
        history.append(sample_result()).unwrap();

        settings.reset_all().unwrap();

        assert!(history.load_all().is_empty());
        assert_eq!(settings.load(), Preferences::default());
        assert!(backend.is_empty());
    }

    #[test]
    fn clearing_history_leaves_settings_alone() {
        let (_, settings, history) = stores();
        settings.save(2, ConnectionMode::Single).unwrap();
        history.append(sample_result()).unwrap();

        history.clear().unwrap();

        assert_eq!(settings.load().selected_server_id, 2);
        assert_eq!(
            settings.load().default_connection_mode,
            ConnectionMode::Single
        );
    }
}
