// ── Persistent stores ──
//
// Result history and settings, each a thin typed layer over one or two
// keys of the shared key-value storage.

mod history;
mod settings;

pub use history::ResultStore;
pub use settings::SettingsStore;

/// Storage key holding the serialized history list.
pub const HISTORY_KEY: &str = "speedTestHistory";
/// Storage key holding the selected server id.
pub const SERVER_ID_KEY: &str = "selectedServerId";
/// Storage key holding the default connection mode.
pub const CONNECTION_MODE_KEY: &str = "defaultConnectionMode";
