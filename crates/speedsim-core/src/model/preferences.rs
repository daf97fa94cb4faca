// ── User preferences ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::server::SERVER_CATALOG;

/// Connection mode offered by the landing surface.
///
/// Stored as the lowercase string `multi` or `single`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionMode {
    #[default]
    Multi,
    Single,
}

/// Persisted settings. Missing or invalid values fall back to defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub selected_server_id: u32,
    pub default_connection_mode: ConnectionMode,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            selected_server_id: SERVER_CATALOG[0].id,
            default_connection_mode: ConnectionMode::default(),
        }
    }
}
