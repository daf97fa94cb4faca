// ── Server identities ──
//
// One catalog for every surface. Results copy a `Server` by value, so
// the catalog can be edited between releases without rewriting history.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named, located test endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Server {
    pub id: u32,
    pub name: String,
    pub location: String,
    pub ip: String,
}

/// Static catalog entry. Converted to an owned [`Server`] on lookup.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: &'static str,
    pub location: &'static str,
    pub ip: &'static str,
}

/// The fixed list of mock servers. The first entry is the default.
pub const SERVER_CATALOG: [CatalogEntry; 4] = [
    CatalogEntry {
        id: 1,
        name: "PT Telekomunikasi Indonesia",
        location: "Makassar, Indonesia",
        ip: "192.168.1.45",
    },
    CatalogEntry {
        id: 2,
        name: "PT Fajar Techno System",
        location: "Makassar, Indonesia",
        ip: "108.200.10.50",
    },
    CatalogEntry {
        id: 3,
        name: "Interlink Data Center",
        location: "Gowa, Indonesia",
        ip: "175.41.10.20",
    },
    CatalogEntry {
        id: 4,
        name: "HIGEN Data Center",
        location: "Samata, Gowa, Indonesia",
        ip: "104.16.10.1",
    },
];

impl From<&CatalogEntry> for Server {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name.into(),
            location: entry.location.into(),
            ip: entry.ip.into(),
        }
    }
}

impl Server {
    /// Look up a catalog entry by id.
    pub fn by_id(id: u32) -> Option<Self> {
        SERVER_CATALOG
            .iter()
            .find(|entry| entry.id == id)
            .map(Self::from)
    }

    /// The first catalog entry.
    pub fn default_server() -> Self {
        Self::from(&SERVER_CATALOG[0])
    }

    /// Every catalog entry, in catalog order.
    pub fn catalog() -> Vec<Self> {
        SERVER_CATALOG.iter().map(Self::from).collect()
    }

    /// Whether this snapshot still matches a catalog entry field-for-field.
    pub fn is_catalog_entry(&self) -> bool {
        Self::by_id(self.id).is_some_and(|s| s == *self)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::default_server()
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let mut ids: Vec<u32> = SERVER_CATALOG.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), SERVER_CATALOG.len());
    }

    #[test]
    fn default_server_is_first_entry() {
        let server = Server::default_server();
        assert_eq!(server.id, 1);
        assert_eq!(server.name, "PT Telekomunikasi Indonesia");
    }

    #[test]
    fn by_id_misses_unknown_ids() {
        assert!(Server::by_id(0).is_none());
        assert!(Server::by_id(5).is_none());
        assert_eq!(Server::by_id(3).map(|s| s.ip), Some("175.41.10.20".into()));
    }

    #[test]
    fn tampered_snapshot_is_not_a_catalog_entry() {
        let mut server = Server::default_server();
        assert!(server.is_catalog_entry());
        server.ip = "10.0.0.1".into();
        assert!(!server.is_catalog_entry());
    }

    #[test]
    fn display_shows_name_and_location() {
        let server = Server::by_id(4).unwrap_or_default();
        assert_eq!(
            server.to_string(),
            "HIGEN Data Center (Samata, Gowa, Indonesia)"
        );
    }
}
