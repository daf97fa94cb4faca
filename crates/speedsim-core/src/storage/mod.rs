// ── Key-value storage service ──
//
// String-keyed, string-valued durable storage behind a small trait so the
// stores can run against an in-memory fake in tests and a JSON file on
// disk in the CLI.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::CoreError;

/// Host key-value storage.
///
/// Each call is atomic on its own; there is no multi-key transaction.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Backend read failures are reported as absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// Delete a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}
