// speedsim-core: simulated speed-test session and the stores it feeds.

pub mod error;
pub mod model;
pub mod probe;
pub mod session;
pub mod storage;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::CoreError;
pub use probe::{DeviceProbe, ProbeBody, ProbeResponse};
pub use session::{Phase, Session, SessionProfile, TransferProfile};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{ResultStore, SettingsStore};

pub use model::{ConnectionMode, Preferences, SERVER_CATALOG, Server, TestResult};
