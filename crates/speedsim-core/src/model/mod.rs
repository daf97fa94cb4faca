// ── Domain model ──
//
// The three records the rest of the crate passes around: the static
// server catalog, the user's preferences, and completed test results.

pub mod preferences;
pub mod result;
pub mod server;

// ── Re-exports ──────────────────────────────────────────────────────

pub use preferences::{ConnectionMode, Preferences};
pub use result::TestResult;
pub use server::{SERVER_CATALOG, Server};
