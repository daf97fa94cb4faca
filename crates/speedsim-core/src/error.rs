// ── Core error types ──
//
// User-facing errors from speedsim-core. The session itself never fails:
// its outputs are clamped. Errors come from the storage backends, settings
// validation, the device-count probe, and a run task that died.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage errors ───────────────────────────────────────────────
    #[error("Storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    #[error("Failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    // ── Settings errors ──────────────────────────────────────────────
    #[error("Server not found: {id}")]
    ServerNotFound { id: u32 },

    // ── Probe errors ─────────────────────────────────────────────────
    #[error("Device probe failed: {reason}")]
    ProbeFailed { reason: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn storage(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Storage {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
