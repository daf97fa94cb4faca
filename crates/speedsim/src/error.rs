//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use speedsim_config::ConfigError;
use speedsim_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const STORAGE: i32 = 5;
    pub const PROBE: i32 = 6;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────
    #[error("Server '{id}' not found")]
    #[diagnostic(
        code(speedsim::server_not_found),
        help("Run: speedsim servers list to see available servers")
    )]
    ServerNotFound { id: u32 },

    // ── Storage ──────────────────────────────────────────────────────
    #[error("Could not access data at {path}")]
    #[diagnostic(
        code(speedsim::storage),
        help(
            "{reason}\n\
             Check permissions, or point --data-dir somewhere writable."
        )
    )]
    Storage { path: String, reason: String },

    // ── Device probe ─────────────────────────────────────────────────
    #[error("Device probe failed: {message}")]
    #[diagnostic(
        code(speedsim::probe_failed),
        help("The probe runs `arp -a`; make sure it is installed and on PATH.")
    )]
    ProbeFailed { message: String },

    // ── Session ──────────────────────────────────────────────────────
    #[error("Session interrupted")]
    #[diagnostic(code(speedsim::interrupted), help("Nothing was saved to history."))]
    Interrupted,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(speedsim::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file already exists")]
    #[diagnostic(
        code(speedsim::config_exists),
        help("Use --force to overwrite it.\nPath: {path}")
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(speedsim::config),
        help("Check the config file (speedsim config path) and SPEEDSIM_* variables.")
    )]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(speedsim::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(speedsim::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(speedsim::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ServerNotFound { .. } => exit_code::NOT_FOUND,
            Self::Storage { .. } => exit_code::STORAGE,
            Self::ProbeFailed { .. } => exit_code::PROBE,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::Validation { .. }
            | Self::ConfigExists { .. }
            | Self::Config(_)
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Io(_) | Self::Render(_) | Self::Internal(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Storage { path, reason } => Self::Storage { path, reason },

            CoreError::Encode { key, source } => Self::Storage {
                path: key,
                reason: source.to_string(),
            },

            CoreError::ServerNotFound { id } => Self::ServerNotFound { id },

            CoreError::ProbeFailed { reason } => Self::ProbeFailed { message: reason },

            CoreError::Internal(message) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let not_found = CliError::from(CoreError::ServerNotFound { id: 9 });
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let storage = CliError::from(CoreError::Storage {
            path: "/data/storage.json".into(),
            reason: "read-only file system".into(),
        });
        assert_eq!(storage.exit_code(), exit_code::STORAGE);

        let probe = CliError::from(CoreError::ProbeFailed {
            reason: "arp: not found".into(),
        });
        assert_eq!(probe.exit_code(), exit_code::PROBE);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "session.download.tick_ms".into(),
            reason: "must be greater than zero".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("tick_ms"));
    }
}
