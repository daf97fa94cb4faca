//! Shared configuration for the speedsim CLI.
//!
//! TOML file + `SPEEDSIM_` environment layering, data-directory
//! resolution, and translation of the `[session]` table into a
//! `speedsim_core::SessionProfile`.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use speedsim_core::{SessionProfile, TransferProfile};

/// Name of the storage file inside the data directory.
pub const STORAGE_FILE: &str = "storage.json";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "SPEEDSIM_CONFIG";

/// Upper bound for every `*_ms` timing in `[session]` (one hour).
pub const MAX_TIMING_MS: u64 = 3_600_000;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Where history and settings are stored. Defaults to the platform
    /// data directory.
    pub data_dir: Option<PathBuf>,

    /// Output defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Session timing and ranges.
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// `[session]` table. Every field defaults to the stock session profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    pub ping_delay_ms: u64,
    pub ping_min_ms: f64,
    pub ping_max_ms: f64,
    pub jitter_max_ms: f64,
    pub download: TransferSettings,
    pub upload: TransferSettings,
}

/// `[session.download]` / `[session.upload]` tables.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TransferSettings {
    pub duration_ms: u64,
    pub tick_ms: u64,
    pub max_increment: f64,
    pub perturbation: f64,
    pub floor: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&SessionProfile::default())
    }
}

impl From<&SessionProfile> for SessionSettings {
    fn from(p: &SessionProfile) -> Self {
        Self {
            ping_delay_ms: millis(p.ping_delay),
            ping_min_ms: p.ping_min_ms,
            ping_max_ms: p.ping_max_ms,
            jitter_max_ms: p.jitter_max_ms,
            download: TransferSettings::from(&p.download),
            upload: TransferSettings::from(&p.upload),
        }
    }
}

impl From<&TransferProfile> for TransferSettings {
    fn from(t: &TransferProfile) -> Self {
        Self {
            duration_ms: millis(t.duration),
            tick_ms: millis(t.tick),
            max_increment: t.max_increment,
            perturbation: t.perturbation,
            floor: t.floor,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl SessionSettings {
    /// Validate and convert into a core session profile.
    pub fn to_profile(&self) -> Result<SessionProfile, ConfigError> {
        within_limit("session.ping_delay_ms", self.ping_delay_ms)?;
        non_negative("session.ping_min_ms", self.ping_min_ms)?;
        non_negative("session.ping_max_ms", self.ping_max_ms)?;
        non_negative("session.jitter_max_ms", self.jitter_max_ms)?;
        if self.ping_max_ms < self.ping_min_ms {
            return Err(ConfigError::Validation {
                field: "session.ping_max_ms".into(),
                reason: format!(
                    "must be >= ping_min_ms ({}), got {}",
                    self.ping_min_ms, self.ping_max_ms
                ),
            });
        }

        Ok(SessionProfile {
            ping_delay: Duration::from_millis(self.ping_delay_ms),
            download: self.download.to_profile("session.download")?,
            upload: self.upload.to_profile("session.upload")?,
            ping_min_ms: self.ping_min_ms,
            ping_max_ms: self.ping_max_ms,
            jitter_max_ms: self.jitter_max_ms,
        })
    }
}

impl TransferSettings {
    fn to_profile(&self, table: &str) -> Result<TransferProfile, ConfigError> {
        if self.tick_ms == 0 {
            return Err(ConfigError::Validation {
                field: format!("{table}.tick_ms"),
                reason: "must be greater than zero".into(),
            });
        }
        within_limit(&format!("{table}.tick_ms"), self.tick_ms)?;
        within_limit(&format!("{table}.duration_ms"), self.duration_ms)?;
        non_negative(&format!("{table}.max_increment"), self.max_increment)?;
        non_negative(&format!("{table}.perturbation"), self.perturbation)?;
        non_negative(&format!("{table}.floor"), self.floor)?;

        Ok(TransferProfile {
            duration: Duration::from_millis(self.duration_ms),
            tick: Duration::from_millis(self.tick_ms),
            max_increment: self.max_increment,
            perturbation: self.perturbation,
            floor: self.floor,
        })
    }
}

fn within_limit(field: &str, value: u64) -> Result<(), ConfigError> {
    if value <= MAX_TIMING_MS {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("must be at most {MAX_TIMING_MS} ms, got {value}"),
        })
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("must be a non-negative number, got {value}"),
        })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "speedsim", "speedsim")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path: `SPEEDSIM_CONFIG`, then XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    project_dirs().map_or_else(
        || home_fallback(&[".config", "speedsim", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Platform data directory for history and settings.
pub fn default_data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "speedsim"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

impl Config {
    /// Configured data directory, or the platform default.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Path of the key-value storage file.
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir().join(STORAGE_FILE)
    }
}

// ── Config loading ──────────────────────────────────────────────────

fn figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(config_path()))
        .merge(Env::prefixed("SPEEDSIM_").split("__"))
}

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let config: Config = figment().extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}
