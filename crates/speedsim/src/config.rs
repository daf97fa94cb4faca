//! Resolution of global flags against the loaded configuration.
//!
//! Flags beat environment, environment beats the config file. This is
//! the single place where CLI types meet `speedsim_config` types.

use std::path::PathBuf;
use std::sync::Arc;

use clap::ValueEnum;
use tracing::debug;

use speedsim_config::Config;
use speedsim_core::{FileStore, KeyValueStore, SessionProfile};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Everything a command handler needs, resolved once per invocation.
pub struct Context {
    pub config: Config,
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    pub yes: bool,
}

impl Context {
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let mut config = speedsim_config::load_config()?;
        if let Some(dir) = &global.data_dir {
            config.data_dir = Some(dir.clone());
        }

        let output = match global.output {
            Some(format) => format,
            None => parse_value::<OutputFormat>("defaults.output", &config.defaults.output)?,
        };
        let color_mode = match global.color {
            Some(mode) => mode,
            None => parse_value::<ColorMode>("defaults.color", &config.defaults.color)?,
        };

        debug!(
            data_dir = %config.data_dir().display(),
            ?output,
            ?color_mode,
            "configuration resolved"
        );

        Ok(Self {
            config,
            output,
            color: crate::output::should_color(color_mode),
            quiet: global.quiet,
            yes: global.yes,
        })
    }

    pub fn storage_path(&self) -> PathBuf {
        self.config.storage_path()
    }

    /// Open the file-backed key-value store under the data directory.
    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        Arc::new(FileStore::new(self.storage_path()))
    }

    /// Validated session profile from the `[session]` table.
    pub fn session_profile(&self) -> Result<SessionProfile, CliError> {
        Ok(self.config.session.to_profile()?)
    }
}

fn parse_value<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("unrecognized value '{raw}'"),
    })
}
