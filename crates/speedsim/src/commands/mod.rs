//! Command dispatch: bridges CLI args -> core stores and session -> output.

pub mod config_cmd;
pub mod devices;
pub mod history;
pub mod run;
pub mod servers;
pub mod settings;
pub mod util;

use crate::cli::Command;
use crate::config::Context;
use crate::error::CliError;

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(args, ctx).await,
        Command::History(args) => history::handle(args, ctx),
        Command::Settings(args) => settings::handle(args, ctx),
        Command::Servers(args) => servers::handle(&args, ctx),
        Command::Devices => devices::handle(ctx).await,
        Command::Config(args) => config_cmd::handle(args, ctx),
        // Handled before a context is resolved
        Command::Completions(_) => Err(CliError::Internal(
            "completions reached command dispatch".into(),
        )),
    }
}
