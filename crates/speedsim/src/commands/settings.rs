//! Settings command handlers.

use serde::Serialize;

use speedsim_core::{ConnectionMode, Server, SettingsStore};

use crate::cli::{ModeArg, SettingsArgs, SettingsCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

/// Resolved view of the persisted settings.
#[derive(Serialize)]
struct SettingsView {
    server: Server,
    connection_mode: ConnectionMode,
}

impl From<ModeArg> for ConnectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Multi => Self::Multi,
            ModeArg::Single => Self::Single,
        }
    }
}

pub fn handle(args: SettingsArgs, ctx: &Context) -> Result<(), CliError> {
    let settings = SettingsStore::new(ctx.storage());

    match args.command {
        SettingsCommand::Show => show(&settings, ctx),

        SettingsCommand::Set { server, mode } => {
            if server.is_none() && mode.is_none() {
                return Err(CliError::Validation {
                    field: "settings".into(),
                    reason: "nothing to change; pass --server and/or --mode".into(),
                });
            }

            let current = settings.load();
            let server_id = server.unwrap_or(current.selected_server_id);
            let mode = mode.map_or(current.default_connection_mode, ConnectionMode::from);
            settings.save(server_id, mode)?;

            if !ctx.quiet {
                eprintln!("Settings saved");
            }
            show(&settings, ctx)
        }

        SettingsCommand::Reset => {
            if !util::confirm(
                "Delete all test history and settings? This cannot be undone.",
                "settings reset",
                ctx.yes,
            )? {
                return Ok(());
            }
            settings.reset_all()?;
            if !ctx.quiet {
                eprintln!("All data has been reset");
            }
            Ok(())
        }
    }
}

fn show(settings: &SettingsStore, ctx: &Context) -> Result<(), CliError> {
    let prefs = settings.load();
    let view = SettingsView {
        server: settings.selected_server(),
        connection_mode: prefs.default_connection_mode,
    };

    let out = output::render_single(
        ctx.output,
        &view,
        |v| {
            output::detail_block(&[
                ("Server", format!("{} (#{})", v.server.name, v.server.id)),
                ("Location", v.server.location.clone()),
                ("IP", v.server.ip.clone()),
                ("Connection mode", v.connection_mode.to_string()),
            ])
        },
        |v| format!("{}\t{}", v.server.id, v.connection_mode),
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}
