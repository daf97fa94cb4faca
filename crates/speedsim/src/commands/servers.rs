//! Server catalog listing.

use tabled::Tabled;

use speedsim_core::{Server, SettingsStore};

use crate::cli::{ServersArgs, ServersCommand};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ServerRow {
    #[tabled(rename = "")]
    selected: &'static str,
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "IP")]
    ip: String,
}

pub fn handle(args: &ServersArgs, ctx: &Context) -> Result<(), CliError> {
    match args.command {
        ServersCommand::List => {
            let selected = SettingsStore::new(ctx.storage()).load().selected_server_id;
            let servers = Server::catalog();

            let out = output::render_list(
                ctx.output,
                &servers,
                |s| ServerRow {
                    selected: if s.id == selected { "*" } else { "" },
                    id: s.id,
                    name: s.name.clone(),
                    location: s.location.clone(),
                    ip: s.ip.clone(),
                },
                |s| format!("{}\t{}", s.id, s.name),
            )?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }
    }
}
