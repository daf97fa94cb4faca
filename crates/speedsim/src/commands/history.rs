//! History command handlers.

use tabled::Tabled;

use speedsim_core::{ResultStore, TestResult};

use crate::cli::{HistoryArgs, HistoryCommand, OutputFormat};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Server")]
    server: String,
    #[tabled(rename = "Download")]
    download: String,
    #[tabled(rename = "Upload")]
    upload: String,
    #[tabled(rename = "Ping")]
    ping: String,
    #[tabled(rename = "Jitter")]
    jitter: String,
}

impl From<&TestResult> for ResultRow {
    fn from(r: &TestResult) -> Self {
        Self {
            date: r.date.clone(),
            server: r.server.name.clone(),
            download: util::mbps(r.download),
            upload: util::mbps(r.upload),
            ping: util::millis(r.ping, 0),
            jitter: util::millis(r.jitter, 1),
        }
    }
}

pub fn handle(args: HistoryArgs, ctx: &Context) -> Result<(), CliError> {
    let history = ResultStore::new(ctx.storage());

    match args.command {
        HistoryCommand::List { limit } => {
            let mut results = history.load_all();
            if let Some(limit) = limit {
                results.truncate(limit);
            }

            if results.is_empty() && ctx.output == OutputFormat::Table {
                if !ctx.quiet {
                    eprintln!("No results yet. Run: speedsim run");
                }
                return Ok(());
            }

            let out = output::render_list(ctx.output, &results, |r| ResultRow::from(r), |r| {
                format!(
                    "{}\t{:.2}\t{:.2}\t{:.0}\t{:.1}\t{}",
                    r.id, r.download, r.upload, r.ping, r.jitter, r.server.name
                )
            })?;
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        HistoryCommand::Clear => {
            history.clear()?;
            if !ctx.quiet {
                eprintln!("History cleared");
            }
            Ok(())
        }
    }
}
