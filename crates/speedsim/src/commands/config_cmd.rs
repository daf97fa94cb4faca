//! Config subcommand handlers.

use speedsim_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, OutputFormat};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, ctx: &Context) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let resolved = &ctx.config;
            let out = match ctx.output {
                // TOML is the native format of the file itself
                OutputFormat::Table | OutputFormat::Plain => render_toml(resolved)?,
                format => {
                    output::render_single(format, resolved, |_| String::new(), |_| String::new())?
                }
            };
            output::print_output(&out, ctx.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), ctx.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::config_path();
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }
            config::save_config(&Config::default())?;
            if !ctx.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
    }
}

fn render_toml(cfg: &Config) -> Result<String, CliError> {
    // `data_dir` is optional in the file; show where data actually goes
    let mut text = toml::to_string_pretty(cfg).map_err(|e| CliError::Render(e.to_string()))?;
    if cfg.data_dir.is_none() {
        text.insert_str(
            0,
            &format!("# data_dir = {:?} (default)\n", cfg.data_dir().display().to_string()),
        );
    }
    Ok(text)
}
