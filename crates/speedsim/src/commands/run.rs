//! `speedsim run`: one session with a live progress line.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use speedsim_core::probe::CONNECTED_DEVICES_PLACEHOLDER;
use speedsim_core::{Phase, Session, SettingsStore, TestResult};

use crate::cli::{OutputFormat, RunArgs};
use crate::config::Context;
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn handle(args: RunArgs, ctx: &Context) -> Result<(), CliError> {
    let profile = ctx.session_profile()?;
    let storage = ctx.storage();

    let settings = SettingsStore::new(storage.clone());
    let prefs = settings.load();
    if ctx.output == OutputFormat::Table && !ctx.quiet {
        eprintln!(
            "{} {}  {}",
            output::accent("Server:", ctx.color),
            settings.selected_server(),
            output::muted(&format!("[{}]", prefs.default_connection_mode), ctx.color),
        );
    }

    let session = match args.seed {
        Some(seed) => Session::with_seed(storage, profile, seed),
        None => Session::new(storage, profile),
    };
    debug!(total = ?profile.total_duration(), "running session");

    let bar = progress_bar(ctx.quiet);
    let mut phase_rx = session.phase();
    let mut speed_rx = session.live_speed();

    let finished = session.run();
    tokio::pin!(finished);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    let outcome = loop {
        tokio::select! {
            outcome = &mut finished => break outcome,
            _ = &mut interrupt => {
                session.teardown().await;
                bar.abandon_with_message("Cancelled");
                info!("session interrupted");
                return Err(CliError::Interrupted);
            }
            Ok(()) = phase_rx.changed() => {
                let phase = *phase_rx.borrow_and_update();
                bar.set_message(status_line(phase, *speed_rx.borrow()));
            }
            Ok(()) = speed_rx.changed() => {
                let speed = *speed_rx.borrow_and_update();
                bar.set_message(status_line(*phase_rx.borrow(), speed));
            }
        }
    };

    bar.finish_and_clear();
    let result =
        outcome?.ok_or_else(|| CliError::Internal("session produced no result".into()))?;

    let out = output::render_single(
        ctx.output,
        &result,
        |r| summary(r, ctx.color),
        |r| {
            format!(
                "{:.2}\t{:.2}\t{:.0}\t{:.1}",
                r.download, r.upload, r.ping, r.jitter
            )
        },
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

fn progress_bar(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        bar.set_style(style);
    }
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn status_line(phase: Phase, speed: f64) -> String {
    if phase.is_transfer() {
        format!("{}  {}", phase.label(), util::mbps(speed))
    } else {
        phase.label().to_owned()
    }
}

fn summary(r: &TestResult, color: bool) -> String {
    let figures = output::detail_block(&[
        ("Download", util::mbps(r.download)),
        ("Upload", util::mbps(r.upload)),
        ("Ping", util::millis(r.ping, 0)),
        ("Jitter", util::millis(r.jitter, 1)),
        ("Server", r.server.to_string()),
        ("Devices", CONNECTED_DEVICES_PLACEHOLDER.to_string()),
        ("Date", r.date.clone()),
    ]);
    format!("{}\n{figures}", output::accent(Phase::Complete.label(), color))
}
