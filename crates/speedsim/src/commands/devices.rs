//! Device-count probe.

use speedsim_core::{DeviceProbe, ProbeBody};

use crate::config::Context;
use crate::error::CliError;
use crate::output;

pub async fn handle(ctx: &Context) -> Result<(), CliError> {
    let response = DeviceProbe::new().probe().await;
    tracing::debug!(status = response.status, "device probe responded");

    if !response.is_success() {
        let message = match response.body {
            ProbeBody::Error { error } => error,
            ProbeBody::Devices { .. } => format!("status {}", response.status),
        };
        return Err(CliError::ProbeFailed { message });
    }

    let out = output::render_single(
        ctx.output,
        &response.body,
        |body| output::detail_block(&[("Devices", device_count(body))]),
        device_count,
    )?;
    output::print_output(&out, ctx.quiet);
    Ok(())
}

fn device_count(body: &ProbeBody) -> String {
    match body {
        ProbeBody::Devices { devices } => devices.to_string(),
        ProbeBody::Error { error } => error.clone(),
    }
}
