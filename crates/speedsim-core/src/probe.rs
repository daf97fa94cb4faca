// ── Device-count probe ──
//
// Runs the host's `arp -a` and counts lines that look like address
// entries (any line containing a '.'). The heuristic only fits the
// Windows/BSD output format. The landing surface does not call this; it
// shows `CONNECTED_DEVICES_PLACEHOLDER` instead.
//
// A command that cannot run or exits non-zero is a read failure. A command
// that hangs past the timeout is killed and reported as a system error.

use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::CoreError;

/// Figure shown as "connected devices" on the landing surface. Not wired
/// to [`DeviceProbe`].
pub const CONNECTED_DEVICES_PLACEHOLDER: u32 = 2;

/// Response status for a successful probe.
pub const STATUS_OK: u16 = 200;
/// Response status for any probe failure.
pub const STATUS_SERVER_ERROR: u16 = 500;

const READ_FAILED: &str = "failed to read network data";
const SYSTEM_ERROR: &str = "system error";

/// How long the ARP command may run before it is killed.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Response body: `{"devices": n}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProbeBody {
    Devices { devices: usize },
    Error { error: String },
}

/// Status plus body, shaped like the HTTP endpoint it stands in for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResponse {
    pub status: u16,
    pub body: ProbeBody,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Count address-resolution entries in `arp -a` output.
pub fn count_devices(output: &str) -> usize {
    output.lines().filter(|line| line.contains('.')).count()
}

/// Runs the ARP table command.
#[derive(Debug, Clone)]
pub struct DeviceProbe {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for DeviceProbe {
    fn default() -> Self {
        Self {
            program: "arp".into(),
            args: vec!["-a".into()],
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl DeviceProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe with a different command, e.g. `ip neigh` on Linux.
    pub fn with_command(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the command and count entries.
    pub async fn count(&self) -> Result<usize, CoreError> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                CoreError::Internal(format!(
                    "{} did not finish within {:?}",
                    self.program, self.timeout
                ))
            })?
            .map_err(|e| CoreError::ProbeFailed {
                reason: format!("{}: {e}", self.program),
            })?;

        if !output.status.success() {
            return Err(CoreError::ProbeFailed {
                reason: format!("{} exited with {}", self.program, output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let devices = count_devices(&stdout);
        debug!(devices, "device probe finished");
        Ok(devices)
    }

    /// Run the probe and shape the outcome as a response. Never fails.
    pub async fn probe(&self) -> ProbeResponse {
        match self.count().await {
            Ok(devices) => ProbeResponse {
                status: STATUS_OK,
                body: ProbeBody::Devices { devices },
            },
            Err(e) => {
                warn!(error = %e, "device probe failed");
                let message = match e {
                    CoreError::ProbeFailed { .. } => READ_FAILED,
                    _ => SYSTEM_ERROR,
                };
                ProbeResponse {
                    status: STATUS_SERVER_ERROR,
                    body: ProbeBody::Error {
                        error: message.into(),
                    },
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const WINDOWS_ARP: &str = "
Interface: 192.168.1.10 --- 0x7
  Internet Address      Physical Address      Type
  192.168.1.1           aa-bb-cc-dd-ee-ff     dynamic
  192.168.1.23          11-22-33-44-55-66     dynamic
  224.0.0.22            01-00-5e-00-00-16     static
";

    #[test]
    fn counts_lines_with_dots() {
        // The interface header line carries an address too.
        assert_eq!(count_devices(WINDOWS_ARP), 4);
    }

    #[test]
    fn empty_output_counts_zero() {
        assert_eq!(count_devices(""), 0);
        assert_eq!(count_devices("no entries\n"), 0);
    }

    #[test]
    fn bodies_serialize_to_endpoint_shapes() {
        let ok = serde_json::to_string(&ProbeBody::Devices { devices: 3 }).unwrap();
        assert_eq!(ok, r#"{"devices":3}"#);

        let err = serde_json::to_string(&ProbeBody::Error {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(err, r#"{"error":"boom"}"#);
    }

    #[tokio::test]
    async fn missing_command_reports_server_error() {
        let probe = DeviceProbe::with_command("speedsim-definitely-not-a-command", &[]);
        let response = probe.probe().await;
        assert!(!response.is_success());
        assert_eq!(response.status, STATUS_SERVER_ERROR);
        assert_eq!(
            response.body,
            ProbeBody::Error {
                error: READ_FAILED.into()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn counts_stdout_of_successful_command() {
        let probe = DeviceProbe::with_command("printf", &["10.0.0.1\\nfoo\\n10.0.0.2\\n"]);
        let response = probe.probe().await;
        assert!(response.is_success());
        assert_eq!(response.body, ProbeBody::Devices { devices: 2 });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_read_failure() {
        let probe = DeviceProbe::with_command("false", &[]);
        let err = probe.count().await.unwrap_err();
        assert!(matches!(err, CoreError::ProbeFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_command_is_killed_and_reported_as_system_error() {
        let probe =
            DeviceProbe::with_command("sleep", &["5"]).with_timeout(Duration::from_millis(50));
        let response = probe.probe().await;
        assert_eq!(response.status, STATUS_SERVER_ERROR);
        assert_eq!(
            response.body,
            ProbeBody::Error {
                error: SYSTEM_ERROR.into()
            }
        );
    }
}
