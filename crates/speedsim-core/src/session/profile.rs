// ── Session timing and ranges ──

use std::time::Duration;

/// Parameters of one transfer phase (download or upload).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProfile {
    /// How long the phase runs.
    pub duration: Duration,
    /// Interval between live-speed updates.
    pub tick: Duration,
    /// Each tick adds `U[0, max_increment)` to the accumulator.
    pub max_increment: f64,
    /// At phase end, `U[-perturbation, perturbation)` is added.
    pub perturbation: f64,
    /// Lower bound of the final figure.
    pub floor: f64,
}

/// Everything that shapes a simulated session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionProfile {
    /// Latency phase pause.
    pub ping_delay: Duration,
    pub download: TransferProfile,
    pub upload: TransferProfile,
    /// Final ping is drawn from `[ping_min_ms, ping_max_ms]`.
    pub ping_min_ms: f64,
    pub ping_max_ms: f64,
    /// Final jitter is drawn from `[0, jitter_max_ms]`.
    pub jitter_max_ms: f64,
}

impl Default for SessionProfile {
    fn default() -> Self {
        Self {
            ping_delay: Duration::from_millis(1500),
            download: TransferProfile {
                duration: Duration::from_millis(4000),
                tick: Duration::from_millis(100),
                max_increment: 15.0,
                perturbation: 10.0,
                floor: 1.0,
            },
            upload: TransferProfile {
                duration: Duration::from_millis(3000),
                tick: Duration::from_millis(150),
                max_increment: 5.0,
                perturbation: 5.0,
                floor: 0.5,
            },
            ping_min_ms: 5.0,
            ping_max_ms: 35.0,
            jitter_max_ms: 5.0,
        }
    }
}

impl SessionProfile {
    /// Total wall time of one session.
    pub fn total_duration(&self) -> Duration {
        self.ping_delay + self.download.duration + self.upload.duration
    }
}
