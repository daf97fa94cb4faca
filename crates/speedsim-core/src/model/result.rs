// ── Completed test results ──
//
// Immutable once created. History blobs written by older builds stored
// the figures as strings ("12.34"), so deserialization accepts both.

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

use super::server::Server;

/// Display format for [`TestResult::date`] (`16/10/2026, 14.05.33`).
pub const DATE_FORMAT: &str = "%d/%m/%Y, %H.%M.%S";

/// One completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Creation time in epoch milliseconds; strictly increasing across history.
    pub id: i64,
    /// Local creation time, human readable.
    pub date: String,
    /// Mbps, two decimals.
    #[serde(deserialize_with = "figure")]
    pub download: f64,
    /// Mbps, two decimals.
    #[serde(deserialize_with = "figure")]
    pub upload: f64,
    /// Milliseconds, whole number.
    #[serde(deserialize_with = "figure")]
    pub ping: f64,
    /// Milliseconds, one decimal.
    #[serde(deserialize_with = "figure")]
    pub jitter: f64,
    /// Server identity at capture time, copied by value.
    pub server: Server,
}

/// Raw measured figures, before rounding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Figures {
    pub download: f64,
    pub upload: f64,
    pub ping: f64,
    pub jitter: f64,
}

impl TestResult {
    /// Build a result captured at `now`.
    ///
    /// `previous_id` is the id at the head of history, if any; the new id is
    /// bumped past it when the clock has not advanced.
    pub fn capture(
        figures: Figures,
        server: Server,
        now: DateTime<Local>,
        previous_id: Option<i64>,
    ) -> Self {
        let stamp = now.timestamp_millis();
        let id = match previous_id {
            Some(prev) if prev >= stamp => prev + 1,
            _ => stamp,
        };

        Self {
            id,
            date: now.format(DATE_FORMAT).to_string(),
            download: round_to(figures.download, 2),
            upload: round_to(figures.upload, 2),
            ping: round_to(figures.ping, 0),
            jitter: round_to(figures.jitter, 1),
            server,
        }
    }
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFigure {
    Number(f64),
    Text(String),
}

fn figure<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawFigure::deserialize(deserializer)? {
        RawFigure::Number(n) => Ok(n),
        RawFigure::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
