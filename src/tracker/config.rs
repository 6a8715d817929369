use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable tracking parameters. Classification thresholds live in
/// [`crate::posture`] as named constants and are not configurable here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    /// Low-pass filter weight kept from the previous smoothed value.
    pub smoothing_retain: f64,

    /// Rolling pitch history capacity (display only, not persisted).
    pub history_capacity: usize,

    /// Cadence of the periodic accrual tick, in milliseconds.
    pub tick_interval_ms: u64,

    /// How long to wait for a first sample before giving up on connecting,
    /// in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            smoothing_retain: 0.8,
            history_capacity: 100,
            tick_interval_ms: 1_000,
            connect_timeout_ms: 10_000,
        }
    }
}

impl TrackerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
