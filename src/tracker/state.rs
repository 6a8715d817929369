use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackerStatus {
    Idle,
    Connecting,
    Active,
    Error,
}

impl Default for TrackerStatus {
    fn default() -> Self {
        TrackerStatus::Idle
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    pub status: TrackerStatus,
    pub status_text: String,
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            status: TrackerStatus::Idle,
            status_text: "Not Connected".to_string(),
            session_id: None,
            started_at: None,
        }
    }
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_session(&mut self, session_id: String, started_at: DateTime<Utc>) {
        *self = Self {
            status: TrackerStatus::Connecting,
            status_text: "Connecting...".to_string(),
            session_id: Some(session_id),
            started_at: Some(started_at),
        };
    }

    pub fn reset(&mut self, status_text: &str) {
        *self = Self {
            status_text: status_text.to_string(),
            ..Self::default()
        };
    }
}
