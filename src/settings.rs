use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::tracker::TrackerConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
struct UserSettings {
    tracker: TrackerConfig,
}

/// JSON-file backed settings. Unreadable or missing files fall back to
/// defaults rather than failing startup.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn tracker(&self) -> TrackerConfig {
        self.data.read().unwrap().tracker.clone()
    }

    pub fn update_tracker(&self, config: TrackerConfig) -> Result<()> {
        let mut guard = self.data.write().unwrap();
        guard.tracker = config;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
