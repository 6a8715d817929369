//! Headless demo: runs one simulated tracking session end to end, then
//! prints the history summary and CSV export.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::info;

use headsup::db::Database;
use headsup::history::{self, Timeframe};
use headsup::sensor::SimulatedSensor;
use headsup::settings::SettingsStore;
use headsup::tracker::TrackerController;

const DEMO_SESSION_SECS: u64 = 15;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let data_dir = std::env::var_os("HEADSUP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&data_dir)?;

    let database = Database::new(data_dir.join("headsup.sqlite3"))?;
    let settings = SettingsStore::new(data_dir.join("settings.json"))?;

    let sensor = Arc::new(SimulatedSensor::default());
    let controller = TrackerController::new(database.clone(), sensor, settings.tracker());

    info!("starting a {DEMO_SESSION_SECS}s simulated session");
    controller.start_tracking().await?;

    for _ in 0..DEMO_SESSION_SECS {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let live = controller.snapshot();
        info!(
            "pitch {:6.1}° [{}] poor {:5.1}s of {:5.1}s ({}%)",
            live.pitch,
            live.posture_quality.as_str(),
            live.poor_posture_secs,
            live.session_secs,
            live.poor_posture_percentage,
        );
    }

    if let Some(record) = controller.stop_tracking().await? {
        info!(
            "session {}: {:.0}s total, {:.0}s poor ({}%), pitch avg {:.1}° min {:.1}° max {:.1}°, score {}",
            record.id,
            record.total_secs(),
            record.poor_posture_secs,
            record.poor_posture_percentage(),
            record.average_pitch,
            record.min_pitch,
            record.max_pitch,
            record.score(),
        );
    }

    let sessions = database.list_sessions().await?;
    let summary = history::summarize(&sessions, Timeframe::All, Utc::now());
    info!(
        "history: {} session(s), avg poor posture {}%, total {:.0}s",
        summary.session_count, summary.average_poor_posture, summary.total_session_secs,
    );
    if let Some(trend) = summary.trend {
        info!("trend: {trend:?}");
    }

    println!("{}", history::export_csv(&sessions));

    Ok(())
}
