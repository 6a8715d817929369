pub mod db;
pub mod history;
pub mod posture;
pub mod sensor;
pub mod session;
pub mod settings;
pub mod tracker;

pub use db::{Database, SessionRecord};
pub use posture::PostureQuality;
pub use session::LiveMetrics;
pub use tracker::{TrackerConfig, TrackerController, TrackerStatus};
