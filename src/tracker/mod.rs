mod config;
mod controller;
mod state;

pub use config::TrackerConfig;
pub use controller::TrackerController;
pub use state::{TrackerState, TrackerStatus};
