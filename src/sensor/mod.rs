//! Motion sensor seam.
//!
//! The tracker talks to headphone motion hardware through the
//! [`MotionSensor`] trait. A subscription is an event channel; dropping the
//! subscription unsubscribes (the producer observes the cancellation token
//! and stops pushing).

mod simulated;

pub use simulated::SimulatedSensor;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One orientation reading, as delivered by the hardware: radians.
#[derive(Debug, Clone, Copy)]
pub struct OrientationSample {
    pub pitch_rad: f64,
    pub roll_rad: f64,
    pub yaw_rad: f64,
    pub timestamp: DateTime<Utc>,
}

/// Orientation converted to degrees, the unit everything downstream uses.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl OrientationSample {
    pub fn degrees(&self) -> Orientation {
        Orientation {
            pitch: self.pitch_rad.to_degrees(),
            roll: self.roll_rad.to_degrees(),
            yaw: self.yaw_rad.to_degrees(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SensorEvent {
    Sample(OrientationSample),
    Error(String),
}

pub trait MotionSensor: Send + Sync {
    fn is_available(&self) -> bool;

    /// Begin delivering events. The stream stops when the returned
    /// subscription is dropped.
    fn subscribe(&self) -> Result<SensorSubscription>;
}

pub struct SensorSubscription {
    events: mpsc::Receiver<SensorEvent>,
    cancel: CancellationToken,
}

impl SensorSubscription {
    pub fn new(events: mpsc::Receiver<SensorEvent>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Next event, or `None` once the producer has gone away.
    pub async fn recv(&mut self) -> Option<SensorEvent> {
        self.events.recv().await
    }
}

impl Drop for SensorSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
