//! Simulated headphone motion source for the demo binary and tests.

use anyhow::Result;
use chrono::Utc;
use log::info;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{MotionSensor, OrientationSample, SensorEvent, SensorSubscription};

const EVENT_BUFFER: usize = 64;

/// Emits a slow slouch cycle: the simulated head starts upright, dips well
/// below the poor-posture threshold, and recovers, with per-sample jitter.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    pub sample_rate_hz: u32,
    pub slouch_period_secs: f64,
    pub jitter_deg: f64,
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self {
            sample_rate_hz: 30,
            slouch_period_secs: 10.0,
            jitter_deg: 0.5,
        }
    }
}

impl MotionSensor for SimulatedSensor {
    fn is_available(&self) -> bool {
        true
    }

    fn subscribe(&self) -> Result<SensorSubscription> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let config = self.clone();

        tokio::spawn(async move {
            let mut ticker =
                time::interval(Duration::from_secs_f64(1.0 / config.sample_rate_hz as f64));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut elapsed = 0.0_f64;
            let step = 1.0 / config.sample_rate_hz as f64;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("simulated sensor unsubscribed");
                        break;
                    }
                    _ = ticker.tick() => {
                        let sample = config.sample_at(elapsed);
                        elapsed += step;
                        if tx.send(SensorEvent::Sample(sample)).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Ok(SensorSubscription::new(rx, cancel))
    }
}

impl SimulatedSensor {
    fn sample_at(&self, elapsed_secs: f64) -> OrientationSample {
        // Pitch swings between roughly -2 and -28 degrees over one period.
        let phase = elapsed_secs / self.slouch_period_secs * std::f64::consts::TAU;
        let pitch_deg = -15.0 + 13.0 * phase.cos();

        let mut rng = rand::thread_rng();
        let mut jitter = || rng.gen_range(-self.jitter_deg..=self.jitter_deg);

        OrientationSample {
            pitch_rad: (pitch_deg + jitter()).to_radians(),
            roll_rad: jitter().to_radians(),
            yaw_rad: jitter().to_radians(),
            timestamp: Utc::now(),
        }
    }
}
