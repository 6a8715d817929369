use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::{error, info, warn};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::db::{Database, SessionRecord};
use crate::sensor::{MotionSensor, SensorEvent, SensorSubscription};
use crate::session::{LiveMetrics, SessionAccumulator};

use super::{TrackerConfig, TrackerState, TrackerStatus};

/// Everything tied to one running session. Taken as a unit on stop so the
/// worker is joined before the accumulator is finalized.
struct ActiveSession {
    worker: JoinHandle<()>,
    cancel: CancellationToken,
    accumulator: Arc<Mutex<SessionAccumulator>>,
}

/// Session lifecycle manager: Idle -> Connecting -> Active -> Idle, with
/// Error reachable from Connecting on timeout.
///
/// All accumulator mutation happens on a single worker task that multiplexes
/// the sensor channel, the periodic tick, and the connect deadline with
/// `select!`, so sample and tick handling are serialized by construction.
#[derive(Clone)]
pub struct TrackerController {
    state: Arc<Mutex<TrackerState>>,
    db: Database,
    sensor: Arc<dyn MotionSensor>,
    config: TrackerConfig,
    live_tx: watch::Sender<LiveMetrics>,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl TrackerController {
    pub fn new(db: Database, sensor: Arc<dyn MotionSensor>, config: TrackerConfig) -> Self {
        let (live_tx, _live_rx) = watch::channel(LiveMetrics::default());

        Self {
            state: Arc::new(Mutex::new(TrackerState::new())),
            db,
            sensor,
            config,
            live_tx,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn get_state(&self) -> TrackerState {
        self.state.lock().await.clone()
    }

    /// Latest read-model snapshot.
    pub fn snapshot(&self) -> LiveMetrics {
        self.live_tx.borrow().clone()
    }

    /// Change-notification channel for the read model; updated on every
    /// sample and tick.
    pub fn subscribe_metrics(&self) -> watch::Receiver<LiveMetrics> {
        self.live_tx.subscribe()
    }

    pub async fn start_tracking(&self) -> Result<()> {
        if !self.sensor.is_available() {
            let mut state = self.state.lock().await;
            state.status_text = "Headphone motion not available".to_string();
            return Err(anyhow!("motion sensor unavailable"));
        }

        let mut active_guard = self.active.lock().await;
        if let Some(session) = active_guard.take() {
            // A previous worker may still be parked in the Error state;
            // reclaim it before starting over.
            let state = self.state.lock().await;
            if state.status == TrackerStatus::Connecting || state.status == TrackerStatus::Active {
                *active_guard = Some(session);
                return Err(anyhow!("tracking already active"));
            }
            drop(state);
            session.cancel.cancel();
            let _ = session.worker.await;
        }

        let subscription = self.sensor.subscribe()?;

        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let accumulator = Arc::new(Mutex::new(SessionAccumulator::new(
            &self.config,
            session_id.clone(),
            started_at,
            Instant::now(),
        )));

        {
            let mut state = self.state.lock().await;
            state.begin_session(session_id.clone(), started_at);
        }
        self.live_tx.send_replace(LiveMetrics {
            connection_status: "Connecting...".to_string(),
            ..LiveMetrics::default()
        });

        let cancel = CancellationToken::new();
        let worker = tokio::spawn(tracking_loop(
            subscription,
            Arc::clone(&accumulator),
            Arc::clone(&self.state),
            self.live_tx.clone(),
            self.config.clone(),
            cancel.clone(),
        ));

        *active_guard = Some(ActiveSession {
            worker,
            cancel,
            accumulator,
        });

        info!("tracking session {session_id} started");
        Ok(())
    }

    /// Stop tracking. Returns the finalized record if a session reached the
    /// Active state, `None` otherwise (never connected, or nothing running).
    ///
    /// The worker task is cancelled and joined before the accumulator is
    /// read, so no late sensor callback can mutate it after finalize.
    pub async fn stop_tracking(&self) -> Result<Option<SessionRecord>> {
        let Some(session) = self.active.lock().await.take() else {
            return Ok(None);
        };

        session.cancel.cancel();
        if let Err(err) = session.worker.await {
            error!("tracking worker failed to join: {err}");
        }

        let was_active = {
            let state = self.state.lock().await;
            state.status == TrackerStatus::Active
        };

        let record = if was_active {
            let mut accumulator = session.accumulator.lock().await;
            let record = accumulator.finalize(Instant::now(), Utc::now());
            if let Err(err) = self.db.insert_session(&record).await {
                // The session ends either way; the record is not requeued.
                error!("failed to persist session {}: {err:#}", record.id);
            } else {
                info!(
                    "session {} saved ({:.0}s total, {}% poor posture)",
                    record.id,
                    record.total_secs(),
                    record.poor_posture_percentage()
                );
            }
            Some(record)
        } else {
            None
        };

        self.state.lock().await.reset("Disconnected");
        self.live_tx.send_replace(LiveMetrics {
            connection_status: "Disconnected".to_string(),
            ..LiveMetrics::default()
        });

        Ok(record)
    }
}

async fn tracking_loop(
    mut subscription: SensorSubscription,
    accumulator: Arc<Mutex<SessionAccumulator>>,
    state: Arc<Mutex<TrackerState>>,
    live_tx: watch::Sender<LiveMetrics>,
    config: TrackerConfig,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // first tick completes immediately

    let connect_deadline = time::sleep(config.connect_timeout());
    tokio::pin!(connect_deadline);

    let mut connected = false;
    let mut stream_done = false;
    let mut status_text = "Connecting...".to_string();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            }
            _ = &mut connect_deadline, if !connected => {
                warn!("no sample within {:?}; giving up on connect", config.connect_timeout());
                let mut guard = state.lock().await;
                if guard.status == TrackerStatus::Connecting {
                    guard.status = TrackerStatus::Error;
                    guard.status_text = "Connection timed out".to_string();
                }
                break;
            }
            event = subscription.recv(), if !stream_done => {
                match event {
                    Some(SensorEvent::Sample(sample)) => {
                        if !connected {
                            connected = true;
                            status_text = "Connected".to_string();
                            let mut guard = state.lock().await;
                            // Check-then-transition: if the timeout won the
                            // race this stays a no-op.
                            if guard.status == TrackerStatus::Connecting {
                                guard.status = TrackerStatus::Active;
                                guard.status_text = status_text.clone();
                                info!("first sample received, tracking active");
                            }
                        }

                        let now = Instant::now();
                        let mut acc = accumulator.lock().await;
                        acc.ingest_sample(sample.degrees(), now);
                        live_tx.send_replace(acc.live_metrics(now, connected, &status_text));
                    }
                    Some(SensorEvent::Error(message)) => {
                        // Surfaced as status text only; the session keeps
                        // running and the user decides when to stop.
                        error!("sensor stream error: {message}");
                        status_text = format!("Error: {message}");
                        let mut guard = state.lock().await;
                        guard.status_text = status_text.clone();
                    }
                    None => {
                        warn!("sensor stream ended");
                        stream_done = true;
                        status_text = "Sensor stream ended".to_string();
                        let mut guard = state.lock().await;
                        guard.status_text = status_text.clone();
                    }
                }
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let mut acc = accumulator.lock().await;
                acc.tick(now);
                live_tx.send_replace(acc.live_metrics(now, connected, &status_text));
            }
        }
    }
}
