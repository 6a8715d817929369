//! In-progress session state.
//!
//! The accumulator owns everything that changes while a session is running:
//! exponentially smoothed orientation, the bounded pitch history used by the
//! live chart, the current quality band, poor-posture duration accrual, and
//! pitch statistics. It is mutated from exactly one task (the tracker worker
//! loop), so it needs no internal locking.
//!
//! Poor-posture time is accrued lazily, against a checkpoint: opening the
//! window records the checkpoint, every `tick` credits the interval since
//! the checkpoint and advances it, and leaving the poor band credits the
//! final interval and closes the window. Because every accrual advances the
//! checkpoint to the accrual instant, the tick-driven and transition-driven
//! paths can interleave in any order without double counting.

use std::collections::VecDeque;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::SessionRecord;
use crate::posture::{self, PostureQuality};
use crate::sensor::Orientation;
use crate::tracker::TrackerConfig;

/// Open-or-closed poor-posture window. `accrued_to` is the last instant up
/// to which duration has been credited.
#[derive(Debug, Clone, Copy)]
enum PoorWindow {
    Closed,
    Open { since: Instant, accrued_to: Instant },
}

#[derive(Debug)]
pub struct SessionAccumulator {
    session_id: String,
    started_at: DateTime<Utc>,
    started_instant: Instant,
    /// `None` until the first sample; the first sample seeds the smoothed
    /// orientation directly instead of decaying from zero.
    smoothed: Option<Orientation>,
    pitch_history: VecDeque<f64>,
    quality: PostureQuality,
    poor_window: PoorWindow,
    poor_secs: f64,
    pitch_sum: f64,
    pitch_count: u64,
    min_pitch: f64,
    max_pitch: f64,
    smoothing_retain: f64,
    history_capacity: usize,
}

impl SessionAccumulator {
    pub fn new(
        config: &TrackerConfig,
        session_id: String,
        started_at: DateTime<Utc>,
        now: Instant,
    ) -> Self {
        Self {
            session_id,
            started_at,
            started_instant: now,
            smoothed: None,
            pitch_history: VecDeque::with_capacity(config.history_capacity),
            quality: PostureQuality::Good,
            poor_window: PoorWindow::Closed,
            poor_secs: 0.0,
            pitch_sum: 0.0,
            pitch_count: 0,
            min_pitch: 0.0,
            max_pitch: 0.0,
            smoothing_retain: config.smoothing_retain,
            history_capacity: config.history_capacity,
        }
    }

    pub fn quality(&self) -> PostureQuality {
        self.quality
    }

    pub fn poor_secs(&self) -> f64 {
        self.poor_secs
    }

    /// Feed one orientation reading (already in degrees).
    pub fn ingest_sample(&mut self, raw: Orientation, now: Instant) {
        let retain = self.smoothing_retain;
        let smoothed = match self.smoothed {
            Some(previous) => Orientation {
                pitch: previous.pitch * retain + raw.pitch * (1.0 - retain),
                roll: previous.roll * retain + raw.roll * (1.0 - retain),
                yaw: previous.yaw * retain + raw.yaw * (1.0 - retain),
            },
            None => raw,
        };
        self.smoothed = Some(smoothed);

        self.pitch_history.push_back(smoothed.pitch);
        while self.pitch_history.len() > self.history_capacity {
            self.pitch_history.pop_front();
        }

        self.apply_quality_transition(posture::classify(smoothed.pitch), now);
        self.update_statistics(smoothed.pitch);
    }

    fn apply_quality_transition(&mut self, new_quality: PostureQuality, now: Instant) {
        self.quality = new_quality;

        match (new_quality, self.poor_window) {
            (PostureQuality::Poor, PoorWindow::Closed) => {
                self.poor_window = PoorWindow::Open {
                    since: now,
                    accrued_to: now,
                };
            }
            (PostureQuality::Good | PostureQuality::Warning, PoorWindow::Open { accrued_to, .. }) => {
                self.poor_secs += now.saturating_duration_since(accrued_to).as_secs_f64();
                self.poor_window = PoorWindow::Closed;
            }
            _ => {}
        }
    }

    fn update_statistics(&mut self, pitch: f64) {
        self.pitch_sum += pitch;
        self.pitch_count += 1;

        if self.pitch_count == 1 {
            self.min_pitch = pitch;
            self.max_pitch = pitch;
        } else {
            self.min_pitch = self.min_pitch.min(pitch);
            self.max_pitch = self.max_pitch.max(pitch);
        }
    }

    /// Periodic accrual. Credits poor-posture time up to `now` while the
    /// window is open and advances the checkpoint.
    pub fn tick(&mut self, now: Instant) {
        if let PoorWindow::Open { since, accrued_to } = self.poor_window {
            self.poor_secs += now.saturating_duration_since(accrued_to).as_secs_f64();
            self.poor_window = PoorWindow::Open {
                since,
                accrued_to: now,
            };
        }
    }

    pub fn session_secs(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started_instant).as_secs_f64()
    }

    pub fn poor_posture_percentage(&self, now: Instant) -> u32 {
        let total = self.session_secs(now);
        if total > 0.0 {
            ((self.poor_secs / total) * 100.0) as u32
        } else {
            0
        }
    }

    /// Final accrual plus conversion into the immutable persisted record.
    pub fn finalize(&mut self, now: Instant, ended_at: DateTime<Utc>) -> SessionRecord {
        self.tick(now);

        let average_pitch = if self.pitch_count > 0 {
            self.pitch_sum / self.pitch_count as f64
        } else {
            0.0
        };

        SessionRecord {
            id: self.session_id.clone(),
            started_at: self.started_at,
            ended_at,
            poor_posture_secs: self.poor_secs,
            average_pitch,
            min_pitch: self.min_pitch,
            max_pitch: self.max_pitch,
        }
    }

    /// Snapshot for the UI read model.
    pub fn live_metrics(&self, now: Instant, is_connected: bool, status: &str) -> LiveMetrics {
        let orientation = self.smoothed.unwrap_or_default();
        LiveMetrics {
            pitch: orientation.pitch,
            roll: orientation.roll,
            yaw: orientation.yaw,
            is_connected,
            connection_status: status.to_string(),
            posture_quality: self.quality,
            pitch_history: self.pitch_history.iter().copied().collect(),
            poor_posture_secs: self.poor_secs,
            session_secs: self.session_secs(now),
            poor_posture_percentage: self.poor_posture_percentage(now),
        }
    }
}

/// Everything the UI needs to render the live view, published on every
/// sample and tick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveMetrics {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    pub is_connected: bool,
    pub connection_status: String,
    pub posture_quality: PostureQuality,
    pub pitch_history: Vec<f64>,
    pub poor_posture_secs: f64,
    pub session_secs: f64,
    pub poor_posture_percentage: u32,
}

impl Default for LiveMetrics {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            roll: 0.0,
            yaw: 0.0,
            is_connected: false,
            connection_status: "Not Connected".to_string(),
            posture_quality: PostureQuality::Good,
            pitch_history: Vec::new(),
            poor_posture_secs: 0.0,
            session_secs: 0.0,
            poor_posture_percentage: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> TrackerConfig {
        TrackerConfig::default()
    }

    fn accumulator(base: Instant) -> SessionAccumulator {
        SessionAccumulator::new(&config(), "test-session".to_string(), Utc::now(), base)
    }

    fn orientation(pitch: f64) -> Orientation {
        Orientation {
            pitch,
            roll: 0.0,
            yaw: 0.0,
        }
    }

    fn at(base: Instant, secs: f64) -> Instant {
        base + Duration::from_secs_f64(secs)
    }

    #[test]
    fn first_sample_seeds_smoothing_directly() {
        let base = Instant::now();
        let mut acc = accumulator(base);

        acc.ingest_sample(orientation(-25.0), at(base, 0.1));

        let metrics = acc.live_metrics(at(base, 0.1), true, "Connected");
        assert_eq!(metrics.pitch, -25.0);
        assert_eq!(metrics.pitch_history, vec![-25.0]);
    }

    #[test]
    fn smoothing_retains_eighty_percent() {
        let base = Instant::now();
        let mut acc = accumulator(base);

        acc.ingest_sample(orientation(-10.0), at(base, 0.1));
        acc.ingest_sample(orientation(-20.0), at(base, 0.2));

        let metrics = acc.live_metrics(at(base, 0.2), true, "Connected");
        assert!((metrics.pitch - (-12.0)).abs() < 1e-9);
    }

    #[test]
    fn history_is_bounded_fifo() {
        let base = Instant::now();
        let mut acc = accumulator(base);

        // Constant input keeps the smoothed value constant at the seed, so
        // feed a slowly drifting pitch to observe eviction order.
        for i in 0..150 {
            acc.ingest_sample(orientation(-(i as f64) / 100.0), at(base, i as f64 * 0.03));
        }

        let metrics = acc.live_metrics(at(base, 5.0), true, "Connected");
        assert_eq!(metrics.pitch_history.len(), 100);

        // Newest value is the last ingested smoothed pitch; the sequence is
        // monotonically decreasing, so the retained window is the tail.
        let newest = *metrics.pitch_history.last().unwrap();
        assert_eq!(newest, metrics.pitch);
        for pair in metrics.pitch_history.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn poor_duration_only_accrues_in_poor_band() {
        let base = Instant::now();
        let mut acc = accumulator(base);

        acc.ingest_sample(orientation(-10.0), at(base, 1.0));
        acc.tick(at(base, 2.0));
        acc.ingest_sample(orientation(-17.0), at(base, 3.0));
        acc.tick(at(base, 4.0));

        assert_eq!(acc.poor_secs(), 0.0);
    }

    #[test]
    fn entering_and_leaving_poor_credits_exact_interval() {
        let base = Instant::now();
        let mut acc = accumulator(base);

        acc.ingest_sample(orientation(-25.0), at(base, 1.0));
        assert_eq!(acc.quality(), PostureQuality::Poor);

        // Multiple ticks while poor: credits must partition, not stack.
        acc.tick(at(base, 2.0));
        acc.tick(at(base, 3.0));
        acc.tick(at(base, 3.0));

        // Leaving poor credits the remainder since the last checkpoint.
        acc.ingest_sample(orientation(0.0), at(base, 4.0));

        assert!((acc.poor_secs() - 3.0).abs() < 1e-9);

        // Later ticks outside the window accrue nothing.
        acc.tick(at(base, 10.0));
        assert!((acc.poor_secs() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn reentering_poor_opens_a_fresh_window() {
        let base = Instant::now();
        let mut acc = accumulator(base);

        acc.ingest_sample(orientation(-25.0), at(base, 1.0));
        acc.ingest_sample(orientation(0.0), at(base, 2.0));
        acc.ingest_sample(orientation(-30.0), at(base, 5.0));
        acc.tick(at(base, 6.0));

        // 1s from the first window, 1s so far from the second.
        assert!((acc.poor_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn finalize_is_idempotent_partitioning() {
        // Whole-session poor: samples at 1..=5s, ticks at 3s and 6s, stop at
        // 6s. Constant -25 input stays -25 after smoothing (seeded by the
        // first sample), so min == max == -25.
        let base = Instant::now();
        let started_at = Utc::now();
        let mut acc =
            SessionAccumulator::new(&config(), "test-session".to_string(), started_at, base);

        for s in 1..=5 {
            acc.ingest_sample(orientation(-25.0), at(base, s as f64));
            if s == 3 {
                acc.tick(at(base, 3.0));
            }
        }
        acc.tick(at(base, 6.0));

        let ended_at = started_at + chrono::Duration::seconds(6);
        let record = acc.finalize(at(base, 6.0), ended_at);

        // Window opened at t=1s, credited through t=6s.
        assert!((record.poor_posture_secs - 5.0).abs() < 1e-9);
        assert_eq!(record.min_pitch, -25.0);
        assert_eq!(record.max_pitch, -25.0);
        assert_eq!(record.average_pitch, -25.0);
    }

    #[test]
    fn finalize_with_no_samples_yields_zeroes() {
        let base = Instant::now();
        let started_at = Utc::now();
        let mut acc =
            SessionAccumulator::new(&config(), "test-session".to_string(), started_at, base);

        let record = acc.finalize(at(base, 0.0), started_at);
        assert_eq!(record.average_pitch, 0.0);
        assert_eq!(record.poor_posture_secs, 0.0);
        assert_eq!(record.poor_posture_percentage(), 0);
    }

    #[test]
    fn percentage_has_no_division_by_zero() {
        let base = Instant::now();
        let acc = accumulator(base);
        assert_eq!(acc.poor_posture_percentage(base), 0);
    }

    #[test]
    fn statistics_track_min_max_and_mean() {
        let base = Instant::now();
        let mut acc = accumulator(base);

        acc.ingest_sample(orientation(-10.0), at(base, 1.0));
        acc.ingest_sample(orientation(-10.0), at(base, 2.0));

        let record = acc.finalize(at(base, 3.0), Utc::now());
        assert_eq!(record.min_pitch, -10.0);
        assert_eq!(record.max_pitch, -10.0);
        assert_eq!(record.average_pitch, -10.0);
    }
}
