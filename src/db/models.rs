use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed tracking session. Immutable once persisted; deletion is
/// whole-record only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub poor_posture_secs: f64,
    pub average_pitch: f64,
    pub min_pitch: f64,
    pub max_pitch: f64,
}

impl SessionRecord {
    pub fn total_secs(&self) -> f64 {
        (self.ended_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    pub fn good_posture_secs(&self) -> f64 {
        (self.total_secs() - self.poor_posture_secs).max(0.0)
    }

    /// Floor-truncated integer percentage; 0 when the session has no
    /// duration.
    pub fn poor_posture_percentage(&self) -> u32 {
        let total = self.total_secs();
        if total > 0.0 {
            ((self.poor_posture_secs / total) * 100.0) as u32
        } else {
            0
        }
    }

    /// 0-100 posture score: the good-posture percentage plus a bonus of one
    /// point per ten minutes of session length, capped at ten.
    pub fn score(&self) -> u32 {
        let base = 100u32.saturating_sub(self.poor_posture_percentage());
        let duration_bonus = ((self.total_secs() / 600.0) as u32).min(10);
        (base + duration_bonus).min(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(total_secs: i64, poor_secs: f64) -> SessionRecord {
        let started_at = Utc::now();
        SessionRecord {
            id: "r".to_string(),
            started_at,
            ended_at: started_at + Duration::seconds(total_secs),
            poor_posture_secs: poor_secs,
            average_pitch: -5.0,
            min_pitch: -30.0,
            max_pitch: 2.0,
        }
    }

    #[test]
    fn percentage_truncates_toward_zero() {
        // 100 * 100 / 300 = 33.33 -> 33
        assert_eq!(record(300, 100.0).poor_posture_percentage(), 33);
        // 100 * 299 / 300 = 99.67 -> 99
        assert_eq!(record(300, 299.0).poor_posture_percentage(), 99);
    }

    #[test]
    fn zero_duration_session_has_zero_percentage() {
        assert_eq!(record(0, 0.0).poor_posture_percentage(), 0);
    }

    #[test]
    fn good_duration_is_the_remainder() {
        let r = record(600, 150.0);
        assert_eq!(r.good_posture_secs(), 450.0);
    }

    #[test]
    fn score_adds_capped_duration_bonus() {
        // 25% poor over 30 minutes: base 75, bonus 3.
        assert_eq!(record(1_800, 450.0).score(), 78);
        // Perfect two-hour session caps at 100.
        assert_eq!(record(7_200, 0.0).score(), 100);
        // Entirely poor short session.
        assert_eq!(record(60, 60.0).score(), 0);
    }
}
