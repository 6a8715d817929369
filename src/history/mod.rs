//! Aggregates over completed sessions: timeframe filtering, summary
//! statistics, trend, and CSV export.
//!
//! Everything here is a pure function of a session list and a reference
//! instant; calendar math uses UTC.

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::db::SessionRecord;

pub const CSV_HEADER: &str = "Date,Start Time,End Time,Duration (min),Poor Posture Duration (min),Poor Posture %,Average Pitch,Min Pitch,Max Pitch";

/// How far a trend shift must move (in percentage points) before it counts
/// as a change.
const TREND_STEADY_BAND: i64 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Timeframe {
    Today,
    Week,
    Month,
    All,
}

impl Timeframe {
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Today => "Today",
            Timeframe::Week => "Week",
            Timeframe::Month => "Month",
            Timeframe::All => "All Time",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Trend {
    Improving,
    Steady,
    Worsening,
}

/// Keep sessions whose start falls inside the timeframe ending at `now`.
/// Cutoffs are inclusive (`>=`).
pub fn filter_sessions<'a>(
    sessions: &'a [SessionRecord],
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> Vec<&'a SessionRecord> {
    sessions
        .iter()
        .filter(|session| match timeframe {
            Timeframe::Today => {
                session.started_at.year() == now.year()
                    && session.started_at.ordinal() == now.ordinal()
            }
            Timeframe::Week => session.started_at >= now - Duration::days(7),
            Timeframe::Month => {
                let cutoff = now
                    .checked_sub_months(Months::new(1))
                    .unwrap_or(now - Duration::days(30));
                session.started_at >= cutoff
            }
            Timeframe::All => true,
        })
        .collect()
}

/// Integer mean of per-session poor-posture percentages; 0 when empty.
pub fn average_poor_posture(sessions: &[&SessionRecord]) -> u32 {
    if sessions.is_empty() {
        return 0;
    }
    let total: u32 = sessions
        .iter()
        .map(|session| session.poor_posture_percentage())
        .sum();
    total / sessions.len() as u32
}

pub fn total_session_secs(sessions: &[&SessionRecord]) -> f64 {
    sessions.iter().map(|session| session.total_secs()).sum()
}

pub fn average_session_secs(sessions: &[&SessionRecord]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    total_session_secs(sessions) / sessions.len() as f64
}

/// Session with the lowest poor-posture percentage; first encountered wins
/// ties.
pub fn best_session<'a>(sessions: &[&'a SessionRecord]) -> Option<&'a SessionRecord> {
    sessions.iter().copied().fold(None, |best, candidate| match best {
        Some(current) if candidate.poor_posture_percentage() < current.poor_posture_percentage() => {
            Some(candidate)
        }
        Some(current) => Some(current),
        None => Some(candidate),
    })
}

/// Session with the highest poor-posture percentage; first encountered wins
/// ties.
pub fn worst_session<'a>(sessions: &[&'a SessionRecord]) -> Option<&'a SessionRecord> {
    sessions.iter().copied().fold(None, |worst, candidate| match worst {
        Some(current) if candidate.poor_posture_percentage() > current.poor_posture_percentage() => {
            Some(candidate)
        }
        Some(current) => Some(current),
        None => Some(candidate),
    })
}

/// Compare the newer half of the sessions (by start time) against the older
/// half. Needs at least two sessions.
pub fn trend(sessions: &[&SessionRecord]) -> Option<Trend> {
    if sessions.len() < 2 {
        return None;
    }

    let mut ordered: Vec<&SessionRecord> = sessions.to_vec();
    ordered.sort_by_key(|session| session.started_at);

    let (older, newer) = ordered.split_at(ordered.len() / 2);
    let older_avg = average_poor_posture(older) as i64;
    let newer_avg = average_poor_posture(newer) as i64;

    let shift = newer_avg - older_avg;
    if shift.abs() <= TREND_STEADY_BAND {
        Some(Trend::Steady)
    } else if shift < 0 {
        Some(Trend::Improving)
    } else {
        Some(Trend::Worsening)
    }
}

/// UI-facing rollup for one timeframe.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub timeframe: Timeframe,
    pub session_count: usize,
    pub average_poor_posture: u32,
    pub total_session_secs: f64,
    pub average_session_secs: f64,
    pub best_session: Option<SessionRecord>,
    pub worst_session: Option<SessionRecord>,
    pub trend: Option<Trend>,
}

pub fn summarize(
    sessions: &[SessionRecord],
    timeframe: Timeframe,
    now: DateTime<Utc>,
) -> HistorySummary {
    let filtered = filter_sessions(sessions, timeframe, now);

    HistorySummary {
        timeframe,
        session_count: filtered.len(),
        average_poor_posture: average_poor_posture(&filtered),
        total_session_secs: total_session_secs(&filtered),
        average_session_secs: average_session_secs(&filtered),
        best_session: best_session(&filtered).cloned(),
        worst_session: worst_session(&filtered).cloned(),
        trend: trend(&filtered),
    }
}

/// Render sessions as CSV, header first, date and time fields quoted.
pub fn export_csv(sessions: &[SessionRecord]) -> String {
    let mut csv = String::from(CSV_HEADER);
    csv.push('\n');

    for session in sessions {
        let row = format!(
            "\"{}\",\"{}\",\"{}\",{},{},{},{:.1},{:.1},{:.1}\n",
            session.started_at.format("%Y-%m-%d"),
            session.started_at.format("%H:%M:%S"),
            session.ended_at.format("%H:%M:%S"),
            (session.total_secs() / 60.0) as u64,
            (session.poor_posture_secs / 60.0) as u64,
            session.poor_posture_percentage(),
            session.average_pitch,
            session.min_pitch,
            session.max_pitch,
        );
        csv.push_str(&row);
    }

    csv
}
