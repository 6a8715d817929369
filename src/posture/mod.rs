//! Posture classification from head pitch.
//!
//! Pitch is measured in degrees; negative values mean the head is tilted
//! forward/down. A sample is classified against two fixed thresholds, with
//! boundary values belonging to the less-bad band (strict `<`).

use serde::{Deserialize, Serialize};

/// Pitch below this is poor posture.
pub const POOR_PITCH_THRESHOLD_DEG: f64 = -20.0;
/// Pitch below this (but at or above the poor threshold) is a warning.
pub const WARNING_PITCH_THRESHOLD_DEG: f64 = -15.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PostureQuality {
    Good,
    Warning,
    Poor,
}

impl Default for PostureQuality {
    fn default() -> Self {
        PostureQuality::Good
    }
}

impl PostureQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostureQuality::Good => "Good",
            PostureQuality::Warning => "Warning",
            PostureQuality::Poor => "Poor",
        }
    }

    /// User-facing status message for this band.
    pub fn message(&self) -> &'static str {
        match self {
            PostureQuality::Good => "Good posture",
            PostureQuality::Warning => "Posture declining",
            PostureQuality::Poor => "Poor posture detected",
        }
    }
}

/// Classify a smoothed pitch reading into a quality band.
pub fn classify(pitch_deg: f64) -> PostureQuality {
    if pitch_deg < POOR_PITCH_THRESHOLD_DEG {
        PostureQuality::Poor
    } else if pitch_deg < WARNING_PITCH_THRESHOLD_DEG {
        PostureQuality::Warning
    } else {
        PostureQuality::Good
    }
}

/// Classification plus a corrective recommendation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostureAnalysis {
    pub quality: PostureQuality,
    pub pitch: f64,
    pub recommendation: &'static str,
}

pub fn analyze(pitch_deg: f64) -> PostureAnalysis {
    let quality = classify(pitch_deg);
    let recommendation = match quality {
        PostureQuality::Good => "Great posture! Keep it up",
        PostureQuality::Warning => "Your posture is declining, adjust your position",
        PostureQuality::Poor => "Lift your chin up and straighten your neck",
    };

    PostureAnalysis {
        quality,
        pitch: pitch_deg,
        recommendation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_belong_to_less_bad_band() {
        assert_eq!(classify(-20.0), PostureQuality::Warning);
        assert_eq!(classify(-20.01), PostureQuality::Poor);
        assert_eq!(classify(-15.0), PostureQuality::Good);
        assert_eq!(classify(-15.01), PostureQuality::Warning);
    }

    #[test]
    fn classifies_typical_values() {
        assert_eq!(classify(0.0), PostureQuality::Good);
        assert_eq!(classify(12.5), PostureQuality::Good);
        assert_eq!(classify(-17.3), PostureQuality::Warning);
        assert_eq!(classify(-45.0), PostureQuality::Poor);
    }

    #[test]
    fn analysis_carries_recommendation() {
        let analysis = analyze(-25.0);
        assert_eq!(analysis.quality, PostureQuality::Poor);
        assert!(analysis.recommendation.contains("chin"));
    }
}
