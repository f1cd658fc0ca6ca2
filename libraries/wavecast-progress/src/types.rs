//! Progress record and policy types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Saved progress for a single episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeProgress {
    /// Position in seconds (0 once completed)
    pub position: f64,

    /// Total duration in seconds
    pub duration: f64,

    /// Fraction listened, 0.0 - 1.0 (1.0 once completed)
    pub progress: f64,

    /// When this record was last written
    pub last_played: DateTime<Utc>,

    /// Whether the episode counts as finished
    pub completed: bool,
}

/// Thresholds deciding completion and resume behaviour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressPolicy {
    /// Ratio at or above which an episode is completed (default: 0.95)
    pub completion_threshold: f64,

    /// Lowest ratio worth resuming from (default: 0.05)
    pub resume_min: f64,

    /// Highest ratio worth resuming from (default: 0.95)
    pub resume_max: f64,
}

impl Default for ProgressPolicy {
    fn default() -> Self {
        Self {
            completion_threshold: 0.95,
            resume_min: 0.05,
            resume_max: 0.95,
        }
    }
}

impl ProgressPolicy {
    /// Whether a ratio falls inside the resume band (inclusive)
    pub fn in_resume_band(&self, progress: f64) -> bool {
        progress >= self.resume_min && progress <= self.resume_max
    }

    /// Whether a ratio counts as finished
    pub fn is_complete(&self, progress: f64) -> bool {
        progress >= self.completion_threshold
    }
}
