//! Core types for playback management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Player status as seen by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    /// Nothing loaded
    #[default]
    Idle,

    /// Loading or buffering
    Loading,

    /// Audio is playing
    Playing,

    /// Paused mid-episode
    Paused,

    /// Played through to the end
    Completed,

    /// Last operation failed; see the error message
    Error,
}

/// Allowed playback rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    /// 1.0x
    #[default]
    #[serde(rename = "1")]
    Normal,

    /// 1.25x
    #[serde(rename = "1.25")]
    Fast,

    /// 1.5x
    #[serde(rename = "1.5")]
    Faster,

    /// 2.0x
    #[serde(rename = "2")]
    Double,
}

impl PlaybackSpeed {
    /// Every allowed speed, slowest first
    pub const ALL: [PlaybackSpeed; 4] = [Self::Normal, Self::Fast, Self::Faster, Self::Double];

    /// Rate multiplier handed to the decoder
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Normal => 1.0,
            Self::Fast => 1.25,
            Self::Faster => 1.5,
            Self::Double => 2.0,
        }
    }

    /// Match a decoder rate against the allowed set
    pub fn from_rate(rate: f64) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|speed| (speed.as_f64() - rate).abs() < 1e-6)
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.as_f64())
    }
}

/// Playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Progress save interval while playing (default: 1000ms)
    pub progress_interval_ms: u64,

    /// Minimum gap between time-update progress saves (default: 1000ms)
    pub progress_throttle_ms: u64,

    /// Network retries before surfacing an error (default: 3)
    pub max_network_retries: u32,

    /// Backoff base; attempt `n` waits `base * 2^n` (default: 1000ms)
    pub retry_base_delay_ms: u64,

    /// Default skip-forward step in seconds (default: 30)
    pub skip_forward_secs: f64,

    /// Default skip-backward step in seconds (default: 15)
    pub skip_backward_secs: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 1000,
            progress_throttle_ms: 1000,
            max_network_retries: 3,
            retry_base_delay_ms: 1000,
            skip_forward_secs: 30.0,
            skip_backward_secs: 15.0,
        }
    }
}

impl PlaybackConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn progress_throttle(&self) -> Duration {
        Duration::from_millis(self.progress_throttle_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}
