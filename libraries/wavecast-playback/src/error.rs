//! Error types for streaming playback

use thiserror::Error;

/// Playback errors
///
/// `Display` output is what the player state shows in its error field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// Playback is unavailable in this environment
    #[error("Playback unavailable: {0}")]
    Environment(String),

    /// The episode cannot be played as configured
    #[error("{0}")]
    Configuration(String),

    /// Neither native nor software adaptive streaming is available
    #[error("{0}")]
    UnsupportedFormat(String),

    /// The stream kept failing to load after every retry
    #[error("Network error loading stream. Please check your connection.")]
    Network {
        /// Retries made before giving up
        attempts: u32,
    },

    /// The decoder reported an error
    #[error("{0}")]
    MediaDecode(String),

    /// The streaming engine hit an unrecoverable error
    #[error("{0}")]
    Streaming(String),

    /// The stream did not become playable
    #[error("Failed to load audio: {0}")]
    LoadFailed(String),

    /// The decoder refused to start playback
    #[error("Playback failed: {0}")]
    PlayRejected(String),

    /// The load was cancelled by `stop()`
    #[error("Load interrupted")]
    Interrupted,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
