//! Platform seams for streaming playback
//!
//! The manager never talks to a real decoder or network stack. A platform
//! supplies a media element (the decoder), and optionally a software
//! adaptive-streaming engine for platforms without native support.
//!
//! Listener and error-handler callbacks must be dispatched by the platform
//! outside of any call into the element or engine, never re-entrantly.

use crate::error::Result;
use std::fmt;
use std::sync::Arc;

/// MIME types that indicate native adaptive-stream (HLS) support
pub const NATIVE_STREAM_MIME_TYPES: [&str; 2] = ["application/vnd.apple.mpegurl", "audio/mpegurl"];

/// Signals emitted by a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEvent {
    /// Duration became known
    LoadedMetadata,
    /// Playback started or resumed
    Playing,
    /// Playback paused (also fired at the end of the stream)
    Pause,
    /// Stalled waiting for data
    Waiting,
    /// Enough data buffered to play
    CanPlay,
    /// Reached the end of the stream
    Ended,
    /// Decoder or network failure; see `MediaElement::error`
    Error,
    /// Current time advanced
    TimeUpdate,
    /// Playback rate changed
    RateChange,
}

/// Media element event listener
///
/// Listeners are compared by identity (`Arc::ptr_eq`) on removal.
pub type MediaListener = Arc<dyn Fn() + Send + Sync>;

/// Error codes reported by a media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorCode {
    /// Fetching was aborted
    Aborted,
    /// Network failure while fetching
    Network,
    /// Data could not be decoded
    Decode,
    /// Source format not supported
    SourceNotSupported,
    /// Unrecognized code
    Unknown,
}

impl MediaErrorCode {
    /// User-facing message for this code
    pub fn message(self) -> &'static str {
        match self {
            Self::Aborted => "Playback aborted",
            Self::Network => "Network error",
            Self::Decode => "Audio decode error",
            Self::SourceNotSupported => "Audio format not supported",
            Self::Unknown => "Playback error",
        }
    }
}

/// User-facing message for an optional media error
pub fn media_error_message(code: Option<MediaErrorCode>) -> &'static str {
    code.map_or("Playback error", MediaErrorCode::message)
}

/// Audio decoder abstraction
///
/// Mirrors the subset of an HTML media element the manager relies on.
pub trait MediaElement: Send {
    /// Whether the element can play the given MIME type natively
    fn can_play_type(&self, mime: &str) -> bool;

    /// Point the element at a new source URL
    fn set_source(&mut self, url: &str);

    /// Start or resume playback
    ///
    /// # Returns
    /// * `Err(PlaybackError::PlayRejected)` - the platform refused to play
    fn play(&mut self) -> Result<()>;

    /// Pause playback
    fn pause(&mut self);

    /// Current position in seconds
    fn current_time(&self) -> f64;

    /// Move the playhead (seconds)
    fn set_current_time(&mut self, seconds: f64);

    /// Duration in seconds; NaN until metadata is loaded
    fn duration(&self) -> f64;

    /// Current rate multiplier
    fn playback_rate(&self) -> f64;

    /// Change the rate multiplier
    fn set_playback_rate(&mut self, rate: f64);

    /// Whether playback reached the end of the stream
    fn ended(&self) -> bool;

    /// Last error, if the element is in an error state
    fn error(&self) -> Option<MediaErrorCode>;

    /// Register a listener for one event
    fn add_event_listener(&mut self, event: MediaEvent, listener: MediaListener);

    /// Remove a previously registered listener (matched by identity)
    fn remove_event_listener(&mut self, event: MediaEvent, listener: &MediaListener);
}

/// Category of an adaptive-streaming engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// Manifest or segment fetch failed
    Network,
    /// Buffer or decode failure
    Media,
    /// Anything else
    Other,
}

/// Error reported by an adaptive-streaming engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamError {
    pub kind: StreamErrorKind,
    /// Fatal errors stop the engine until recovered
    pub fatal: bool,
    /// Engine-specific detail, for logs only
    pub details: String,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, fatal: bool, details: impl Into<String>) -> Self {
        Self {
            kind,
            fatal,
            details: details.into(),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = if self.fatal { "fatal" } else { "non-fatal" };
        write!(f, "{:?} ({}): {}", self.kind, severity, self.details)
    }
}

/// Engine error callback
pub type StreamErrorHandler = Arc<dyn Fn(StreamError) + Send + Sync>;

/// Software adaptive-streaming engine (an hls.js equivalent)
pub trait StreamEngine: Send {
    /// Register the error callback; called before `load_source`
    fn on_error(&mut self, handler: StreamErrorHandler);

    /// Start fetching the manifest
    fn load_source(&mut self, url: &str);

    /// Feed decoded data into a media element
    fn attach_media(&mut self, media: &mut dyn MediaElement);

    /// Restart loading after a network failure
    fn start_load(&mut self);

    /// Built-in recovery for fatal media errors
    fn recover_media_error(&mut self);

    /// Release all resources; the engine is not used again
    fn destroy(&mut self);
}

/// Factory and capability checks for a playback environment
pub trait Platform: Send + Sync {
    /// Whether this environment can play audio at all
    fn is_interactive(&self) -> bool;

    /// Create the single media element the manager drives
    fn create_media_element(&self) -> Box<dyn MediaElement>;

    /// Whether a software streaming engine is available
    fn stream_engine_supported(&self) -> bool;

    /// Create a software streaming engine
    ///
    /// Only called when `stream_engine_supported` returns true.
    fn create_stream_engine(&self) -> Box<dyn StreamEngine>;
}
