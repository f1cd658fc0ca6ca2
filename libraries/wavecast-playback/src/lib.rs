//! Wavecast - Streaming Playback
//!
//! Platform-agnostic streaming playback for Wavecast episodes.
//!
//! This crate provides:
//! - A streaming playback manager (native or software adaptive streaming)
//! - Network error recovery with bounded exponential backoff
//! - An observable player state store for the UI
//! - Throttled progress persistence through `wavecast-progress`
//! - Resume from the last saved position
//! - A host that keeps a single manager per process
//!
//! # Architecture
//!
//! `wavecast-playback` never touches a real decoder. The platform supplies:
//! - [`MediaElement`]: the audio decoder (an HTML media element equivalent)
//! - [`StreamEngine`]: a software adaptive-streaming engine, when the decoder
//!   cannot play HLS natively
//! - [`Platform`]: capability checks and factories for both
//!
//! The manager translates decoder signals into [`PlayerStore`] updates. The
//! store forwards UI actions back to the manager through
//! [`PlaybackControls`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wavecast_core::{Category, Episode, Language, MemoryStore};
//! use wavecast_playback::{PlaybackConfig, PlaybackHost, Platform};
//! use wavecast_progress::ProgressStore;
//!
//! # async fn run(platform: Arc<dyn Platform>) -> wavecast_playback::Result<()> {
//! let progress = ProgressStore::open(Arc::new(MemoryStore::new()));
//! let host = PlaybackHost::new(platform, progress, PlaybackConfig::default());
//!
//! let episode = Episode::new("2025-01-02-markets", Language::EnUs, Category::Macro, "Markets")
//!     .with_stream_url("https://cdn.example.com/2025-01-02-markets/index.m3u8");
//!
//! let manager = host.manager()?;
//! manager.play(Some(episode)).await?;
//!
//! let mut changes = host.store().subscribe();
//! changes.changed().await.ok();
//! println!("status: {:?}", changes.borrow().status);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod host;
pub mod manager;
pub mod platform;
pub mod retry;
pub mod store;
pub mod throttle;
pub mod types;

pub use error::{PlaybackError, Result};
pub use host::PlaybackHost;
pub use manager::PlaybackManager;
pub use platform::{
    media_error_message, MediaElement, MediaErrorCode, MediaEvent, MediaListener, Platform,
    StreamEngine, StreamError, StreamErrorHandler, StreamErrorKind, NATIVE_STREAM_MIME_TYPES,
};
pub use retry::NetworkRetry;
pub use store::{PlaybackControls, PlayerState, PlayerStore};
pub use throttle::Throttle;
pub use types::{PlaybackConfig, PlaybackSpeed, PlaybackStatus};
