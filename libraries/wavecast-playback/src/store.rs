//! Player state store
//!
//! Single source of truth for what the UI shows: current episode, status,
//! position, duration, speed and error. Only the playback manager writes;
//! observers read snapshots or subscribe to changes.
//!
//! UI actions (`play`, `pause`, ...) are forwarded to the `PlaybackControls`
//! the manager attaches when it is created. Until then they do nothing.

use crate::error::Result;
use crate::types::{PlaybackSpeed, PlaybackStatus};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tokio::sync::watch;
use tracing::debug;
use wavecast_core::format::format_duration;
use wavecast_core::Episode;

/// Actions the store forwards to the playback manager
#[async_trait]
pub trait PlaybackControls: Send + Sync {
    /// Load `episode` if it is not current, then start playback
    async fn play(&self, episode: Option<Episode>) -> Result<()>;

    fn pause(&self);

    /// Move the playhead (seconds) and save progress
    fn seek(&self, seconds: f64);

    fn set_speed(&self, speed: PlaybackSpeed);

    /// Skip ahead; `None` uses the configured step
    fn skip_forward(&self, seconds: Option<f64>);

    /// Skip back; `None` uses the configured step
    fn skip_backward(&self, seconds: Option<f64>);

    /// Stop playback and reset the player
    fn stop(&self);
}

/// Snapshot of the player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub current_episode: Option<Episode>,
    pub status: PlaybackStatus,
    /// Seconds
    pub position: f64,
    /// Seconds; 0 until known
    pub duration: f64,
    pub speed: PlaybackSpeed,
    pub error: Option<String>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_episode: None,
            status: PlaybackStatus::Idle,
            position: 0.0,
            duration: 0.0,
            speed: PlaybackSpeed::Normal,
            error: None,
        }
    }
}

impl PlayerState {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.status == PlaybackStatus::Paused
    }

    pub fn is_loading(&self) -> bool {
        self.status == PlaybackStatus::Loading
    }

    pub fn has_error(&self) -> bool {
        self.status == PlaybackStatus::Error
    }

    pub fn is_idle(&self) -> bool {
        self.status == PlaybackStatus::Idle
    }

    pub fn is_completed(&self) -> bool {
        self.status == PlaybackStatus::Completed
    }

    /// Fraction played, clamped to 0.0 - 1.0
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Position as `M:SS` / `H:MM:SS`
    pub fn formatted_position(&self) -> String {
        format_duration(self.position, false)
    }

    /// Duration as `M:SS` / `H:MM:SS`
    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration, false)
    }

    fn duration_known(&self) -> bool {
        self.duration.is_finite() && self.duration > 0.0
    }
}

struct StoreShared {
    state: watch::Sender<PlayerState>,
    controls: RwLock<Option<Weak<dyn PlaybackControls>>>,
}

/// Observable player state plus UI actions
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct PlayerStore {
    shared: Arc<StoreShared>,
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PlayerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerStore")
            .field("state", &*self.shared.state.borrow())
            .finish_non_exhaustive()
    }
}

impl PlayerStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(PlayerState::default());
        Self {
            shared: Arc::new(StoreShared {
                state,
                controls: RwLock::new(None),
            }),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> PlayerState {
        self.shared.state.borrow().clone()
    }

    /// Current status
    pub fn status(&self) -> PlaybackStatus {
        self.shared.state.borrow().status
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.shared.state.subscribe()
    }

    // ===== Actions =====

    /// Play `episode` (or resume the current one)
    pub async fn play(&self, episode: Option<Episode>) -> Result<()> {
        match self.controls() {
            Some(controls) => controls.play(episode).await,
            None => {
                debug!("play ignored: no playback manager attached");
                Ok(())
            }
        }
    }

    pub fn pause(&self) {
        self.with_controls("pause", |c| c.pause());
    }

    pub fn seek(&self, seconds: f64) {
        self.with_controls("seek", |c| c.seek(seconds));
    }

    pub fn set_speed(&self, speed: PlaybackSpeed) {
        self.with_controls("set_speed", |c| c.set_speed(speed));
    }

    pub fn skip_forward(&self, seconds: Option<f64>) {
        self.with_controls("skip_forward", |c| c.skip_forward(seconds));
    }

    pub fn skip_backward(&self, seconds: Option<f64>) {
        self.with_controls("skip_backward", |c| c.skip_backward(seconds));
    }

    pub fn stop(&self) {
        self.with_controls("stop", |c| c.stop());
    }

    /// Dismiss a reported error and return to idle; no-op without one
    pub fn clear_error(&self) {
        self.shared.state.send_if_modified(|state| {
            if state.error.is_none() && state.status != PlaybackStatus::Error {
                return false;
            }
            state.error = None;
            state.status = PlaybackStatus::Idle;
            true
        });
    }

    /// Whether a playback manager is attached
    pub fn has_controls(&self) -> bool {
        self.controls().is_some()
    }

    // ===== Manager-side mutators =====

    pub(crate) fn attach_controls(&self, controls: Weak<dyn PlaybackControls>) {
        *self
            .shared
            .controls
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(controls);
    }

    /// Detach `controls` if they are still the attached ones
    pub(crate) fn detach_controls(&self, controls: &Weak<dyn PlaybackControls>) {
        let mut attached = self
            .shared
            .controls
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if attached
            .as_ref()
            .is_some_and(|current| Weak::ptr_eq(current, controls))
        {
            *attached = None;
        }
    }

    /// Change status; leaving `Error` clears the error message
    pub(crate) fn set_status(&self, status: PlaybackStatus) {
        self.shared.state.send_if_modified(|state| {
            if state.status == status {
                return false;
            }
            debug!("Player status {:?} -> {:?}", state.status, status);
            if state.status == PlaybackStatus::Error {
                state.error = None;
            }
            state.status = status;
            true
        });
    }

    /// Publish the playhead, clamped to the duration once it is known
    pub(crate) fn update_position(&self, position: f64) {
        if !position.is_finite() {
            return;
        }
        self.shared.state.send_if_modified(|state| {
            let mut position = position.max(0.0);
            if state.duration_known() {
                position = position.min(state.duration);
            }
            if state.position == position {
                return false;
            }
            state.position = position;
            true
        });
    }

    pub(crate) fn update_duration(&self, duration: f64) {
        if !duration.is_finite() || duration < 0.0 {
            return;
        }
        self.shared.state.send_if_modified(|state| {
            if state.duration == duration {
                return false;
            }
            state.duration = duration;
            if state.duration_known() && state.position > duration {
                state.position = duration;
            }
            true
        });
    }

    pub(crate) fn update_speed(&self, speed: PlaybackSpeed) {
        self.shared.state.send_if_modified(|state| {
            if state.speed == speed {
                return false;
            }
            state.speed = speed;
            true
        });
    }

    pub(crate) fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.shared.state.send_modify(|state| {
            state.status = PlaybackStatus::Error;
            state.error = Some(message);
        });
    }

    pub(crate) fn on_playback_completed(&self) {
        self.shared.state.send_modify(|state| {
            state.status = PlaybackStatus::Completed;
            state.error = None;
            state.position = 0.0;
        });
    }

    pub(crate) fn set_current_episode(&self, episode: Option<Episode>) {
        self.shared.state.send_modify(|state| {
            state.current_episode = episode;
        });
    }

    /// Back to idle with nothing loaded and speed 1.0
    pub(crate) fn reset(&self) {
        self.shared.state.send_replace(PlayerState::default());
    }

    fn controls(&self) -> Option<Arc<dyn PlaybackControls>> {
        self.shared
            .controls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
    }

    fn with_controls(&self, action: &str, apply: impl FnOnce(&dyn PlaybackControls)) {
        match self.controls() {
            Some(controls) => apply(controls.as_ref()),
            None => debug!("{} ignored: no playback manager attached", action),
        }
    }
}
