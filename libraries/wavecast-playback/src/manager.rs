//! Streaming playback manager
//!
//! Drives one media element (and, where the platform lacks native adaptive
//! streaming, one software streaming engine) and mirrors everything it sees
//! into the `PlayerStore` and `ProgressStore`.
//!
//! Decoder signals arrive through a fixed table of bound handlers that is
//! registered once at construction and unregistered by `destroy()`.
//!
//! Locking: the session mutex is never held across an await, and never held
//! while a listener could run. Acquisition order is session, then player
//! store, then progress store.

use crate::error::{PlaybackError, Result};
use crate::platform::{
    media_error_message, MediaElement, MediaEvent, MediaListener, Platform, StreamEngine,
    StreamError, StreamErrorHandler, StreamErrorKind, NATIVE_STREAM_MIME_TYPES,
};
use crate::retry::NetworkRetry;
use crate::store::{PlaybackControls, PlayerStore};
use crate::throttle::Throttle;
use crate::types::{PlaybackConfig, PlaybackSpeed, PlaybackStatus};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use wavecast_core::Episode;
use wavecast_progress::ProgressStore;

/// Outcome reported by the temporary readiness listeners of a load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Ready,
    Failed,
}

/// Sender shared by the can-play and error listeners of one load
type ReadySlot = Arc<Mutex<Option<oneshot::Sender<Readiness>>>>;

/// Playback session, owned exclusively by the manager
struct Session {
    media: Box<dyn MediaElement>,
    engine: Option<Box<dyn StreamEngine>>,
    current: Option<Episode>,

    /// Loading lock; at most one load in flight
    loading: bool,
    /// Bumped whenever a load starts or is interrupted
    load_id: u64,
    pending_ready: Option<ReadySlot>,

    retry: NetworkRetry,
    retry_task: Option<JoinHandle<()>>,

    tick: Option<JoinHandle<()>>,
    throttle: Throttle,

    destroyed: bool,
}

impl Session {
    fn new(media: Box<dyn MediaElement>, config: &PlaybackConfig) -> Self {
        Self {
            media,
            engine: None,
            current: None,
            loading: false,
            load_id: 0,
            pending_ready: None,
            retry: NetworkRetry::new(config.max_network_retries, config.retry_base_delay()),
            retry_task: None,
            tick: None,
            throttle: Throttle::new(config.progress_throttle()),
            destroyed: false,
        }
    }

    fn stop_tick(&mut self) {
        if let Some(tick) = self.tick.take() {
            tick.abort();
        }
    }

    fn cancel_retry(&mut self) {
        if let Some(task) = self.retry_task.take() {
            task.abort();
        }
    }

    /// Destroy the streaming engine and any retry scheduled against it
    fn teardown_engine(&mut self) {
        self.cancel_retry();
        self.retry.reset();
        if let Some(mut engine) = self.engine.take() {
            debug!("Destroying streaming engine");
            engine.destroy();
        }
    }

    /// Release the loading lock and fail the in-flight load's ready wait
    fn interrupt_load(&mut self) {
        if self.loading {
            self.loading = false;
            self.load_id += 1;
        }
        if let Some(slot) = self.pending_ready.take() {
            slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        }
    }

    fn is_current(&self, episode_id: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| current.id == episode_id)
    }
}

/// Listener table bound to one manager instance
///
/// Each listener holds a `Weak` back-reference, so registered listeners do
/// not keep the manager alive.
struct BoundHandlers {
    loaded_metadata: MediaListener,
    playing: MediaListener,
    pause: MediaListener,
    waiting: MediaListener,
    can_play: MediaListener,
    ended: MediaListener,
    error: MediaListener,
    time_update: MediaListener,
    rate_change: MediaListener,
}

impl BoundHandlers {
    fn new(me: &Weak<ManagerInner>) -> Self {
        Self {
            loaded_metadata: bind(me, ManagerInner::on_loaded_metadata),
            playing: bind(me, ManagerInner::on_playing),
            pause: bind(me, ManagerInner::on_pause),
            waiting: bind(me, ManagerInner::on_waiting),
            can_play: bind(me, ManagerInner::on_can_play),
            ended: bind(me, ManagerInner::on_ended),
            error: bind(me, ManagerInner::on_media_error),
            time_update: bind(me, ManagerInner::on_time_update),
            rate_change: bind(me, ManagerInner::on_rate_change),
        }
    }

    fn entries(&self) -> [(MediaEvent, &MediaListener); 9] {
        [
            (MediaEvent::LoadedMetadata, &self.loaded_metadata),
            (MediaEvent::Playing, &self.playing),
            (MediaEvent::Pause, &self.pause),
            (MediaEvent::Waiting, &self.waiting),
            (MediaEvent::CanPlay, &self.can_play),
            (MediaEvent::Ended, &self.ended),
            (MediaEvent::Error, &self.error),
            (MediaEvent::TimeUpdate, &self.time_update),
            (MediaEvent::RateChange, &self.rate_change),
        ]
    }
}

fn bind(me: &Weak<ManagerInner>, handler: fn(&ManagerInner)) -> MediaListener {
    let me = me.clone();
    Arc::new(move || {
        if let Some(inner) = me.upgrade() {
            handler(&inner);
        }
    })
}

fn destroyed_error() -> PlaybackError {
    PlaybackError::Environment("playback manager has been destroyed".to_string())
}

fn ready_listener(slot: &ReadySlot, outcome: Readiness) -> MediaListener {
    let slot = Arc::clone(slot);
    Arc::new(move || {
        let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sender) = sender {
            // The load may already have been dropped
            let _ = sender.send(outcome);
        }
    })
}

/// Releases the loading lock and removes readiness listeners on every exit
/// path of a load, including a dropped load future
struct LoadGuard<'a> {
    inner: &'a ManagerInner,
    load_id: u64,
    listeners: Vec<(MediaEvent, MediaListener)>,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.inner.session();
        for (event, listener) in self.listeners.drain(..) {
            session.media.remove_event_listener(event, &listener);
        }
        // A stop() in the meantime already released the lock
        if session.load_id == self.load_id {
            session.loading = false;
            session.pending_ready = None;
        }
    }
}

struct ManagerInner {
    me: Weak<ManagerInner>,
    platform: Arc<dyn Platform>,
    store: PlayerStore,
    progress: ProgressStore,
    config: PlaybackConfig,
    runtime: Handle,
    handlers: BoundHandlers,
    session: Mutex<Session>,
}

/// Streaming playback manager
///
/// Cloning is cheap; clones drive the same session. Use `PlaybackHost` to
/// keep a single instance per process.
#[derive(Clone)]
pub struct PlaybackManager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for PlaybackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackManager")
            .field("current_episode", &self.current_episode().map(|e| e.id))
            .field("loading", &self.is_loading())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

impl PlaybackManager {
    /// Create a manager and attach it to `store` as its playback controls
    ///
    /// # Errors
    /// * `PlaybackError::Environment` - the platform cannot play audio, or no
    ///   tokio runtime is running
    pub fn new(
        platform: Arc<dyn Platform>,
        store: PlayerStore,
        progress: ProgressStore,
        config: PlaybackConfig,
    ) -> Result<Self> {
        if !platform.is_interactive() {
            return Err(PlaybackError::Environment(
                "platform cannot play audio".to_string(),
            ));
        }
        let runtime = Handle::try_current().map_err(|_| {
            PlaybackError::Environment("no async runtime available".to_string())
        })?;

        let session = Session::new(platform.create_media_element(), &config);
        let inner = Arc::new_cyclic(|me| ManagerInner {
            me: me.clone(),
            handlers: BoundHandlers::new(me),
            session: Mutex::new(session),
            platform,
            store,
            progress,
            config,
            runtime,
        });

        inner.register_handlers();
        inner.store.attach_controls(inner.controls_handle());
        debug!("Playback manager created");

        Ok(Self { inner })
    }

    /// Load an episode and wait until it can play
    ///
    /// Ignored (returns `Ok`) while another load is in flight or when the
    /// episode is already current.
    pub async fn load_episode(&self, episode: Episode) -> Result<()> {
        self.inner.load_episode(episode).await
    }

    /// Load `episode` if it is not current, then start playback
    pub async fn play(&self, episode: Option<Episode>) -> Result<()> {
        self.inner.play(episode).await
    }

    pub fn pause(&self) {
        self.inner.pause();
    }

    /// Move the playhead (seconds) and save progress immediately
    pub fn seek(&self, seconds: f64) {
        self.inner.seek(seconds);
    }

    pub fn set_speed(&self, speed: PlaybackSpeed) {
        self.inner.set_speed(speed);
    }

    /// Skip ahead, clamped to the duration; `None` uses the configured step
    pub fn skip_forward(&self, seconds: Option<f64>) {
        self.inner.skip_forward(seconds);
    }

    /// Skip back, clamped to 0; `None` uses the configured step
    pub fn skip_backward(&self, seconds: Option<f64>) {
        self.inner.skip_backward(seconds);
    }

    /// Stop playback, tear down the stream and reset the player
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Stop, unregister every listener and detach from the player store
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.session().destroyed
    }

    /// Whether a load is in flight
    pub fn is_loading(&self) -> bool {
        self.inner.session().loading
    }

    pub fn current_episode(&self) -> Option<Episode> {
        self.inner.session().current.clone()
    }

    pub fn store(&self) -> &PlayerStore {
        &self.inner.store
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.inner.config
    }
}

impl ManagerInner {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn controls_handle(&self) -> Weak<dyn PlaybackControls> {
        self.me.clone()
    }

    fn register_handlers(&self) {
        let mut session = self.session();
        for (event, listener) in self.handlers.entries() {
            session.media.add_event_listener(event, Arc::clone(listener));
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.session().destroyed {
            return Err(destroyed_error());
        }
        Ok(())
    }

    /// Log an error and show it in the player
    fn report(&self, err: &PlaybackError) {
        if matches!(err, PlaybackError::Interrupted) {
            debug!("Load interrupted");
            return;
        }
        error!("Playback error: {}", err);
        self.store.set_error(err.to_string());
    }

    // ===== Loading =====

    async fn load_episode(&self, episode: Episode) -> Result<()> {
        let Some(mut guard) = self.begin_load(&episode)? else {
            return Ok(());
        };

        let result = self.prepare_and_wait(&episode, &mut guard).await;
        drop(guard);

        if let Err(err) = &result {
            if !matches!(err, PlaybackError::Interrupted) {
                // Forget the failed episode so play() with it loads again
                let mut session = self.session();
                if !session.loading && session.is_current(&episode.id) {
                    session.current = None;
                }
            }
            self.report(err);
        }
        result
    }

    /// Take the loading lock and make `episode` current
    fn begin_load(&self, episode: &Episode) -> Result<Option<LoadGuard<'_>>> {
        let mut session = self.session();
        if session.destroyed {
            return Err(destroyed_error());
        }
        if session.loading {
            warn!("Episode load already in progress, skipping {}", episode.id);
            return Ok(None);
        }
        if session.is_current(&episode.id) {
            debug!("Episode {} already loaded", episode.id);
            return Ok(None);
        }

        session.loading = true;
        session.load_id += 1;
        session.current = Some(episode.clone());
        session.stop_tick();
        session.throttle.reset();

        self.store.set_status(PlaybackStatus::Loading);
        self.store.set_current_episode(Some(episode.clone()));

        Ok(Some(LoadGuard {
            inner: self,
            load_id: session.load_id,
            listeners: Vec::new(),
        }))
    }

    async fn prepare_and_wait(&self, episode: &Episode, guard: &mut LoadGuard<'_>) -> Result<()> {
        let ready = self.prepare_source(episode, guard)?;

        match ready.await {
            Ok(Readiness::Ready) => {
                debug!("Episode {} ready to play", episode.id);
                Ok(())
            }
            Ok(Readiness::Failed) => {
                let message = media_error_message(self.session().media.error());
                Err(PlaybackError::LoadFailed(message.to_string()))
            }
            Err(_) => Err(PlaybackError::Interrupted),
        }
    }

    /// Point the decoder at the episode's stream and arm the ready wait
    fn prepare_source(
        &self,
        episode: &Episode,
        guard: &mut LoadGuard<'_>,
    ) -> Result<oneshot::Receiver<Readiness>> {
        let url = episode.stream_url().ok_or_else(|| {
            PlaybackError::Configuration("No streaming URL available".to_string())
        })?;
        let resume_position = self.progress.get_resume_position(&episode.id);
        let speed = self.store.snapshot().speed;

        let mut session = self.session();
        session.teardown_engine();

        let native = NATIVE_STREAM_MIME_TYPES
            .iter()
            .any(|mime| session.media.can_play_type(mime));

        if native {
            info!("Using native adaptive streaming for {}", episode.id);
            session.media.set_source(url);
        } else if self.platform.stream_engine_supported() {
            info!("Using software streaming engine for {}", episode.id);
            let mut engine = self.platform.create_stream_engine();
            engine.on_error(self.stream_error_handler());
            engine.load_source(url);
            engine.attach_media(&mut *session.media);
            session.engine = Some(engine);
        } else {
            return Err(PlaybackError::UnsupportedFormat(
                "Adaptive streaming is not supported on this platform".to_string(),
            ));
        }

        if resume_position > 0.0 {
            debug!("Resuming {} at {:.1}s", episode.id, resume_position);
            session.media.set_current_time(resume_position);
        }
        session.media.set_playback_rate(speed.as_f64());

        let (sender, receiver) = oneshot::channel();
        let slot: ReadySlot = Arc::new(Mutex::new(Some(sender)));
        for (event, outcome) in [
            (MediaEvent::CanPlay, Readiness::Ready),
            (MediaEvent::Error, Readiness::Failed),
        ] {
            let listener = ready_listener(&slot, outcome);
            session.media.add_event_listener(event, Arc::clone(&listener));
            guard.listeners.push((event, listener));
        }
        session.pending_ready = Some(slot);

        Ok(receiver)
    }

    // ===== Transport =====

    async fn play(&self, episode: Option<Episode>) -> Result<()> {
        self.ensure_alive()?;

        if let Some(episode) = episode {
            let is_current = self.session().is_current(&episode.id);
            if !is_current {
                self.load_episode(episode).await?;
            }
        }

        let result = self.session().media.play();
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    fn pause(&self) {
        self.session().media.pause();
    }

    fn seek(&self, seconds: f64) {
        if !seconds.is_finite() {
            warn!("Ignoring seek to {}", seconds);
            return;
        }
        self.session().media.set_current_time(seconds.max(0.0));
        self.write_progress();
    }

    fn set_speed(&self, speed: PlaybackSpeed) {
        self.session().media.set_playback_rate(speed.as_f64());
    }

    fn skip_forward(&self, seconds: Option<f64>) {
        let step = seconds.unwrap_or(self.config.skip_forward_secs);
        let target = {
            let session = self.session();
            let duration = session.media.duration();
            (duration.is_finite() && duration > 0.0)
                .then(|| (session.media.current_time() + step).min(duration))
        };

        match target {
            Some(target) => self.seek(target),
            None => debug!("skip_forward ignored: duration not known yet"),
        }
    }

    fn skip_backward(&self, seconds: Option<f64>) {
        let step = seconds.unwrap_or(self.config.skip_backward_secs);
        let target = (self.session().media.current_time() - step).max(0.0);
        self.seek(target);
    }

    fn stop(&self) {
        {
            let mut session = self.session();
            session.media.pause();
            session.media.set_current_time(0.0);
            session.stop_tick();
            session.teardown_engine();
            session.interrupt_load();
            session.current = None;
            session.throttle.reset();
        }
        self.store.reset();
        debug!("Playback stopped");
    }

    fn destroy(&self) {
        if self.session().destroyed {
            return;
        }
        self.stop();

        {
            let mut session = self.session();
            for (event, listener) in self.handlers.entries() {
                session.media.remove_event_listener(event, listener);
            }
            session.destroyed = true;
        }
        self.store.detach_controls(&self.controls_handle());
        info!("Playback manager destroyed");
    }

    // ===== Progress =====

    fn start_tick(&self, session: &mut Session) {
        if session.tick.is_some() {
            return;
        }

        let me = self.me.clone();
        let period = self.config.progress_interval().max(Duration::from_millis(1));
        session.tick = Some(self.runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                let Some(inner) = me.upgrade() else {
                    break;
                };
                inner.write_progress();
            }
        }));
    }

    /// Save the current position of the current episode
    fn write_progress(&self) {
        let sample = {
            let session = self.session();
            session.current.as_ref().map(|episode| {
                (
                    episode.id.clone(),
                    session.media.current_time(),
                    session.media.duration(),
                )
            })
        };

        if let Some((episode_id, position, duration)) = sample {
            self.progress.update_progress(&episode_id, position, duration);
        }
    }

    // ===== Decoder signals =====

    fn on_loaded_metadata(&self) {
        let duration = self.session().media.duration();
        debug!("Duration known: {:.1}s", duration);
        self.store.update_duration(duration);
    }

    fn on_playing(&self) {
        {
            let mut session = self.session();
            session.retry.reset();
            self.start_tick(&mut session);
        }
        self.store.set_status(PlaybackStatus::Playing);
    }

    fn on_pause(&self) {
        let applies = {
            let mut session = self.session();
            session.stop_tick();
            !session.media.ended() && session.current.is_some()
        };

        if applies {
            self.store.set_status(PlaybackStatus::Paused);
        }
        self.write_progress();
    }

    fn on_waiting(&self) {
        if self.store.status() == PlaybackStatus::Playing {
            self.store.set_status(PlaybackStatus::Loading);
        }
    }

    fn on_can_play(&self) {
        if self.store.status() == PlaybackStatus::Loading {
            self.store.set_status(PlaybackStatus::Playing);
        }
    }

    fn on_ended(&self) {
        self.session().stop_tick();
        self.store.on_playback_completed();
        self.write_progress();
    }

    fn on_media_error(&self) {
        let message = {
            let mut session = self.session();
            session.stop_tick();
            media_error_message(session.media.error())
        };
        self.report(&PlaybackError::MediaDecode(message.to_string()));
    }

    fn on_time_update(&self) {
        let (position, save) = {
            let mut session = self.session();
            let position = session.media.current_time();
            let save = session.current.is_some() && session.throttle.try_acquire();
            (position, save)
        };

        self.store.update_position(position);
        if save {
            self.write_progress();
        }
    }

    fn on_rate_change(&self) {
        let rate = self.session().media.playback_rate();
        match PlaybackSpeed::from_rate(rate) {
            Some(speed) => self.store.update_speed(speed),
            None => warn!("Ignoring unsupported playback rate {}", rate),
        }
    }

    // ===== Streaming engine errors =====

    fn stream_error_handler(&self) -> StreamErrorHandler {
        let me = self.me.clone();
        Arc::new(move |error| {
            if let Some(inner) = me.upgrade() {
                inner.on_stream_error(&error);
            }
        })
    }

    fn on_stream_error(&self, error: &StreamError) {
        if !error.fatal {
            debug!("Streaming engine warning: {}", error);
            return;
        }
        warn!("Streaming engine error: {}", error);

        match error.kind {
            StreamErrorKind::Network => self.retry_network(),
            StreamErrorKind::Media => {
                if let Some(engine) = self.session().engine.as_mut() {
                    info!("Attempting to recover from media error");
                    engine.recover_media_error();
                }
            }
            StreamErrorKind::Other => {
                self.report(&PlaybackError::Streaming("Fatal streaming error".to_string()));
            }
        }
    }

    fn retry_network(&self) {
        let mut session = self.session();
        let Some(delay) = session.retry.next_delay() else {
            let attempts = session.retry.max_attempts();
            drop(session);
            error!("Max network retries reached");
            self.report(&PlaybackError::Network { attempts });
            return;
        };

        info!(
            "Network error. Retry {}/{} in {:?}",
            session.retry.attempts(),
            session.retry.max_attempts(),
            delay
        );

        session.cancel_retry();
        let me = self.me.clone();
        session.retry_task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = me.upgrade() {
                inner.restart_load();
            }
        }));
    }

    fn restart_load(&self) {
        let mut session = self.session();
        session.retry_task = None;
        if let Some(engine) = session.engine.as_mut() {
            info!("Retrying stream load");
            engine.start_load();
        }
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        let session = self
            .session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        session.stop_tick();
        session.teardown_engine();
    }
}

#[async_trait]
impl PlaybackControls for ManagerInner {
    async fn play(&self, episode: Option<Episode>) -> Result<()> {
        ManagerInner::play(self, episode).await
    }

    fn pause(&self) {
        ManagerInner::pause(self);
    }

    fn seek(&self, seconds: f64) {
        ManagerInner::seek(self, seconds);
    }

    fn set_speed(&self, speed: PlaybackSpeed) {
        ManagerInner::set_speed(self, speed);
    }

    fn skip_forward(&self, seconds: Option<f64>) {
        ManagerInner::skip_forward(self, seconds);
    }

    fn skip_backward(&self, seconds: Option<f64>) {
        ManagerInner::skip_backward(self, seconds);
    }

    fn stop(&self) {
        ManagerInner::stop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_listener_sends_once() {
        let (sender, mut receiver) = oneshot::channel();
        let slot: ReadySlot = Arc::new(Mutex::new(Some(sender)));

        let ready = ready_listener(&slot, Readiness::Ready);
        let failed = ready_listener(&slot, Readiness::Failed);

        ready();
        failed();

        assert_eq!(receiver.try_recv().unwrap(), Readiness::Ready);
        assert!(slot.lock().unwrap().is_none());
    }

    #[test]
    fn bound_listener_outliving_manager_is_inert() {
        let me: Weak<ManagerInner> = Weak::new();
        let listener = bind(&me, ManagerInner::on_playing);
        listener();
    }
}
