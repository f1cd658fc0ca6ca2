//! Scripted platform for driving the playback manager in tests
//!
//! Mock elements and engines share their state with the test through
//! `Arc<Mutex<..>>` handles. Events are emitted by the test itself, outside
//! any call into the mock, the way a real platform dispatches them.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use wavecast_core::{Category, Episode, Language, MemoryStore};
use wavecast_playback::{
    MediaElement, MediaErrorCode, MediaEvent, MediaListener, PlaybackConfig, PlaybackError,
    PlaybackManager, Platform, PlayerStore, StreamEngine, StreamError, StreamErrorHandler,
};
use wavecast_progress::ProgressStore;

// ===== Media element =====

pub struct MediaState {
    pub native_streaming: bool,
    pub source: Option<String>,
    pub current_time: f64,
    pub duration: f64,
    pub playback_rate: f64,
    pub paused: bool,
    pub ended: bool,
    pub error: Option<MediaErrorCode>,
    pub play_calls: usize,
    pub reject_play: bool,
    pub listeners: Vec<(MediaEvent, MediaListener)>,
}

impl MediaState {
    fn new(native_streaming: bool) -> Self {
        Self {
            native_streaming,
            source: None,
            current_time: 0.0,
            duration: f64::NAN,
            playback_rate: 1.0,
            paused: true,
            ended: false,
            error: None,
            play_calls: 0,
            reject_play: false,
            listeners: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct MediaHandle(Arc<Mutex<MediaState>>);

impl MediaHandle {
    pub fn state(&self) -> MutexGuard<'_, MediaState> {
        self.0.lock().unwrap()
    }

    /// Dispatch an event to every listener registered for it
    pub fn emit(&self, event: MediaEvent) {
        let listeners: Vec<MediaListener> = self
            .state()
            .listeners
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self, event: MediaEvent) -> usize {
        self.state()
            .listeners
            .iter()
            .filter(|(e, _)| *e == event)
            .count()
    }

    pub fn total_listeners(&self) -> usize {
        self.state().listeners.len()
    }

    /// Metadata arrives: set the duration and signal it
    pub fn load_metadata(&self, duration: f64) {
        self.state().duration = duration;
        self.emit(MediaEvent::LoadedMetadata);
    }

    /// Playhead moves: set the time and signal it
    pub fn advance_to(&self, seconds: f64) {
        self.state().current_time = seconds;
        self.emit(MediaEvent::TimeUpdate);
    }

    /// Decoder fails with `code`
    pub fn fail(&self, code: MediaErrorCode) {
        self.state().error = Some(code);
        self.emit(MediaEvent::Error);
    }

    /// Playback reaches the end
    pub fn finish(&self) {
        {
            let mut state = self.state();
            state.current_time = state.duration;
            state.ended = true;
            state.paused = true;
        }
        self.emit(MediaEvent::Pause);
        self.emit(MediaEvent::Ended);
    }
}

struct MockMedia(MediaHandle);

impl MediaElement for MockMedia {
    fn can_play_type(&self, mime: &str) -> bool {
        self.0.state().native_streaming && mime.contains("mpegurl")
    }

    fn set_source(&mut self, url: &str) {
        let mut state = self.0.state();
        state.source = Some(url.to_string());
        state.ended = false;
        state.error = None;
    }

    fn play(&mut self) -> wavecast_playback::Result<()> {
        let mut state = self.0.state();
        state.play_calls += 1;
        if state.reject_play {
            return Err(PlaybackError::PlayRejected("autoplay blocked".to_string()));
        }
        state.paused = false;
        state.ended = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.0.state().paused = true;
    }

    fn current_time(&self) -> f64 {
        self.0.state().current_time
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.0.state().current_time = seconds;
    }

    fn duration(&self) -> f64 {
        self.0.state().duration
    }

    fn playback_rate(&self) -> f64 {
        self.0.state().playback_rate
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.0.state().playback_rate = rate;
    }

    fn ended(&self) -> bool {
        self.0.state().ended
    }

    fn error(&self) -> Option<MediaErrorCode> {
        self.0.state().error
    }

    fn add_event_listener(&mut self, event: MediaEvent, listener: MediaListener) {
        self.0.state().listeners.push((event, listener));
    }

    fn remove_event_listener(&mut self, event: MediaEvent, listener: &MediaListener) {
        let mut state = self.0.state();
        if let Some(index) = state
            .listeners
            .iter()
            .position(|(e, l)| *e == event && Arc::ptr_eq(l, listener))
        {
            state.listeners.remove(index);
        }
    }
}

// ===== Streaming engine =====

#[derive(Default)]
pub struct EngineState {
    pub source: Option<String>,
    pub attached: bool,
    pub start_loads: usize,
    pub recoveries: usize,
    pub destroyed: bool,
    pub handler: Option<StreamErrorHandler>,
}

#[derive(Clone)]
pub struct EngineHandle(Arc<Mutex<EngineState>>);

impl EngineHandle {
    pub fn state(&self) -> MutexGuard<'_, EngineState> {
        self.0.lock().unwrap()
    }

    /// Report an error through the registered handler
    pub fn emit_error(&self, error: StreamError) {
        let handler = self.state().handler.clone();
        if let Some(handler) = handler {
            handler(error);
        }
    }
}

struct MockEngine(EngineHandle);

impl StreamEngine for MockEngine {
    fn on_error(&mut self, handler: StreamErrorHandler) {
        self.0.state().handler = Some(handler);
    }

    fn load_source(&mut self, url: &str) {
        let mut state = self.0.state();
        assert!(state.handler.is_some(), "error handler must be registered first");
        state.source = Some(url.to_string());
    }

    fn attach_media(&mut self, media: &mut dyn MediaElement) {
        media.set_source("blob:mock-media-source");
        self.0.state().attached = true;
    }

    fn start_load(&mut self) {
        self.0.state().start_loads += 1;
    }

    fn recover_media_error(&mut self) {
        self.0.state().recoveries += 1;
    }

    fn destroy(&mut self) {
        self.0.state().destroyed = true;
    }
}

// ===== Platform =====

pub struct MockPlatform {
    interactive: bool,
    native_streaming: bool,
    engine_supported: bool,
    media: Mutex<Vec<MediaHandle>>,
    engines: Mutex<Vec<EngineHandle>>,
}

impl MockPlatform {
    fn build(interactive: bool, native_streaming: bool, engine_supported: bool) -> Arc<Self> {
        Arc::new(Self {
            interactive,
            native_streaming,
            engine_supported,
            media: Mutex::new(Vec::new()),
            engines: Mutex::new(Vec::new()),
        })
    }

    /// Decoder plays HLS itself
    pub fn native() -> Arc<Self> {
        Self::build(true, true, true)
    }

    /// Decoder needs the software engine
    pub fn software() -> Arc<Self> {
        Self::build(true, false, true)
    }

    /// Neither native nor software streaming
    pub fn unsupported() -> Arc<Self> {
        Self::build(true, false, false)
    }

    /// Not an interactive environment
    pub fn headless() -> Arc<Self> {
        Self::build(false, true, true)
    }

    /// Most recently created media element
    pub fn media(&self) -> MediaHandle {
        self.media.lock().unwrap().last().cloned().expect("no media element")
    }

    pub fn media_count(&self) -> usize {
        self.media.lock().unwrap().len()
    }

    /// Most recently created engine
    pub fn engine(&self) -> EngineHandle {
        self.engines.lock().unwrap().last().cloned().expect("no engine")
    }

    pub fn engines(&self) -> Vec<EngineHandle> {
        self.engines.lock().unwrap().clone()
    }
}

impl Platform for MockPlatform {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn create_media_element(&self) -> Box<dyn MediaElement> {
        let handle = MediaHandle(Arc::new(Mutex::new(MediaState::new(self.native_streaming))));
        self.media.lock().unwrap().push(handle.clone());
        Box::new(MockMedia(handle))
    }

    fn stream_engine_supported(&self) -> bool {
        self.engine_supported
    }

    fn create_stream_engine(&self) -> Box<dyn StreamEngine> {
        let handle = EngineHandle(Arc::new(Mutex::new(EngineState::default())));
        self.engines.lock().unwrap().push(handle.clone());
        Box::new(MockEngine(handle))
    }
}

// ===== Fixtures =====

pub struct Fixture {
    pub platform: Arc<MockPlatform>,
    pub store: PlayerStore,
    pub progress: ProgressStore,
    pub manager: PlaybackManager,
}

impl Fixture {
    pub fn new(platform: Arc<MockPlatform>) -> Self {
        Self::with_config(platform, PlaybackConfig::default())
    }

    pub fn with_config(platform: Arc<MockPlatform>, config: PlaybackConfig) -> Self {
        let store = PlayerStore::new();
        let progress = ProgressStore::open(Arc::new(MemoryStore::new()));
        let manager =
            PlaybackManager::new(platform.clone(), store.clone(), progress.clone(), config)
                .expect("manager");

        Self {
            platform,
            store,
            progress,
            manager,
        }
    }

    pub fn media(&self) -> MediaHandle {
        self.platform.media()
    }

    /// Load `episode` and answer with can-play once the load is waiting
    pub async fn load(&self, episode: Episode) -> wavecast_playback::Result<()> {
        let manager = self.manager.clone();
        let task = tokio::spawn(async move { manager.load_episode(episode).await });
        settle().await;
        self.media().emit(MediaEvent::CanPlay);
        task.await.expect("load task")
    }

    /// Load `episode`, then start playing as the platform would
    pub async fn load_and_play(&self, episode: Episode) {
        self.load(episode).await.expect("load");
        self.manager.play(None).await.expect("play");
        self.media().emit(MediaEvent::Playing);
        settle().await;
    }
}

pub fn episode(id: &str) -> Episode {
    Episode::new(id, Language::EnUs, Category::DailyNews, format!("Episode {id}"))
        .with_stream_url(format!("https://cdn.test/audio/{id}/index.m3u8"))
}

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Move paused time forward and let woken tasks run
pub async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}
