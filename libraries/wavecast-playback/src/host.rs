//! Process-wide owner of the playback manager
//!
//! The host is the factory guard around the manager singleton: it creates the
//! manager lazily (so capability checks run only when playback is first
//! needed) and hands out the same instance until it is destroyed.

use crate::error::Result;
use crate::manager::PlaybackManager;
use crate::platform::Platform;
use crate::store::PlayerStore;
use crate::types::PlaybackConfig;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;
use wavecast_progress::ProgressStore;

/// Owns the platform, the stores and at most one live `PlaybackManager`
pub struct PlaybackHost {
    platform: Arc<dyn Platform>,
    store: PlayerStore,
    progress: ProgressStore,
    config: PlaybackConfig,
    instance: Mutex<Option<PlaybackManager>>,
}

impl PlaybackHost {
    pub fn new(platform: Arc<dyn Platform>, progress: ProgressStore, config: PlaybackConfig) -> Self {
        Self {
            platform,
            store: PlayerStore::new(),
            progress,
            config,
            instance: Mutex::new(None),
        }
    }

    /// Player state shared with the UI
    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// The live manager, created on first use or after a `destroy()`
    ///
    /// # Errors
    /// * `PlaybackError::Environment` - the platform cannot play audio, or no
    ///   tokio runtime is running
    pub fn manager(&self) -> Result<PlaybackManager> {
        let mut instance = self.instance.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(manager) = instance.as_ref().filter(|m| !m.is_destroyed()) {
            return Ok(manager.clone());
        }

        let manager = PlaybackManager::new(
            Arc::clone(&self.platform),
            self.store.clone(),
            self.progress.clone(),
            self.config.clone(),
        )?;
        *instance = Some(manager.clone());
        Ok(manager)
    }

    /// Whether a live manager exists
    pub fn has_manager(&self) -> bool {
        self.instance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|m| !m.is_destroyed())
    }

    /// Destroy the current manager, if any
    pub fn reset(&self) {
        let manager = self
            .instance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(manager) = manager {
            debug!("Resetting playback host");
            manager.destroy();
        }
    }
}

impl std::fmt::Debug for PlaybackHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHost")
            .field("store", &self.store)
            .field("progress", &self.progress)
            .field("config", &self.config)
            .field("has_manager", &self.has_manager())
            .finish_non_exhaustive()
    }
}
