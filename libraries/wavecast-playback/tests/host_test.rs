//! Playback host: lazy creation, reuse and re-creation of the manager

mod support;

use std::sync::Arc;
use support::{episode, settle, MockPlatform};
use wavecast_core::MemoryStore;
use wavecast_playback::{MediaEvent, PlaybackConfig, PlaybackError, PlaybackHost};
use wavecast_progress::ProgressStore;

fn host(platform: Arc<MockPlatform>) -> PlaybackHost {
    let progress = ProgressStore::open(Arc::new(MemoryStore::new()));
    PlaybackHost::new(platform, progress, PlaybackConfig::default())
}

#[tokio::test]
async fn manager_created_lazily_and_reused() {
    let platform = MockPlatform::native();
    let host = host(platform.clone());

    assert!(!host.has_manager());
    assert_eq!(platform.media_count(), 0);

    let first = host.manager().unwrap();
    let second = host.manager().unwrap();
    assert!(host.has_manager());
    assert_eq!(platform.media_count(), 1);

    // Same session behind both handles
    first.seek(12.0);
    assert_eq!(platform.media().state().current_time, 12.0);
    second.seek(20.0);
    assert_eq!(platform.media().state().current_time, 20.0);
}

#[tokio::test]
async fn reset_destroys_and_next_access_recreates() {
    let platform = MockPlatform::native();
    let host = host(platform.clone());

    let old = host.manager().unwrap();
    let old_media = platform.media();

    host.reset();
    assert!(old.is_destroyed());
    assert!(!host.has_manager());
    assert_eq!(old_media.total_listeners(), 0);
    assert!(!host.store().has_controls());

    let fresh = host.manager().unwrap();
    assert!(!fresh.is_destroyed());
    assert_eq!(platform.media_count(), 2);
    assert_eq!(platform.media().total_listeners(), 9);
    assert!(host.store().has_controls());
}

#[tokio::test]
async fn destroyed_manager_is_replaced() {
    let platform = MockPlatform::native();
    let host = host(platform.clone());

    host.manager().unwrap().destroy();
    assert!(!host.has_manager());

    let manager = host.manager().unwrap();
    assert!(!manager.is_destroyed());
    assert_eq!(platform.media_count(), 2);
}

#[tokio::test]
async fn headless_host_reports_environment_error() {
    let host = host(MockPlatform::headless());

    let err = host.manager().unwrap_err();
    assert!(matches!(err, PlaybackError::Environment(_)));
    assert!(!host.has_manager());
}

#[tokio::test]
async fn store_actions_are_noops_until_manager_exists() {
    let platform = MockPlatform::native();
    let host = host(platform.clone());

    host.store().play(Some(episode("a"))).await.unwrap();
    host.store().seek(30.0);
    assert!(host.store().snapshot().is_idle());
    assert_eq!(platform.media_count(), 0);

    host.manager().unwrap();
    let store = host.store().clone();
    let task = tokio::spawn(async move { store.play(Some(episode("a"))).await });
    settle().await;
    platform.media().emit(MediaEvent::CanPlay);
    task.await.unwrap().unwrap();

    assert_eq!(platform.media().state().play_calls, 1);
    assert_eq!(
        host.store().snapshot().current_episode.unwrap().id,
        "a"
    );
}

#[tokio::test]
async fn manager_shares_host_progress() {
    let platform = MockPlatform::native();
    let host = host(platform.clone());
    host.progress().update_progress("a", 45.0, 100.0);

    let manager = host.manager().unwrap();
    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.load_episode(episode("a")).await })
    };
    settle().await;
    platform.media().emit(MediaEvent::CanPlay);
    task.await.unwrap().unwrap();

    assert_eq!(platform.media().state().current_time, 45.0);
}
