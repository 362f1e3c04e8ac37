//! Player service tests
//!
//! Ordering and cancellation through the tokio service: download completions,
//! backend callbacks and user commands all go through one channel.

use cadence_playback::{
    JsonFileStore, MemoryStore, PlayContext, Playable, PlayerConfig, PlayerEvent, PlayerHandle,
    PlayerService, PlayerState, RepeatMode, SimulatedBackend, SimulatedDownloader,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

// ===== Test Helpers =====

const DOWNLOAD_DELAY: Duration = Duration::from_millis(500);

fn create_track(id: &str, cached: bool) -> Playable {
    Playable::song(id, format!("Track {id}"), Duration::from_secs(5)).cached(cached)
}

fn spawn_service(downloader: SimulatedDownloader) -> (PlayerService, SimulatedBackend, MemoryStore) {
    let backend = SimulatedBackend::new();
    let store = MemoryStore::new();
    let service = PlayerService::spawn(
        PlayerConfig::default(),
        Box::new(backend.clone()),
        Arc::new(downloader),
        Box::new(store.clone()),
    );
    (service, backend, store)
}

fn drain(rx: &mut UnboundedReceiver<PlayerEvent>) -> Vec<PlayerEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

async fn settle(handle: &PlayerHandle) {
    tokio::time::sleep(DOWNLOAD_DELAY * 2).await;
    // A view round-trip guarantees every posted completion was applied
    handle.view().await.unwrap();
}

// ===== Readiness =====

#[tokio::test(start_paused = true)]
async fn test_uncached_item_starts_after_download() {
    let (service, backend, _) = spawn_service(SimulatedDownloader::new(DOWNLOAD_DELAY));
    let handle = service.handle();
    let (_, mut events) = handle.subscribe().await.unwrap();

    handle
        .play_context(PlayContext::new("Album", vec![create_track("a", false)]))
        .unwrap();
    assert_eq!(handle.view().await.unwrap().state, PlayerState::Loading);

    settle(&handle).await;

    let view = handle.view().await.unwrap();
    assert_eq!(view.state, PlayerState::Playing);
    assert!(view.currently_playing.unwrap().is_cached);
    assert_eq!(backend.loaded_id().as_deref(), Some("a"));
    assert!(drain(&mut events)
        .iter()
        .any(|e| matches!(e, PlayerEvent::Started(p) if p.id == "a")));

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_play_then_stop_never_yields_late_started() {
    let (service, backend, _) = spawn_service(SimulatedDownloader::new(DOWNLOAD_DELAY));
    let handle = service.handle();
    let (_, mut events) = handle.subscribe().await.unwrap();

    handle
        .play_context(PlayContext::new("Album", vec![create_track("a", false)]))
        .unwrap();
    handle.stop().unwrap();
    settle(&handle).await;

    let events = drain(&mut events);
    assert!(!events.iter().any(|e| matches!(e, PlayerEvent::Started(_))));
    assert_eq!(events.last(), Some(&PlayerEvent::Stopped));
    assert_eq!(handle.view().await.unwrap().state, PlayerState::Stopped);
    assert!(backend.loaded_id().is_none());

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_skip_supersedes_pending_download() {
    let (service, _, _) = spawn_service(SimulatedDownloader::new(DOWNLOAD_DELAY));
    let handle = service.handle();
    let (_, mut events) = handle.subscribe().await.unwrap();

    handle
        .play_context(PlayContext::new(
            "Album",
            vec![create_track("a", false), create_track("b", false)],
        ))
        .unwrap();
    handle.play_next().unwrap();
    settle(&handle).await;

    let started: Vec<String> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            PlayerEvent::Started(p) => Some(p.id),
            _ => None,
        })
        .collect();
    assert_eq!(started, ["b"]);

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_download_is_reported() {
    let (service, _, _) =
        spawn_service(SimulatedDownloader::new(DOWNLOAD_DELAY).failing_on("broken"));
    let handle = service.handle();
    let (_, mut events) = handle.subscribe().await.unwrap();

    handle
        .play_context(PlayContext::new("Album", vec![create_track("broken", false)]))
        .unwrap();
    settle(&handle).await;

    let view = handle.view().await.unwrap();
    assert_eq!(view.state, PlayerState::Paused);
    assert_eq!(view.currently_playing.unwrap().id, "broken");
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        PlayerEvent::PlaybackFailed { playable_id, .. } if playable_id == "broken"
    )));

    service.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_prefetch_marks_upcoming_item_cached() {
    let (service, _, _) = spawn_service(SimulatedDownloader::new(DOWNLOAD_DELAY));
    let handle = service.handle();

    handle.set_auto_cache(true).unwrap();
    handle
        .play_context(PlayContext::new(
            "Album",
            vec![create_track("a", true), create_track("b", false)],
        ))
        .unwrap();
    settle(&handle).await;

    let view = handle.view().await.unwrap();
    assert!(view.next[0].is_cached);

    handle.play_next().unwrap();
    assert_eq!(handle.view().await.unwrap().state, PlayerState::Playing);

    service.shutdown().await;
}

// ===== Backend Callbacks =====

#[tokio::test]
async fn test_backend_callbacks_drive_navigation() {
    let (service, backend, _) = spawn_service(SimulatedDownloader::new(Duration::ZERO));
    let handle = service.handle();
    let (_, mut events) = handle.subscribe().await.unwrap();

    handle
        .play_context(PlayContext::new(
            "Album",
            vec![create_track("a", true), create_track("b", true)],
        ))
        .unwrap();
    handle.view().await.unwrap();
    let token = backend.loaded_token().unwrap();
    handle.report_elapsed(token, 2.5, 5.0).unwrap();
    handle.report_finished(token).unwrap();

    let view = handle.view().await.unwrap();
    assert_eq!(view.currently_playing.unwrap().id, "b");
    assert!(drain(&mut events).contains(&PlayerEvent::ElapsedTimeChanged {
        elapsed: 2.5,
        duration: 5.0
    }));

    let token = backend.loaded_token().unwrap();
    handle.report_finished(token).unwrap();
    let view = handle.view().await.unwrap();
    assert_eq!(view.state, PlayerState::Stopped);

    service.shutdown().await;
}

#[tokio::test]
async fn test_end_of_track_racing_a_skip_is_discarded() {
    let (service, backend, _) = spawn_service(SimulatedDownloader::new(Duration::ZERO));
    let handle = service.handle();

    handle
        .play_context(PlayContext::new(
            "Album",
            vec![create_track("a", true), create_track("b", true), create_track("c", true)],
        ))
        .unwrap();
    handle.view().await.unwrap();
    let token_a = backend.loaded_token().unwrap();
    let (_, mut events) = handle.subscribe().await.unwrap();

    // The skip is queued before the backend's reports for "a" arrive
    handle.play_next().unwrap();
    handle.report_elapsed(token_a, 5.0, 5.0).unwrap();
    handle.report_finished(token_a).unwrap();

    let view = handle.view().await.unwrap();
    assert_eq!(view.currently_playing.unwrap().id, "b");
    assert_eq!(view.state, PlayerState::Playing);

    let events = drain(&mut events);
    let started = events
        .iter()
        .position(|e| matches!(e, PlayerEvent::Started(p) if p.id == "b"))
        .unwrap();
    assert!(!events[started..]
        .iter()
        .any(|e| matches!(e, PlayerEvent::ElapsedTimeChanged { .. })));

    service.shutdown().await;
}

#[tokio::test]
async fn test_cycle_repeat_mode_is_applied_in_order() {
    let (service, _, _) = spawn_service(SimulatedDownloader::new(Duration::ZERO));
    let handle = service.handle();

    handle.set_repeat_mode(RepeatMode::All).unwrap();
    handle.cycle_repeat_mode().unwrap();
    assert_eq!(handle.view().await.unwrap().status.repeat_mode, RepeatMode::Single);

    handle.cycle_repeat_mode().unwrap();
    handle.cycle_repeat_mode().unwrap();
    assert_eq!(handle.view().await.unwrap().status.repeat_mode, RepeatMode::All);

    service.shutdown().await;
}

#[tokio::test]
async fn test_rejected_command_keeps_service_alive() {
    let (service, _, _) = spawn_service(SimulatedDownloader::new(Duration::ZERO));
    let handle = service.handle();

    handle.remove_at_order(42).unwrap();
    handle.set_repeat_mode(RepeatMode::All).unwrap();

    let view = handle.view().await.unwrap();
    assert_eq!(view.status.repeat_mode, RepeatMode::All);

    service.shutdown().await;
}

// ===== Lifecycle =====

#[tokio::test]
async fn test_commands_after_shutdown_fail() {
    let (service, _, _) = spawn_service(SimulatedDownloader::new(Duration::ZERO));
    let handle = service.handle();
    service.shutdown().await;

    assert!(handle.play().is_err());
    assert!(handle.view().await.is_err());
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("player.json");

    let spawn = || {
        PlayerService::spawn(
            PlayerConfig::default(),
            Box::new(SimulatedBackend::new()),
            Arc::new(SimulatedDownloader::new(Duration::ZERO)),
            Box::new(JsonFileStore::new(&path)),
        )
    };

    let service = spawn();
    let handle = service.handle();
    handle
        .play_context(
            PlayContext::new(
                "Album",
                vec![create_track("a", true), create_track("b", true), create_track("c", true)],
            )
            .starting_at(1),
        )
        .unwrap();
    handle.append_user_queue(vec![create_track("u", true)]).unwrap();
    handle.set_repeat_mode(RepeatMode::All).unwrap();
    handle.view().await.unwrap();
    service.shutdown().await;

    let service = spawn();
    let view = service.handle().view().await.unwrap();
    assert_eq!(view.state, PlayerState::Paused);
    assert_eq!(view.currently_playing.unwrap().id, "b");
    assert_eq!(view.user_queue.len(), 1);
    assert_eq!(view.context_name, "Album");
    assert_eq!(view.status.repeat_mode, RepeatMode::All);
    service.shutdown().await;
}

#[tokio::test]
async fn test_unsubscribe_is_idempotent() {
    let (service, _, _) = spawn_service(SimulatedDownloader::new(Duration::ZERO));
    let handle = service.handle();
    let (id, mut events) = handle.subscribe().await.unwrap();

    handle.unsubscribe(id).unwrap();
    handle.unsubscribe(id).unwrap();
    handle.toggle_shuffle().unwrap();
    handle.view().await.unwrap();

    assert!(drain(&mut events).is_empty());
    service.shutdown().await;
}
