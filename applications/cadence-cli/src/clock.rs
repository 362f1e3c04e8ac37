//! Playback clock for the simulated backend
//!
//! Stands in for the audio thread: advances the loaded item and reports
//! elapsed time and end-of-track to the player service, tagged with the load
//! they belong to.

use cadence_playback::{PlayerHandle, SimulatedBackend};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Spawn the clock task
///
/// Each tick advances the backend by `interval * speed` simulated seconds.
/// The task ends when the service stops accepting commands.
pub fn spawn_clock(
    backend: SimulatedBackend,
    handle: PlayerHandle,
    interval: Duration,
    speed: f64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let step = interval.as_secs_f64() * speed;

        loop {
            ticker.tick().await;
            let Some(tick) = backend.tick(step) else {
                continue;
            };

            if handle.report_tick(tick).is_err() {
                break;
            }
        }

        tracing::debug!("Playback clock stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_playback::{
        MemoryStore, PlayContext, Playable, PlayerConfig, PlayerService, PlayerState,
        SimulatedDownloader,
    };
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn clock_advances_to_next_item() {
        let backend = SimulatedBackend::new();
        let service = PlayerService::spawn(
            PlayerConfig::default(),
            Box::new(backend.clone()),
            Arc::new(SimulatedDownloader::new(Duration::ZERO)),
            Box::new(MemoryStore::new()),
        );
        let handle = service.handle();
        handle
            .play_context(PlayContext::new(
                "Album",
                vec![
                    Playable::song("a", "A", Duration::from_secs(3)).cached(true),
                    Playable::song("b", "B", Duration::from_secs(30)).cached(true),
                ],
            ))
            .unwrap();
        handle.view().await.unwrap();

        let clock = spawn_clock(backend.clone(), handle.clone(), Duration::from_secs(1), 1.0);
        tokio::time::sleep(Duration::from_millis(4500)).await;

        let view = handle.view().await.unwrap();
        assert_eq!(view.state, PlayerState::Playing);
        assert_eq!(view.currently_playing.unwrap().id, "b");
        assert_eq!(backend.loaded_id().as_deref(), Some("b"));

        clock.abort();
        service.shutdown().await;
    }
}
