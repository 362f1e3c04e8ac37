//! Player Events
//!
//! Event-based communication for UI synchronization. Events are emitted at key
//! points:
//! - State changes (started/paused/stopped)
//! - Queue and status changes (playlist, shuffle, repeat, player mode)
//! - Track switches (artwork)
//! - Position updates (forwarded from the backend)
//! - Failures that make the current item unplayable
//!
//! Observers receive events in the order they were emitted over an unbounded
//! channel, so delivery never blocks the player.

use crate::types::{Playable, RepeatMode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::trace;

/// Events emitted by the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Playback of an item started (or resumed)
    Started(Playable),

    /// Playback paused
    Paused,

    /// Playback stopped
    Stopped,

    /// Position update, forwarded from the backend
    ElapsedTimeChanged {
        /// Elapsed seconds into the current item
        elapsed: f64,
        /// Total seconds of the current item
        duration: f64,
    },

    /// Queue contents or shape changed
    PlaylistChanged,

    /// The current item changed, so the displayed artwork may have too
    ArtworkChanged,

    /// Shuffle flag changed
    ShuffleChanged(bool),

    /// Repeat mode changed
    RepeatChanged(RepeatMode),

    /// Music/podcast mode changed
    PlayerModeChanged,

    /// The current item could not be made playable
    PlaybackFailed {
        /// ID of the item that failed
        playable_id: String,
        /// Human-readable reason
        error: String,
    },
}

/// Handle identifying one observer registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Fan-out of player events to registered observers
///
/// Closed receivers are pruned on the next notification.
#[derive(Debug, Default)]
pub struct Notifier {
    observers: Vec<(ObserverId, mpsc::UnboundedSender<PlayerEvent>)>,
    next_id: u64,
}

impl Notifier {
    /// Create new notifier without observers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn subscribe(&mut self) -> (ObserverId, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, tx));
        (id, rx)
    }

    /// Remove an observer
    ///
    /// Unknown or already removed ids are ignored.
    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.observers.retain(|(observer, _)| *observer != id);
    }

    /// Number of live registrations
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Deliver `event` to every observer
    pub fn notify(&mut self, event: PlayerEvent) {
        trace!(?event, observers = self.observers.len(), "Player event");
        self.observers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_reach_all_observers_in_order() {
        let mut notifier = Notifier::new();
        let (_, mut first) = notifier.subscribe();
        let (_, mut second) = notifier.subscribe();

        notifier.notify(PlayerEvent::PlaylistChanged);
        notifier.notify(PlayerEvent::Paused);

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.try_recv().unwrap(), PlayerEvent::PlaylistChanged);
            assert_eq!(rx.try_recv().unwrap(), PlayerEvent::Paused);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let mut notifier = Notifier::new();
        let (id, mut rx) = notifier.subscribe();

        notifier.unsubscribe(id);
        notifier.unsubscribe(id);
        notifier.notify(PlayerEvent::Stopped);

        assert_eq!(notifier.observer_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let mut notifier = Notifier::new();
        let (_, rx) = notifier.subscribe();
        let (_, mut live) = notifier.subscribe();
        drop(rx);

        notifier.notify(PlayerEvent::ArtworkChanged);

        assert_eq!(notifier.observer_count(), 1);
        assert_eq!(live.try_recv().unwrap(), PlayerEvent::ArtworkChanged);
    }

    #[test]
    fn observer_ids_are_unique() {
        let mut notifier = Notifier::new();
        let (a, _rx_a) = notifier.subscribe();
        let (b, _rx_b) = notifier.subscribe();
        assert_ne!(a, b);
    }
}
