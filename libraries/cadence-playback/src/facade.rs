//! Player facade
//!
//! The surface UI code talks to. Wraps a [`MusicPlayer`] and adds:
//! - queue snapshots for list views
//! - offline mode routing (skips only land on cached items)
//! - persistence of queue and status after every change
//! - `reinit` from a persisted snapshot

use crate::backend::PlaybackToken;
use crate::context::PlayContext;
use crate::download::ReadinessTicket;
use crate::error::Result;
use crate::events::{ObserverId, PlayerEvent};
use crate::persistence::{PlayerSnapshot, PlayerStore};
use crate::player::MusicPlayer;
use crate::status::PlayerStatus;
use crate::types::{Playable, PlayerIndex, PlayerMode, PlayerState, RepeatMode};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// UI-facing player
pub struct PlayerFacade {
    player: MusicPlayer,
    store: Box<dyn PlayerStore>,
}

impl PlayerFacade {
    pub fn new(player: MusicPlayer, store: Box<dyn PlayerStore>) -> Self {
        Self { player, store }
    }

    /// Create a facade and restore whatever the store holds
    ///
    /// A broken store is logged and treated as empty.
    pub fn restored(player: MusicPlayer, store: Box<dyn PlayerStore>) -> Self {
        let mut facade = Self::new(player, store);
        match facade.store.load() {
            Ok(Some(snapshot)) => facade.reinit(&snapshot),
            Ok(None) => info!("No persisted player state"),
            Err(err) => warn!(error = %err, "Failed to load persisted player state"),
        }
        facade
    }

    pub fn player(&self) -> &MusicPlayer {
        &self.player
    }

    // ===== Snapshots =====

    pub fn prev_queue(&self) -> Vec<Playable> {
        self.player.queue().previous().to_vec()
    }

    pub fn user_queue(&self) -> Vec<Playable> {
        self.player.queue().user_queue().to_vec()
    }

    pub fn next_queue(&self) -> Vec<Playable> {
        self.player.queue().next_queue().to_vec()
    }

    pub fn currently_playing(&self) -> Option<Playable> {
        self.player.currently_playing().cloned()
    }

    pub fn is_user_queue_playing(&self) -> bool {
        self.player.queue().is_user_queue_playing()
    }

    pub fn context_name(&self) -> String {
        self.player.queue().context_name().to_string()
    }

    pub fn state(&self) -> PlayerState {
        self.player.state()
    }

    pub fn status(&self) -> PlayerStatus {
        self.player.status()
    }

    pub fn reported_order(&self) -> usize {
        self.player.reported_order()
    }

    pub fn elapsed_time(&self) -> f64 {
        self.player.elapsed_time()
    }

    pub fn duration(&self) -> f64 {
        self.player.duration()
    }

    pub fn get_playable(&self, index: PlayerIndex) -> Result<Playable> {
        self.player.queue().get_playable(index).cloned()
    }

    /// Current persisted shape
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot::capture(self.player.queue(), self.player.status())
    }

    // ===== Settings =====

    pub fn is_offline_mode(&self) -> bool {
        self.player.is_offline()
    }

    pub fn set_offline_mode(&mut self, is_offline: bool) {
        info!(is_offline, "Offline mode changed");
        self.player.set_offline(is_offline);
    }

    pub fn is_auto_cache_played_items(&self) -> bool {
        self.player.status().is_auto_cache_on_play
    }

    pub fn set_auto_cache_played_items(&mut self, enabled: bool) {
        self.player.set_auto_cache_on_play(enabled);
        self.persist();
    }

    pub fn set_shuffle(&mut self, is_shuffle: bool) {
        self.player.set_shuffle(is_shuffle);
        self.persist();
    }

    pub fn toggle_shuffle(&mut self) {
        self.player.toggle_shuffle();
        self.persist();
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.player.set_repeat_mode(mode);
        self.persist();
    }

    pub fn cycle_repeat_mode(&mut self) {
        let mode = self.player.status().repeat_mode.cycled();
        self.set_repeat_mode(mode);
    }

    pub fn set_player_mode(&mut self, mode: PlayerMode) {
        self.player.set_player_mode(mode);
        self.persist();
    }

    // ===== Observers =====

    pub fn subscribe(&mut self) -> (ObserverId, mpsc::UnboundedReceiver<PlayerEvent>) {
        self.player.subscribe()
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.player.unsubscribe(id);
    }

    // ===== Transport =====

    pub fn play(&mut self) {
        self.player.play();
    }

    pub fn pause(&mut self) {
        self.player.pause();
    }

    pub fn toggle_play_pause(&mut self) {
        self.player.toggle_play_pause();
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    pub fn seek(&mut self, seconds: f64) {
        self.player.seek(seconds);
    }

    /// Start `context` (clears shuffle)
    pub fn play_context(&mut self, context: PlayContext) {
        self.player.play_context(context);
        self.persist();
    }

    /// Start `context` at a random item (sets shuffle)
    pub fn play_shuffled(&mut self, context: PlayContext) {
        self.player.play_shuffled(context);
        self.persist();
    }

    pub fn play_at(&mut self, index: PlayerIndex) -> Result<()> {
        self.player.play_at(index)?;
        self.persist();
        Ok(())
    }

    /// Step forwards; offline this skips to the next cached item
    pub fn play_next(&mut self) {
        if self.player.is_offline() {
            self.player.play_next_cached();
        } else {
            self.player.play_next();
        }
        self.persist();
    }

    /// Step backwards; offline this skips to the previous cached item
    pub fn play_previous(&mut self) {
        if self.player.is_offline() {
            self.player.play_previous_cached();
        } else {
            self.player.play_previous();
        }
        self.persist();
    }

    pub fn play_previous_or_replay(&mut self) {
        self.player.play_previous_or_replay();
        self.persist();
    }

    pub fn play_next_cached(&mut self) {
        self.player.play_next_cached();
        self.persist();
    }

    pub fn play_previous_cached(&mut self) {
        self.player.play_previous_cached();
        self.persist();
    }

    // ===== Queue =====

    pub fn insert_context_queue(&mut self, items: Vec<Playable>) {
        self.player.insert_context_queue(items);
        self.persist();
    }

    pub fn append_context_queue(&mut self, items: Vec<Playable>) {
        self.player.append_context_queue(items);
        self.persist();
    }

    pub fn insert_user_queue(&mut self, items: Vec<Playable>) {
        self.player.insert_user_queue(items);
        self.persist();
    }

    pub fn append_user_queue(&mut self, items: Vec<Playable>) {
        self.player.append_user_queue(items);
        self.persist();
    }

    pub fn remove_playable(&mut self, index: PlayerIndex) -> Result<Playable> {
        let removed = self.player.remove_playable(index)?;
        self.persist();
        Ok(removed)
    }

    pub fn remove_at_order(&mut self, order: usize) -> Result<Playable> {
        let removed = self.player.remove_at_order(order)?;
        self.persist();
        Ok(removed)
    }

    pub fn move_playable(&mut self, from: PlayerIndex, to: PlayerIndex) -> Result<()> {
        self.player.move_playable(from, to)?;
        self.persist();
        Ok(())
    }

    pub fn clear_user_queue(&mut self) {
        self.player.clear_user_queue();
        self.persist();
    }

    pub fn clear_context_queue(&mut self) {
        self.player.clear_context_queue();
        self.persist();
    }

    pub fn clear_queues(&mut self) {
        self.player.clear_queues();
        self.persist();
    }

    // ===== Completions =====

    pub fn on_elapsed_tick(&mut self, token: PlaybackToken, elapsed: f64, duration: f64) {
        self.player.on_elapsed_tick(token, elapsed, duration);
    }

    pub fn on_playback_finished(&mut self, token: PlaybackToken) {
        self.player.on_playback_finished(token);
        self.persist();
    }

    pub fn on_download_finished(&mut self, ticket: ReadinessTicket, result: Result<()>) {
        self.player.on_download_finished(ticket, result);
        self.persist();
    }

    pub fn on_prefetched(&mut self, playable_id: &str) {
        self.player.on_prefetched(playable_id);
        self.persist();
    }

    // ===== Persistence =====

    /// Replace queue and status with a persisted snapshot
    ///
    /// An unresolvable current index keeps the segments and leaves the player
    /// stopped without a current item.
    pub fn reinit(&mut self, snapshot: &PlayerSnapshot) {
        let (queue, restored) = snapshot.restore_queue();
        if !restored && snapshot.current_index.is_some() {
            warn!(
                current_index = ?snapshot.current_index,
                "Persisted current index does not resolve, starting stopped"
            );
        }
        self.player.restore(queue, snapshot.status());
    }

    fn persist(&mut self) {
        let snapshot = self.snapshot();
        if let Err(err) = self.store.save(&snapshot) {
            warn!(error = %err, "Failed to persist player state");
        }
    }
}
