//! Navigation state machine
//!
//! `MusicPlayer` combines the queue with the audio backend and the download
//! subsystem. It is single-owner: every method takes `&mut self`, and async
//! completions (downloads, backend callbacks) re-enter through the
//! `on_*` methods, which the player service serializes with user commands.

use crate::backend::{AudioBackend, PlaybackToken};
use crate::context::PlayContext;
use crate::download::{DownloadManager, DownloadRequest, ReadinessTicket};
use crate::error::Result;
use crate::events::{Notifier, ObserverId, PlayerEvent};
use crate::queue::PlayQueueHandler;
use crate::status::{PlayerConfig, PlayerStatus};
use crate::types::{
    DownloadPriority, Playable, PlayerIndex, PlayerMode, PlayerState, QueueSegment, RepeatMode,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct LoadedItem {
    playable_id: String,
    token: PlaybackToken,
}

/// Player state machine
pub struct MusicPlayer {
    queue: PlayQueueHandler,
    status: PlayerStatus,
    state: PlayerState,
    config: PlayerConfig,
    notifier: Notifier,
    backend: Box<dyn AudioBackend>,
    downloads: Box<dyn DownloadManager>,

    // Item loaded in the backend
    loaded: Option<LoadedItem>,
    next_token: u64,

    // Play request waiting for its download
    pending: Option<ReadinessTicket>,
    next_ticket: u64,

    is_offline: bool,
}

impl MusicPlayer {
    /// Create new stopped player with an empty queue
    pub fn new(
        config: PlayerConfig,
        backend: Box<dyn AudioBackend>,
        downloads: Box<dyn DownloadManager>,
    ) -> Self {
        Self {
            queue: PlayQueueHandler::new(),
            status: config.initial_status,
            state: PlayerState::Stopped,
            config,
            notifier: Notifier::new(),
            backend,
            downloads,
            loaded: None,
            next_token: 1,
            pending: None,
            next_ticket: 1,
            is_offline: false,
        }
    }

    // ===== State =====

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn queue(&self) -> &PlayQueueHandler {
        &self.queue
    }

    /// The active item; `None` while stopped
    pub fn currently_playing(&self) -> Option<&Playable> {
        match self.state {
            PlayerState::Stopped => None,
            _ => self.queue.current(),
        }
    }

    /// Order position shown to the user (0 while stopped)
    pub fn reported_order(&self) -> usize {
        match self.state {
            PlayerState::Stopped => 0,
            _ => self.queue.current_order().unwrap_or(0),
        }
    }

    /// Token of the backend load callbacks must refer to
    pub fn loaded_token(&self) -> Option<PlaybackToken> {
        self.loaded.as_ref().map(|loaded| loaded.token)
    }

    /// Ticket of the play request waiting for a download
    pub fn pending_ticket(&self) -> Option<ReadinessTicket> {
        self.pending
    }

    pub fn is_offline(&self) -> bool {
        self.is_offline
    }

    /// Offline mode: uncached items fail instead of being downloaded
    pub fn set_offline(&mut self, is_offline: bool) {
        self.is_offline = is_offline;
    }

    /// Seconds played of the active item
    pub fn elapsed_time(&self) -> f64 {
        if self.is_current_loaded() {
            self.backend.elapsed_time()
        } else {
            0.0
        }
    }

    /// Total seconds of the active item
    pub fn duration(&self) -> f64 {
        if self.is_current_loaded() {
            self.backend.duration()
        } else {
            self.queue
                .current()
                .map_or(0.0, |p| p.duration.as_secs_f64())
        }
    }

    // ===== Observers =====

    pub fn subscribe(&mut self) -> (ObserverId, mpsc::UnboundedReceiver<PlayerEvent>) {
        self.notifier.subscribe()
    }

    pub fn unsubscribe(&mut self, id: ObserverId) {
        self.notifier.unsubscribe(id);
    }

    // ===== Transport =====

    /// Start or resume the active item
    ///
    /// No-op without an active item, while playing, or while loading.
    pub fn play(&mut self) {
        match self.state {
            PlayerState::Playing | PlayerState::Loading => {}
            PlayerState::Paused if self.is_current_loaded() => {
                self.backend.play();
                self.state = PlayerState::Playing;
                if let Some(current) = self.queue.current().cloned() {
                    self.notifier.notify(PlayerEvent::Started(current));
                }
            }
            PlayerState::Paused | PlayerState::Stopped => {
                if self.queue.current().is_some() {
                    self.start_current();
                }
            }
        }
    }

    /// Pause playback (also abandons a pending download wait)
    pub fn pause(&mut self) {
        match self.state {
            PlayerState::Playing => {
                self.backend.pause();
                self.state = PlayerState::Paused;
                self.notifier.notify(PlayerEvent::Paused);
            }
            PlayerState::Loading => {
                self.cancel_pending();
                self.state = PlayerState::Paused;
                self.notifier.notify(PlayerEvent::Paused);
            }
            PlayerState::Paused | PlayerState::Stopped => {}
        }
    }

    pub fn toggle_play_pause(&mut self) {
        match self.state {
            PlayerState::Playing | PlayerState::Loading => self.pause(),
            PlayerState::Paused | PlayerState::Stopped => self.play(),
        }
    }

    /// Stop playback, keeping the queue position
    pub fn stop(&mut self) {
        self.halt();
    }

    /// Seek within the active item
    pub fn seek(&mut self, seconds: f64) {
        if !self.is_current_loaded() {
            return;
        }
        self.backend.seek(seconds);
        self.notifier.notify(PlayerEvent::ElapsedTimeChanged {
            elapsed: self.backend.elapsed_time(),
            duration: self.backend.duration(),
        });
    }

    // ===== Starting =====

    /// Replace the queue with `context` and start its active item
    ///
    /// Clears the shuffle flag. An empty context stops the player.
    pub fn play_context(&mut self, context: PlayContext) {
        self.set_shuffle(false);
        debug!(context = %context.name(), items = context.items().len(), "Playing context");

        let has_current = self.queue.apply_context(context);
        self.notifier.notify(PlayerEvent::PlaylistChanged);
        if has_current {
            self.start_current();
        } else {
            self.halt();
        }
    }

    /// Start `context` at a random index and turn shuffle on
    ///
    /// Empty contexts are ignored.
    pub fn play_shuffled(&mut self, context: PlayContext) {
        if context.is_empty() {
            return;
        }
        self.play_context(context.with_shuffled_index());
        self.set_shuffle(true);
    }

    /// Make the addressed item current and start it
    pub fn play_at(&mut self, index: PlayerIndex) -> Result<()> {
        self.queue.jump_to(index)?;
        self.notifier.notify(PlayerEvent::PlaylistChanged);
        self.start_current();
        Ok(())
    }

    // ===== Navigation =====

    /// One step forwards (user queue first)
    pub fn play_next(&mut self) {
        if self.queue.advance() {
            self.notifier.notify(PlayerEvent::PlaylistChanged);
            self.start_current();
            return;
        }

        match self.status.repeat_mode {
            RepeatMode::Off => debug!("End of queue, holding"),
            RepeatMode::All => {
                if self.queue.wrap_to_start() {
                    debug!("End of queue, wrapping to start");
                    self.notifier.notify(PlayerEvent::PlaylistChanged);
                    self.start_current();
                }
            }
            RepeatMode::Single => self.replay_current(),
        }
    }

    /// One step back through the played context items
    pub fn play_previous(&mut self) {
        if self.queue.retreat() {
            self.notifier.notify(PlayerEvent::PlaylistChanged);
            self.start_current();
            return;
        }

        match self.status.repeat_mode {
            RepeatMode::Off => debug!("Start of queue, holding"),
            RepeatMode::All => {
                if self.queue.wrap_to_end() {
                    debug!("Start of queue, wrapping to end");
                    self.notifier.notify(PlayerEvent::PlaylistChanged);
                    self.start_current();
                }
            }
            RepeatMode::Single => self.replay_current(),
        }
    }

    /// Restart the active item when it played long enough or nothing
    /// precedes it, step back otherwise
    ///
    /// Offline, the step back lands on the nearest cached item.
    pub fn play_previous_or_replay(&mut self) {
        if self.elapsed_time() > self.config.replay_threshold_secs || !self.queue.has_previous() {
            self.replay_current();
        } else if self.is_offline {
            self.play_previous_cached();
        } else {
            self.play_previous();
        }
    }

    /// Skip forwards to the nearest cached item, wrapping around
    pub fn play_next_cached(&mut self) {
        let target = self.queue.next_cached_index();
        self.jump_to_cached(target);
    }

    /// Skip backwards to the nearest cached item, wrapping around
    pub fn play_previous_cached(&mut self) {
        let target = self.queue.previous_cached_index();
        self.jump_to_cached(target);
    }

    fn jump_to_cached(&mut self, target: Option<PlayerIndex>) {
        let Some(index) = target else {
            debug!("No cached item to skip to, holding");
            return;
        };

        match self.queue.jump_to(index) {
            Ok(()) => {
                self.notifier.notify(PlayerEvent::PlaylistChanged);
                self.start_current();
            }
            Err(err) => warn!(error = %err, "Cached skip target did not resolve"),
        }
    }

    // ===== Completions =====

    /// Position callback from the backend
    ///
    /// Ticks for any load but the current one are discarded.
    pub fn on_elapsed_tick(&mut self, token: PlaybackToken, elapsed: f64, duration: f64) {
        if !self.is_loaded_token(token) {
            warn!(token = %token, "Discarding stale position callback");
            return;
        }
        if self.state == PlayerState::Playing {
            self.notifier
                .notify(PlayerEvent::ElapsedTimeChanged { elapsed, duration });
        }
    }

    /// The backend played the load identified by `token` to its end
    ///
    /// A report for an item the player already left is discarded.
    pub fn on_playback_finished(&mut self, token: PlaybackToken) {
        if !self.is_loaded_token(token) {
            warn!(token = %token, "Discarding stale end of track");
            return;
        }
        if self.state != PlayerState::Playing {
            debug!(state = ?self.state, "Ignoring end of track outside playback");
            return;
        }

        if self.status.repeat_mode == RepeatMode::Single {
            self.replay_current();
        } else if self.is_offline {
            self.advance_cached_after_end();
        } else if self.queue.advance()
            || (self.status.repeat_mode == RepeatMode::All && self.queue.wrap_to_start())
        {
            self.notifier.notify(PlayerEvent::PlaylistChanged);
            self.start_current();
        } else {
            debug!("Queue finished");
            self.halt();
        }
    }

    /// Natural end while offline: continue with the next cached item
    ///
    /// Wrapping into the played items only happens under repeat all; a lone
    /// cached item loops under repeat all and stops otherwise.
    fn advance_cached_after_end(&mut self) {
        let repeat_all = self.status.repeat_mode == RepeatMode::All;
        match self.queue.next_cached_index() {
            Some(index) if index.segment != QueueSegment::Previous || repeat_all => {
                self.jump_to_cached(Some(index));
            }
            None if repeat_all => self.replay_current(),
            _ => {
                debug!("No cached item ahead, queue finished");
                self.halt();
            }
        }
    }

    /// A ticketed download finished
    ///
    /// Completions for anything but the pending ticket are discarded.
    pub fn on_download_finished(&mut self, ticket: ReadinessTicket, result: Result<()>) {
        if self.pending != Some(ticket) {
            warn!(ticket = %ticket, "Discarding stale download completion");
            return;
        }
        self.pending = None;

        let Some(playable_id) = self.queue.current().map(|p| p.id.clone()) else {
            return;
        };

        match result {
            Ok(()) => {
                self.queue.mark_cached(&playable_id);
                if let Some(current) = self.queue.current().cloned() {
                    self.start_backend(current);
                }
            }
            Err(err) => self.fail(&playable_id, &err.to_string()),
        }
    }

    /// An untracked (prefetch) download finished
    pub fn on_prefetched(&mut self, playable_id: &str) {
        debug!(playable_id, "Prefetched");
        self.queue.mark_cached(playable_id);
    }

    // ===== Queue mutation =====

    pub fn insert_context_queue(&mut self, items: Vec<Playable>) {
        self.queue.insert_context_queue(items);
        self.notifier.notify(PlayerEvent::PlaylistChanged);
    }

    pub fn append_context_queue(&mut self, items: Vec<Playable>) {
        self.queue.append_context_queue(items);
        self.notifier.notify(PlayerEvent::PlaylistChanged);
    }

    pub fn insert_user_queue(&mut self, items: Vec<Playable>) {
        self.queue.insert_user_queue(items);
        self.notifier.notify(PlayerEvent::PlaylistChanged);
    }

    pub fn append_user_queue(&mut self, items: Vec<Playable>) {
        self.queue.append_user_queue(items);
        self.notifier.notify(PlayerEvent::PlaylistChanged);
    }

    /// Remove a queued (non-current) item
    pub fn remove_playable(&mut self, index: PlayerIndex) -> Result<Playable> {
        let removed = self.queue.remove_playable(index)?;
        self.notifier.notify(PlayerEvent::PlaylistChanged);
        Ok(removed)
    }

    /// Remove by context order position, including the active item
    pub fn remove_at_order(&mut self, order: usize) -> Result<Playable> {
        let removal = self.queue.remove_at_order(order)?;
        self.notifier.notify(PlayerEvent::PlaylistChanged);

        if removal.displaced_current {
            debug!(playable_id = %removal.removed.id, "Removed active item");
            match self.state {
                PlayerState::Playing | PlayerState::Loading => self.start_current(),
                PlayerState::Paused => {
                    self.cancel_pending();
                    self.unload();
                    if self.queue.current().is_some() {
                        self.notifier.notify(PlayerEvent::ArtworkChanged);
                    } else {
                        self.halt();
                    }
                }
                PlayerState::Stopped => {}
            }
        }
        Ok(removal.removed)
    }

    pub fn move_playable(&mut self, from: PlayerIndex, to: PlayerIndex) -> Result<()> {
        self.queue.move_playable(from, to)?;
        self.notifier.notify(PlayerEvent::PlaylistChanged);
        Ok(())
    }

    pub fn clear_user_queue(&mut self) {
        self.queue.clear_user_queue();
        self.notifier.notify(PlayerEvent::PlaylistChanged);
    }

    /// Drop the context
    ///
    /// A playing context item hands over to the user queue head when there is
    /// one; otherwise playback stops.
    pub fn clear_context_queue(&mut self) {
        let context_is_playing =
            self.queue.current().is_some() && !self.queue.is_user_queue_playing();
        let hand_over = context_is_playing && !self.queue.user_queue().is_empty();

        if hand_over {
            self.queue.advance();
        }
        if self.queue.clear_context_queue() {
            self.halt();
        }
        self.notifier.notify(PlayerEvent::PlaylistChanged);

        if hand_over && self.state != PlayerState::Stopped {
            self.start_current();
        }
    }

    /// Stop and drop everything
    pub fn clear_queues(&mut self) {
        self.halt();
        self.queue.clear_queues();
        self.notifier.notify(PlayerEvent::PlaylistChanged);
    }

    // ===== Status =====

    pub fn set_shuffle(&mut self, is_shuffle: bool) {
        if self.status.is_shuffle != is_shuffle {
            self.status.is_shuffle = is_shuffle;
            self.notifier.notify(PlayerEvent::ShuffleChanged(is_shuffle));
        }
    }

    pub fn toggle_shuffle(&mut self) {
        self.set_shuffle(!self.status.is_shuffle);
        self.notifier.notify(PlayerEvent::PlaylistChanged);
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        if self.status.repeat_mode != mode {
            self.status.repeat_mode = mode;
            self.notifier.notify(PlayerEvent::RepeatChanged(mode));
        }
    }

    pub fn set_auto_cache_on_play(&mut self, enabled: bool) {
        self.status.is_auto_cache_on_play = enabled;
        if enabled && self.state == PlayerState::Playing {
            self.prefetch_upcoming();
        }
    }

    /// Switch music/podcast mode (queue untouched)
    pub fn set_player_mode(&mut self, mode: PlayerMode) {
        if self.status.player_mode != mode {
            self.status.player_mode = mode;
            self.notifier.notify(PlayerEvent::PlayerModeChanged);
        }
    }

    /// Replace queue and status wholesale
    ///
    /// Nothing is loaded into the backend: a restored pointer leaves the
    /// player paused so `play()` starts it, no pointer leaves it stopped.
    pub fn restore(&mut self, queue: PlayQueueHandler, status: PlayerStatus) {
        self.cancel_pending();
        self.unload();

        self.queue = queue;
        self.status = status;
        self.state = if self.queue.current().is_some() {
            PlayerState::Paused
        } else {
            PlayerState::Stopped
        };
        info!(state = ?self.state, context = %self.queue.context_name(), "Player state restored");

        self.notifier.notify(PlayerEvent::PlaylistChanged);
        self.notifier.notify(PlayerEvent::ArtworkChanged);
        self.notifier.notify(PlayerEvent::ShuffleChanged(status.is_shuffle));
        self.notifier.notify(PlayerEvent::RepeatChanged(status.repeat_mode));
        self.notifier.notify(PlayerEvent::PlayerModeChanged);
    }

    // ===== Internals =====

    fn is_current_loaded(&self) -> bool {
        match (&self.loaded, self.queue.current()) {
            (Some(loaded), Some(current)) => loaded.playable_id == current.id,
            _ => false,
        }
    }

    fn is_loaded_token(&self, token: PlaybackToken) -> bool {
        self.loaded_token() == Some(token)
    }

    fn issue_token(&mut self) -> PlaybackToken {
        let token = PlaybackToken::new(self.next_token);
        self.next_token += 1;
        token
    }

    fn issue_ticket(&mut self) -> ReadinessTicket {
        let ticket = ReadinessTicket::new(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn cancel_pending(&mut self) {
        if let Some(ticket) = self.pending.take() {
            debug!(ticket = %ticket, "Cancelling pending download wait");
            self.downloads.cancel(ticket);
        }
    }

    fn unload(&mut self) {
        if self.loaded.take().is_some() {
            self.backend.stop();
        }
    }

    /// Go to `Stopped`, keeping the pointer
    fn halt(&mut self) {
        self.cancel_pending();
        self.unload();
        if self.state != PlayerState::Stopped {
            self.state = PlayerState::Stopped;
            self.notifier.notify(PlayerEvent::Stopped);
        }
    }

    /// Load the active item, downloading it first when needed
    fn start_current(&mut self) {
        self.cancel_pending();

        let Some(playable) = self.queue.current().cloned() else {
            self.halt();
            return;
        };
        self.notifier.notify(PlayerEvent::ArtworkChanged);

        if playable.is_cached || self.downloads.is_cached(&playable) {
            self.start_backend(playable);
        } else if self.is_offline {
            self.unload();
            self.fail(&playable.id, "not available offline");
        } else {
            self.unload();
            let ticket = self.issue_ticket();
            debug!(playable_id = %playable.id, ticket = %ticket, "Waiting for download");
            self.pending = Some(ticket);
            self.state = PlayerState::Loading;
            self.downloads.download(DownloadRequest {
                ticket: Some(ticket),
                playable,
                priority: DownloadPriority::High,
            });
        }
    }

    fn start_backend(&mut self, playable: Playable) {
        let token = self.issue_token();
        match self.backend.start(&playable, token) {
            Ok(()) => {
                debug!(playable_id = %playable.id, title = %playable.title, token = %token, "Started");
                self.loaded = Some(LoadedItem {
                    playable_id: playable.id.clone(),
                    token,
                });
                self.state = PlayerState::Playing;
                self.notifier.notify(PlayerEvent::Started(playable));
                self.prefetch_upcoming();
            }
            Err(err) => {
                self.loaded = None;
                self.fail(&playable.id, &err.to_string());
            }
        }
    }

    /// Report a failed item and pause on it
    fn fail(&mut self, playable_id: &str, reason: &str) {
        warn!(playable_id, reason, "Playback failed");
        self.state = PlayerState::Paused;
        self.notifier.notify(PlayerEvent::PlaybackFailed {
            playable_id: playable_id.to_string(),
            error: reason.to_string(),
        });
        self.notifier.notify(PlayerEvent::Paused);
    }

    /// Restart the active item from 0
    fn replay_current(&mut self) {
        if self.queue.current().is_none() {
            return;
        }
        if !self.is_current_loaded() {
            self.start_current();
            return;
        }

        self.backend.seek(0.0);
        if !self.backend.is_playing() {
            self.backend.play();
        }
        if self.state != PlayerState::Playing {
            self.state = PlayerState::Playing;
            if let Some(current) = self.queue.current().cloned() {
                self.notifier.notify(PlayerEvent::Started(current));
            }
        }
        self.notifier.notify(PlayerEvent::ElapsedTimeChanged {
            elapsed: 0.0,
            duration: self.backend.duration(),
        });
    }

    fn prefetch_upcoming(&mut self) {
        if !self.status.is_auto_cache_on_play || !self.config.prefetch_next || self.is_offline {
            return;
        }
        let Some(upcoming) = self.queue.peek_next() else {
            return;
        };
        if upcoming.is_cached || self.downloads.is_cached(upcoming) {
            return;
        }

        debug!(playable_id = %upcoming.id, "Prefetching upcoming item");
        let request = DownloadRequest {
            ticket: None,
            playable: upcoming.clone(),
            priority: DownloadPriority::Low,
        };
        self.downloads.download(request);
    }
}
