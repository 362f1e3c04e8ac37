//! Player service
//!
//! Runs a [`PlayerFacade`] on its own tokio task. Everything that touches the
//! player (user commands, download completions, backend callbacks) is a
//! [`PlayerCommand`] on one channel, so mutations are applied strictly in
//! arrival order and events go out in state-change order.
//!
//! ```text
//! PlayerHandle ──┐
//! backend clock ─┼──> mpsc ──> service task ──> PlayerFacade ──> observers
//! download tasks ┘
//! ```

use crate::backend::{AudioBackend, BackendTick, PlaybackToken};
use crate::context::PlayContext;
use crate::download::{DownloadManager, DownloadRequest, Downloader, ReadinessTicket};
use crate::error::{PlaybackError, Result};
use crate::events::{ObserverId, PlayerEvent};
use crate::facade::PlayerFacade;
use crate::persistence::{PlayerSnapshot, PlayerStore};
use crate::player::MusicPlayer;
use crate::status::{PlayerConfig, PlayerStatus};
use crate::types::{Playable, PlayerIndex, PlayerMode, PlayerState, RepeatMode};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Commands processed by the service task
#[derive(Debug)]
pub enum PlayerCommand {
    // Transport
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    Seek(f64),
    PlayContext(PlayContext),
    PlayShuffled(PlayContext),
    PlayAt(PlayerIndex),
    Next,
    Previous,
    PreviousOrReplay,
    NextCached,
    PreviousCached,

    // Queue
    InsertContextQueue(Vec<Playable>),
    AppendContextQueue(Vec<Playable>),
    InsertUserQueue(Vec<Playable>),
    AppendUserQueue(Vec<Playable>),
    RemovePlayable(PlayerIndex),
    RemoveAtOrder(usize),
    MovePlayable { from: PlayerIndex, to: PlayerIndex },
    ClearUserQueue,
    ClearContextQueue,
    ClearQueues,

    // Status
    SetShuffle(bool),
    ToggleShuffle,
    SetRepeatMode(RepeatMode),
    CycleRepeatMode,
    SetPlayerMode(PlayerMode),
    SetAutoCache(bool),
    SetOfflineMode(bool),
    Reinit(Box<PlayerSnapshot>),

    // Observers and queries
    Subscribe(oneshot::Sender<(ObserverId, mpsc::UnboundedReceiver<PlayerEvent>)>),
    Unsubscribe(ObserverId),
    View(oneshot::Sender<PlayerView>),

    // Completions
    ElapsedTick {
        token: PlaybackToken,
        elapsed: f64,
        duration: f64,
    },
    PlaybackFinished(PlaybackToken),
    DownloadFinished {
        ticket: Option<ReadinessTicket>,
        playable_id: String,
        outcome: Result<()>,
    },

    Shutdown,
}

/// Read-only copy of the player for UI rendering
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub state: PlayerState,
    pub status: PlayerStatus,
    pub currently_playing: Option<Playable>,
    pub is_user_queue_playing: bool,
    pub context_name: String,
    pub previous: Vec<Playable>,
    pub user_queue: Vec<Playable>,
    pub next: Vec<Playable>,
    pub reported_order: usize,
    pub elapsed: f64,
    pub duration: f64,
    pub is_offline: bool,
}

impl PlayerView {
    fn capture(facade: &PlayerFacade) -> Self {
        Self {
            state: facade.state(),
            status: facade.status(),
            currently_playing: facade.currently_playing(),
            is_user_queue_playing: facade.is_user_queue_playing(),
            context_name: facade.context_name(),
            previous: facade.prev_queue(),
            user_queue: facade.user_queue(),
            next: facade.next_queue(),
            reported_order: facade.reported_order(),
            elapsed: facade.elapsed_time(),
            duration: facade.duration(),
            is_offline: facade.is_offline_mode(),
        }
    }
}

/// Download manager that runs an async [`Downloader`] on spawned tasks
///
/// Completions are posted back into the service channel. Cancelling a ticket
/// aborts its task; a completion that still slips through is discarded by the
/// player because its ticket is no longer pending.
pub struct ChannelDownloader {
    downloader: Arc<dyn Downloader>,
    commands: mpsc::UnboundedSender<PlayerCommand>,
    cached: Arc<Mutex<HashSet<String>>>,
    tasks: HashMap<ReadinessTicket, JoinHandle<()>>,
}

impl ChannelDownloader {
    pub fn new(downloader: Arc<dyn Downloader>, commands: mpsc::UnboundedSender<PlayerCommand>) -> Self {
        Self {
            downloader,
            commands,
            cached: Arc::new(Mutex::new(HashSet::new())),
            tasks: HashMap::new(),
        }
    }
}

impl DownloadManager for ChannelDownloader {
    fn is_cached(&self, playable: &Playable) -> bool {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&playable.id)
    }

    fn download(&mut self, request: DownloadRequest) {
        self.tasks.retain(|_, task| !task.is_finished());

        let DownloadRequest {
            ticket,
            playable,
            priority,
        } = request;
        debug!(playable_id = %playable.id, ?ticket, ?priority, "Download requested");

        let downloader = Arc::clone(&self.downloader);
        let commands = self.commands.clone();
        let cached = Arc::clone(&self.cached);

        let task = tokio::spawn(async move {
            let outcome = downloader.fetch(&playable).await;
            if outcome.is_ok() {
                cached
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(playable.id.clone());
            }
            let _ = commands.send(PlayerCommand::DownloadFinished {
                ticket,
                playable_id: playable.id,
                outcome,
            });
        });

        if let Some(ticket) = ticket {
            self.tasks.insert(ticket, task);
        }
    }

    fn cancel(&mut self, ticket: ReadinessTicket) {
        if let Some(task) = self.tasks.remove(&ticket) {
            task.abort();
        }
    }
}

/// Running player service
pub struct PlayerService {
    handle: PlayerHandle,
    task: JoinHandle<()>,
}

impl PlayerService {
    /// Build the player and start the service task
    ///
    /// Must be called from within a tokio runtime. Persisted state in `store`
    /// is restored before the first command is processed.
    pub fn spawn(
        config: PlayerConfig,
        backend: Box<dyn AudioBackend>,
        downloader: Arc<dyn Downloader>,
        store: Box<dyn PlayerStore>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let downloads = ChannelDownloader::new(downloader, tx.clone());
        let player = MusicPlayer::new(config, backend, Box::new(downloads));
        let facade = PlayerFacade::restored(player, store);

        let task = tokio::spawn(run(facade, rx));
        Self {
            handle: PlayerHandle { commands: tx },
            task,
        }
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle.clone()
    }

    /// Stop the player and wait for the task to finish
    pub async fn shutdown(self) {
        let _ = self.handle.send(PlayerCommand::Shutdown);
        if let Err(err) = self.task.await {
            warn!(error = %err, "Player service task failed");
        }
    }
}

async fn run(mut facade: PlayerFacade, mut commands: mpsc::UnboundedReceiver<PlayerCommand>) {
    info!("Player service started");
    while let Some(command) = commands.recv().await {
        if matches!(command, PlayerCommand::Shutdown) {
            break;
        }
        apply(&mut facade, command);
    }
    facade.stop();
    info!("Player service stopped");
}

fn log_rejected<T>(result: Result<T>) {
    if let Err(err) = result {
        warn!(error = %err, "Rejected queue command");
    }
}

fn apply(facade: &mut PlayerFacade, command: PlayerCommand) {
    match command {
        PlayerCommand::Play => facade.play(),
        PlayerCommand::Pause => facade.pause(),
        PlayerCommand::TogglePlayPause => facade.toggle_play_pause(),
        PlayerCommand::Stop => facade.stop(),
        PlayerCommand::Seek(seconds) => facade.seek(seconds),
        PlayerCommand::PlayContext(context) => facade.play_context(context),
        PlayerCommand::PlayShuffled(context) => facade.play_shuffled(context),
        PlayerCommand::PlayAt(index) => log_rejected(facade.play_at(index)),
        PlayerCommand::Next => facade.play_next(),
        PlayerCommand::Previous => facade.play_previous(),
        PlayerCommand::PreviousOrReplay => facade.play_previous_or_replay(),
        PlayerCommand::NextCached => facade.play_next_cached(),
        PlayerCommand::PreviousCached => facade.play_previous_cached(),

        PlayerCommand::InsertContextQueue(items) => facade.insert_context_queue(items),
        PlayerCommand::AppendContextQueue(items) => facade.append_context_queue(items),
        PlayerCommand::InsertUserQueue(items) => facade.insert_user_queue(items),
        PlayerCommand::AppendUserQueue(items) => facade.append_user_queue(items),
        PlayerCommand::RemovePlayable(index) => log_rejected(facade.remove_playable(index)),
        PlayerCommand::RemoveAtOrder(order) => log_rejected(facade.remove_at_order(order)),
        PlayerCommand::MovePlayable { from, to } => log_rejected(facade.move_playable(from, to)),
        PlayerCommand::ClearUserQueue => facade.clear_user_queue(),
        PlayerCommand::ClearContextQueue => facade.clear_context_queue(),
        PlayerCommand::ClearQueues => facade.clear_queues(),

        PlayerCommand::SetShuffle(is_shuffle) => facade.set_shuffle(is_shuffle),
        PlayerCommand::ToggleShuffle => facade.toggle_shuffle(),
        PlayerCommand::SetRepeatMode(mode) => facade.set_repeat_mode(mode),
        PlayerCommand::CycleRepeatMode => facade.cycle_repeat_mode(),
        PlayerCommand::SetPlayerMode(mode) => facade.set_player_mode(mode),
        PlayerCommand::SetAutoCache(enabled) => facade.set_auto_cache_played_items(enabled),
        PlayerCommand::SetOfflineMode(is_offline) => facade.set_offline_mode(is_offline),
        PlayerCommand::Reinit(snapshot) => facade.reinit(&snapshot),

        PlayerCommand::Subscribe(reply) => {
            let _ = reply.send(facade.subscribe());
        }
        PlayerCommand::Unsubscribe(id) => facade.unsubscribe(id),
        PlayerCommand::View(reply) => {
            let _ = reply.send(PlayerView::capture(facade));
        }

        PlayerCommand::ElapsedTick {
            token,
            elapsed,
            duration,
        } => facade.on_elapsed_tick(token, elapsed, duration),
        PlayerCommand::PlaybackFinished(token) => facade.on_playback_finished(token),
        PlayerCommand::DownloadFinished {
            ticket,
            playable_id,
            outcome,
        } => match ticket {
            Some(ticket) => facade.on_download_finished(ticket, outcome),
            None => match outcome {
                Ok(()) => facade.on_prefetched(&playable_id),
                Err(err) => debug!(playable_id, error = %err, "Prefetch failed"),
            },
        },

        PlayerCommand::Shutdown => {}
    }
}

/// Cloneable handle to a running [`PlayerService`]
///
/// Commands are fire-and-forget; rejected queue commands are logged by the
/// service. Queries wait until every earlier command has been applied.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    commands: mpsc::UnboundedSender<PlayerCommand>,
}

impl PlayerHandle {
    /// Send a raw command
    pub fn send(&self, command: PlayerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| PlaybackError::ServiceClosed)
    }

    // ===== Queries =====

    /// Snapshot of the player after all earlier commands
    pub async fn view(&self) -> Result<PlayerView> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::View(tx))?;
        rx.await.map_err(|_| PlaybackError::ServiceClosed)
    }

    /// Register an observer
    pub async fn subscribe(&self) -> Result<(ObserverId, mpsc::UnboundedReceiver<PlayerEvent>)> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerCommand::Subscribe(tx))?;
        rx.await.map_err(|_| PlaybackError::ServiceClosed)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> Result<()> {
        self.send(PlayerCommand::Unsubscribe(id))
    }

    // ===== Transport =====

    pub fn play(&self) -> Result<()> {
        self.send(PlayerCommand::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(PlayerCommand::Pause)
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send(PlayerCommand::TogglePlayPause)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(PlayerCommand::Stop)
    }

    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.send(PlayerCommand::Seek(seconds))
    }

    pub fn play_context(&self, context: PlayContext) -> Result<()> {
        self.send(PlayerCommand::PlayContext(context))
    }

    pub fn play_shuffled(&self, context: PlayContext) -> Result<()> {
        self.send(PlayerCommand::PlayShuffled(context))
    }

    pub fn play_at(&self, index: PlayerIndex) -> Result<()> {
        self.send(PlayerCommand::PlayAt(index))
    }

    pub fn play_next(&self) -> Result<()> {
        self.send(PlayerCommand::Next)
    }

    pub fn play_previous(&self) -> Result<()> {
        self.send(PlayerCommand::Previous)
    }

    pub fn play_previous_or_replay(&self) -> Result<()> {
        self.send(PlayerCommand::PreviousOrReplay)
    }

    pub fn play_next_cached(&self) -> Result<()> {
        self.send(PlayerCommand::NextCached)
    }

    pub fn play_previous_cached(&self) -> Result<()> {
        self.send(PlayerCommand::PreviousCached)
    }

    // ===== Queue =====

    pub fn insert_context_queue(&self, items: Vec<Playable>) -> Result<()> {
        self.send(PlayerCommand::InsertContextQueue(items))
    }

    pub fn append_context_queue(&self, items: Vec<Playable>) -> Result<()> {
        self.send(PlayerCommand::AppendContextQueue(items))
    }

    pub fn insert_user_queue(&self, items: Vec<Playable>) -> Result<()> {
        self.send(PlayerCommand::InsertUserQueue(items))
    }

    pub fn append_user_queue(&self, items: Vec<Playable>) -> Result<()> {
        self.send(PlayerCommand::AppendUserQueue(items))
    }

    pub fn remove_playable(&self, index: PlayerIndex) -> Result<()> {
        self.send(PlayerCommand::RemovePlayable(index))
    }

    pub fn remove_at_order(&self, order: usize) -> Result<()> {
        self.send(PlayerCommand::RemoveAtOrder(order))
    }

    pub fn move_playable(&self, from: PlayerIndex, to: PlayerIndex) -> Result<()> {
        self.send(PlayerCommand::MovePlayable { from, to })
    }

    pub fn clear_user_queue(&self) -> Result<()> {
        self.send(PlayerCommand::ClearUserQueue)
    }

    pub fn clear_context_queue(&self) -> Result<()> {
        self.send(PlayerCommand::ClearContextQueue)
    }

    pub fn clear_queues(&self) -> Result<()> {
        self.send(PlayerCommand::ClearQueues)
    }

    // ===== Status =====

    pub fn set_shuffle(&self, is_shuffle: bool) -> Result<()> {
        self.send(PlayerCommand::SetShuffle(is_shuffle))
    }

    pub fn toggle_shuffle(&self) -> Result<()> {
        self.send(PlayerCommand::ToggleShuffle)
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.send(PlayerCommand::SetRepeatMode(mode))
    }

    /// Step the repeat mode (off → all → single → off) inside the service
    pub fn cycle_repeat_mode(&self) -> Result<()> {
        self.send(PlayerCommand::CycleRepeatMode)
    }

    pub fn set_player_mode(&self, mode: PlayerMode) -> Result<()> {
        self.send(PlayerCommand::SetPlayerMode(mode))
    }

    pub fn set_auto_cache(&self, enabled: bool) -> Result<()> {
        self.send(PlayerCommand::SetAutoCache(enabled))
    }

    pub fn set_offline_mode(&self, is_offline: bool) -> Result<()> {
        self.send(PlayerCommand::SetOfflineMode(is_offline))
    }

    pub fn reinit(&self, snapshot: PlayerSnapshot) -> Result<()> {
        self.send(PlayerCommand::Reinit(Box::new(snapshot)))
    }

    // ===== Backend callbacks =====

    /// Position update from the audio backend for the load `token`
    pub fn report_elapsed(&self, token: PlaybackToken, elapsed: f64, duration: f64) -> Result<()> {
        self.send(PlayerCommand::ElapsedTick {
            token,
            elapsed,
            duration,
        })
    }

    /// The audio backend reached the end of the load `token`
    pub fn report_finished(&self, token: PlaybackToken) -> Result<()> {
        self.send(PlayerCommand::PlaybackFinished(token))
    }

    /// Forward a backend clock report: position, then end of track if reached
    pub fn report_tick(&self, tick: BackendTick) -> Result<()> {
        self.report_elapsed(tick.token, tick.elapsed, tick.duration)?;
        if tick.finished {
            self.report_finished(tick.token)?;
        }
        Ok(())
    }
}
