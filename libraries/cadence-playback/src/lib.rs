//! Cadence - Playback Queue & Navigation
//!
//! Queue and navigation engine for a music/podcast client.
//!
//! This crate provides:
//! - Three-segment queue (previous, user queue, next)
//! - Play contexts with optional shuffled start
//! - Navigation with repeat modes (Off, All, Single)
//! - Cached-only skipping for offline playback
//! - Fetch-then-play with readiness tickets
//! - Observer notifications for UI synchronization
//! - Persistence of queue and status across restarts
//!
//! # Architecture
//!
//! `cadence-playback` does not produce sound or fetch files itself:
//! - Audio output is an [`AudioBackend`]
//! - Fetching is a [`DownloadManager`] (or an async [`Downloader`] behind the
//!   service)
//! - Persistence is a [`PlayerStore`]
//!
//! [`MusicPlayer`] is the single-owner state machine, [`PlayerFacade`] adds
//! offline routing and persistence, and [`PlayerService`] runs the facade on a
//! tokio task behind a cloneable [`PlayerHandle`].
//!
//! # Example: Basic Playback
//!
//! ```rust
//! use cadence_playback::{
//!     MusicPlayer, PlayContext, Playable, PlayerConfig, PlayerState, RecordingDownloads,
//!     SimulatedBackend,
//! };
//! use std::time::Duration;
//!
//! let mut player = MusicPlayer::new(
//!     PlayerConfig::default(),
//!     Box::new(SimulatedBackend::new()),
//!     Box::new(RecordingDownloads::new()),
//! );
//!
//! let album = vec![
//!     Playable::song("1", "Intro", Duration::from_secs(95)).cached(true),
//!     Playable::song("2", "Theme", Duration::from_secs(240)).cached(true),
//! ];
//! player.play_context(PlayContext::new("Album", album));
//! assert_eq!(player.state(), PlayerState::Playing);
//!
//! player.play_next();
//! assert_eq!(player.currently_playing().map(|p| p.id.as_str()), Some("2"));
//! ```
//!
//! # Example: Service
//!
//! ```rust,no_run
//! use cadence_playback::{
//!     MemoryStore, PlayContext, PlayerConfig, PlayerService, SimulatedBackend,
//!     SimulatedDownloader,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> cadence_playback::Result<()> {
//! let service = PlayerService::spawn(
//!     PlayerConfig::default(),
//!     Box::new(SimulatedBackend::new()),
//!     Arc::new(SimulatedDownloader::new(Duration::from_millis(200))),
//!     Box::new(MemoryStore::new()),
//! );
//! let player = service.handle();
//!
//! let (_, mut events) = player.subscribe().await?;
//! player.play_context(PlayContext::new("Album", Vec::new()))?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! service.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod context;
pub mod download;
mod error;
pub mod events;
pub mod facade;
pub mod persistence;
pub mod player;
pub mod queue;
pub mod service;
pub mod status;
pub mod types;

// Public exports
pub use backend::{AudioBackend, BackendCommand, BackendTick, PlaybackToken, SimulatedBackend};
pub use context::PlayContext;
pub use download::{
    DownloadManager, DownloadRequest, Downloader, ReadinessTicket, RecordingDownloads,
    SimulatedDownloader,
};
pub use error::{PlaybackError, Result};
pub use events::{Notifier, ObserverId, PlayerEvent};
pub use facade::PlayerFacade;
pub use persistence::{JsonFileStore, MemoryStore, PlayerSnapshot, PlayerStore};
pub use player::MusicPlayer;
pub use queue::{PlayQueueHandler, Removal, MIXED_CONTEXT_NAME};
pub use service::{ChannelDownloader, PlayerCommand, PlayerHandle, PlayerService, PlayerView};
pub use status::{PlayerConfig, PlayerStatus};
pub use types::{
    CollectionRef, DownloadPriority, Playable, PlayableKind, PlayerIndex, PlayerMode,
    PlayerState, QueueSegment, RepeatMode,
};
