//! Persisted player state
//!
//! The queue and the status flags survive restarts. The facade captures a
//! [`PlayerSnapshot`] after every change and hands it to a [`PlayerStore`].

use crate::error::{PlaybackError, Result};
use crate::queue::PlayQueueHandler;
use crate::status::PlayerStatus;
use crate::types::{Playable, PlayerIndex, PlayerMode, RepeatMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Serializable player state
///
/// The active item is stored inside the segment it is addressed by:
/// `next[0]` for a context item, `user_queue[0]` for a user item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub previous: Vec<Playable>,
    pub user_queue: Vec<Playable>,
    pub next: Vec<Playable>,
    pub current_index: Option<PlayerIndex>,
    pub context_name: String,
    pub is_shuffle: bool,
    pub repeat_mode: RepeatMode,
    pub is_auto_cache_on_play: bool,
    pub player_mode: PlayerMode,
    pub saved_at: DateTime<Utc>,
}

impl PlayerSnapshot {
    /// Capture queue and status
    pub fn capture(queue: &PlayQueueHandler, status: PlayerStatus) -> Self {
        let mut user_queue = queue.user_queue().to_vec();
        let mut next = queue.next_queue().to_vec();

        let current_index = match queue.current() {
            Some(current) if queue.is_user_queue_playing() => {
                user_queue.insert(0, current.clone());
                Some(PlayerIndex::user(0))
            }
            Some(current) => {
                next.insert(0, current.clone());
                Some(PlayerIndex::next(0))
            }
            None => None,
        };

        Self {
            previous: queue.previous().to_vec(),
            user_queue,
            next,
            current_index,
            context_name: queue.assigned_context_name().to_string(),
            is_shuffle: status.is_shuffle,
            repeat_mode: status.repeat_mode,
            is_auto_cache_on_play: status.is_auto_cache_on_play,
            player_mode: status.player_mode,
            saved_at: Utc::now(),
        }
    }

    pub fn status(&self) -> PlayerStatus {
        PlayerStatus {
            is_shuffle: self.is_shuffle,
            repeat_mode: self.repeat_mode,
            is_auto_cache_on_play: self.is_auto_cache_on_play,
            player_mode: self.player_mode,
        }
    }

    /// Rebuild the queue
    ///
    /// Returns the queue and whether `current_index` resolved.
    pub fn restore_queue(&self) -> (PlayQueueHandler, bool) {
        PlayQueueHandler::from_parts(
            self.context_name.clone(),
            self.previous.clone(),
            self.user_queue.clone(),
            self.next.clone(),
            self.current_index,
        )
    }
}

/// Storage for player snapshots
pub trait PlayerStore: Send {
    /// Last saved snapshot, if any
    fn load(&self) -> Result<Option<PlayerSnapshot>>;

    /// Replace the saved snapshot
    fn save(&mut self, snapshot: &PlayerSnapshot) -> Result<()>;
}

/// In-memory store
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<PlayerSnapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `snapshot`
    pub fn with_snapshot(snapshot: PlayerSnapshot) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot))),
        }
    }

    /// Current content
    pub fn snapshot(&self) -> Option<PlayerSnapshot> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PlayerStore for MemoryStore {
    fn load(&self) -> Result<Option<PlayerSnapshot>> {
        Ok(self.snapshot())
    }

    fn save(&mut self, snapshot: &PlayerSnapshot) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}

/// JSON file store
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PlayerStore for JsonFileStore {
    fn load(&self) -> Result<Option<PlayerSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&json)?;
        debug!(path = %self.path.display(), "Loaded player snapshot");
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &PlayerSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path).map_err(|err| {
            PlaybackError::Persistence(format!(
                "failed to replace {}: {err}",
                self.path.display()
            ))
        })
    }
}
