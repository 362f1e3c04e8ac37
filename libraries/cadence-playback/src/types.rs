//! Core types for the playback engine

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One playable item (song or podcast episode)
///
/// Carries everything the queue needs to navigate without I/O. The owning
/// collection is kept for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playable {
    /// Unique identifier from the library
    pub id: String,

    /// Display title
    pub title: String,

    /// Song or episode
    pub kind: PlayableKind,

    /// Track duration
    pub duration: Duration,

    /// Whether the audio payload is already in local storage
    pub is_cached: bool,

    /// Owning album or podcast (optional)
    pub collection: Option<CollectionRef>,
}

impl Playable {
    /// Create an uncached song without a collection
    pub fn song(id: impl Into<String>, title: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind: PlayableKind::Song,
            duration,
            is_cached: false,
            collection: None,
        }
    }

    /// Create an uncached podcast episode without a collection
    pub fn episode(id: impl Into<String>, title: impl Into<String>, duration: Duration) -> Self {
        Self {
            kind: PlayableKind::Episode,
            ..Self::song(id, title, duration)
        }
    }

    /// Builder-style cached flag
    #[must_use]
    pub fn cached(mut self, is_cached: bool) -> Self {
        self.is_cached = is_cached;
        self
    }

    /// Builder-style owning collection
    #[must_use]
    pub fn in_collection(mut self, collection: CollectionRef) -> Self {
        self.collection = Some(collection);
        self
    }
}

/// Kind of playable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayableKind {
    Song,
    Episode,
}

/// Reference to the collection a playable belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionRef {
    /// Song belongs to an album
    Album { id: String, name: String },

    /// Episode belongs to a podcast
    Podcast { id: String, name: String },
}

/// One of the three queue segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueSegment {
    /// Context items already played
    Previous,

    /// "Play next"/"play later" insertions
    User,

    /// Remaining context items
    Next,
}

/// Address of an item inside the queue
///
/// Relative to the current queue shape: re-resolve after any structural
/// mutation. The currently playing item is not part of any segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerIndex {
    pub segment: QueueSegment,
    pub offset: usize,
}

impl PlayerIndex {
    pub fn new(segment: QueueSegment, offset: usize) -> Self {
        Self { segment, offset }
    }

    pub fn previous(offset: usize) -> Self {
        Self::new(QueueSegment::Previous, offset)
    }

    pub fn user(offset: usize) -> Self {
        Self::new(QueueSegment::User, offset)
    }

    pub fn next(offset: usize) -> Self {
        Self::new(QueueSegment::Next, offset)
    }
}

/// Player state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    /// Nothing active
    Stopped,

    /// Waiting for the current item to become playable (download pending)
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Hold at the queue boundary
    #[default]
    Off,

    /// Wrap through the whole context
    All,

    /// Repeat the current item
    Single,
}

impl RepeatMode {
    /// Next mode in the UI cycle (off → all → single → off)
    #[must_use]
    pub fn cycled(self) -> Self {
        match self {
            Self::Off => Self::All,
            Self::All => Self::Single,
            Self::Single => Self::Off,
        }
    }
}

/// Interpretation of skip intervals in the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerMode {
    #[default]
    Music,
    Podcast,
}

/// Download priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadPriority {
    /// Background prefetch
    Low,

    /// User is waiting for this item
    High,
}
