//! Error types for the playback engine

use crate::types::QueueSegment;
use thiserror::Error;

/// Playback errors
///
/// Navigation never returns these: an empty queue is a silent no-op and
/// download/backend failures travel through [`crate::PlayerEvent::PlaybackFailed`].
/// Only addressing, persistence and service plumbing surface errors to callers.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A `PlayerIndex` did not resolve against the current queue shape
    #[error("Index out of range: {segment:?}[{offset}] (segment length {len})")]
    IndexOutOfRange {
        segment: QueueSegment,
        offset: usize,
        len: usize,
    },

    /// A flat order position did not resolve against the context order
    #[error("Order position out of range: {order} (context length {len})")]
    OrderOutOfRange { order: usize, len: usize },

    /// A playable could not be fetched
    #[error("Download failed for {playable_id}: {reason}")]
    DownloadFailed { playable_id: String, reason: String },

    /// The audio backend rejected a command
    #[error("Backend error: {0}")]
    Backend(String),

    /// Persisted state could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Snapshot (de)serialization error
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The player service task is gone
    #[error("Player service is not running")]
    ServiceClosed,
}

impl PlaybackError {
    /// Create a download failure
    pub fn download_failed(playable_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DownloadFailed {
            playable_id: playable_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
