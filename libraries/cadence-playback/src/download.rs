//! Download subsystem seam
//!
//! The player asks for items through the synchronous [`DownloadManager`] and
//! hears back through [`crate::MusicPlayer::on_download_finished`]. Each request
//! the player waits on carries a [`ReadinessTicket`]; only the pending ticket is
//! honoured when a completion arrives.

use crate::error::{PlaybackError, Result};
use crate::types::{DownloadPriority, Playable};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Identifies one play request waiting for its item to become available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadinessTicket(u64);

impl ReadinessTicket {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ReadinessTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One download request
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    /// Present when the player waits for the result
    pub ticket: Option<ReadinessTicket>,
    pub playable: Playable,
    pub priority: DownloadPriority,
}

/// Download subsystem as seen by the player
pub trait DownloadManager: Send {
    /// Whether the item is available locally
    fn is_cached(&self, playable: &Playable) -> bool;

    /// Queue a download
    ///
    /// Ticketed requests must eventually be answered through
    /// `MusicPlayer::on_download_finished` unless cancelled.
    fn download(&mut self, request: DownloadRequest);

    /// The player no longer waits for `ticket`
    fn cancel(&mut self, ticket: ReadinessTicket);
}

/// Asynchronous fetcher behind a channel-based download manager
#[async_trait]
pub trait Downloader: Send + Sync + 'static {
    /// Fetch `playable` into local storage
    async fn fetch(&self, playable: &Playable) -> Result<()>;
}

#[derive(Debug, Default)]
struct RecordedDownloads {
    requests: Vec<DownloadRequest>,
    cancelled: Vec<ReadinessTicket>,
    cached: HashSet<String>,
}

/// Download manager that only records requests
///
/// Completions are delivered by whoever holds a clone, which makes readiness
/// ordering fully controllable in tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingDownloads {
    inner: Arc<Mutex<RecordedDownloads>>,
}

impl RecordingDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecordedDownloads> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Treat `playable_id` as available locally
    pub fn mark_cached(&self, playable_id: impl Into<String>) {
        self.lock().cached.insert(playable_id.into());
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.lock().requests.clone()
    }

    /// Most recent ticketed request
    pub fn last_ticketed(&self) -> Option<(ReadinessTicket, Playable)> {
        self.lock()
            .requests
            .iter()
            .rev()
            .find_map(|r| r.ticket.map(|t| (t, r.playable.clone())))
    }

    /// Tickets the player gave up on
    pub fn cancelled(&self) -> Vec<ReadinessTicket> {
        self.lock().cancelled.clone()
    }
}

impl DownloadManager for RecordingDownloads {
    fn is_cached(&self, playable: &Playable) -> bool {
        self.lock().cached.contains(&playable.id)
    }

    fn download(&mut self, request: DownloadRequest) {
        self.lock().requests.push(request);
    }

    fn cancel(&mut self, ticket: ReadinessTicket) {
        self.lock().cancelled.push(ticket);
    }
}

/// Downloader that waits a fixed delay and fails for selected items
#[derive(Debug, Clone, Default)]
pub struct SimulatedDownloader {
    delay: Duration,
    failing: HashSet<String>,
}

impl SimulatedDownloader {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failing: HashSet::new(),
        }
    }

    /// Make fetches of `playable_id` fail
    #[must_use]
    pub fn failing_on(mut self, playable_id: impl Into<String>) -> Self {
        self.failing.insert(playable_id.into());
        self
    }
}

#[async_trait]
impl Downloader for SimulatedDownloader {
    async fn fetch(&self, playable: &Playable) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        if self.failing.contains(&playable.id) {
            return Err(PlaybackError::download_failed(&playable.id, "server unreachable"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Playable {
        Playable::song(id, id, Duration::from_secs(60))
    }

    #[test]
    fn recording_downloads_tracks_requests() {
        let downloads = RecordingDownloads::new();
        let mut manager = downloads.clone();

        manager.download(DownloadRequest {
            ticket: Some(ReadinessTicket::new(1)),
            playable: track("a"),
            priority: DownloadPriority::High,
        });
        manager.download(DownloadRequest {
            ticket: None,
            playable: track("b"),
            priority: DownloadPriority::Low,
        });
        manager.cancel(ReadinessTicket::new(1));

        assert_eq!(downloads.requests().len(), 2);
        let (ticket, playable) = downloads.last_ticketed().unwrap();
        assert_eq!(ticket.value(), 1);
        assert_eq!(playable.id, "a");
        assert_eq!(downloads.cancelled(), vec![ReadinessTicket::new(1)]);
    }

    #[test]
    fn recording_downloads_cache() {
        let downloads = RecordingDownloads::new();
        downloads.mark_cached("a");
        assert!(downloads.is_cached(&track("a")));
        assert!(!downloads.is_cached(&track("b")));
    }

    #[test]
    fn ticket_display() {
        assert_eq!(ReadinessTicket::new(7).to_string(), "#7");
    }

    #[tokio::test]
    async fn simulated_downloader_outcomes() {
        let downloader = SimulatedDownloader::new(Duration::ZERO).failing_on("bad");
        assert!(downloader.fetch(&track("ok")).await.is_ok());
        assert!(matches!(
            downloader.fetch(&track("bad")).await,
            Err(PlaybackError::DownloadFailed { .. })
        ));
    }
}
