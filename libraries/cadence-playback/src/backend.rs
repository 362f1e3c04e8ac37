//! Platform-agnostic audio backend trait
//!
//! The player never decodes audio itself. It drives whatever engine the
//! platform provides (native player, streaming client, simulation) through
//! [`AudioBackend`] and receives position and end-of-track callbacks through
//! the player service.

use crate::error::{PlaybackError, Result};
use crate::types::Playable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identity of one backend load
///
/// Every `start` gets a fresh token. Position and end-of-track callbacks carry
/// the token of the load they belong to, so callbacks for an item the player
/// already left can be told apart from callbacks for the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackToken(u64);

impl PlaybackToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlaybackToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load#{}", self.0)
    }
}

/// Clock report of a playing load
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackendTick {
    pub token: PlaybackToken,
    pub elapsed: f64,
    pub duration: f64,
    pub finished: bool,
}

/// Audio engine driven by the player
///
/// `start` is the readiness point: it loads the item and begins playback, and
/// an error means the item cannot be played (the player reports
/// [`crate::PlayerEvent::PlaybackFailed`] and pauses). Callbacks for the load
/// must be reported with the `token` passed to `start`.
pub trait AudioBackend: Send {
    /// Load `playable` and start playing it from the beginning
    fn start(&mut self, playable: &Playable, token: PlaybackToken) -> Result<()>;

    /// Resume the loaded item
    fn play(&mut self);

    /// Pause the loaded item
    fn pause(&mut self);

    /// Stop and unload
    fn stop(&mut self);

    /// Seek within the loaded item
    fn seek(&mut self, seconds: f64);

    /// Seconds played of the loaded item
    fn elapsed_time(&self) -> f64;

    /// Total seconds of the loaded item (0 when nothing is loaded)
    fn duration(&self) -> f64;

    /// Whether audio is currently coming out
    fn is_playing(&self) -> bool;
}

/// Command received by a [`SimulatedBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    Start(String),
    Play,
    Pause,
    Stop,
    Seek(f64),
}

#[derive(Debug, Default)]
struct SimulatedState {
    commands: Vec<BackendCommand>,
    loaded: Option<Playable>,
    token: Option<PlaybackToken>,
    elapsed: f64,
    playing: bool,
    failing: HashSet<String>,
}

/// In-process backend without audio output
///
/// Clones share state, so a test (or the CLI's clock) can keep a handle after
/// the player took ownership of the backend.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedBackend {
    /// Create new idle backend
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `start` fail for `playable_id`
    pub fn fail_on(&self, playable_id: impl Into<String>) {
        self.lock().failing.insert(playable_id.into());
    }

    /// Every command received so far
    pub fn commands(&self) -> Vec<BackendCommand> {
        self.lock().commands.clone()
    }

    /// Forget recorded commands
    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    /// ID of the loaded item
    pub fn loaded_id(&self) -> Option<String> {
        self.lock().loaded.as_ref().map(|p| p.id.clone())
    }

    /// Token of the current load
    pub fn loaded_token(&self) -> Option<PlaybackToken> {
        self.lock().token
    }

    /// Move the clock of the loaded item
    pub fn set_elapsed(&self, seconds: f64) {
        self.lock().elapsed = seconds;
    }

    /// Advance the clock while playing
    ///
    /// `None` when nothing is playing.
    pub fn tick(&self, seconds: f64) -> Option<BackendTick> {
        let mut state = self.lock();
        if !state.playing {
            return None;
        }
        let token = state.token?;
        let duration = state.loaded.as_ref()?.duration.as_secs_f64();
        state.elapsed = (state.elapsed + seconds).min(duration);
        let finished = state.elapsed >= duration;
        if finished {
            state.playing = false;
        }
        Some(BackendTick {
            token,
            elapsed: state.elapsed,
            duration,
            finished,
        })
    }
}

impl AudioBackend for SimulatedBackend {
    fn start(&mut self, playable: &Playable, token: PlaybackToken) -> Result<()> {
        let mut state = self.lock();
        state.commands.push(BackendCommand::Start(playable.id.clone()));
        if state.failing.contains(&playable.id) {
            state.loaded = None;
            state.token = None;
            state.playing = false;
            return Err(PlaybackError::backend(format!(
                "unsupported stream for {}",
                playable.id
            )));
        }
        state.loaded = Some(playable.clone());
        state.token = Some(token);
        state.elapsed = 0.0;
        state.playing = true;
        Ok(())
    }

    fn play(&mut self) {
        let mut state = self.lock();
        state.commands.push(BackendCommand::Play);
        state.playing = state.loaded.is_some();
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        state.commands.push(BackendCommand::Pause);
        state.playing = false;
    }

    fn stop(&mut self) {
        let mut state = self.lock();
        state.commands.push(BackendCommand::Stop);
        state.loaded = None;
        state.token = None;
        state.elapsed = 0.0;
        state.playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        let mut state = self.lock();
        state.commands.push(BackendCommand::Seek(seconds));
        let duration = state
            .loaded
            .as_ref()
            .map_or(0.0, |p| p.duration.as_secs_f64());
        state.elapsed = seconds.clamp(0.0, duration);
    }

    fn elapsed_time(&self) -> f64 {
        self.lock().elapsed
    }

    fn duration(&self) -> f64 {
        self.lock()
            .loaded
            .as_ref()
            .map_or(0.0, |p| p.duration.as_secs_f64())
    }

    fn is_playing(&self) -> bool {
        self.lock().playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn track(id: &str, secs: u64) -> Playable {
        Playable::song(id, id, Duration::from_secs(secs))
    }

    const TOKEN: PlaybackToken = PlaybackToken(7);

    #[test]
    fn start_loads_and_plays() {
        let mut backend = SimulatedBackend::new();
        backend.start(&track("a", 120), TOKEN).unwrap();

        assert_eq!(backend.loaded_id().as_deref(), Some("a"));
        assert!(backend.is_playing());
        assert!((backend.duration() - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn failing_start_unloads() {
        let mut backend = SimulatedBackend::new();
        backend.fail_on("bad");
        assert!(backend.start(&track("bad", 60), TOKEN).is_err());
        assert!(backend.loaded_id().is_none());
        assert!(backend.loaded_token().is_none());
        assert!(!backend.is_playing());
    }

    #[test]
    fn stop_forgets_token() {
        let mut backend = SimulatedBackend::new();
        backend.start(&track("a", 10), TOKEN).unwrap();
        assert_eq!(backend.loaded_token(), Some(TOKEN));

        backend.stop();
        assert!(backend.loaded_token().is_none());
        assert_eq!(backend.tick(1.0), None);
    }

    #[test]
    fn tick_reports_end_of_track() {
        let mut backend = SimulatedBackend::new();
        backend.start(&track("a", 2), TOKEN).unwrap();

        let tick = backend.tick(1.0).unwrap();
        assert_eq!(tick.token, TOKEN);
        assert!(!tick.finished);

        let tick = backend.tick(5.0).unwrap();
        assert_eq!((tick.elapsed, tick.duration, tick.finished), (2.0, 2.0, true));
        assert_eq!(backend.tick(1.0), None);
    }

    #[test]
    fn seek_is_clamped() {
        let mut backend = SimulatedBackend::new();
        backend.start(&track("a", 10), TOKEN).unwrap();
        backend.seek(42.0);
        assert!((backend.elapsed_time() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn clones_share_state() {
        let backend = SimulatedBackend::new();
        let mut owned = backend.clone();
        owned.start(&track("a", 10), TOKEN).unwrap();
        owned.pause();

        assert_eq!(
            backend.commands(),
            vec![BackendCommand::Start("a".to_string()), BackendCommand::Pause]
        );
    }
}
