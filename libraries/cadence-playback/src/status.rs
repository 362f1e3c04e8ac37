//! Player status flags and configuration

use crate::types::{PlayerMode, RepeatMode};
use serde::{Deserialize, Serialize};

/// User-facing player flags
///
/// Persisted alongside the queue and restored on startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// Shuffle flag (affects how contexts are started, never reorders the queue)
    pub is_shuffle: bool,

    /// Repeat mode
    pub repeat_mode: RepeatMode,

    /// Cache items on play and prefetch the upcoming one
    pub is_auto_cache_on_play: bool,

    /// Music or podcast mode
    pub player_mode: PlayerMode,
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Seconds of elapsed time after which "previous" restarts the current
    /// item instead of stepping back
    pub replay_threshold_secs: f64,

    /// Prefetch the upcoming item when auto-cache is on
    pub prefetch_next: bool,

    /// Flags applied before any persisted state is restored
    pub initial_status: PlayerStatus,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            replay_threshold_secs: 3.0,
            prefetch_next: true,
            initial_status: PlayerStatus::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PlayerConfig::default();
        assert!((config.replay_threshold_secs - 3.0).abs() < f64::EPSILON);
        assert!(config.prefetch_next);
        assert!(!config.initial_status.is_shuffle);
        assert_eq!(config.initial_status.repeat_mode, RepeatMode::Off);
        assert_eq!(config.initial_status.player_mode, PlayerMode::Music);
    }
}
