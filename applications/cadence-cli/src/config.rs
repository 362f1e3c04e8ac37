/// Application configuration
use crate::error::{CliError, Result};
use cadence_playback::{PlayerConfig, PlayerMode, PlayerStatus, RepeatMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_player")]
    pub player: PlayerSettings,

    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerSettings {
    #[serde(default = "default_replay_threshold_secs")]
    pub replay_threshold_secs: f64,

    #[serde(default = "default_true")]
    pub prefetch_next: bool,

    #[serde(default)]
    pub auto_cache_on_play: bool,

    #[serde(default)]
    pub repeat_mode: RepeatMode,

    #[serde(default)]
    pub player_mode: PlayerMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Where queue and status are persisted; in-memory only when unset
    #[serde(default = "default_state_file")]
    pub state_file: Option<PathBuf>,

    #[serde(default = "default_library_file")]
    pub library_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    #[serde(default = "default_download_delay_ms")]
    pub download_delay_ms: u64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Simulated seconds per real second
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Items whose download always fails
    #[serde(default)]
    pub failing_downloads: Vec<String>,

    /// Start in offline mode
    #[serde(default)]
    pub offline: bool,
}

impl AppConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// Environment variables use the `CADENCE_` prefix and `__` between
    /// sections, e.g. `CADENCE_SIMULATION__SPEED=10`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path.map_or_else(|| PathBuf::from("cadence.toml"), Path::to_path_buf);
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        } else if path.is_some() {
            return Err(CliError::Config(format!(
                "config file not found: {}",
                config_path.display()
            )));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.player.replay_threshold_secs.is_finite() || self.player.replay_threshold_secs < 0.0 {
            return Err(CliError::Config(
                "player.replay_threshold_secs must be a non-negative number".to_string(),
            ));
        }

        if self.simulation.tick_interval_ms == 0 {
            return Err(CliError::Config(
                "simulation.tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        if !self.simulation.speed.is_finite() || self.simulation.speed <= 0.0 {
            return Err(CliError::Config(
                "simulation.speed must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Engine configuration derived from the player settings
    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig {
            replay_threshold_secs: self.player.replay_threshold_secs,
            prefetch_next: self.player.prefetch_next,
            initial_status: PlayerStatus {
                is_shuffle: false,
                repeat_mode: self.player.repeat_mode,
                is_auto_cache_on_play: self.player.auto_cache_on_play,
                player_mode: self.player.player_mode,
            },
        }
    }
}

// Default values
fn default_player() -> PlayerSettings {
    PlayerSettings {
        replay_threshold_secs: default_replay_threshold_secs(),
        prefetch_next: default_true(),
        auto_cache_on_play: false,
        repeat_mode: RepeatMode::Off,
        player_mode: PlayerMode::Music,
    }
}

fn default_replay_threshold_secs() -> f64 {
    PlayerConfig::default().replay_threshold_secs
}

fn default_true() -> bool {
    true
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        state_file: default_state_file(),
        library_file: default_library_file(),
    }
}

fn default_state_file() -> Option<PathBuf> {
    Some(PathBuf::from("./data/player.json"))
}

fn default_library_file() -> PathBuf {
    PathBuf::from("library.toml")
}

fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        download_delay_ms: default_download_delay_ms(),
        tick_interval_ms: default_tick_interval_ms(),
        speed: default_speed(),
        failing_downloads: Vec::new(),
        offline: false,
    }
}

fn default_download_delay_ms() -> u64 {
    750
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_speed() -> f64 {
    1.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            player: default_player(),
            storage: default_storage(),
            simulation: default_simulation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.player_config().replay_threshold_secs, 3.0);
        assert_eq!(config.storage.library_file, PathBuf::from("library.toml"));
    }

    #[test]
    fn loads_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[player]\nrepeat_mode = \"all\"\n\n[simulation]\nspeed = 4.0\nfailing_downloads = [\"t3\"]"
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.player.repeat_mode, RepeatMode::All);
        assert_eq!(config.simulation.speed, 4.0);
        assert_eq!(config.simulation.failing_downloads, vec!["t3".to_string()]);
        assert_eq!(config.simulation.tick_interval_ms, 1000);
        assert!(config.player.prefetch_next);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/cadence.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = AppConfig::default();
        config.simulation.speed = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.player.replay_threshold_secs = -1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.simulation.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
