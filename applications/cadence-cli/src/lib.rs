//! Cadence shell
//!
//! Interactive front end for `cadence-playback`: loads a static library,
//! runs the player service against a simulated backend and downloader, and
//! drives it from stdin.

pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod library;
pub mod shell;

pub use commands::{ShellCommand, ShellLine};
pub use config::AppConfig;
pub use error::{CliError, Result};
pub use library::Library;
pub use shell::{Flow, Shell};
