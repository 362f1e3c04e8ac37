//! Shell command grammar
//!
//! Each input line is parsed with clap, without a binary name.

use cadence_playback::{PlayerIndex, PlayerMode, QueueSegment, RepeatMode};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

impl ShellLine {
    /// Parse one input line
    pub fn parse_line(line: &str) -> Result<ShellCommand, clap::Error> {
        Self::try_parse_from(line.split_whitespace()).map(|parsed| parsed.command)
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum ShellCommand {
    /// List albums and podcasts
    Library,

    /// Play an album or podcast
    Play {
        collection: String,

        /// Item to start at
        #[arg(long, default_value_t = 0)]
        at: usize,

        /// Start at a random item
        #[arg(long)]
        shuffle: bool,

        /// Keep --at even when shuffling
        #[arg(long, requires = "shuffle")]
        keep_index: bool,
    },

    /// Resume playback
    Resume,

    /// Pause playback
    Pause,

    /// Toggle play/pause
    Toggle,

    /// Stop playback
    Stop,

    /// Seek to a position in seconds
    Seek { seconds: f64 },

    /// Skip forward
    Next {
        /// Only land on cached items
        #[arg(long)]
        cached: bool,
    },

    /// Skip backward
    Prev {
        /// Only land on cached items
        #[arg(long)]
        cached: bool,

        /// Restart the current item when past the replay threshold
        #[arg(long, conflicts_with = "cached")]
        replay: bool,
    },

    /// Play the item at a queue position
    Jump { segment: SegmentArg, offset: usize },

    /// Add items to the user queue
    Queue {
        #[arg(required = true)]
        items: Vec<String>,

        /// Play them right after the current item
        #[arg(long)]
        next: bool,
    },

    /// Add items to the context queue
    Context {
        #[arg(required = true)]
        items: Vec<String>,

        /// Insert them at the front of the upcoming context items
        #[arg(long)]
        next: bool,
    },

    /// Remove the item at a queue position
    Remove { segment: SegmentArg, offset: usize },

    /// Remove the item at an absolute position of the displayed order
    RemoveOrder { order: usize },

    /// Move an item between queue positions
    Move {
        from_segment: SegmentArg,
        from_offset: usize,
        to_segment: SegmentArg,
        to_offset: usize,
    },

    /// Clear queue segments
    Clear { target: ClearTarget },

    /// Set shuffle, or toggle it when no state is given
    Shuffle { state: Option<Switch> },

    /// Set the repeat mode, or cycle it when no mode is given
    Repeat { mode: Option<RepeatArg> },

    /// Switch between music and podcast mode
    Mode { mode: ModeArg },

    /// Turn offline mode on or off
    Offline { state: Switch },

    /// Turn caching of played items on or off
    Autocache { state: Switch },

    /// Show the queue and player status
    Status,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SegmentArg {
    Previous,
    User,
    Next,
}

impl SegmentArg {
    pub fn at(self, offset: usize) -> PlayerIndex {
        PlayerIndex::new(self.into(), offset)
    }
}

impl From<SegmentArg> for QueueSegment {
    fn from(segment: SegmentArg) -> Self {
        match segment {
            SegmentArg::Previous => Self::Previous,
            SegmentArg::User => Self::User,
            SegmentArg::Next => Self::Next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClearTarget {
    User,
    Context,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepeatArg {
    Off,
    All,
    Single,
}

impl From<RepeatArg> for RepeatMode {
    fn from(mode: RepeatArg) -> Self {
        match mode {
            RepeatArg::Off => Self::Off,
            RepeatArg::All => Self::All,
            RepeatArg::Single => Self::Single,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Music,
    Podcast,
}

impl From<ModeArg> for PlayerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Music => Self::Music,
            ModeArg::Podcast => Self::Podcast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_play_with_options() {
        let command = ShellLine::parse_line("play blue --at 2 --shuffle --keep-index").unwrap();
        assert_eq!(
            command,
            ShellCommand::Play {
                collection: "blue".to_string(),
                at: 2,
                shuffle: true,
                keep_index: true,
            }
        );
    }

    #[test]
    fn keep_index_requires_shuffle() {
        assert!(ShellLine::parse_line("play blue --keep-index").is_err());
    }

    #[test]
    fn parses_queue_positions() {
        let command = ShellLine::parse_line("move next 3 user 0").unwrap();
        let ShellCommand::Move { from_segment, from_offset, to_segment, to_offset } = command else {
            panic!("expected move");
        };
        assert_eq!(from_segment.at(from_offset), PlayerIndex::next(3));
        assert_eq!(to_segment.at(to_offset), PlayerIndex::user(0));
    }

    #[test]
    fn optional_switches() {
        assert_eq!(
            ShellLine::parse_line("shuffle").unwrap(),
            ShellCommand::Shuffle { state: None }
        );
        assert_eq!(
            ShellLine::parse_line("repeat single").unwrap(),
            ShellCommand::Repeat { mode: Some(RepeatArg::Single) }
        );
        assert_eq!(ShellLine::parse_line("exit").unwrap(), ShellCommand::Quit);
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(ShellLine::parse_line("dance").is_err());
        assert!(ShellLine::parse_line("queue").is_err());
        assert!(ShellLine::parse_line("prev --cached --replay").is_err());
        assert!(ShellLine::parse_line("jump sideways 1").is_err());
    }
}
