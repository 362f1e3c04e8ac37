//! Command execution and rendering

use crate::commands::{ClearTarget, ShellCommand};
use crate::error::{CliError, Result};
use crate::library::Library;
use cadence_playback::{Playable, PlayerEvent, PlayerHandle, PlayerView};
use std::fmt::Write as _;

/// What the shell should do after a command
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Print(String),
    Quit,
}

pub struct Shell {
    handle: PlayerHandle,
    library: Library,
}

impl Shell {
    pub fn new(handle: PlayerHandle, library: Library) -> Self {
        Self { handle, library }
    }

    pub fn handle(&self) -> &PlayerHandle {
        &self.handle
    }

    pub async fn execute(&self, command: ShellCommand) -> Result<Flow> {
        let player = &self.handle;
        match command {
            ShellCommand::Library => return Ok(Flow::Print(self.render_library())),
            ShellCommand::Play { collection, at, shuffle, keep_index } => {
                let mut context = self.library.context(&collection)?.starting_at(at);
                if keep_index {
                    context = context.keeping_index_during_shuffle();
                }
                if shuffle {
                    player.play_shuffled(context)?;
                } else {
                    player.play_context(context)?;
                }
            }
            ShellCommand::Resume => player.play()?,
            ShellCommand::Pause => player.pause()?,
            ShellCommand::Toggle => player.toggle_play_pause()?,
            ShellCommand::Stop => player.stop()?,
            ShellCommand::Seek { seconds } => player.seek(seconds)?,
            ShellCommand::Next { cached: true } => player.play_next_cached()?,
            ShellCommand::Next { cached: false } => player.play_next()?,
            ShellCommand::Prev { cached: true, .. } => player.play_previous_cached()?,
            ShellCommand::Prev { replay: true, .. } => player.play_previous_or_replay()?,
            ShellCommand::Prev { .. } => player.play_previous()?,
            ShellCommand::Jump { segment, offset } => player.play_at(segment.at(offset))?,
            ShellCommand::Queue { items, next } => {
                let items = self.resolve(&items)?;
                if next {
                    player.insert_user_queue(items)?;
                } else {
                    player.append_user_queue(items)?;
                }
            }
            ShellCommand::Context { items, next } => {
                let items = self.resolve(&items)?;
                if next {
                    player.insert_context_queue(items)?;
                } else {
                    player.append_context_queue(items)?;
                }
            }
            ShellCommand::Remove { segment, offset } => player.remove_playable(segment.at(offset))?,
            ShellCommand::RemoveOrder { order } => player.remove_at_order(order)?,
            ShellCommand::Move { from_segment, from_offset, to_segment, to_offset } => {
                player.move_playable(from_segment.at(from_offset), to_segment.at(to_offset))?;
            }
            ShellCommand::Clear { target } => match target {
                ClearTarget::User => player.clear_user_queue()?,
                ClearTarget::Context => player.clear_context_queue()?,
                ClearTarget::All => player.clear_queues()?,
            },
            ShellCommand::Shuffle { state: Some(state) } => player.set_shuffle(state.is_on())?,
            ShellCommand::Shuffle { state: None } => player.toggle_shuffle()?,
            ShellCommand::Repeat { mode: Some(mode) } => player.set_repeat_mode(mode.into())?,
            ShellCommand::Repeat { mode: None } => player.cycle_repeat_mode()?,
            ShellCommand::Mode { mode } => player.set_player_mode(mode.into())?,
            ShellCommand::Offline { state } => player.set_offline_mode(state.is_on())?,
            ShellCommand::Autocache { state } => player.set_auto_cache(state.is_on())?,
            ShellCommand::Status => {
                let view = player.view().await?;
                return Ok(Flow::Print(render_view(&view)));
            }
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn resolve(&self, ids: &[String]) -> Result<Vec<Playable>> {
        ids.iter()
            .map(|id| {
                self.library
                    .playable(id)
                    .ok_or_else(|| CliError::Library(format!("unknown item: {id}")))
            })
            .collect()
    }

    fn render_library(&self) -> String {
        let mut out = String::new();
        for (id, name, count) in self.library.collections() {
            let _ = writeln!(out, "{id:<12} {name} ({count} items)");
        }
        if out.is_empty() {
            out.push_str("library is empty\n");
        }
        out
    }
}

/// Multi-line description of the player for the terminal
pub fn render_view(view: &PlayerView) -> String {
    let mut out = String::new();
    let context = if view.context_name.is_empty() {
        "-"
    } else {
        view.context_name.as_str()
    };
    let _ = writeln!(
        out,
        "{:?} | context: {} | shuffle: {} | repeat: {:?} | mode: {:?}{}",
        view.state,
        context,
        if view.status.is_shuffle { "on" } else { "off" },
        view.status.repeat_mode,
        view.status.player_mode,
        if view.is_offline { " | offline" } else { "" },
    );

    match &view.currently_playing {
        Some(current) => {
            let _ = writeln!(
                out,
                "now #{}: {} [{:.0}/{:.0}s]{}",
                view.reported_order,
                label(current),
                view.elapsed,
                view.duration,
                if view.is_user_queue_playing { " (queued)" } else { "" },
            );
        }
        None => out.push_str("now: -\n"),
    }

    for (heading, items) in [
        ("previous", &view.previous),
        ("queued", &view.user_queue),
        ("next", &view.next),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{heading}:");
        for (offset, item) in items.iter().enumerate() {
            let _ = writeln!(out, "  {offset:>3} {}", label(item));
        }
    }
    out
}

/// Single-line description of an event, `None` for noisy ones
pub fn render_event(event: &PlayerEvent) -> Option<String> {
    match event {
        PlayerEvent::Started(playable) => Some(format!("> started {}", label(playable))),
        PlayerEvent::Paused => Some("> paused".to_string()),
        PlayerEvent::Stopped => Some("> stopped".to_string()),
        PlayerEvent::ShuffleChanged(on) => Some(format!("> shuffle {}", if *on { "on" } else { "off" })),
        PlayerEvent::RepeatChanged(mode) => Some(format!("> repeat {mode:?}")),
        PlayerEvent::PlayerModeChanged => Some("> player mode changed".to_string()),
        PlayerEvent::PlaybackFailed { playable_id, error } => {
            Some(format!("> failed {playable_id}: {error}"))
        }
        PlayerEvent::ElapsedTimeChanged { .. }
        | PlayerEvent::PlaylistChanged
        | PlayerEvent::ArtworkChanged => None,
    }
}

fn label(playable: &Playable) -> String {
    let cached = if playable.is_cached { "" } else { " (remote)" };
    format!("{} [{}]{cached}", playable.title, playable.id)
}
