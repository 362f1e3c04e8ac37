//! Play contexts
//!
//! A context is an immutable request to start playback: a named sequence of
//! playables plus the position to start from. It is absorbed into the queue by
//! [`crate::PlayQueueHandler::apply_context`] and discarded afterwards.

use crate::types::Playable;
use rand::Rng;

/// Request to start playback of a named sequence
#[derive(Debug, Clone, PartialEq)]
pub struct PlayContext {
    name: String,
    start_index: usize,
    items: Vec<Playable>,
    keep_index_during_shuffle: bool,
}

impl PlayContext {
    /// Create a context starting at the first item
    pub fn new(name: impl Into<String>, items: Vec<Playable>) -> Self {
        Self {
            name: name.into(),
            start_index: 0,
            items,
            keep_index_during_shuffle: false,
        }
    }

    /// Start at `index` instead of the first item
    #[must_use]
    pub fn starting_at(mut self, index: usize) -> Self {
        self.start_index = index;
        self
    }

    /// Pin the start index so shuffling only toggles the shuffle flag
    #[must_use]
    pub fn keeping_index_during_shuffle(mut self) -> Self {
        self.keep_index_during_shuffle = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn items(&self) -> &[Playable] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keeps_index_during_shuffle(&self) -> bool {
        self.keep_index_during_shuffle
    }

    /// The item playback starts with
    ///
    /// `None` for an empty context or an out-of-range start index.
    pub fn active_playable(&self) -> Option<&Playable> {
        self.items.get(self.start_index)
    }

    /// Same context with a uniformly random start index
    ///
    /// Never reorders the items. Returns an unchanged copy when the index is
    /// pinned or there is nothing to pick from.
    #[must_use]
    pub fn with_shuffled_index(&self) -> Self {
        if self.keep_index_during_shuffle || self.items.is_empty() {
            return self.clone();
        }

        let start_index = rand::thread_rng().gen_range(0..self.items.len());
        Self {
            start_index,
            ..self.clone()
        }
    }

    /// Split into (items before start, start item, items after start)
    ///
    /// Returns `None` when there is no valid active item.
    pub(crate) fn into_segments(self) -> Option<(String, Vec<Playable>, Playable, Vec<Playable>)> {
        if self.start_index >= self.items.len() {
            return None;
        }

        let mut previous = self.items;
        let mut next = previous.split_off(self.start_index);
        let current = next.remove(0);
        Some((self.name, previous, current, next))
    }
}
