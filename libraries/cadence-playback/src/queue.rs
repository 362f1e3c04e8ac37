//! Three-segment play queue
//!
//! ```text
//! Previous (context items already played):
//!   - Track A
//!   - Track B
//! ─────────────────────────────
//! Currently Playing: Track C
//! ─────────────────────────────
//! User Queue (play next / play later):
//!   - Track X
//! ─────────────────────────────
//! Next (remaining context items):
//!   - Track D
//!   - Track E
//! ```
//!
//! `previous ++ [current] ++ next` is always the context order when the current
//! item came from the context. User-queue items are one-shot: once they stop
//! being current they are gone.

use crate::context::PlayContext;
use crate::error::{PlaybackError, Result};
use crate::types::{Playable, PlayerIndex, QueueSegment};

/// Label shown when the queue no longer matches a single named context
pub const MIXED_CONTEXT_NAME: &str = "Mixed Context";

/// Queue storage and addressing
///
/// Pure data structure: no backend, no downloads, no notifications. Operations
/// that may require the player to react report what happened through their
/// return value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayQueueHandler {
    /// Name of the context the queue was built from (empty once mixed)
    context_name: String,

    /// Context items already played
    previous: Vec<Playable>,

    /// Explicit insertions, consumed front-to-back
    user: Vec<Playable>,

    /// Remaining context items
    next: Vec<Playable>,

    /// Active item
    current: Option<Playable>,

    /// Whether `current` was taken from the user queue
    is_user_queue_playing: bool,
}

/// Outcome of removing an item by order position
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    /// The item that left the queue
    pub removed: Playable,

    /// Whether the removed item was the current one
    pub displaced_current: bool,
}

impl PlayQueueHandler {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Snapshots =====

    /// Context items already played
    pub fn previous(&self) -> &[Playable] {
        &self.previous
    }

    /// Pending user insertions
    pub fn user_queue(&self) -> &[Playable] {
        &self.user
    }

    /// Remaining context items
    pub fn next_queue(&self) -> &[Playable] {
        &self.next
    }

    /// Segment by tag
    pub fn segment(&self, segment: QueueSegment) -> &[Playable] {
        match segment {
            QueueSegment::Previous => &self.previous,
            QueueSegment::User => &self.user,
            QueueSegment::Next => &self.next,
        }
    }

    /// The active item, if any
    pub fn current(&self) -> Option<&Playable> {
        self.current.as_ref()
    }

    /// Whether the active item came from the user queue
    pub fn is_user_queue_playing(&self) -> bool {
        self.is_user_queue_playing
    }

    /// Whether there is nothing at all in the queue
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
            && self.previous.is_empty()
            && self.user.is_empty()
            && self.next.is_empty()
    }

    /// Whether a step backwards is possible without wrapping
    pub fn has_previous(&self) -> bool {
        !self.previous.is_empty()
    }

    /// Whether a step forwards is possible without wrapping
    pub fn has_next(&self) -> bool {
        !self.user.is_empty() || !self.next.is_empty()
    }

    /// Display name of the queue
    ///
    /// Empty once no context items remain and nothing from the context is
    /// playing; the assigned name otherwise, or [`MIXED_CONTEXT_NAME`] when the
    /// context identity was lost through insertions.
    pub fn context_name(&self) -> &str {
        let context_idle = self.previous.is_empty()
            && self.next.is_empty()
            && (self.current.is_none() || self.is_user_queue_playing);

        if context_idle {
            ""
        } else if self.context_name.is_empty() {
            MIXED_CONTEXT_NAME
        } else {
            &self.context_name
        }
    }

    /// Name as assigned, without display fallbacks
    pub fn assigned_context_name(&self) -> &str {
        &self.context_name
    }

    /// Flat context order: `previous ++ [current] ++ next`
    ///
    /// The current item is included only when it came from the context.
    pub fn context_order(&self) -> Vec<&Playable> {
        let current = if self.is_user_queue_playing {
            None
        } else {
            self.current.as_ref()
        };

        self.previous
            .iter()
            .chain(current)
            .chain(self.next.iter())
            .collect()
    }

    /// Order position of the active item (number of context items played)
    pub fn current_order(&self) -> Option<usize> {
        self.current.as_ref().map(|_| self.previous.len())
    }

    // ===== Building =====

    /// Replace the context wholesale
    ///
    /// The user queue survives. Returns whether the context had a valid active
    /// item; an empty context leaves the queue without a current item.
    pub fn apply_context(&mut self, context: PlayContext) -> bool {
        if self.is_user_queue_playing {
            self.current = None;
            self.is_user_queue_playing = false;
        }

        match context.into_segments() {
            Some((name, previous, current, next)) => {
                self.context_name = name;
                self.previous = previous;
                self.current = Some(current);
                self.next = next;
                true
            }
            None => {
                self.context_name.clear();
                self.previous.clear();
                self.current = None;
                self.next.clear();
                false
            }
        }
    }

    /// Splice items at the front of the remaining context
    pub fn insert_context_queue(&mut self, items: Vec<Playable>) {
        if items.is_empty() {
            return;
        }
        self.context_name.clear();
        self.next.splice(0..0, items);
    }

    /// Splice items at the end of the remaining context
    pub fn append_context_queue(&mut self, items: Vec<Playable>) {
        if items.is_empty() {
            return;
        }
        self.context_name.clear();
        self.next.extend(items);
    }

    /// Splice items at the front of the user queue ("play next")
    pub fn insert_user_queue(&mut self, items: Vec<Playable>) {
        self.user.splice(0..0, items);
    }

    /// Splice items at the end of the user queue ("play later")
    pub fn append_user_queue(&mut self, items: Vec<Playable>) {
        self.user.extend(items);
    }

    // ===== Addressing =====

    fn resolve(&self, index: PlayerIndex) -> Result<()> {
        let len = self.segment(index.segment).len();
        if index.offset < len {
            Ok(())
        } else {
            Err(PlaybackError::IndexOutOfRange {
                segment: index.segment,
                offset: index.offset,
                len,
            })
        }
    }

    fn segment_mut(&mut self, segment: QueueSegment) -> &mut Vec<Playable> {
        match segment {
            QueueSegment::Previous => &mut self.previous,
            QueueSegment::User => &mut self.user,
            QueueSegment::Next => &mut self.next,
        }
    }

    /// Item at `index`
    pub fn get_playable(&self, index: PlayerIndex) -> Result<&Playable> {
        self.resolve(index)?;
        Ok(&self.segment(index.segment)[index.offset])
    }

    /// Remove the item at `index`
    ///
    /// Segment items are never the current item, so the pointer is untouched.
    pub fn remove_playable(&mut self, index: PlayerIndex) -> Result<Playable> {
        self.resolve(index)?;
        Ok(self.segment_mut(index.segment).remove(index.offset))
    }

    /// Remove the item at a flat context order position
    ///
    /// Removing the current item advances the pointer to the following item
    /// (user queue first, then the context) without changing the order
    /// position; removing an earlier item shifts the position down by one.
    pub fn remove_at_order(&mut self, order: usize) -> Result<Removal> {
        let previous_len = self.previous.len();
        let current_in_order = self.current.is_some() && !self.is_user_queue_playing;
        let len = self.context_order_len();

        if order >= len {
            return Err(PlaybackError::OrderOutOfRange { order, len });
        }

        if order < previous_len {
            return Ok(Removal {
                removed: self.previous.remove(order),
                displaced_current: false,
            });
        }

        if current_in_order && order == previous_len {
            let removed = self.current.take().ok_or(PlaybackError::OrderOutOfRange { order, len })?;
            if !self.user.is_empty() {
                self.current = Some(self.user.remove(0));
                self.is_user_queue_playing = true;
            } else if !self.next.is_empty() {
                self.current = Some(self.next.remove(0));
            }
            return Ok(Removal {
                removed,
                displaced_current: true,
            });
        }

        let offset = order - previous_len - usize::from(current_in_order);
        Ok(Removal {
            removed: self.next.remove(offset),
            displaced_current: false,
        })
    }

    fn context_order_len(&self) -> usize {
        let current = usize::from(self.current.is_some() && !self.is_user_queue_playing);
        self.previous.len() + current + self.next.len()
    }

    /// Move an item between or within segments
    ///
    /// `to.offset` is the insertion position after the item was taken out of
    /// its segment. The current item is never affected.
    pub fn move_playable(&mut self, from: PlayerIndex, to: PlayerIndex) -> Result<()> {
        self.resolve(from)?;

        let target_len = self.segment(to.segment).len() - usize::from(from.segment == to.segment);
        if to.offset > target_len {
            return Err(PlaybackError::IndexOutOfRange {
                segment: to.segment,
                offset: to.offset,
                len: target_len,
            });
        }

        if from == to {
            return Ok(());
        }

        let item = self.segment_mut(from.segment).remove(from.offset);
        self.segment_mut(to.segment).insert(to.offset, item);
        if from.segment != to.segment && to.segment != QueueSegment::User {
            self.context_name.clear();
        }
        Ok(())
    }

    /// Drop all pending user insertions
    ///
    /// A user item that is already playing stays current.
    pub fn clear_user_queue(&mut self) {
        self.user.clear();
    }

    /// Drop the context
    ///
    /// Returns whether the current item was dropped with it (it came from the
    /// context), in which case the player has to stop.
    pub fn clear_context_queue(&mut self) -> bool {
        self.previous.clear();
        self.next.clear();
        self.context_name.clear();

        if self.is_user_queue_playing || self.current.is_none() {
            false
        } else {
            self.current = None;
            true
        }
    }

    /// Drop everything, including the current item
    pub fn clear_queues(&mut self) {
        *self = Self::default();
    }

    // ===== Navigation =====

    /// Retire the current item: context items move to `previous`, user items
    /// are consumed.
    fn retire_current(&mut self) {
        if let Some(current) = self.current.take() {
            if !self.is_user_queue_playing {
                self.previous.push(current);
            }
        }
        self.is_user_queue_playing = false;
    }

    /// Step forwards: user queue head first, then the next context item
    ///
    /// Returns `false` at the end of the queue without touching anything.
    pub fn advance(&mut self) -> bool {
        if !self.user.is_empty() {
            let upcoming = self.user.remove(0);
            self.retire_current();
            self.current = Some(upcoming);
            self.is_user_queue_playing = true;
            true
        } else if !self.next.is_empty() {
            let upcoming = self.next.remove(0);
            self.retire_current();
            self.current = Some(upcoming);
            true
        } else {
            false
        }
    }

    /// Step back to the previous context item
    ///
    /// Never pulls from the user queue; a playing user item is consumed.
    pub fn retreat(&mut self) -> bool {
        let Some(target) = self.previous.pop() else {
            return false;
        };

        if let Some(current) = self.current.take() {
            if !self.is_user_queue_playing {
                self.next.insert(0, current);
            }
        }
        self.current = Some(target);
        self.is_user_queue_playing = false;
        true
    }

    fn drain_context(&mut self) -> Vec<Playable> {
        let mut order = std::mem::take(&mut self.previous);
        if !self.is_user_queue_playing {
            order.extend(self.current.take());
        }
        order.append(&mut self.next);
        order
    }

    /// Wrap to the first context item (repeat all, forwards)
    pub fn wrap_to_start(&mut self) -> bool {
        let mut order = self.drain_context();
        if order.is_empty() {
            return false;
        }

        let first = order.remove(0);
        self.current = Some(first);
        self.next = order;
        self.is_user_queue_playing = false;
        true
    }

    /// Wrap to the last context item (repeat all, backwards)
    pub fn wrap_to_end(&mut self) -> bool {
        let mut order = self.drain_context();
        let Some(last) = order.pop() else {
            return false;
        };

        self.previous = order;
        self.current = Some(last);
        self.is_user_queue_playing = false;
        true
    }

    /// Make the item at `index` current
    ///
    /// - `Previous(k)`: items after `k` and the current context item move to
    ///   the front of `next`.
    /// - `User(k)`: user items before `k` are skipped and dropped.
    /// - `Next(k)`: the current context item and the `k` skipped items move to
    ///   `previous`.
    pub fn jump_to(&mut self, index: PlayerIndex) -> Result<()> {
        self.resolve(index)?;

        match index.segment {
            QueueSegment::Previous => {
                let mut tail = self.previous.split_off(index.offset);
                let target = tail.remove(0);
                if let Some(current) = self.current.take() {
                    if !self.is_user_queue_playing {
                        tail.push(current);
                    }
                }
                tail.append(&mut self.next);
                self.next = tail;
                self.current = Some(target);
                self.is_user_queue_playing = false;
            }
            QueueSegment::User => {
                self.user.drain(..index.offset);
                let target = self.user.remove(0);
                self.retire_current();
                self.current = Some(target);
                self.is_user_queue_playing = true;
            }
            QueueSegment::Next => {
                let mut rest = self.next.split_off(index.offset);
                let target = rest.remove(0);
                let skipped = std::mem::replace(&mut self.next, rest);
                self.retire_current();
                self.previous.extend(skipped);
                self.current = Some(target);
            }
        }
        Ok(())
    }

    /// Nearest cached item forwards, scanning circularly
    ///
    /// Order: user queue, remaining context, then wrapping around to the start
    /// of the context. The current item is never a candidate.
    pub fn next_cached_index(&self) -> Option<PlayerIndex> {
        let user = self.user.iter().enumerate().map(|(i, p)| (PlayerIndex::user(i), p));
        let next = self.next.iter().enumerate().map(|(i, p)| (PlayerIndex::next(i), p));
        let wrapped = self
            .previous
            .iter()
            .enumerate()
            .map(|(i, p)| (PlayerIndex::previous(i), p));

        user.chain(next)
            .chain(wrapped)
            .find(|(_, playable)| playable.is_cached)
            .map(|(index, _)| index)
    }

    /// Nearest cached item backwards, scanning circularly
    ///
    /// Order: played context items (most recent first), then wrapping around
    /// to the end of the context. The user queue is never a candidate.
    pub fn previous_cached_index(&self) -> Option<PlayerIndex> {
        let previous = self
            .previous
            .iter()
            .enumerate()
            .rev()
            .map(|(i, p)| (PlayerIndex::previous(i), p));
        let wrapped = self
            .next
            .iter()
            .enumerate()
            .rev()
            .map(|(i, p)| (PlayerIndex::next(i), p));

        previous
            .chain(wrapped)
            .find(|(_, playable)| playable.is_cached)
            .map(|(index, _)| index)
    }

    /// The item a forward step would land on, without moving
    pub fn peek_next(&self) -> Option<&Playable> {
        self.user.first().or_else(|| self.next.first())
    }

    /// Flag every copy of `playable_id` as cached
    pub fn mark_cached(&mut self, playable_id: &str) {
        let segments = self
            .previous
            .iter_mut()
            .chain(self.user.iter_mut())
            .chain(self.next.iter_mut())
            .chain(self.current.iter_mut());

        for playable in segments.filter(|p| p.id == playable_id) {
            playable.is_cached = true;
        }
    }

    // ===== Restoration =====

    /// Rebuild a queue from persisted segments
    ///
    /// `current` addresses the active item inside the given segments. Returns
    /// the queue and whether the pointer resolved; an unresolvable pointer
    /// leaves the segments intact without a current item.
    pub fn from_parts(
        context_name: String,
        previous: Vec<Playable>,
        user: Vec<Playable>,
        next: Vec<Playable>,
        current: Option<PlayerIndex>,
    ) -> (Self, bool) {
        let mut queue = Self {
            context_name,
            previous,
            user,
            next,
            current: None,
            is_user_queue_playing: false,
        };

        let restored = match current {
            Some(index) => queue.jump_to(index).is_ok(),
            None => false,
        };
        (queue, restored)
    }
}
